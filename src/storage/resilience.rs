//! Store resilience wrapper with retry and circuit breaking.
//!
//! Wraps any [`TacticStore`] so transient backend failures are retried with
//! exponential backoff and a persistently failing backend is short-circuited.
//!
//! # Circuit Breaker States
//!
//! ```text
//! +--------+     failures >= threshold     +------+
//! | Closed | --------------------------->  | Open |
//! +--------+                               +------+
//!     ^                                        |
//!     |  success                               | timeout elapsed
//!     |                                        v
//!     +--------------------------------  +-----------+
//!                                        | Half-Open |
//!                                        +-----------+
//! ```
//!
//! Only idempotent operations are retried. Appends are attempted once: a
//! lost reply after a committed append would otherwise duplicate the item.

use super::traits::TacticStore;
use crate::{Error, Result};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Resilience configuration for stores.
#[derive(Debug, Clone)]
pub struct StoreResilienceConfig {
    /// Retries after the first failed attempt of an idempotent operation.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles on each further retry.
    pub initial_backoff_ms: u64,
    /// Consecutive failures before opening the circuit.
    pub breaker_failure_threshold: u32,
    /// How long to keep the circuit open before half-open.
    pub breaker_reset_timeout_ms: u64,
}

impl Default for StoreResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 50,
            breaker_failure_threshold: 5,
            breaker_reset_timeout_ms: 30_000,
        }
    }
}

impl StoreResilienceConfig {
    /// Loads resilience configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(parsed) = env_parse::<u32>("TACTIC_STORE_RETRY_MAX") {
            self.max_retries = parsed;
        }
        if let Some(parsed) = env_parse::<u64>("TACTIC_STORE_RETRY_BACKOFF_MS") {
            self.initial_backoff_ms = parsed;
        }
        if let Some(parsed) = env_parse::<u32>("TACTIC_STORE_BREAKER_FAILURE_THRESHOLD") {
            self.breaker_failure_threshold = parsed.max(1);
        }
        if let Some(parsed) = env_parse::<u64>("TACTIC_STORE_BREAKER_RESET_MS") {
            self.breaker_reset_timeout_ms = parsed;
        }
        self
    }

    /// Sets the retry count.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the initial backoff in milliseconds.
    #[must_use]
    pub const fn with_initial_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.initial_backoff_ms = backoff_ms;
        self
    }

    /// Sets the failure threshold.
    #[must_use]
    pub const fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.breaker_failure_threshold = threshold;
        self
    }

    /// Sets the reset timeout in milliseconds.
    #[must_use]
    pub const fn with_reset_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.breaker_reset_timeout_ms = timeout_ms;
        self
    }

    fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.min(16);
        Duration::from_millis(self.initial_backoff_ms.saturating_mul(factor))
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparseable value");
            None
        },
    }
}

/// Runs `connect` until it succeeds, retrying with exponential backoff.
///
/// Used by network backends when establishing a fresh connection.
///
/// # Errors
///
/// Returns the last error once `config.max_retries` retries are exhausted.
pub fn retry_connection<T, F>(
    config: &StoreResilienceConfig,
    backend: &'static str,
    operation: &'static str,
    mut connect: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut attempt = 0;
    loop {
        match connect() {
            Ok(value) => return Ok(value),
            Err(err) if attempt < config.max_retries => {
                let delay = config.backoff(attempt);
                tracing::warn!(
                    backend,
                    operation,
                    attempt = attempt + 1,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "Connection attempt failed, retrying"
                );
                metrics::counter!(
                    "tactic_store_connect_retries_total",
                    "backend" => backend
                )
                .increment(1);
                std::thread::sleep(delay);
                attempt += 1;
            },
            Err(err) => return Err(err),
        }
    }
}

#[derive(Debug)]
enum BreakerState {
    Closed { failures: u32 },
    Open { opened_at: Instant },
    HalfOpen,
}

/// Circuit breaker for a store backend.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: BreakerState,
    failure_threshold: u32,
    reset_timeout: Duration,
    backend_name: &'static str,
}

impl CircuitBreaker {
    /// Creates a closed circuit breaker.
    #[must_use]
    pub fn new(config: &StoreResilienceConfig, backend_name: &'static str) -> Self {
        Self {
            state: BreakerState::Closed { failures: 0 },
            failure_threshold: config.breaker_failure_threshold.max(1),
            reset_timeout: Duration::from_millis(config.breaker_reset_timeout_ms),
            backend_name,
        }
    }

    /// Returns `true` if a call may proceed.
    pub fn allow(&mut self) -> bool {
        match self.state {
            BreakerState::Closed { .. } => true,
            BreakerState::Open { opened_at } => {
                if opened_at.elapsed() >= self.reset_timeout {
                    tracing::info!(
                        backend = self.backend_name,
                        "Circuit breaker transitioning to half-open"
                    );
                    self.state = BreakerState::HalfOpen;
                    true
                } else {
                    false
                }
            },
            // One trial call at a time; the outcome decides the next state.
            BreakerState::HalfOpen => false,
        }
    }

    /// Records a successful call and closes the circuit.
    pub fn on_success(&mut self) {
        if !matches!(self.state, BreakerState::Closed { failures: 0 }) {
            tracing::info!(
                backend = self.backend_name,
                "Circuit breaker closing after success"
            );
        }
        self.state = BreakerState::Closed { failures: 0 };
    }

    /// Records a failed call.
    ///
    /// Returns `true` if the circuit just opened.
    pub fn on_failure(&mut self) -> bool {
        match self.state {
            BreakerState::Closed { ref mut failures } => {
                *failures += 1;
                if *failures >= self.failure_threshold {
                    tracing::warn!(
                        backend = self.backend_name,
                        failures = *failures,
                        threshold = self.failure_threshold,
                        "Circuit breaker opened after consecutive failures"
                    );
                    self.state = BreakerState::Open {
                        opened_at: Instant::now(),
                    };
                    return true;
                }
            },
            BreakerState::HalfOpen => {
                tracing::warn!(
                    backend = self.backend_name,
                    "Circuit breaker re-opened after half-open failure"
                );
                self.state = BreakerState::Open {
                    opened_at: Instant::now(),
                };
                return true;
            },
            BreakerState::Open { .. } => {},
        }
        false
    }

    /// Returns the current state as a numeric value for metrics.
    ///
    /// - 0: Closed
    /// - 1: Open
    /// - 2: Half-Open
    #[must_use]
    pub const fn state_value(&self) -> u8 {
        match self.state {
            BreakerState::Closed { .. } => 0,
            BreakerState::Open { .. } => 1,
            BreakerState::HalfOpen => 2,
        }
    }
}

/// Store wrapper adding retry with backoff and circuit breaking.
pub struct ResilientStore<S: TacticStore> {
    inner: S,
    config: StoreResilienceConfig,
    breaker: Mutex<CircuitBreaker>,
}

impl<S: TacticStore> ResilientStore<S> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: S, config: StoreResilienceConfig) -> Self {
        let breaker = CircuitBreaker::new(&config, inner.backend_name());
        Self {
            inner,
            config,
            breaker: Mutex::new(breaker),
        }
    }

    /// Returns the wrapped store.
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    fn execute<T, F>(&self, operation: &'static str, retryable: bool, call: F) -> Result<T>
    where
        F: Fn(&S) -> Result<T>,
    {
        let backend = self.inner.backend_name();
        let attempts = if retryable {
            self.config.max_retries.saturating_add(1)
        } else {
            1
        };

        let mut last_err = None;
        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.config.backoff(attempt - 1);
                tracing::debug!(
                    backend,
                    operation,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Retrying store operation"
                );
                metrics::counter!(
                    "tactic_store_retries_total",
                    "backend" => backend,
                    "operation" => operation
                )
                .increment(1);
                std::thread::sleep(delay);
            }

            if !self.breaker().allow() {
                self.record(operation, "circuit_open");
                return Err(Error::store(
                    operation,
                    format!("circuit breaker open for backend '{backend}'"),
                ));
            }

            match call(&self.inner) {
                Ok(value) => {
                    self.breaker().on_success();
                    self.record(operation, "success");
                    return Ok(value);
                },
                Err(err) => {
                    let tripped = self.breaker().on_failure();
                    self.record(operation, "error");
                    if tripped {
                        metrics::counter!(
                            "tactic_store_circuit_breaker_trips_total",
                            "backend" => backend,
                            "operation" => operation
                        )
                        .increment(1);
                    }
                    // Only backend outages are worth another attempt.
                    let transient = matches!(err, Error::StoreUnavailable { .. });
                    last_err = Some(err);
                    if !transient {
                        break;
                    }
                },
            }
        }

        Err(last_err.unwrap_or_else(|| Error::store(operation, "no attempt made")))
    }

    fn breaker(&self) -> std::sync::MutexGuard<'_, CircuitBreaker> {
        self.breaker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, operation: &'static str, status: &'static str) {
        let backend = self.inner.backend_name();
        let state = self.breaker().state_value();
        metrics::counter!(
            "tactic_store_requests_total",
            "backend" => backend,
            "operation" => operation,
            "status" => status
        )
        .increment(1);
        metrics::gauge!(
            "tactic_store_circuit_breaker_state",
            "backend" => backend
        )
        .set(f64::from(state));
    }
}

impl<S: TacticStore> TacticStore for ResilientStore<S> {
    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }

    fn read_list(&self, key: &str) -> Result<Vec<String>> {
        self.execute("read_list", true, |s| s.read_list(key))
    }

    fn append(&self, key: &str, items: &[String]) -> Result<()> {
        self.execute("append", false, |s| s.append(key, items))
    }

    fn get_fields(&self, key: &str, fields: &[String]) -> Result<Vec<Option<String>>> {
        self.execute("get_fields", true, |s| s.get_fields(key, fields))
    }

    fn put_field(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.execute("put_field", true, |s| s.put_field(key, field, value))
    }

    fn delete(&self, keys: &[&str]) -> Result<()> {
        self.execute("delete", true, |s| s.delete(keys))
    }

    fn list_keys(&self, prefix: &str, suffix: &str) -> Result<Vec<String>> {
        self.execute("list_keys", true, |s| s.list_keys(prefix, suffix))
    }

    fn append_entry(&self, list_key: &str, item: &str, map_key: &str, value: &str) -> Result<()> {
        self.execute("append_entry", false, |s| {
            s.append_entry(list_key, item, map_key, value)
        })
    }

    fn replace_entries(
        &self,
        list_key: &str,
        map_key: &str,
        entries: &[(String, String)],
    ) -> Result<()> {
        self.execute("replace_entries", true, |s| {
            s.replace_entries(list_key, map_key, entries)
        })
    }

    fn remove_entry(&self, list_key: &str, map_key: &str, item: &str) -> Result<bool> {
        self.execute("remove_entry", true, |s| {
            s.remove_entry(list_key, map_key, item)
        })
    }
}
