//! End-to-end scenarios for the deduplication engine.
//!
//! Runs admission, compaction, seeding and merging against an in-memory
//! store wrapped in a call counter, with fixed vectors so similarity scores
//! are exact.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

mod common;

use common::{CountingStore, MapEmbedder, at, raw_list, with_similarity};
use std::sync::Arc;
use tactic_dedupe::models::ListKey;
use tactic_dedupe::storage::TacticStore;
use tactic_dedupe::{AdmitOutcome, DedupeEngine, DuplicateReason, Error};

const THRESHOLD: f32 = 0.92;

type Engine = DedupeEngine<MapEmbedder, CountingStore>;

fn setup(entries: &[(&str, Vec<f32>)]) -> (Engine, Arc<MapEmbedder>, Arc<CountingStore>) {
    let embedder = Arc::new(MapEmbedder::new(entries));
    let store = Arc::new(CountingStore::new());
    let engine = DedupeEngine::new(Arc::clone(&embedder), Arc::clone(&store));
    (engine, embedder, store)
}

#[test]
fn supervisor_pair_compacts_to_first() {
    let (engine, _, store) = setup(&[
        ("Ask for a supervisor.", vec![1.0, 0.0]),
        ("Request to speak with a supervisor.", with_similarity(0.95)),
    ]);
    let key = ListKey::tactics();
    raw_list(
        store.as_ref(),
        key.as_str(),
        &["Ask for a supervisor.", "Request to speak with a supervisor."],
    );

    let summary = engine.compact(&key, THRESHOLD).unwrap();

    assert_eq!(summary.removed, 1);
    assert_eq!(summary.kept, 1);
    assert_eq!(engine.list(&key).unwrap(), vec!["Ask for a supervisor."]);
}

#[test]
fn supervisor_pair_admission_rejects_second() {
    let (engine, _, _) = setup(&[
        ("Ask for a supervisor.", vec![1.0, 0.0]),
        ("Request to speak with a supervisor.", with_similarity(0.95)),
    ]);
    let key = ListKey::tactics();

    assert!(engine.admit(&key, "Ask for a supervisor.", THRESHOLD).unwrap().is_added());
    let second = engine
        .admit(&key, "Request to speak with a supervisor.", THRESHOLD)
        .unwrap();

    match second {
        AdmitOutcome::Duplicate {
            reason,
            matched,
            score,
        } => {
            assert_eq!(reason, DuplicateReason::SemanticSimilar);
            assert_eq!(matched, "Ask for a supervisor.");
            assert!((score.unwrap() - 0.95).abs() < 1e-4);
        },
        other => panic!("expected duplicate, got {other:?}"),
    }
    assert_eq!(engine.list(&key).unwrap().len(), 1);
}

#[test]
fn cite_policy_twice_is_added_then_exact_duplicate() {
    let (engine, _, _) = setup(&[("Cite policy.", vec![1.0, 0.0])]);
    let key = ListKey::tactics();

    assert_eq!(
        engine.admit(&key, "Cite policy.", THRESHOLD).unwrap(),
        AdmitOutcome::Added
    );
    assert_eq!(
        engine.admit(&key, "Cite policy.", THRESHOLD).unwrap(),
        AdmitOutcome::Duplicate {
            reason: DuplicateReason::ExactMatch,
            matched: "Cite policy.".to_string(),
            score: None,
        }
    );
    assert_eq!(engine.list(&key).unwrap(), vec!["Cite policy."]);
}

#[test]
fn blank_candidate_makes_no_calls() {
    let (engine, embedder, store) = setup(&[]);
    let key = ListKey::tactics();

    assert!(engine.admit(&key, "", THRESHOLD).unwrap().is_skip());
    assert!(engine.admit(&key, " \t\n", THRESHOLD).unwrap().is_skip());

    assert_eq!(embedder.calls(), 0);
    assert_eq!(store.calls(), 0);
}

#[test]
fn below_threshold_candidate_added_once() {
    let (engine, _, _) = setup(&[
        ("Cite policy.", at(0.0)),
        ("Mention loyalty.", at(1.2)),
    ]);
    let key = ListKey::tactics();

    engine.admit(&key, "Cite policy.", THRESHOLD).unwrap();
    let outcome = engine.admit(&key, "Mention loyalty.", THRESHOLD).unwrap();

    assert!(outcome.is_added());
    let list = engine.list(&key).unwrap();
    assert_eq!(list.iter().filter(|t| *t == "Mention loyalty.").count(), 1);
}

#[test]
fn candidate_is_trimmed_before_storing() {
    let (engine, _, _) = setup(&[("Stay calm.", at(0.0))]);
    let key = ListKey::tactics();

    engine.admit(&key, "   Stay calm.\n", THRESHOLD).unwrap();
    assert_eq!(engine.list(&key).unwrap(), vec!["Stay calm."]);
}

#[test]
fn compaction_is_idempotent_and_second_run_writes_nothing() {
    let (engine, embedder, store) = setup(&[
        ("A", at(0.0)),
        ("A'", at(0.05)),
        ("B", at(1.0)),
        ("B'", at(1.02)),
        ("C", at(2.5)),
    ]);
    let key = ListKey::failed();
    raw_list(store.as_ref(), key.as_str(), &["A", "B", "A'", "C", "B'"]);

    let first = engine.compact(&key, THRESHOLD).unwrap();
    assert_eq!(first.removed, 2);
    assert_eq!(engine.list(&key).unwrap(), vec!["A", "B", "C"]);

    let writes = store.writes();
    let calls = embedder.calls();
    let second = engine.compact(&key, THRESHOLD).unwrap();

    assert_eq!(second.removed, 0);
    assert_eq!(store.writes(), writes);
    assert_eq!(embedder.calls(), calls);
}

#[test]
fn compaction_keeps_exact_repeats_once() {
    let (engine, _, store) = setup(&[("Cite policy.", at(0.0))]);
    let key = ListKey::winning();
    raw_list(
        store.as_ref(),
        key.as_str(),
        &["Cite policy.", "Cite policy.", "Cite policy."],
    );

    assert_eq!(engine.compact(&key, THRESHOLD).unwrap().removed, 2);
    assert_eq!(engine.list(&key).unwrap(), vec!["Cite policy."]);
}

#[test]
fn cached_vectors_are_reused_across_admissions() {
    let (engine, embedder, _) = setup(&[
        ("A", at(0.0)),
        ("B", at(1.0)),
        ("C", at(2.0)),
    ]);
    let key = ListKey::tactics();

    engine.admit(&key, "A", THRESHOLD).unwrap();
    engine.admit(&key, "B", THRESHOLD).unwrap();
    engine.admit(&key, "C", THRESHOLD).unwrap();

    // One embedding per candidate; existing entries come from the cache.
    assert_eq!(embedder.calls(), 3);
}

#[test]
fn uncached_entries_take_part_in_the_check() {
    let (engine, _, store) = setup(&[("Ask for a supervisor.", at(0.0)), ("Ask a supervisor.", at(0.1))]);
    let key = ListKey::tactics();
    raw_list(store.as_ref(), key.as_str(), &["Ask for a supervisor."]);

    let outcome = engine.admit(&key, "Ask a supervisor.", THRESHOLD).unwrap();
    assert!(outcome.is_duplicate());
}

#[test]
fn model_change_forces_recompute() {
    let entries = [("A", at(0.0)), ("B", at(1.5))];
    let store = Arc::new(CountingStore::new());
    let key = ListKey::tactics();

    let old = Arc::new(MapEmbedder::with_model(&entries, "old-model"));
    let engine = DedupeEngine::new(Arc::clone(&old), Arc::clone(&store));
    engine.admit(&key, "A", THRESHOLD).unwrap();

    let new = Arc::new(MapEmbedder::with_model(&entries, "new-model"));
    let engine = DedupeEngine::new(Arc::clone(&new), Arc::clone(&store));
    engine.admit(&key, "B", THRESHOLD).unwrap();

    // "A" recomputed under the new model plus the candidate itself.
    assert_eq!(new.calls(), 2);
}

#[test]
fn seed_then_merge_session() {
    let (engine, _, _) = setup(&[
        ("Cite policy.", at(0.0)),
        ("Stay calm.", at(1.0)),
        ("Stay calm and polite.", at(1.05)),
        ("Mention loyalty.", at(2.2)),
    ]);
    let winning = ListKey::winning();
    let session = ListKey::session("s-1").unwrap();

    let seeded = engine
        .seed(&winning, &["Cite policy.", "Stay calm."], THRESHOLD)
        .unwrap();
    assert_eq!(seeded.kept, 2);

    for tactic in ["Stay calm and polite.", "Mention loyalty.", ""] {
        engine.store().append(session.as_str(), &[tactic.to_string()]).unwrap();
    }
    let merged = engine.merge(&session, &winning, THRESHOLD).unwrap();

    assert_eq!(merged.added, 1);
    assert_eq!(merged.duplicates, 1);
    assert_eq!(merged.skipped, 1);
    assert_eq!(
        engine.list(&winning).unwrap(),
        vec!["Cite policy.", "Stay calm.", "Mention loyalty."]
    );
    assert!(engine.list(&session).unwrap().is_empty());
}

#[test]
fn embedder_failure_leaves_list_unchanged() {
    let (engine, _, store) = setup(&[("Known.", at(0.0))]);
    let key = ListKey::tactics();
    engine.admit(&key, "Known.", THRESHOLD).unwrap();
    let writes = store.writes();

    let result = engine.admit(&key, "Unknown.", THRESHOLD);

    assert!(matches!(result, Err(Error::Embedding { .. })));
    assert_eq!(store.writes(), writes);
    assert_eq!(engine.list(&key).unwrap(), vec!["Known."]);
}

#[test]
fn invalid_threshold_rejected_before_io() {
    let (engine, _, store) = setup(&[("A", at(0.0))]);
    let key = ListKey::tactics();

    assert!(matches!(
        engine.admit(&key, "A", 1.01),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        engine.compact(&key, f32::NAN),
        Err(Error::InvalidInput(_))
    ));
    assert_eq!(store.calls(), 0);
}

#[test]
fn threshold_one_only_rejects_identical_vectors() {
    let (engine, _, _) = setup(&[("A", at(0.0)), ("A'", at(0.01)), ("A again", at(0.0))]);
    let key = ListKey::tactics();

    engine.admit(&key, "A", 1.0).unwrap();
    assert!(engine.admit(&key, "A'", 1.0).unwrap().is_added());
    assert!(engine.admit(&key, "A again", 1.0).unwrap().is_duplicate());
}
