//! List store trait.
//!
//! The engine keeps two coupled records per tactic list: an ordered list of
//! texts and a field map (text → serialized vector) holding its vector cache.
//! Backends expose plain per-key primitives plus compound writes that touch
//! both records in one atomic operation.
//!
//! # Available Implementations
//!
//! | Backend | Use Case | Atomicity of compound writes |
//! |---------|----------|------------------------------|
//! | `InMemoryStore` | Tests, throwaway runs | Single mutex |
//! | `SqliteStore` | Local persistent store (default) | `SQLite` transaction |
//! | `RedisStore` | Shared store (feature `redis`) | `MULTI`/`EXEC` pipeline |

use crate::Result;

/// Trait for ordered-list stores.
///
/// Implementations should be thread-safe (`Send + Sync`) and use interior
/// mutability so a store can be shared via `Arc<dyn TacticStore>`.
///
/// Reads are read-your-writes per key. Compound writes
/// ([`append_entry`](TacticStore::append_entry),
/// [`replace_entries`](TacticStore::replace_entries),
/// [`remove_entry`](TacticStore::remove_entry)) either fully apply or not at
/// all, so a list and its vector cache are never left half-rewritten.
pub trait TacticStore: Send + Sync {
    /// Short backend name for logs and metrics labels.
    fn backend_name(&self) -> &'static str;

    /// Returns every item of the list at `key`, in order.
    ///
    /// A missing key is an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn read_list(&self, key: &str) -> Result<Vec<String>>;

    /// Appends `items` to the end of the list at `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn append(&self, key: &str, items: &[String]) -> Result<()>;

    /// Returns the values of `fields` in the map at `key`, aligned with `fields`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get_fields(&self, key: &str, fields: &[String]) -> Result<Vec<Option<String>>>;

    /// Sets one field in the map at `key` (upsert).
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn put_field(&self, key: &str, field: &str, value: &str) -> Result<()>;

    /// Deletes every key in `keys` (lists or maps) in one operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete(&self, keys: &[&str]) -> Result<()>;

    /// Returns the keys of every non-empty list whose key starts with
    /// `prefix` and ends with `suffix`, sorted.
    ///
    /// Field maps are never returned, and the prefix and suffix may not
    /// overlap within a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn list_keys(&self, prefix: &str, suffix: &str) -> Result<Vec<String>>;

    /// Appends `item` to `list_key` and sets field `item` of `map_key` to
    /// `value`, atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; neither record is changed then.
    fn append_entry(&self, list_key: &str, item: &str, map_key: &str, value: &str) -> Result<()>;

    /// Replaces the list at `list_key` with the entry texts, in order, and
    /// the map at `map_key` with exactly the entries, atomically.
    ///
    /// An empty `entries` slice leaves both keys deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; neither record is changed then.
    fn replace_entries(
        &self,
        list_key: &str,
        map_key: &str,
        entries: &[(String, String)],
    ) -> Result<()>;

    /// Removes every occurrence of `item` from `list_key` and field `item`
    /// from `map_key`, atomically.
    ///
    /// Returns `true` if the list contained the item.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn remove_entry(&self, list_key: &str, map_key: &str, item: &str) -> Result<bool>;
}

impl<T: TacticStore + ?Sized> TacticStore for std::sync::Arc<T> {
    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }

    fn read_list(&self, key: &str) -> Result<Vec<String>> {
        (**self).read_list(key)
    }

    fn append(&self, key: &str, items: &[String]) -> Result<()> {
        (**self).append(key, items)
    }

    fn get_fields(&self, key: &str, fields: &[String]) -> Result<Vec<Option<String>>> {
        (**self).get_fields(key, fields)
    }

    fn put_field(&self, key: &str, field: &str, value: &str) -> Result<()> {
        (**self).put_field(key, field, value)
    }

    fn delete(&self, keys: &[&str]) -> Result<()> {
        (**self).delete(keys)
    }

    fn list_keys(&self, prefix: &str, suffix: &str) -> Result<Vec<String>> {
        (**self).list_keys(prefix, suffix)
    }

    fn append_entry(&self, list_key: &str, item: &str, map_key: &str, value: &str) -> Result<()> {
        (**self).append_entry(list_key, item, map_key, value)
    }

    fn replace_entries(
        &self,
        list_key: &str,
        map_key: &str,
        entries: &[(String, String)],
    ) -> Result<()> {
        (**self).replace_entries(list_key, map_key, entries)
    }

    fn remove_entry(&self, list_key: &str, map_key: &str, item: &str) -> Result<bool> {
        (**self).remove_entry(list_key, map_key, item)
    }
}
