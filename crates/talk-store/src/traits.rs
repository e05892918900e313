use std::fmt::Debug;

use crate::error::{TableError, TableResult};

/// A row type that can live in a [`Table`].
pub trait Record: Clone {
    /// Key of the table's secondary index. Need not be unique.
    type SecondaryKey: Ord + Clone + Debug;

    /// Table name, used in errors and logs.
    const TABLE: &'static str;

    /// The record's primary key.
    fn primary_key(&self) -> u64;

    /// The record's secondary index key.
    fn secondary_key(&self) -> Self::SecondaryKey;
}

/// Keyed record storage with one secondary index.
///
/// Implementations must satisfy these invariants:
/// - `insert` never overwrites; a taken primary key is an error.
/// - `modify` never changes a record's primary key and re-indexes the
///   secondary key if the update changed it.
/// - `available_primary_key` is one greater than the largest key present,
///   or `0` for an empty table.
pub trait Table<R: Record> {
    /// Insert a new record.
    fn insert(&mut self, record: R) -> TableResult<()>;

    /// Look up a record by primary key.
    fn find(&self, key: u64) -> Option<&R>;

    /// Update a record in place.
    fn modify<F>(&mut self, key: u64, update: F) -> TableResult<()>
    where
        F: FnOnce(&mut R);

    /// Delete a record, returning it.
    fn remove(&mut self, key: u64) -> TableResult<R>;

    /// One greater than the largest primary key present, `0` when empty.
    fn available_primary_key(&self) -> TableResult<u64>;

    /// First record (by primary key) whose secondary key equals `key`.
    fn find_by_secondary(&self, key: &R::SecondaryKey) -> Option<&R>;

    /// All records whose secondary key equals `key`, in primary-key order.
    fn secondary_range(&self, key: &R::SecondaryKey) -> Vec<&R>;

    /// All records in primary-key order.
    fn iter(&self) -> Box<dyn Iterator<Item = &R> + '_>;

    /// Number of records.
    fn len(&self) -> usize;

    /// Look up a record by primary key, failing when it is absent.
    fn get(&self, key: u64) -> TableResult<&R> {
        self.find(key).ok_or(TableError::NotFound {
            table: R::TABLE,
            key,
        })
    }

    /// Returns `true` if a record with this primary key exists.
    fn contains(&self, key: u64) -> bool {
        self.find(key).is_some()
    }

    /// Returns `true` if the table holds no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
