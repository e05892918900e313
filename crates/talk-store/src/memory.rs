use std::collections::{BTreeMap, BTreeSet};

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeSeq, Serializer};
use tracing::debug;

use crate::error::{TableError, TableResult};
use crate::traits::{Record, Table};

/// `BTreeMap`-backed table.
///
/// Rows are keyed by primary key; the secondary index is an ordered set of
/// `(secondary, primary)` pairs, so a composite secondary key is compared as
/// a genuine tuple rather than a packed scalar.
///
/// Serializes as the sequence of rows in primary-key order; the index is
/// rebuilt on load.
#[derive(Clone)]
pub struct InMemoryTable<R: Record> {
    rows: BTreeMap<u64, R>,
    index: BTreeSet<(R::SecondaryKey, u64)>,
}

impl<R: Record> InMemoryTable<R> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            index: BTreeSet::new(),
        }
    }

    /// Build a table from rows, rejecting duplicate primary keys.
    pub fn from_records(records: impl IntoIterator<Item = R>) -> TableResult<Self> {
        let mut table = Self::new();
        for record in records {
            table.insert(record)?;
        }
        Ok(table)
    }
}

impl<R: Record> Default for InMemoryTable<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> Table<R> for InMemoryTable<R> {
    fn insert(&mut self, record: R) -> TableResult<()> {
        let key = record.primary_key();
        if self.rows.contains_key(&key) {
            return Err(TableError::DuplicatePrimaryKey {
                table: R::TABLE,
                key,
            });
        }
        self.index.insert((record.secondary_key(), key));
        self.rows.insert(key, record);
        debug!(table = R::TABLE, key, "row inserted");
        Ok(())
    }

    fn find(&self, key: u64) -> Option<&R> {
        self.rows.get(&key)
    }

    fn modify<F>(&mut self, key: u64, update: F) -> TableResult<()>
    where
        F: FnOnce(&mut R),
    {
        let row = self.rows.get_mut(&key).ok_or(TableError::NotFound {
            table: R::TABLE,
            key,
        })?;

        let mut updated = row.clone();
        update(&mut updated);
        if updated.primary_key() != key {
            return Err(TableError::PrimaryKeyChanged {
                table: R::TABLE,
                key,
            });
        }

        let old_secondary = row.secondary_key();
        let new_secondary = updated.secondary_key();
        *row = updated;
        if old_secondary != new_secondary {
            self.index.remove(&(old_secondary, key));
            self.index.insert((new_secondary, key));
        }
        debug!(table = R::TABLE, key, "row modified");
        Ok(())
    }

    fn remove(&mut self, key: u64) -> TableResult<R> {
        let record = self.rows.remove(&key).ok_or(TableError::NotFound {
            table: R::TABLE,
            key,
        })?;
        self.index.remove(&(record.secondary_key(), key));
        debug!(table = R::TABLE, key, "row removed");
        Ok(record)
    }

    fn available_primary_key(&self) -> TableResult<u64> {
        match self.rows.keys().next_back() {
            None => Ok(0),
            Some(&max) => max
                .checked_add(1)
                .ok_or(TableError::KeySpaceExhausted { table: R::TABLE }),
        }
    }

    fn find_by_secondary(&self, key: &R::SecondaryKey) -> Option<&R> {
        self.index
            .range((key.clone(), 0)..=(key.clone(), u64::MAX))
            .next()
            .and_then(|(_, primary)| self.rows.get(primary))
    }

    fn secondary_range(&self, key: &R::SecondaryKey) -> Vec<&R> {
        self.index
            .range((key.clone(), 0)..=(key.clone(), u64::MAX))
            .filter_map(|(_, primary)| self.rows.get(primary))
            .collect()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &R> + '_> {
        Box::new(self.rows.values())
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

impl<R: Record> std::fmt::Debug for InMemoryTable<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTable")
            .field("table", &R::TABLE)
            .field("row_count", &self.rows.len())
            .finish()
    }
}

impl<R: Record + Serialize> Serialize for InMemoryTable<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in self.rows.values() {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}

impl<'de, R: Record + Deserialize<'de>> Deserialize<'de> for InMemoryTable<R> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<R>::deserialize(deserializer)?;
        Self::from_records(rows).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    struct Row {
        id: u64,
        owner: u64,
        topic: u64,
        body: String,
    }

    impl Record for Row {
        type SecondaryKey = (u64, u64);
        const TABLE: &'static str = "rows";

        fn primary_key(&self) -> u64 {
            self.id
        }

        fn secondary_key(&self) -> (u64, u64) {
            (self.owner, self.topic)
        }
    }

    fn row(id: u64, owner: u64, topic: u64) -> Row {
        Row {
            id,
            owner,
            topic,
            body: format!("row {id}"),
        }
    }

    #[test]
    fn insert_and_find() {
        let mut table = InMemoryTable::new();
        table.insert(row(5, 1, 1)).unwrap();

        assert_eq!(table.find(5).unwrap().body, "row 5");
        assert!(table.find(6).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn insert_rejects_taken_key() {
        let mut table = InMemoryTable::new();
        table.insert(row(5, 1, 1)).unwrap();

        let error = table.insert(row(5, 2, 2)).unwrap_err();
        assert_eq!(
            error,
            TableError::DuplicatePrimaryKey {
                table: "rows",
                key: 5
            }
        );
        // The original row and its index entry survive.
        assert_eq!(table.find(5).unwrap().owner, 1);
        assert!(table.find_by_secondary(&(2, 2)).is_none());
    }

    #[test]
    fn get_reports_missing_key() {
        let table: InMemoryTable<Row> = InMemoryTable::new();
        assert_eq!(
            table.get(9).unwrap_err(),
            TableError::NotFound {
                table: "rows",
                key: 9
            }
        );
    }

    #[test]
    fn available_primary_key_tracks_largest_key() {
        let mut table = InMemoryTable::new();
        assert_eq!(table.available_primary_key().unwrap(), 0);

        table.insert(row(3, 1, 1)).unwrap();
        table.insert(row(10, 1, 2)).unwrap();
        table.insert(row(7, 1, 3)).unwrap();
        assert_eq!(table.available_primary_key().unwrap(), 11);
    }

    #[test]
    fn available_primary_key_at_limit() {
        let mut table = InMemoryTable::new();
        table.insert(row(u64::MAX, 1, 1)).unwrap();
        assert_eq!(
            table.available_primary_key().unwrap_err(),
            TableError::KeySpaceExhausted { table: "rows" }
        );
    }

    #[test]
    fn composite_secondary_lookup() {
        let mut table = InMemoryTable::new();
        table.insert(row(1, 10, 100)).unwrap();
        table.insert(row(2, 10, 200)).unwrap();
        table.insert(row(3, 20, 100)).unwrap();

        assert_eq!(table.find_by_secondary(&(10, 200)).unwrap().id, 2);
        assert_eq!(table.find_by_secondary(&(20, 100)).unwrap().id, 3);
        assert!(table.find_by_secondary(&(20, 200)).is_none());
    }

    #[test]
    fn secondary_range_is_non_unique_and_ordered() {
        let mut table = InMemoryTable::new();
        table.insert(row(9, 1, 1)).unwrap();
        table.insert(row(4, 1, 1)).unwrap();
        table.insert(row(6, 2, 1)).unwrap();

        let ids: Vec<u64> = table.secondary_range(&(1, 1)).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 9]);
        assert_eq!(table.find_by_secondary(&(1, 1)).unwrap().id, 4);
    }

    #[test]
    fn modify_updates_row_and_reindexes() {
        let mut table = InMemoryTable::new();
        table.insert(row(1, 10, 100)).unwrap();

        table.modify(1, |r| r.topic = 300).unwrap();

        assert_eq!(table.find(1).unwrap().topic, 300);
        assert!(table.find_by_secondary(&(10, 100)).is_none());
        assert_eq!(table.find_by_secondary(&(10, 300)).unwrap().id, 1);
    }

    #[test]
    fn modify_cannot_change_primary_key() {
        let mut table = InMemoryTable::new();
        table.insert(row(1, 10, 100)).unwrap();

        let error = table.modify(1, |r| r.id = 2).unwrap_err();
        assert_eq!(
            error,
            TableError::PrimaryKeyChanged {
                table: "rows",
                key: 1
            }
        );
        assert_eq!(table.find(1).unwrap().id, 1);
        assert!(table.find(2).is_none());
    }

    #[test]
    fn modify_missing_row() {
        let mut table: InMemoryTable<Row> = InMemoryTable::new();
        assert!(matches!(
            table.modify(3, |r| r.topic = 1),
            Err(TableError::NotFound { key: 3, .. })
        ));
    }

    #[test]
    fn remove_drops_row_and_index_entry() {
        let mut table = InMemoryTable::new();
        table.insert(row(1, 10, 100)).unwrap();
        table.insert(row(2, 10, 100)).unwrap();

        assert_eq!(table.remove(1).unwrap().id, 1);
        assert!(table.find(1).is_none());
        assert_eq!(table.find_by_secondary(&(10, 100)).unwrap().id, 2);
        assert_eq!(table.available_primary_key().unwrap(), 3);
        assert!(matches!(
            table.remove(1),
            Err(TableError::NotFound { key: 1, .. })
        ));
    }

    #[test]
    fn serde_rebuilds_index() {
        let mut table = InMemoryTable::new();
        table.insert(row(2, 1, 5)).unwrap();
        table.insert(row(1, 3, 5)).unwrap();

        let json = serde_json::to_string(&table).unwrap();
        let restored: InMemoryTable<Row> = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.len(), 2);
        assert_eq!(restored.find_by_secondary(&(3, 5)).unwrap().id, 1);
        let ids: Vec<u64> = restored.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn deserialize_rejects_duplicate_rows() {
        let json = serde_json::to_string(&vec![row(1, 1, 1), row(1, 2, 2)]).unwrap();
        assert!(serde_json::from_str::<InMemoryTable<Row>>(&json).is_err());
    }
}
