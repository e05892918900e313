//! File persistence for partition snapshots.
//!
//! Writes go to a temporary file in the destination directory and are
//! renamed into place, so a crash mid-write never leaves a truncated file.

use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::error::{ContractError, ContractResult};
use crate::partition::PartitionSnapshot;

/// Write `data` to `path` atomically.
pub fn write_atomic(path: &Path, data: &[u8]) -> ContractResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let persistence =
        |e: std::io::Error| ContractError::Persistence(format!("{}: {e}", path.display()));

    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(persistence)?;
    file.write_all(data).map_err(persistence)?;
    file.as_file().sync_all().map_err(persistence)?;
    file.persist(path).map_err(|e| persistence(e.error))?;
    Ok(())
}

/// Save a snapshot as JSON.
pub fn save_snapshot(path: &Path, snapshot: &PartitionSnapshot) -> ContractResult<()> {
    let data = serde_json::to_vec_pretty(snapshot)
        .map_err(|e| ContractError::Serialization(e.to_string()))?;
    write_atomic(path, &data)?;
    debug!(path = %path.display(), receipts = snapshot.journal.len(), "snapshot saved");
    Ok(())
}

/// Load a snapshot, or `None` when no file exists yet.
pub fn load_snapshot(path: &Path) -> ContractResult<Option<PartitionSnapshot>> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ContractError::Persistence(format!("{}: {e}", path.display())));
        }
    };
    let snapshot = serde_json::from_slice(&data)
        .map_err(|e| ContractError::Serialization(format!("{}: {e}", path.display())))?;
    Ok(Some(snapshot))
}

#[cfg(test)]
mod tests {
    use talk_types::AccountName;

    use super::*;
    use crate::action::{Action, PostArgs, SignedAction};
    use crate::auth::Authority;

    fn snapshot() -> PartitionSnapshot {
        let alice = AccountName::new("alice").unwrap();
        let signed = SignedAction::unsigned(Action::Post(PostArgs {
            id: 3,
            reply_to: 0,
            author: alice,
            content: "saved".into(),
        }));
        let mut snapshot = PartitionSnapshot::default();
        let id = snapshot
            .board
            .apply(&signed.action, &Authority::single(alice))
            .unwrap();
        snapshot.journal.append(&signed, id).unwrap();
        snapshot
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_snapshot(&dir.path().join("state.json")).unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let original = snapshot();

        save_snapshot(&path, &original).unwrap();
        let loaded = load_snapshot(&path).unwrap().unwrap();
        assert_eq!(loaded, original);
        assert_eq!(loaded.board.message(3).unwrap().content, "saved");
    }

    #[test]
    fn save_overwrites_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        save_snapshot(&path, &PartitionSnapshot::default()).unwrap();
        save_snapshot(&path, &snapshot()).unwrap();
        assert_eq!(load_snapshot(&path).unwrap().unwrap().journal.len(), 1);
    }

    #[test]
    fn garbage_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(matches!(
            load_snapshot(&path),
            Err(ContractError::Serialization(_))
        ));
    }
}
