use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use talk_types::{AccountName, MessageId};
use tracing::{info, warn};

use crate::action::SignedAction;
use crate::auth::{KeyRegistry, NonceLedger};
use crate::board::BoardState;
use crate::error::{ContractError, ContractResult};
use crate::journal::{ActionJournal, ActionReceipt};
use crate::records::{Message, Vote};
use crate::replay::ReplayEngine;

/// Serializable contents of a partition: current tables plus the journal
/// that produced them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSnapshot {
    pub board: BoardState,
    pub journal: ActionJournal,
}

/// Single-writer owner of the board's state.
///
/// Every action takes the write lock for its full duration, so the
/// duplicate-vote check and the insert that follows it can never interleave
/// with another action. An action is applied to the live tables and then
/// journaled; a rejected action changes nothing.
pub struct Partition {
    registry: KeyRegistry,
    inner: RwLock<Live>,
}

struct Live {
    snapshot: PartitionSnapshot,
    nonces: NonceLedger,
}

impl Partition {
    /// An empty partition verifying signatures against `registry`.
    pub fn new(registry: KeyRegistry) -> Self {
        Self {
            registry,
            inner: RwLock::new(Live {
                snapshot: PartitionSnapshot::default(),
                nonces: NonceLedger::new(),
            }),
        }
    }

    /// Restore from a snapshot, refusing one whose journal is corrupt or
    /// does not replay to the stored tables.
    pub fn from_snapshot(
        registry: KeyRegistry,
        snapshot: PartitionSnapshot,
    ) -> ContractResult<Self> {
        let replayed = ReplayEngine::replay_from_genesis(&snapshot.journal)
            .map_err(|e| ContractError::Persistence(e.to_string()))?;
        if replayed.state != snapshot.board {
            return Err(ContractError::Persistence(
                "stored tables do not match journal replay".into(),
            ));
        }
        Ok(Self {
            registry,
            inner: RwLock::new(Live {
                snapshot,
                nonces: replayed.nonces,
            }),
        })
    }

    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    /// Verify, execute, and journal one action.
    pub fn apply(&self, signed: &SignedAction) -> ContractResult<ActionReceipt> {
        let kind = signed.action.kind();
        let result = self.apply_inner(signed);
        match &result {
            Ok(receipt) => info!(
                action = kind,
                id = receipt.assigned_id,
                seq = receipt.seq,
                receipt = %receipt.short_hash(),
                "action applied"
            ),
            Err(error) => warn!(action = kind, %error, "action rejected"),
        }
        result
    }

    fn apply_inner(&self, signed: &SignedAction) -> ContractResult<ActionReceipt> {
        let authority = self.registry.verify(signed)?;

        let mut live = self
            .inner
            .write()
            .map_err(|_| ContractError::Internal("partition write lock poisoned".into()))?;
        live.nonces.check(signed)?;

        let Live { snapshot, nonces } = &mut *live;
        let id = snapshot.board.apply(&signed.action, &authority)?;
        let receipt = match snapshot.journal.append(signed, id) {
            Ok(receipt) => receipt,
            Err(error) => {
                snapshot.board.revert(&signed.action, id)?;
                return Err(ContractError::Internal(error.to_string()));
            }
        };
        nonces.record(signed);
        Ok(receipt)
    }

    fn read<T>(&self, f: impl FnOnce(&PartitionSnapshot) -> T) -> ContractResult<T> {
        let live = self
            .inner
            .read()
            .map_err(|_| ContractError::Internal("partition read lock poisoned".into()))?;
        Ok(f(&live.snapshot))
    }

    pub fn message(&self, id: MessageId) -> ContractResult<Option<Message>> {
        self.read(|s| s.board.message(id).cloned())
    }

    /// Direct replies to `id`, in id order.
    pub fn replies(&self, id: MessageId) -> ContractResult<Vec<Message>> {
        self.read(|s| s.board.replies(id).into_iter().cloned().collect())
    }

    pub fn votes_for(&self, message: MessageId) -> ContractResult<Vec<Vote>> {
        self.read(|s| s.board.votes_for(message).into_iter().cloned().collect())
    }

    pub fn has_voted(&self, voter: AccountName, message: MessageId) -> ContractResult<bool> {
        self.read(|s| s.board.has_voted(voter, message))
    }

    pub fn receipts(&self) -> ContractResult<Vec<ActionReceipt>> {
        self.read(|s| s.journal.receipts().to_vec())
    }

    /// Copy of the full state, for persistence.
    pub fn snapshot(&self) -> ContractResult<PartitionSnapshot> {
        self.read(Clone::clone)
    }
}

impl std::fmt::Debug for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Partition")
            .field("accounts", &self.registry.len())
            .finish_non_exhaustive()
    }
}
