//! State-transition core of the talk message board.
//!
//! Two actions mutate the board: [`Action::Post`] adds a message, optionally
//! as a reply, and [`Action::Like`] records one vote per account per message
//! and moves that message's like count by one. Messages and votes live in
//! two keyed tables ([`talk_store::Table`]) whose ids come either from the
//! caller (below [`talk_types::RESERVED_THRESHOLD`]) or from the table.
//!
//! This crate provides:
//! - `Message` / `Vote` records and the composite `VoteKey` index key
//! - The `post` / `like` state transitions, generic over the table backend
//! - Signature-based authorization (`KeyRegistry`, `AuthContext`)
//! - A single-writer `Partition` that applies actions all-or-nothing
//! - A hash-linked `ActionJournal` of receipts and deterministic replay
//! - TOML configuration and atomic file persistence

pub mod action;
pub mod auth;
pub mod board;
pub mod config;
pub mod error;
pub mod journal;
pub mod partition;
pub mod persist;
pub mod records;
pub mod replay;

pub use action::{AccountSignature, Action, LikeArgs, PostArgs, SignedAction};
pub use auth::{AuthContext, Authority, KeyRegistry, NonceLedger};
pub use board::{like, post, BoardState};
pub use config::BoardConfig;
pub use error::{ContractError, ContractResult};
pub use journal::{ActionJournal, ActionReceipt, JournalError};
pub use partition::{Partition, PartitionSnapshot};
pub use persist::{load_snapshot, save_snapshot};
pub use records::{Message, Vote, VoteKey};
pub use replay::{ReplayEngine, ReplayError, ReplayResult};
