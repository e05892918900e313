//! Foundation types for the talk message board.
//!
//! This crate provides the identity and identifier types shared by every
//! other talk crate.
//!
//! # Key Types
//!
//! - [`AccountName`]: 64-bit encoded account identity (`[.1-5a-z]{1,13}`)
//! - [`MessageId`] / [`VoteId`]: primary keys of the two record collections
//! - [`RESERVED_THRESHOLD`]: boundary between caller-chosen and auto-assigned ids
//! - [`resolve_id`]: the identifier-assignment policy shared by every action

pub mod error;
pub mod id;
pub mod name;

pub use error::TypeError;
pub use id::{check_requested_id, resolve_id, MessageId, VoteId, RESERVED_THRESHOLD};
pub use name::AccountName;
