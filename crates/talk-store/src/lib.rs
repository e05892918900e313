//! Keyed record tables for the talk message board.
//!
//! A table holds records of one kind, keyed by a `u64` primary key, with a
//! single non-unique secondary index over a key derived from each record.
//! This is the storage shape the board's actions are written against; the
//! contract never reaches past the [`Table`] trait.
//!
//! # Design Rules
//!
//! 1. Primary keys are unique within a table and never change once inserted.
//! 2. The secondary index is kept in step with every insert and modify.
//! 3. [`Table::available_primary_key`] is derived from current contents
//!    (largest key plus one), never from a separate counter.
//! 4. Tables are plain values: callers stage a copy and swap it in to get
//!    all-or-nothing updates.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{TableError, TableResult};
pub use memory::InMemoryTable;
pub use traits::{Record, Table};
