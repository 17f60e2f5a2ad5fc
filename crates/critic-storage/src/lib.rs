//! Storage abstraction for changes, accounts and groups.
//!
//! Provides the [`ChangeStore`], [`AccountStore`] and [`GroupStore`] traits
//! defining the storage contract that all backends implement, plus the
//! [`InMemoryStore`] and [`SqliteStore`] as first-class backends.
//!
//! # Concurrency
//!
//! Stores are shared between request handlers (`Send + Sync`, `&self`
//! methods) and own their own concurrency control. In particular
//! [`GroupStore::update_members`] is an atomic read-modify-write: concurrent
//! membership updates against one group never lose each other's changes.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`types`]: snapshot and creation-request types
//! - [`traits`]: store trait definitions
//! - [`hash`]: content-addressed meta ids for change snapshots
//! - [`memory`]: InMemoryStore implementation
//! - [`schema`]: SQL schema migration setup
//! - [`sqlite`]: SqliteStore implementation

pub mod error;
pub mod hash;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod types;

// Re-export key types for ergonomic use.
pub use error::StorageError;
pub use hash::compute_meta_id;
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AccountStore, ChangeStore, GroupStore, MemberModification};
pub use types::{ChangeSnapshot, NewAccount, NewGroup};
