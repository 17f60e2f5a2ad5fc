//! Storage error types for critic-storage.
//!
//! [`StorageError`] covers all anticipated failure modes in the storage layer:
//! serialization, entity-not-found variants, uniqueness violations, missing
//! metadata snapshots and backend failures.

use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// SQLite reported an error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// A change with the given number was not found.
    #[error("change not found: {0}")]
    ChangeNotFound(u32),

    /// A change with the given number already exists.
    #[error("change {0} already exists")]
    DuplicateChange(u32),

    /// The requested meta snapshot is not part of the change's history.
    #[error("missing meta object {meta} for change {change}")]
    MissingMetaObject { change: u32, meta: String },

    /// An account with the given id was not found.
    #[error("account not found: {0}")]
    AccountNotFound(u32),

    /// The username is already taken by another account.
    #[error("username '{0}' already in use")]
    DuplicateUsername(String),

    /// A group with the given uuid was not found.
    #[error("group not found: {0}")]
    GroupNotFound(String),

    /// The group name is already taken by another group.
    #[error("group name '{0}' already in use")]
    DuplicateGroupName(String),

    /// A stored row could not be converted back into a domain value.
    #[error("integrity error: {reason}")]
    IntegrityError { reason: String },

    /// An in-process lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}
