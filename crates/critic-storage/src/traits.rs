//! The storage contracts for changes, accounts and groups.
//!
//! All backends (InMemoryStore, SqliteStore) implement every trait, ensuring
//! they are fully swappable without changing service logic. The traits are
//! synchronous; callers on an async runtime invoke them directly since every
//! operation is a short local read or write.

use std::collections::BTreeSet;

use critic_core::{Account, AccountId, ChangeId, ChangeState, GroupId, GroupUuid, InternalGroup, ObjectId};

use crate::error::StorageError;
use crate::types::{ChangeSnapshot, NewAccount, NewGroup};

/// Membership mutation applied atomically by [`GroupStore::update_members`].
pub type MemberModification<'a> = &'a dyn Fn(&BTreeSet<AccountId>) -> BTreeSet<AccountId>;

/// Versioned change storage. Every write appends a metadata snapshot; older
/// snapshots stay readable by meta id.
pub trait ChangeStore: Send + Sync {
    /// Stores a new change. Returns the meta id of its first snapshot.
    fn insert_change(&self, state: &ChangeState) -> Result<ObjectId, StorageError>;

    /// Appends a snapshot for an existing change. Returns the new meta id.
    fn update_change(&self, state: &ChangeState) -> Result<ObjectId, StorageError>;

    /// Loads a change at `meta`, or at its newest snapshot when `meta` is
    /// `None`.
    ///
    /// Fails with [`StorageError::MissingMetaObject`] if `meta` is not part
    /// of this change's history.
    fn get_change(
        &self,
        id: ChangeId,
        meta: Option<ObjectId>,
    ) -> Result<ChangeSnapshot, StorageError>;

    /// Finds all changes carrying the given Change-Id key.
    fn find_by_key(&self, change_key: &str) -> Result<Vec<ChangeId>, StorageError>;

    /// Meta ids of a change, oldest first.
    fn meta_history(&self, id: ChangeId) -> Result<Vec<ObjectId>, StorageError>;
}

/// Account storage.
pub trait AccountStore: Send + Sync {
    /// Creates an account, allocating its id.
    ///
    /// Fails with [`StorageError::DuplicateUsername`] if the username is taken.
    fn create_account(&self, account: &NewAccount) -> Result<Account, StorageError>;

    /// Retrieves an account by id.
    fn get_account(&self, id: AccountId) -> Result<Account, StorageError>;

    /// Finds the account owning a username (exact match).
    fn find_by_username(&self, username: &str) -> Result<Option<Account>, StorageError>;

    /// Finds accounts whose preferred email matches, ignoring ASCII case.
    fn find_by_email(&self, email: &str) -> Result<Vec<Account>, StorageError>;

    /// Finds accounts whose full name matches exactly.
    fn find_by_full_name(&self, full_name: &str) -> Result<Vec<Account>, StorageError>;

    /// Activates or deactivates an account.
    fn set_active(&self, id: AccountId, active: bool) -> Result<(), StorageError>;
}

/// Internal group storage.
pub trait GroupStore: Send + Sync {
    /// Creates a group, allocating its uuid and legacy id.
    fn create_group(&self, group: &NewGroup) -> Result<InternalGroup, StorageError>;

    /// Retrieves a group by uuid.
    fn get_group(&self, uuid: GroupUuid) -> Result<InternalGroup, StorageError>;

    /// Finds a group by exact name.
    fn find_group_by_name(&self, name: &str) -> Result<Option<InternalGroup>, StorageError>;

    /// Finds a group by legacy numeric id.
    fn find_group_by_id(&self, id: GroupId) -> Result<Option<InternalGroup>, StorageError>;

    /// Atomically replaces the member set with `modification(current)`.
    ///
    /// Concurrent calls against the same group are serialized; no update is
    /// lost. Fails with [`StorageError::GroupNotFound`] if the group does not
    /// exist (for example because it was deleted concurrently).
    fn update_members(
        &self,
        uuid: GroupUuid,
        modification: MemberModification<'_>,
    ) -> Result<InternalGroup, StorageError>;

    /// Uuids of all groups that directly contain `account`.
    fn groups_containing(&self, account: AccountId) -> Result<Vec<GroupUuid>, StorageError>;

    /// Deletes a group.
    fn delete_group(&self, uuid: GroupUuid) -> Result<(), StorageError>;
}
