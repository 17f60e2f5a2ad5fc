//! In-memory implementation of the store traits.
//!
//! [`InMemoryStore`] is a first-class backend for tests and ephemeral
//! deployments. Changes and groups live in `DashMap`s; a group's membership
//! mutation runs while holding that group's entry guard, which serializes
//! concurrent updates to the same group. Accounts sit behind a single
//! `RwLock` so that username uniqueness is checked and claimed atomically.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, RwLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use critic_core::{
    Account, AccountId, ChangeId, ChangeState, GroupId, GroupUuid, InternalGroup, ObjectId,
};

use crate::error::StorageError;
use crate::hash::compute_meta_id;
use crate::traits::{AccountStore, ChangeStore, GroupStore, MemberModification};
use crate::types::{ChangeSnapshot, NewAccount, NewGroup, FIRST_ACCOUNT_ID, FIRST_GROUP_ID};

#[derive(Debug, Default)]
struct AccountTable {
    by_id: BTreeMap<AccountId, Account>,
    next_id: u32,
}

/// In-memory backend implementing [`ChangeStore`], [`AccountStore`] and
/// [`GroupStore`].
#[derive(Debug)]
pub struct InMemoryStore {
    /// Snapshot chain per change, oldest first.
    changes: DashMap<ChangeId, Vec<ChangeSnapshot>>,
    accounts: RwLock<AccountTable>,
    groups: DashMap<GroupUuid, InternalGroup>,
    /// Held while checking and claiming a group name.
    group_names: Mutex<()>,
    next_group_id: AtomicU32,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore {
            changes: DashMap::new(),
            accounts: RwLock::new(AccountTable {
                by_id: BTreeMap::new(),
                next_id: FIRST_ACCOUNT_ID,
            }),
            groups: DashMap::new(),
            group_names: Mutex::new(()),
            next_group_id: AtomicU32::new(FIRST_GROUP_ID),
        }
    }

    fn read_accounts(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, AccountTable>, StorageError> {
        self.accounts.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write_accounts(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, AccountTable>, StorageError> {
        self.accounts.write().map_err(|_| StorageError::LockPoisoned)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeStore for InMemoryStore {
    fn insert_change(&self, state: &ChangeState) -> Result<ObjectId, StorageError> {
        let meta_id = compute_meta_id(None, state)?;
        match self.changes.entry(state.id) {
            Entry::Occupied(_) => Err(StorageError::DuplicateChange(state.id.0)),
            Entry::Vacant(slot) => {
                slot.insert(vec![ChangeSnapshot {
                    meta_id,
                    state: state.clone(),
                }]);
                Ok(meta_id)
            }
        }
    }

    fn update_change(&self, state: &ChangeState) -> Result<ObjectId, StorageError> {
        let mut history = self
            .changes
            .get_mut(&state.id)
            .ok_or(StorageError::ChangeNotFound(state.id.0))?;
        let parent = history.last().map(|s| s.meta_id);
        let meta_id = compute_meta_id(parent, state)?;
        history.push(ChangeSnapshot {
            meta_id,
            state: state.clone(),
        });
        Ok(meta_id)
    }

    fn get_change(
        &self,
        id: ChangeId,
        meta: Option<ObjectId>,
    ) -> Result<ChangeSnapshot, StorageError> {
        let history = self
            .changes
            .get(&id)
            .ok_or(StorageError::ChangeNotFound(id.0))?;
        let snapshot = match meta {
            None => history.last(),
            Some(meta) => history.iter().find(|s| s.meta_id == meta),
        };
        snapshot.cloned().ok_or_else(|| StorageError::MissingMetaObject {
            change: id.0,
            meta: meta.map(|m| m.to_hex()).unwrap_or_default(),
        })
    }

    fn find_by_key(&self, change_key: &str) -> Result<Vec<ChangeId>, StorageError> {
        let mut ids: Vec<ChangeId> = self
            .changes
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .last()
                    .is_some_and(|s| s.state.change_key == change_key)
            })
            .map(|entry| *entry.key())
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn meta_history(&self, id: ChangeId) -> Result<Vec<ObjectId>, StorageError> {
        let history = self
            .changes
            .get(&id)
            .ok_or(StorageError::ChangeNotFound(id.0))?;
        Ok(history.iter().map(|s| s.meta_id).collect())
    }
}

impl AccountStore for InMemoryStore {
    fn create_account(&self, account: &NewAccount) -> Result<Account, StorageError> {
        let mut table = self.write_accounts()?;
        if let Some(username) = &account.username {
            if table
                .by_id
                .values()
                .any(|a| a.username.as_deref() == Some(username.as_str()))
            {
                return Err(StorageError::DuplicateUsername(username.clone()));
            }
        }
        let id = AccountId(table.next_id);
        table.next_id += 1;
        let created = Account {
            id,
            username: account.username.clone(),
            full_name: account.full_name.clone(),
            preferred_email: account.preferred_email.clone(),
            active: account.active,
            registered_on: account.registered_on,
        };
        table.by_id.insert(id, created.clone());
        Ok(created)
    }

    fn get_account(&self, id: AccountId) -> Result<Account, StorageError> {
        self.read_accounts()?
            .by_id
            .get(&id)
            .cloned()
            .ok_or(StorageError::AccountNotFound(id.0))
    }

    fn find_by_username(&self, username: &str) -> Result<Option<Account>, StorageError> {
        Ok(self
            .read_accounts()?
            .by_id
            .values()
            .find(|a| a.username.as_deref() == Some(username))
            .cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Vec<Account>, StorageError> {
        Ok(self
            .read_accounts()?
            .by_id
            .values()
            .filter(|a| {
                a.preferred_email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
            .cloned()
            .collect())
    }

    fn find_by_full_name(&self, full_name: &str) -> Result<Vec<Account>, StorageError> {
        Ok(self
            .read_accounts()?
            .by_id
            .values()
            .filter(|a| a.full_name.as_deref() == Some(full_name))
            .cloned()
            .collect())
    }

    fn set_active(&self, id: AccountId, active: bool) -> Result<(), StorageError> {
        let mut table = self.write_accounts()?;
        let account = table
            .by_id
            .get_mut(&id)
            .ok_or(StorageError::AccountNotFound(id.0))?;
        account.active = active;
        Ok(())
    }
}

impl GroupStore for InMemoryStore {
    fn create_group(&self, group: &NewGroup) -> Result<InternalGroup, StorageError> {
        let _claim = self
            .group_names
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        if self.groups.iter().any(|g| g.name == group.name) {
            return Err(StorageError::DuplicateGroupName(group.name.clone()));
        }
        if let Some(owner) = group.owner_group_uuid {
            if !self.groups.contains_key(&owner) {
                return Err(StorageError::GroupNotFound(owner.to_string()));
            }
        }

        let uuid = GroupUuid::new_random();
        let created = InternalGroup {
            uuid,
            id: GroupId(self.next_group_id.fetch_add(1, Ordering::SeqCst)),
            name: group.name.clone(),
            description: group.description.clone(),
            owner_group_uuid: group.owner_group_uuid.unwrap_or(uuid),
            members: group.members.clone(),
            visible_to_all: group.visible_to_all,
            created_on: group.created_on,
        };
        self.groups.insert(uuid, created.clone());
        Ok(created)
    }

    fn get_group(&self, uuid: GroupUuid) -> Result<InternalGroup, StorageError> {
        self.groups
            .get(&uuid)
            .map(|g| g.clone())
            .ok_or_else(|| StorageError::GroupNotFound(uuid.to_string()))
    }

    fn find_group_by_name(&self, name: &str) -> Result<Option<InternalGroup>, StorageError> {
        Ok(self
            .groups
            .iter()
            .find(|g| g.name == name)
            .map(|g| g.value().clone()))
    }

    fn find_group_by_id(&self, id: GroupId) -> Result<Option<InternalGroup>, StorageError> {
        Ok(self
            .groups
            .iter()
            .find(|g| g.id == id)
            .map(|g| g.value().clone()))
    }

    fn update_members(
        &self,
        uuid: GroupUuid,
        modification: MemberModification<'_>,
    ) -> Result<InternalGroup, StorageError> {
        // The entry guard is held across read, modify and write.
        let mut group = self
            .groups
            .get_mut(&uuid)
            .ok_or_else(|| StorageError::GroupNotFound(uuid.to_string()))?;
        let members = modification(&group.members);
        group.members = members;
        Ok(group.clone())
    }

    fn groups_containing(&self, account: AccountId) -> Result<Vec<GroupUuid>, StorageError> {
        let mut uuids: Vec<GroupUuid> = self
            .groups
            .iter()
            .filter(|g| g.has_member(account))
            .map(|g| *g.key())
            .collect();
        uuids.sort();
        Ok(uuids)
    }

    fn delete_group(&self, uuid: GroupUuid) -> Result<(), StorageError> {
        self.groups
            .remove(&uuid)
            .map(|_| ())
            .ok_or_else(|| StorageError::GroupNotFound(uuid.to_string()))
    }
}
