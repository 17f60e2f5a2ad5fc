//! Storage-layer types for snapshots and entity creation.
//!
//! Entity ids are allocated by the store, so creation requests carry every
//! field except the id.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use critic_core::{AccountId, ChangeState, GroupUuid, ObjectId};

/// A change as of one metadata snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSnapshot {
    /// Content-addressed id of this snapshot.
    pub meta_id: ObjectId,
    pub state: ChangeState,
}

/// First account id handed out by a fresh store.
pub const FIRST_ACCOUNT_ID: u32 = 1000;

/// First legacy group id handed out by a fresh store.
pub const FIRST_GROUP_ID: u32 = 1;

/// Request to create an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub preferred_email: Option<String>,
    pub active: bool,
    pub registered_on: i64,
}

/// Request to create an internal group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub description: Option<String>,
    /// `None` makes the group its own owner.
    pub owner_group_uuid: Option<GroupUuid>,
    pub members: BTreeSet<AccountId>,
    pub visible_to_all: bool,
    pub created_on: i64,
}
