//! Groups and group membership.
//!
//! Internal groups are stored and managed here. External groups are mirrored
//! from a directory and only ever exist as a description; their membership is
//! owned by the directory.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::id::{AccountId, GroupId, GroupUuid};

/// Prefix marking a group uuid as owned by the directory backend.
pub const EXTERNAL_GROUP_PREFIX: &str = "ldap:";

/// A group whose membership is stored by this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalGroup {
    pub uuid: GroupUuid,
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Members of the owner group administer this group. A group may own
    /// itself.
    pub owner_group_uuid: GroupUuid,
    #[serde(default)]
    pub members: BTreeSet<AccountId>,
    #[serde(default)]
    pub visible_to_all: bool,
    /// Creation time, seconds since the Unix epoch.
    #[serde(default)]
    pub created_on: i64,
}

impl InternalGroup {
    pub fn has_member(&self, account: AccountId) -> bool {
        self.members.contains(&account)
    }
}

/// Anything a group path segment may resolve to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupDescription {
    Internal(InternalGroup),
    External { uuid: String, name: String },
}

impl GroupDescription {
    pub fn name(&self) -> &str {
        match self {
            GroupDescription::Internal(g) => &g.name,
            GroupDescription::External { name, .. } => name,
        }
    }

    pub fn as_internal(&self) -> Option<&InternalGroup> {
        match self {
            GroupDescription::Internal(g) => Some(g),
            GroupDescription::External { .. } => None,
        }
    }
}

/// Set-union membership mutation: `current ∪ added`.
pub fn union_members<'a, I>(current: &BTreeSet<AccountId>, added: I) -> BTreeSet<AccountId>
where
    I: IntoIterator<Item = &'a AccountId>,
{
    let mut members = current.clone();
    members.extend(added.into_iter().copied());
    members
}
