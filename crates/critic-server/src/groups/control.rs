//! Per-caller permissions on one group.

use critic_core::GroupDescription;
use critic_storage::{GroupStore, StorageError};

use crate::caller::{is_administrator, Caller};
use crate::error::ApiError;

/// What the caller may do with a group.
///
/// Owners are the direct members of the owner group. Administrators own
/// every internal group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupControl {
    is_owner: bool,
    is_member: bool,
    visible_to_all: bool,
    internal: bool,
}

impl GroupControl {
    pub fn new(
        caller: &Caller,
        group: &GroupDescription,
        groups: &dyn GroupStore,
        admin_group: &str,
    ) -> Result<Self, ApiError> {
        let GroupDescription::Internal(group) = group else {
            return Ok(GroupControl {
                is_owner: false,
                is_member: false,
                visible_to_all: true,
                internal: false,
            });
        };

        let Some(viewer) = caller.account_id() else {
            return Ok(GroupControl {
                is_owner: false,
                is_member: false,
                visible_to_all: group.visible_to_all,
                internal: true,
            });
        };

        let is_owner = if is_administrator(groups, admin_group, viewer)? {
            true
        } else if group.owner_group_uuid == group.uuid {
            group.has_member(viewer)
        } else {
            match groups.get_group(group.owner_group_uuid) {
                Ok(owner) => owner.has_member(viewer),
                Err(StorageError::GroupNotFound(_)) => false,
                Err(err) => return Err(err.into()),
            }
        };

        Ok(GroupControl {
            is_owner,
            is_member: group.has_member(viewer),
            visible_to_all: group.visible_to_all,
            internal: true,
        })
    }

    pub fn is_owner(&self) -> bool {
        self.is_owner
    }

    pub fn is_visible(&self) -> bool {
        self.visible_to_all || self.is_owner || self.is_member
    }

    pub fn can_add_member(&self) -> bool {
        self.internal && self.is_owner
    }

    /// Members of internal groups are listed to anyone who can see the group.
    pub fn can_see_members(&self) -> bool {
        self.internal && self.is_visible()
    }
}
