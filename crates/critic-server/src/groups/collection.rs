//! Resolution of the `{id}` segment of group URLs.

use std::sync::Arc;

use uuid::Uuid;

use critic_core::group::EXTERNAL_GROUP_PREFIX;
use critic_core::{GroupDescription, GroupId, GroupUuid, InternalGroup};
use critic_storage::{GroupStore, StorageError};

use super::control::GroupControl;
use crate::caller::Caller;
use crate::error::ApiError;

/// A group addressed by a request, with the caller's permissions on it.
#[derive(Debug, Clone)]
pub struct GroupResource {
    pub group: GroupDescription,
    pub control: GroupControl,
}

impl GroupResource {
    /// The internal group, or 405 for directory-backed groups.
    pub fn internal(&self) -> Result<&InternalGroup, ApiError> {
        self.group
            .as_internal()
            .ok_or_else(|| ApiError::MethodNotAllowed("not an internal group".into()))
    }
}

#[derive(Clone)]
pub struct GroupsCollection {
    groups: Arc<dyn GroupStore>,
    admin_group: String,
}

impl GroupsCollection {
    pub fn new(groups: Arc<dyn GroupStore>, admin_group: &str) -> Self {
        GroupsCollection {
            groups,
            admin_group: admin_group.to_string(),
        }
    }

    /// Resolves `id` as a group uuid, a legacy numeric id or a group name.
    /// Names with the directory prefix denote external groups. Groups the
    /// caller cannot see are reported as missing.
    pub fn parse(&self, caller: &Caller, id: &str) -> Result<GroupResource, ApiError> {
        let group = self
            .find(id)?
            .ok_or_else(|| ApiError::NotFound(format!("Group Not Found: {id}")))?;
        let control = GroupControl::new(caller, &group, self.groups.as_ref(), &self.admin_group)?;
        if !control.is_visible() {
            return Err(ApiError::NotFound(format!("Group Not Found: {id}")));
        }
        Ok(GroupResource { group, control })
    }

    fn find(&self, id: &str) -> Result<Option<GroupDescription>, ApiError> {
        if let Some(name) = id.strip_prefix(EXTERNAL_GROUP_PREFIX) {
            return Ok(Some(GroupDescription::External {
                uuid: id.to_string(),
                name: name.to_string(),
            }));
        }

        if let Ok(uuid) = Uuid::parse_str(id) {
            return match self.groups.get_group(GroupUuid(uuid)) {
                Ok(group) => Ok(Some(GroupDescription::Internal(group))),
                Err(StorageError::GroupNotFound(_)) => Ok(None),
                Err(err) => Err(err.into()),
            };
        }

        if let Ok(legacy) = id.parse::<u32>() {
            if let Some(group) = self.groups.find_group_by_id(GroupId(legacy))? {
                return Ok(Some(GroupDescription::Internal(group)));
            }
        }

        Ok(self
            .groups
            .find_group_by_name(id)?
            .map(GroupDescription::Internal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use critic_core::{Account, AccountId};
    use critic_storage::{InMemoryStore, NewGroup};

    fn member(id: u32) -> Caller {
        Caller::User(Account {
            id: AccountId(id),
            username: None,
            full_name: None,
            preferred_email: None,
            active: true,
            registered_on: 0,
        })
    }

    #[test]
    fn resolves_by_uuid_legacy_id_and_name() {
        let store = Arc::new(InMemoryStore::new());
        let devs = store
            .create_group(&NewGroup {
                name: "devs".into(),
                visible_to_all: true,
                ..NewGroup::default()
            })
            .unwrap();
        let groups = GroupsCollection::new(store, "Administrators");

        for id in [devs.uuid.to_string(), devs.id.to_string(), "devs".to_string()] {
            let resource = groups.parse(&Caller::Anonymous, &id).unwrap();
            assert_eq!(resource.internal().unwrap().uuid, devs.uuid);
        }
    }

    #[test]
    fn invisible_and_missing_groups_are_not_found() {
        let store = Arc::new(InMemoryStore::new());
        store
            .create_group(&NewGroup {
                name: "secret".into(),
                members: [AccountId(1)].into_iter().collect(),
                ..NewGroup::default()
            })
            .unwrap();
        let groups = GroupsCollection::new(store, "Administrators");

        assert!(matches!(
            groups.parse(&member(2), "secret"),
            Err(ApiError::NotFound(_))
        ));
        assert!(groups.parse(&member(1), "secret").is_ok());
        assert!(matches!(
            groups.parse(&member(1), "nope"),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn prefixed_ids_are_external() {
        let store = Arc::new(InMemoryStore::new());
        let groups = GroupsCollection::new(store, "Administrators");
        let resource = groups.parse(&member(1), "ldap:cn=ops").unwrap();
        assert_eq!(resource.group.name(), "cn=ops");
        assert_eq!(
            resource.internal().unwrap_err(),
            ApiError::MethodNotAllowed("not an internal group".into())
        );
    }
}
