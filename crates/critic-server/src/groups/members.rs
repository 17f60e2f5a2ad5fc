//! Membership reads and edits on internal groups.

use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexSet;

use critic_core::group::union_members;
use critic_core::{AccountId, GroupUuid};
use critic_storage::{AccountStore, GroupStore};

use super::collection::GroupResource;
use crate::accounts::identity::IdentityResolver;
use crate::accounts::loader::AccountLoader;
use crate::caller::Caller;
use crate::error::ApiError;
use crate::schema::accounts::AccountInfo;

/// Result of `PUT /groups/{id}/members/{member}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// The account was already a member; nothing was written.
    Existing(AccountInfo),
    /// The account was added by this request.
    Added(AccountInfo),
}

#[derive(Clone)]
pub struct MembershipEditor {
    groups: Arc<dyn GroupStore>,
    accounts: Arc<dyn AccountStore>,
    resolver: IdentityResolver,
}

impl MembershipEditor {
    pub fn new(
        groups: Arc<dyn GroupStore>,
        accounts: Arc<dyn AccountStore>,
        resolver: IdentityResolver,
    ) -> Self {
        MembershipEditor {
            groups,
            accounts,
            resolver,
        }
    }

    /// Adds every account named by `tokens` to the group.
    ///
    /// All tokens are resolved before anything is written, so a bad token
    /// leaves the group unchanged. Returns one summary per distinct account
    /// in first-seen order.
    pub async fn add_members(
        &self,
        caller: &Caller,
        resource: &GroupResource,
        tokens: &[String],
    ) -> Result<Vec<AccountInfo>, ApiError> {
        let group = resource.internal()?;
        caller.require_user()?;
        if !resource.control.can_add_member() {
            return Err(ApiError::Forbidden(format!(
                "Cannot add members to group {}",
                group.name
            )));
        }

        let mut new_members = IndexSet::new();
        for token in tokens {
            let account = self.resolver.resolve(caller, token).await?;
            if !account.active {
                return Err(ApiError::UnprocessableEntity(format!(
                    "Account Inactive: {token}"
                )));
            }
            new_members.insert(account.id);
        }

        self.add_by_id(group.uuid, &new_members)?;
        tracing::info!(
            group = %group.uuid,
            added = new_members.len(),
            "added group members"
        );

        let mut loader = AccountLoader::new(self.accounts.clone(), true);
        new_members.iter().map(|id| loader.fill(*id)).collect()
    }

    fn add_by_id(&self, group: GroupUuid, ids: &IndexSet<AccountId>) -> Result<(), ApiError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.groups
            .update_members(group, &|current: &BTreeSet<AccountId>| {
                union_members(current, ids)
            })?;
        Ok(())
    }

    /// Adds a single member, or re-reads it if it is already one.
    ///
    /// A token that cannot be resolved surfaces as 404 at this URL.
    pub async fn put_member(
        &self,
        caller: &Caller,
        resource: &GroupResource,
        token: &str,
    ) -> Result<PutOutcome, ApiError> {
        if let Some(existing) = self.find_member(caller, resource, token)? {
            return Ok(PutOutcome::Existing(existing));
        }

        match self
            .add_members(caller, resource, &[token.to_string()])
            .await
        {
            Ok(mut infos) => infos
                .pop()
                .map(PutOutcome::Added)
                .ok_or_else(|| ApiError::NotFound(token.to_string())),
            Err(ApiError::UnprocessableEntity(_)) => Err(ApiError::NotFound(token.to_string())),
            Err(err) => Err(err),
        }
    }

    /// The member named by `token`, or `None` if it does not resolve to a
    /// current member of the group.
    pub fn find_member(
        &self,
        caller: &Caller,
        resource: &GroupResource,
        token: &str,
    ) -> Result<Option<AccountInfo>, ApiError> {
        let group = resource.internal()?;
        let account = match self.resolver.collection().parse(caller, token) {
            Ok(account) => account,
            Err(ApiError::UnprocessableEntity(_)) => return Ok(None),
            Err(err) => return Err(err),
        };
        if !group.has_member(account.id) {
            return Ok(None);
        }
        let mut loader = AccountLoader::new(self.accounts.clone(), true);
        loader.fill(account.id).map(Some)
    }

    /// Every direct member, sorted by full name then id.
    pub fn list_members(&self, resource: &GroupResource) -> Result<Vec<AccountInfo>, ApiError> {
        let group = resource.internal()?;
        if !resource.control.can_see_members() {
            return Err(ApiError::NotFound(format!("Group Not Found: {}", group.uuid)));
        }
        let mut loader = AccountLoader::new(self.accounts.clone(), true);
        let mut infos = group
            .members
            .iter()
            .map(|id| loader.get(*id))
            .collect::<Result<Vec<_>, _>>()?;
        infos.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.account_id.cmp(&b.account_id))
        });
        Ok(infos)
    }
}
