//! Identifier resolution with just-in-time provisioning from the directory.

use std::sync::Arc;

use critic_core::{is_valid_username, Account, AuthType};
use critic_storage::AccountStore;

use super::directory::{DirectoryError, DirectoryService};
use super::manager::{AccountError, AccountManager, AuthRequest};
use super::resolver::AccountsCollection;
use crate::caller::Caller;
use crate::error::ApiError;

/// Resolves member identifiers for group edits.
///
/// Local resolution comes first. When it fails and the auth backend is
/// directory-integrated, a token that matches no local account at all and
/// is a valid username is looked up in the directory and, if present,
/// provisioned without a credential check.
#[derive(Clone)]
pub struct IdentityResolver {
    collection: AccountsCollection,
    manager: AccountManager,
    accounts: Arc<dyn AccountStore>,
    directory: Arc<dyn DirectoryService>,
    auth_type: AuthType,
}

impl IdentityResolver {
    pub fn new(
        collection: AccountsCollection,
        manager: AccountManager,
        accounts: Arc<dyn AccountStore>,
        directory: Arc<dyn DirectoryService>,
        auth_type: AuthType,
    ) -> Self {
        IdentityResolver {
            collection,
            manager,
            accounts,
            directory,
            auth_type,
        }
    }

    /// Local-only resolution, without the directory fallback.
    pub fn collection(&self) -> &AccountsCollection {
        &self.collection
    }

    pub async fn resolve(&self, caller: &Caller, token: &str) -> Result<Account, ApiError> {
        let token = token.trim();
        let matches = self.collection.lookup(caller, token)?;
        let exists_locally = !matches.is_empty();
        let err = match matches.into_unique(token) {
            Ok(account) => return Ok(account),
            Err(err) => err,
        };

        // Any local match, hidden or ambiguous, keeps the original error so
        // that hidden accounts stay indistinguishable from missing ones.
        if !matches!(err, ApiError::UnprocessableEntity(_))
            || !self.auth_type.is_directory_integrated()
            || exists_locally
            || !is_valid_username(token)
        {
            return Err(err);
        }

        match self.directory.lookup(token).await {
            Ok(Some(_)) => {}
            Ok(None) => return Err(err),
            Err(DirectoryError::Transport(msg)) => {
                return Err(ApiError::InternalError(format!("directory unreachable: {msg}")))
            }
            Err(other) => {
                tracing::warn!(token, error = %other, "directory lookup failed");
                return Err(err);
            }
        }

        let request = AuthRequest::for_user(token).skip_authentication();
        match self.manager.authenticate(request).await {
            Ok(result) => Ok(self.accounts.get_account(result.account_id)?),
            Err(AccountError::Directory(DirectoryError::Transport(msg))) => {
                Err(ApiError::InternalError(format!("directory unreachable: {msg}")))
            }
            Err(other) => {
                tracing::warn!(token, error = %other, "cannot provision account");
                Err(err)
            }
        }
    }
}
