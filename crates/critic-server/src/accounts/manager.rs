//! Account authentication and directory-driven account creation.

use std::sync::Arc;

use critic_core::{is_valid_username, AccountId};
use critic_storage::{AccountStore, NewAccount, StorageError};

use super::directory::{DirectoryError, DirectoryService};

/// A request to authenticate a user against the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub username: String,
    pub password: Option<String>,
    /// Trusts the directory entry without checking credentials.
    pub skip_authentication: bool,
}

impl AuthRequest {
    pub fn for_user(username: &str) -> Self {
        AuthRequest {
            username: username.to_string(),
            password: None,
            skip_authentication: false,
        }
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn skip_authentication(mut self) -> Self {
        self.skip_authentication = true;
        self
    }
}

/// Outcome of a successful authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthResult {
    pub account_id: AccountId,
    /// True if the account was created by this call.
    pub is_new: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("invalid username '{0}'")]
    InvalidUsername(String),

    #[error("no such user '{0}' in directory")]
    NoSuchUser(String),

    #[error("authentication failed for '{0}'")]
    AuthenticationFailed(String),

    #[error("username '{0}' already in use")]
    DuplicateUsername(String),

    #[error("email '{0}' already in use")]
    DuplicateEmail(String),

    #[error("cannot store account: {0}")]
    Storage(String),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Authenticates users and creates local accounts on first sight.
#[derive(Clone)]
pub struct AccountManager {
    accounts: Arc<dyn AccountStore>,
    directory: Arc<dyn DirectoryService>,
}

impl AccountManager {
    pub fn new(accounts: Arc<dyn AccountStore>, directory: Arc<dyn DirectoryService>) -> Self {
        AccountManager {
            accounts,
            directory,
        }
    }

    /// Authenticates `request` and returns the matching local account,
    /// creating it from the directory entry if none exists yet.
    pub async fn authenticate(&self, request: AuthRequest) -> Result<AuthResult, AccountError> {
        let username = request.username.as_str();
        if !is_valid_username(username) {
            return Err(AccountError::InvalidUsername(username.to_string()));
        }

        let entry = self
            .directory
            .lookup(username)
            .await?
            .ok_or_else(|| AccountError::NoSuchUser(username.to_string()))?;

        if !request.skip_authentication {
            let password = request.password.as_deref().unwrap_or_default();
            if !self.directory.authenticate(username, password).await? {
                return Err(AccountError::AuthenticationFailed(username.to_string()));
            }
        }

        if let Some(existing) = self.accounts.find_by_username(username).map_err(storage)? {
            return Ok(AuthResult {
                account_id: existing.id,
                is_new: false,
            });
        }

        if let Some(email) = &entry.email {
            if !self.accounts.find_by_email(email).map_err(storage)?.is_empty() {
                return Err(AccountError::DuplicateEmail(email.clone()));
            }
        }

        let account = self
            .accounts
            .create_account(&NewAccount {
                username: Some(entry.username.clone()),
                full_name: entry.full_name.clone(),
                preferred_email: entry.email.clone(),
                active: true,
                registered_on: chrono::Utc::now().timestamp(),
            })
            .map_err(|e| match e {
                StorageError::DuplicateUsername(name) => AccountError::DuplicateUsername(name),
                other => storage(other),
            })?;

        tracing::info!(
            username = %username,
            account_id = %account.id,
            "created account from directory entry"
        );
        Ok(AuthResult {
            account_id: account.id,
            is_new: true,
        })
    }
}

fn storage(err: StorageError) -> AccountError {
    AccountError::Storage(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::directory::{DirectoryEntry, StaticDirectory};
    use critic_storage::InMemoryStore;

    fn setup() -> (Arc<InMemoryStore>, Arc<StaticDirectory>, AccountManager) {
        let store = Arc::new(InMemoryStore::new());
        let directory = Arc::new(StaticDirectory::new());
        let manager = AccountManager::new(store.clone(), directory.clone());
        (store, directory, manager)
    }

    fn entry(username: &str, email: &str) -> DirectoryEntry {
        DirectoryEntry {
            username: username.into(),
            full_name: Some(format!("{username} example")),
            email: Some(email.into()),
        }
    }

    #[tokio::test]
    async fn skipped_authentication_creates_account_once() {
        let (store, directory, manager) = setup();
        directory.insert(entry("dana", "dana@example.com"));

        let first = manager
            .authenticate(AuthRequest::for_user("dana").skip_authentication())
            .await
            .unwrap();
        assert!(first.is_new);
        let account = store.get_account(first.account_id).unwrap();
        assert_eq!(account.preferred_email.as_deref(), Some("dana@example.com"));
        assert!(account.active);

        let second = manager
            .authenticate(AuthRequest::for_user("dana").skip_authentication())
            .await
            .unwrap();
        assert_eq!(second.account_id, first.account_id);
        assert!(!second.is_new);
    }

    #[tokio::test]
    async fn password_is_checked_unless_skipped() {
        let (_store, directory, manager) = setup();
        directory.insert_with_password(entry("dana", "dana@example.com"), "pw");

        let err = manager
            .authenticate(AuthRequest::for_user("dana").with_password("nope"))
            .await
            .unwrap_err();
        assert_eq!(err, AccountError::AuthenticationFailed("dana".into()));

        assert!(manager
            .authenticate(AuthRequest::for_user("dana").with_password("pw"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn unknown_invalid_and_duplicate_email_fail() {
        let (store, directory, manager) = setup();
        store
            .create_account(&NewAccount {
                username: Some("other".into()),
                preferred_email: Some("taken@example.com".into()),
                active: true,
                ..NewAccount::default()
            })
            .unwrap();
        directory.insert(entry("dana", "taken@example.com"));

        assert!(matches!(
            manager.authenticate(AuthRequest::for_user("ghost").skip_authentication()).await,
            Err(AccountError::NoSuchUser(_))
        ));
        assert!(matches!(
            manager.authenticate(AuthRequest::for_user("-bad-").skip_authentication()).await,
            Err(AccountError::InvalidUsername(_))
        ));
        assert!(matches!(
            manager.authenticate(AuthRequest::for_user("dana").skip_authentication()).await,
            Err(AccountError::DuplicateEmail(_))
        ));
    }
}
