//! Shared application state for the HTTP server.
//!
//! [`AppState`] holds the stores and collaborators behind `Arc`s so it can be
//! cloned into every handler task. The stores are `Send + Sync` and own their
//! concurrency control, so handlers never lock anything themselves.
//! Per-request components (collections, formatter, membership editor) are
//! cheap views built from the state on demand.

use std::sync::Arc;

use axum::http::HeaderMap;

use critic_core::{LabelTypes, OptionSet};
use critic_storage::{AccountStore, ChangeStore, GroupStore, InMemoryStore, SqliteStore};

use crate::accounts::directory::{DirectoryService, HttpDirectory, StaticDirectory};
use crate::accounts::identity::IdentityResolver;
use crate::accounts::manager::AccountManager;
use crate::accounts::resolver::AccountsCollection;
use crate::caller::{extract_caller, Caller};
use crate::change_json::ChangeJson;
use crate::changes::ChangesCollection;
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::groups::collection::GroupsCollection;
use crate::groups::members::MembershipEditor;
use crate::plugins::{ChangeSizeFactory, PluginRegistry};

#[derive(Clone)]
pub struct AppState {
    pub changes: Arc<dyn ChangeStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub groups: Arc<dyn GroupStore>,
    pub directory: Arc<dyn DirectoryService>,
    pub plugins: Arc<PluginRegistry>,
    pub labels: Arc<LabelTypes>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Creates an `AppState` backed by the SQLite database at
    /// `config.db_path`, with an HTTP directory if one is configured.
    pub fn new(config: ServerConfig) -> Result<Self, ApiError> {
        let store = Arc::new(SqliteStore::new(&config.db_path)?);
        let directory: Arc<dyn DirectoryService> = match &config.directory_url {
            Some(url) => Arc::new(
                HttpDirectory::new(url, config.directory_timeout)
                    .map_err(|e| ApiError::InternalError(e.to_string()))?,
            ),
            None => Arc::new(StaticDirectory::new()),
        };
        Ok(Self::from_store(store, config, directory))
    }

    /// Creates an `AppState` with in-memory storage and an empty directory
    /// (for testing).
    pub fn in_memory() -> Self {
        Self::in_memory_with(ServerConfig::default(), Arc::new(StaticDirectory::new()))
    }

    pub fn in_memory_with(config: ServerConfig, directory: Arc<dyn DirectoryService>) -> Self {
        Self::from_store(Arc::new(InMemoryStore::new()), config, directory)
    }

    fn from_store<S>(store: Arc<S>, config: ServerConfig, directory: Arc<dyn DirectoryService>) -> Self
    where
        S: ChangeStore + AccountStore + GroupStore + 'static,
    {
        let mut plugins = PluginRegistry::new();
        if config.plugin_change_size {
            plugins.register(Arc::new(ChangeSizeFactory));
        }

        AppState {
            changes: store.clone(),
            accounts: store.clone(),
            groups: store,
            directory,
            plugins: Arc::new(plugins),
            labels: Arc::new(LabelTypes::default()),
            config: Arc::new(config),
        }
    }

    pub fn caller(&self, headers: &HeaderMap) -> Result<Caller, ApiError> {
        extract_caller(headers, self.accounts.as_ref())
    }

    pub fn changes_collection(&self) -> ChangesCollection {
        ChangesCollection::new(self.changes.clone())
    }

    pub fn change_json(&self, options: OptionSet) -> ChangeJson {
        ChangeJson::new(
            self.changes.clone(),
            self.accounts.clone(),
            self.labels.clone(),
            options,
        )
    }

    pub fn accounts_collection(&self) -> AccountsCollection {
        AccountsCollection::new(
            self.accounts.clone(),
            self.groups.clone(),
            self.config.account_visibility,
            &self.config.admin_group,
        )
    }

    pub fn identity_resolver(&self) -> IdentityResolver {
        IdentityResolver::new(
            self.accounts_collection(),
            AccountManager::new(self.accounts.clone(), self.directory.clone()),
            self.accounts.clone(),
            self.directory.clone(),
            self.config.auth_type,
        )
    }

    pub fn groups_collection(&self) -> GroupsCollection {
        GroupsCollection::new(self.groups.clone(), &self.config.admin_group)
    }

    pub fn membership_editor(&self) -> MembershipEditor {
        MembershipEditor::new(
            self.groups.clone(),
            self.accounts.clone(),
            self.identity_resolver(),
        )
    }
}
