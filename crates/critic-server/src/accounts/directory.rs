//! Directory service backends.
//!
//! The directory is the external source of truth for identities under a
//! directory-integrated auth backend. Two implementations are provided:
//! [`StaticDirectory`], an in-process table, and [`HttpDirectory`], a JSON
//! client for a directory gateway exposing
//!
//! - `GET {base}/users/{username}`: 200 with a [`DirectoryEntry`], 404 if absent
//! - `POST {base}/users/{username}/authenticate` with `{"password": ..}`:
//!   200 on success, 401/403 on bad credentials

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// One identity as known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// The directory could not be reached or did not answer in time.
    #[error("directory unreachable: {0}")]
    Transport(String),

    /// The directory answered with something unexpected.
    #[error("directory protocol error: {0}")]
    Protocol(String),
}

#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Looks up a username. `Ok(None)` means the directory has no such user.
    async fn lookup(&self, username: &str) -> Result<Option<DirectoryEntry>, DirectoryError>;

    /// Verifies a password for `username`.
    async fn authenticate(&self, username: &str, password: &str) -> Result<bool, DirectoryError>;
}

/// In-process directory backed by a concurrent map.
#[derive(Default)]
pub struct StaticDirectory {
    entries: DashMap<String, (DirectoryEntry, Option<String>)>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        StaticDirectory::default()
    }

    /// Adds or replaces an entry without a password.
    pub fn insert(&self, entry: DirectoryEntry) {
        self.entries.insert(entry.username.clone(), (entry, None));
    }

    pub fn insert_with_password(&self, entry: DirectoryEntry, password: &str) {
        self.entries
            .insert(entry.username.clone(), (entry, Some(password.to_string())));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl DirectoryService for StaticDirectory {
    async fn lookup(&self, username: &str) -> Result<Option<DirectoryEntry>, DirectoryError> {
        Ok(self.entries.get(username).map(|e| e.value().0.clone()))
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<bool, DirectoryError> {
        Ok(self
            .entries
            .get(username)
            .is_some_and(|e| e.value().1.as_deref() == Some(password)))
    }
}

/// JSON-over-HTTP directory client.
pub struct HttpDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDirectory {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DirectoryError::Transport(format!("client setup failed: {e}")))?;
        Ok(HttpDirectory {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn user_url(&self, username: &str) -> String {
        format!("{}/users/{}", self.base_url, username)
    }
}

#[async_trait]
impl DirectoryService for HttpDirectory {
    async fn lookup(&self, username: &str) -> Result<Option<DirectoryEntry>, DirectoryError> {
        let response = self
            .client
            .get(self.user_url(username))
            .send()
            .await
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;

        match response.status() {
            reqwest::StatusCode::OK => {
                let entry = response
                    .json::<DirectoryEntry>()
                    .await
                    .map_err(|e| DirectoryError::Protocol(format!("bad entry: {e}")))?;
                Ok(Some(entry))
            }
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            status => Err(DirectoryError::Protocol(format!(
                "lookup of '{username}' returned {status}"
            ))),
        }
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<bool, DirectoryError> {
        let response = self
            .client
            .post(format!("{}/authenticate", self.user_url(username)))
            .json(&serde_json::json!({ "password": password }))
            .send()
            .await
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;

        match response.status() {
            reqwest::StatusCode::OK => Ok(true),
            reqwest::StatusCode::UNAUTHORIZED
            | reqwest::StatusCode::FORBIDDEN
            | reqwest::StatusCode::NOT_FOUND => Ok(false),
            status => Err(DirectoryError::Protocol(format!(
                "authentication of '{username}' returned {status}"
            ))),
        }
    }
}
