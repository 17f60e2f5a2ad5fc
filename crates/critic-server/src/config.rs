//! Server configuration read from `CRITIC_*` environment variables.
//!
//! | variable | default |
//! |---|---|
//! | `CRITIC_DB_PATH` | `critic.db` |
//! | `CRITIC_PORT` | `3000` |
//! | `CRITIC_AUTH_TYPE` | `HTTP` |
//! | `CRITIC_ACCOUNT_VISIBILITY` | `ALL` |
//! | `CRITIC_ADMIN_GROUP` | `Administrators` |
//! | `CRITIC_DIRECTORY_URL` | unset (static, empty directory) |
//! | `CRITIC_DIRECTORY_TIMEOUT_SECS` | `10` |
//! | `CRITIC_PLUGIN_CHANGE_SIZE` | `true` |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use critic_core::AuthType;

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value '{value}' for {var}: {reason}")]
pub struct ConfigError {
    pub var: String,
    pub value: String,
    pub reason: String,
}

/// Which accounts a caller may discover through account resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountVisibility {
    /// Every account is visible.
    #[default]
    All,
    /// Accounts sharing at least one group with the caller.
    SameGroup,
    /// Only the caller's own account.
    None,
}

impl fmt::Display for AccountVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccountVisibility::All => "ALL",
            AccountVisibility::SameGroup => "SAME_GROUP",
            AccountVisibility::None => "NONE",
        })
    }
}

impl FromStr for AccountVisibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ALL" => Ok(AccountVisibility::All),
            "SAME_GROUP" => Ok(AccountVisibility::SameGroup),
            "NONE" => Ok(AccountVisibility::None),
            _ => Err("expected ALL, SAME_GROUP or NONE".to_string()),
        }
    }
}

/// Runtime configuration for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub db_path: String,
    pub port: u16,
    pub auth_type: AuthType,
    pub account_visibility: AccountVisibility,
    /// Name of the group whose members administer every group.
    pub admin_group: String,
    /// Base URL of the HTTP directory service, if any.
    pub directory_url: Option<String>,
    pub directory_timeout: Duration,
    /// Registers the built-in `change-size` contribution factory.
    pub plugin_change_size: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            db_path: "critic.db".to_string(),
            port: 3000,
            auth_type: AuthType::default(),
            account_visibility: AccountVisibility::default(),
            admin_group: "Administrators".to_string(),
            directory_url: None,
            directory_timeout: Duration::from_secs(10),
            plugin_change_size: true,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads the configuration through `lookup`, falling back to defaults
    /// for unset variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ServerConfig::default();

        if let Some(path) = lookup("CRITIC_DB_PATH") {
            config.db_path = path;
        }
        if let Some(port) = lookup("CRITIC_PORT") {
            config.port = parse_var("CRITIC_PORT", &port)?;
        }
        if let Some(auth) = lookup("CRITIC_AUTH_TYPE") {
            config.auth_type = auth.parse().map_err(|e: critic_core::CoreError| ConfigError {
                var: "CRITIC_AUTH_TYPE".to_string(),
                value: auth.clone(),
                reason: e.to_string(),
            })?;
        }
        if let Some(visibility) = lookup("CRITIC_ACCOUNT_VISIBILITY") {
            config.account_visibility = parse_var("CRITIC_ACCOUNT_VISIBILITY", &visibility)?;
        }
        if let Some(group) = lookup("CRITIC_ADMIN_GROUP") {
            config.admin_group = group;
        }
        config.directory_url = lookup("CRITIC_DIRECTORY_URL").filter(|url| !url.is_empty());
        if let Some(secs) = lookup("CRITIC_DIRECTORY_TIMEOUT_SECS") {
            config.directory_timeout =
                Duration::from_secs(parse_var("CRITIC_DIRECTORY_TIMEOUT_SECS", &secs)?);
        }
        if let Some(flag) = lookup("CRITIC_PLUGIN_CHANGE_SIZE") {
            config.plugin_change_size = parse_var("CRITIC_PLUGIN_CHANGE_SIZE", &flag)?;
        }

        Ok(config)
    }
}

fn parse_var<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError {
        var: var.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}
