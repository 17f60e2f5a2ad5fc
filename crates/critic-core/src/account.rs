//! Accounts and the authentication backend kinds that govern how unknown
//! accounts may be materialised.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::AccountId;

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub preferred_email: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Registration time, seconds since the Unix epoch.
    #[serde(default)]
    pub registered_on: i64,
}

fn default_active() -> bool {
    true
}

impl Account {
    /// `Full Name <email>` when both are known, else whichever is present.
    pub fn name_email(&self) -> Option<String> {
        match (&self.full_name, &self.preferred_email) {
            (Some(name), Some(email)) => Some(format!("{name} <{email}>")),
            (Some(name), None) => Some(name.clone()),
            (None, Some(email)) => Some(format!("<{email}>")),
            (None, None) => None,
        }
    }
}

/// Returns true if `name` is acceptable as a username.
///
/// A username starts and ends with an ASCII letter or digit and may contain
/// `.`, `_`, `-` and `@` in between.
pub fn is_valid_username(name: &str) -> bool {
    let bytes = name.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return false;
    }
    bytes
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-' | b'@'))
}

/// Configured authentication backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthType {
    #[default]
    Http,
    HttpLdap,
    ClientSslCertLdap,
    Ldap,
    LdapBind,
    Oauth,
    Openid,
    OpenidSso,
    DevelopmentBecomeAnyAccount,
    CustomExtension,
}

impl AuthType {
    /// Backends that can confirm an identity against the directory before a
    /// local account exists.
    pub fn is_directory_integrated(self) -> bool {
        matches!(
            self,
            AuthType::Ldap | AuthType::HttpLdap | AuthType::ClientSslCertLdap
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            AuthType::Http => "HTTP",
            AuthType::HttpLdap => "HTTP_LDAP",
            AuthType::ClientSslCertLdap => "CLIENT_SSL_CERT_LDAP",
            AuthType::Ldap => "LDAP",
            AuthType::LdapBind => "LDAP_BIND",
            AuthType::Oauth => "OAUTH",
            AuthType::Openid => "OPENID",
            AuthType::OpenidSso => "OPENID_SSO",
            AuthType::DevelopmentBecomeAnyAccount => "DEVELOPMENT_BECOME_ANY_ACCOUNT",
            AuthType::CustomExtension => "CUSTOM_EXTENSION",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AuthType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: [AuthType; 10] = [
            AuthType::Http,
            AuthType::HttpLdap,
            AuthType::ClientSslCertLdap,
            AuthType::Ldap,
            AuthType::LdapBind,
            AuthType::Oauth,
            AuthType::Openid,
            AuthType::OpenidSso,
            AuthType::DevelopmentBecomeAnyAccount,
            AuthType::CustomExtension,
        ];
        ALL.into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnknownAuthType {
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_validation() {
        assert!(is_valid_username("alice"));
        assert!(is_valid_username("a"));
        assert!(is_valid_username("jane.doe-2"));
        assert!(is_valid_username("svc_bot@ci"));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username(".alice"));
        assert!(!is_valid_username("alice-"));
        assert!(!is_valid_username("alice smith"));
        assert!(!is_valid_username("Alice <alice@example.com>"));
    }

    #[test]
    fn only_ldap_backends_are_directory_integrated() {
        assert!(AuthType::Ldap.is_directory_integrated());
        assert!(AuthType::HttpLdap.is_directory_integrated());
        assert!(AuthType::ClientSslCertLdap.is_directory_integrated());
        assert!(!AuthType::LdapBind.is_directory_integrated());
        assert!(!AuthType::Http.is_directory_integrated());
        assert!(!AuthType::Oauth.is_directory_integrated());
    }

    #[test]
    fn auth_type_parses_case_insensitively() {
        assert_eq!("ldap".parse::<AuthType>().unwrap(), AuthType::Ldap);
        assert_eq!("HTTP_LDAP".parse::<AuthType>().unwrap(), AuthType::HttpLdap);
        assert!("kerberos".parse::<AuthType>().is_err());
    }

    #[test]
    fn name_email_formats() {
        let mut a = Account {
            id: AccountId(1),
            username: None,
            full_name: Some("Alice".into()),
            preferred_email: Some("alice@example.com".into()),
            active: true,
            registered_on: 0,
        };
        assert_eq!(a.name_email().as_deref(), Some("Alice <alice@example.com>"));
        a.full_name = None;
        assert_eq!(a.name_email().as_deref(), Some("<alice@example.com>"));
    }
}
