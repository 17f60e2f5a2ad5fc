//! Account summaries embedded in change and group responses.

use serde::{Deserialize, Serialize};

use critic_core::{Account, AccountId};

/// Caller-visible summary of an account.
///
/// Only `_account_id` is always present; the remaining fields are filled in
/// when detailed accounts were requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(rename = "_account_id")]
    pub account_id: AccountId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inactive: Option<bool>,
}

impl AccountInfo {
    pub fn id_only(account_id: AccountId) -> Self {
        AccountInfo {
            account_id,
            name: None,
            email: None,
            username: None,
            inactive: None,
        }
    }

    pub fn detailed(account: &Account) -> Self {
        AccountInfo {
            account_id: account.id,
            name: account.full_name.clone(),
            email: account.preferred_email.clone(),
            username: account.username.clone(),
            inactive: (!account.active).then_some(true),
        }
    }
}
