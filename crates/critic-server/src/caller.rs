//! Caller identity for incoming requests.
//!
//! The caller is named by the `X-Account-Id` header carrying a numeric
//! account id. A request without the header is anonymous; a malformed id,
//! an unknown account or an inactive account is rejected with 401.

use axum::http::HeaderMap;

use critic_core::{Account, AccountId};
use critic_storage::{AccountStore, GroupStore, StorageError};

use crate::error::ApiError;

pub const ACCOUNT_HEADER: &str = "X-Account-Id";

/// The identity a request runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    User(Account),
}

impl Caller {
    pub fn account_id(&self) -> Option<AccountId> {
        match self {
            Caller::Anonymous => None,
            Caller::User(account) => Some(account.id),
        }
    }

    /// Fails with 401 unless the caller is identified.
    pub fn require_user(&self) -> Result<&Account, ApiError> {
        match self {
            Caller::Anonymous => Err(ApiError::AuthRequired("Authentication required".into())),
            Caller::User(account) => Ok(account),
        }
    }
}

/// Extracts the caller from request headers.
pub fn extract_caller(headers: &HeaderMap, accounts: &dyn AccountStore) -> Result<Caller, ApiError> {
    let Some(raw) = headers.get(ACCOUNT_HEADER) else {
        return Ok(Caller::Anonymous);
    };
    let id = raw
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok())
        .map(AccountId)
        .ok_or_else(|| ApiError::AuthRequired(format!("invalid {ACCOUNT_HEADER} header")))?;
    identify(id, accounts)
}

/// The caller for a known account id. Unknown and inactive accounts cannot
/// act.
pub fn identify(id: AccountId, accounts: &dyn AccountStore) -> Result<Caller, ApiError> {
    match accounts.get_account(id) {
        Ok(account) if account.active => Ok(Caller::User(account)),
        Ok(_) | Err(StorageError::AccountNotFound(_)) => {
            Err(ApiError::AuthRequired(format!("unknown account {id}")))
        }
        Err(err) => Err(err.into()),
    }
}

/// Returns true if `account` is a direct member of the administrators group.
pub fn is_administrator(
    groups: &dyn GroupStore,
    admin_group: &str,
    account: AccountId,
) -> Result<bool, StorageError> {
    Ok(groups
        .find_group_by_name(admin_group)?
        .is_some_and(|g| g.has_member(account)))
}
