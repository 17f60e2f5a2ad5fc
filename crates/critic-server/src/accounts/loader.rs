//! Builds [`AccountInfo`] summaries, reading each account at most once per
//! request.

use std::collections::HashMap;
use std::sync::Arc;

use critic_core::{Account, AccountId};
use critic_storage::{AccountStore, StorageError};

use crate::error::ApiError;
use crate::schema::accounts::AccountInfo;

pub struct AccountLoader {
    accounts: Arc<dyn AccountStore>,
    detailed: bool,
    cache: HashMap<AccountId, Option<Account>>,
}

impl AccountLoader {
    pub fn new(accounts: Arc<dyn AccountStore>, detailed: bool) -> Self {
        AccountLoader {
            accounts,
            detailed,
            cache: HashMap::new(),
        }
    }

    fn load(&mut self, id: AccountId) -> Result<Option<&Account>, ApiError> {
        if !self.cache.contains_key(&id) {
            let account = match self.accounts.get_account(id) {
                Ok(account) => Some(account),
                Err(StorageError::AccountNotFound(_)) => None,
                Err(err) => return Err(err.into()),
            };
            self.cache.insert(id, account);
        }
        Ok(self.cache.get(&id).and_then(Option::as_ref))
    }

    /// Summary of `id`. An account that no longer exists is rendered with
    /// its id only.
    pub fn get(&mut self, id: AccountId) -> Result<AccountInfo, ApiError> {
        let detailed = self.detailed;
        Ok(match self.load(id)? {
            Some(account) if detailed => AccountInfo::detailed(account),
            _ => AccountInfo::id_only(id),
        })
    }

    /// Summary of `id`, failing with 404 if the account does not exist.
    pub fn fill(&mut self, id: AccountId) -> Result<AccountInfo, ApiError> {
        let detailed = self.detailed;
        match self.load(id)? {
            Some(account) if detailed => Ok(AccountInfo::detailed(account)),
            Some(_) => Ok(AccountInfo::id_only(id)),
            None => Err(ApiError::NotFound(format!("Account '{id}' not found"))),
        }
    }
}
