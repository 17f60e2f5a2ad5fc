//! Local account resolution under the account visibility policy.
//!
//! Accepted identifier syntaxes, tried in order:
//!
//! - `self`: the caller
//! - a numeric account id
//! - `Full Name <email>`: matched on the email
//! - `Full Name (id)`: matched on the id
//! - a username, then a preferred email, then an exact full name

use std::sync::Arc;

use critic_core::{Account, AccountId};
use critic_storage::{AccountStore, GroupStore, StorageError};

use crate::caller::{is_administrator, Caller};
use crate::config::AccountVisibility;
use crate::error::ApiError;

/// Local matches for one identifier, split by visibility to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matches {
    pub visible: Vec<Account>,
    /// Number of matches the caller may not see.
    pub hidden: usize,
}

impl Matches {
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty() && self.hidden == 0
    }

    /// The unique visible match, or 422.
    ///
    /// Hidden matches are reported exactly like missing ones.
    pub fn into_unique(self, token: &str) -> Result<Account, ApiError> {
        let mut visible = self.visible;
        match visible.len() {
            0 => Err(not_found(token)),
            1 => Ok(visible.remove(0)),
            _ => Err(ApiError::UnprocessableEntity(format!(
                "Account '{token}' is ambiguous"
            ))),
        }
    }
}

pub fn not_found(token: &str) -> ApiError {
    ApiError::UnprocessableEntity(format!("Account '{token}' not found"))
}

/// Resolves identifiers to local accounts.
#[derive(Clone)]
pub struct AccountsCollection {
    accounts: Arc<dyn AccountStore>,
    groups: Arc<dyn GroupStore>,
    visibility: AccountVisibility,
    admin_group: String,
}

impl AccountsCollection {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        groups: Arc<dyn GroupStore>,
        visibility: AccountVisibility,
        admin_group: &str,
    ) -> Self {
        AccountsCollection {
            accounts,
            groups,
            visibility,
            admin_group: admin_group.to_string(),
        }
    }

    /// Resolves `token` to exactly one account visible to `caller`.
    pub fn parse(&self, caller: &Caller, token: &str) -> Result<Account, ApiError> {
        self.lookup(caller, token)?.into_unique(token)
    }

    /// Finds every local account `token` denotes, inactive ones included.
    pub fn lookup(&self, caller: &Caller, token: &str) -> Result<Matches, ApiError> {
        let token = token.trim();
        if token == "self" {
            let account = caller.require_user()?;
            return Ok(Matches {
                visible: vec![account.clone()],
                hidden: 0,
            });
        }

        let candidates = self.candidates(token)?;
        let mut matches = Matches::default();
        for account in candidates {
            if self.can_see(caller, &account)? {
                matches.visible.push(account);
            } else {
                matches.hidden += 1;
            }
        }
        Ok(matches)
    }

    fn candidates(&self, token: &str) -> Result<Vec<Account>, ApiError> {
        if token.is_empty() {
            return Ok(Vec::new());
        }
        if let Ok(id) = token.parse::<u32>() {
            return self.by_id(AccountId(id));
        }
        if let Some(email) = bracketed(token, '<', '>') {
            return Ok(self.accounts.find_by_email(email)?);
        }
        if let Some(id) = bracketed(token, '(', ')').and_then(|s| s.parse::<u32>().ok()) {
            return self.by_id(AccountId(id));
        }

        if let Some(account) = self.accounts.find_by_username(token)? {
            return Ok(vec![account]);
        }
        if token.contains('@') {
            let by_email = self.accounts.find_by_email(token)?;
            if !by_email.is_empty() {
                return Ok(by_email);
            }
        }
        Ok(self.accounts.find_by_full_name(token)?)
    }

    fn by_id(&self, id: AccountId) -> Result<Vec<Account>, ApiError> {
        match self.accounts.get_account(id) {
            Ok(account) => Ok(vec![account]),
            Err(StorageError::AccountNotFound(_)) => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Applies the visibility policy. Administrators and the account itself
    /// always see it.
    pub fn can_see(&self, caller: &Caller, account: &Account) -> Result<bool, ApiError> {
        let Some(viewer) = caller.account_id() else {
            return Ok(self.visibility == AccountVisibility::All);
        };
        if viewer == account.id || self.visibility == AccountVisibility::All {
            return Ok(true);
        }
        if is_administrator(self.groups.as_ref(), &self.admin_group, viewer)? {
            return Ok(true);
        }
        match self.visibility {
            AccountVisibility::All => Ok(true),
            AccountVisibility::None => Ok(false),
            AccountVisibility::SameGroup => {
                let mine = self.groups.groups_containing(viewer)?;
                let theirs = self.groups.groups_containing(account.id)?;
                Ok(mine.iter().any(|g| theirs.contains(g)))
            }
        }
    }
}

/// The text between the last `open` and a trailing `close`.
fn bracketed(token: &str, open: char, close: char) -> Option<&str> {
    let inner = token.strip_suffix(close)?;
    let start = inner.rfind(open)?;
    Some(inner[start + open.len_utf8()..].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use critic_storage::{InMemoryStore, NewAccount, NewGroup};

    struct Fixture {
        store: Arc<InMemoryStore>,
        alice: Account,
        bob: Account,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let alice = store
            .create_account(&NewAccount {
                username: Some("alice".into()),
                full_name: Some("Alice Liddell".into()),
                preferred_email: Some("alice@example.com".into()),
                active: true,
                registered_on: 0,
            })
            .unwrap();
        let bob = store
            .create_account(&NewAccount {
                username: Some("bob".into()),
                full_name: Some("Bob Smith".into()),
                preferred_email: Some("bob@example.com".into()),
                active: false,
                registered_on: 0,
            })
            .unwrap();
        Fixture { store, alice, bob }
    }

    fn collection(f: &Fixture, visibility: AccountVisibility) -> AccountsCollection {
        AccountsCollection::new(f.store.clone(), f.store.clone(), visibility, "Administrators")
    }

    #[test]
    fn resolves_every_syntax() {
        let f = fixture();
        let accounts = collection(&f, AccountVisibility::All);
        let caller = Caller::User(f.alice.clone());
        let tokens = [
            "self".to_string(),
            f.alice.id.to_string(),
            "alice".to_string(),
            "alice@example.com".to_string(),
            "ALICE@example.com".to_string(),
            "Alice Liddell".to_string(),
            "Alice Liddell <alice@example.com>".to_string(),
            format!("Alice Liddell ({})", f.alice.id),
        ];
        for token in &tokens {
            assert_eq!(accounts.parse(&caller, token).unwrap(), f.alice, "{token}");
        }
    }

    #[test]
    fn inactive_accounts_still_resolve() {
        let f = fixture();
        let accounts = collection(&f, AccountVisibility::All);
        let bob = accounts.parse(&Caller::Anonymous, "bob").unwrap();
        assert_eq!(bob, f.bob);
        assert!(!bob.active);
    }

    #[test]
    fn unknown_and_ambiguous_are_unprocessable() {
        let f = fixture();
        f.store
            .create_account(&NewAccount {
                username: Some("alice2".into()),
                full_name: Some("Alice Liddell".into()),
                active: true,
                ..NewAccount::default()
            })
            .unwrap();
        let accounts = collection(&f, AccountVisibility::All);
        assert_eq!(
            accounts.parse(&Caller::Anonymous, "ghost").unwrap_err(),
            ApiError::UnprocessableEntity("Account 'ghost' not found".into())
        );
        assert_eq!(
            accounts.parse(&Caller::Anonymous, "Alice Liddell").unwrap_err(),
            ApiError::UnprocessableEntity("Account 'Alice Liddell' is ambiguous".into())
        );
    }

    #[test]
    fn self_requires_a_caller() {
        let f = fixture();
        let accounts = collection(&f, AccountVisibility::All);
        assert!(matches!(
            accounts.parse(&Caller::Anonymous, "self"),
            Err(ApiError::AuthRequired(_))
        ));
    }

    #[test]
    fn hidden_accounts_look_missing() {
        let f = fixture();
        let accounts = collection(&f, AccountVisibility::None);
        let caller = Caller::User(f.alice.clone());

        let matches = accounts.lookup(&caller, "bob").unwrap();
        assert!(matches.visible.is_empty());
        assert_eq!(matches.hidden, 1);
        assert!(!matches.is_empty());
        assert_eq!(
            accounts.parse(&caller, "bob").unwrap_err(),
            ApiError::UnprocessableEntity("Account 'bob' not found".into())
        );
        assert_eq!(accounts.parse(&caller, "alice").unwrap(), f.alice);
    }

    #[test]
    fn same_group_visibility_and_administrators() {
        let f = fixture();
        let accounts = collection(&f, AccountVisibility::SameGroup);
        let caller = Caller::User(f.alice.clone());
        assert!(accounts.parse(&caller, "bob").is_err());

        let team = f
            .store
            .create_group(&NewGroup {
                name: "team".into(),
                members: [f.alice.id, f.bob.id].into_iter().collect(),
                ..NewGroup::default()
            })
            .unwrap();
        assert_eq!(accounts.parse(&caller, "bob").unwrap(), f.bob);

        f.store.delete_group(team.uuid).unwrap();
        f.store
            .create_group(&NewGroup {
                name: "Administrators".into(),
                members: [f.alice.id].into_iter().collect(),
                ..NewGroup::default()
            })
            .unwrap();
        assert_eq!(accounts.parse(&caller, "bob").unwrap(), f.bob);
    }

    #[test]
    fn bracketed_extracts_trailing_segment() {
        assert_eq!(bracketed("A B <a@b.c>", '<', '>'), Some("a@b.c"));
        assert_eq!(bracketed("A (12)", '(', ')'), Some("12"));
        assert_eq!(bracketed("plain", '<', '>'), None);
    }
}
