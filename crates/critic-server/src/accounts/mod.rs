//! Account resolution, directory lookup and just-in-time provisioning.
//!
//! [`resolver::AccountsCollection`] resolves identifiers against local
//! accounts under the configured visibility policy.
//! [`identity::IdentityResolver`] adds the directory fallback on top of it,
//! provisioning missing accounts through [`manager::AccountManager`].

pub mod directory;
pub mod identity;
pub mod loader;
pub mod manager;
pub mod resolver;
