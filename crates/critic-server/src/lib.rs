//! HTTP/JSON server for the critic code-review API.
//!
//! Serves change reads shaped by output options, pinned to historical
//! metadata snapshots and enriched by plugin contributions, plus group
//! membership edits with directory-backed account provisioning. This crate
//! contains the server framework, API schema types, error handling and route
//! definitions.

pub mod accounts;
pub mod caller;
pub mod change_json;
pub mod changes;
pub mod config;
pub mod error;
pub mod groups;
pub mod handlers;
pub mod plugins;
pub mod router;
pub mod schema;
pub mod state;
