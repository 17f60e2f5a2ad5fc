//! HTTP handler modules for the critic API.
//!
//! Each sub-module implements thin handlers that parse requests, build the
//! per-request components from [`AppState`](crate::state::AppState) and
//! return JSON responses. No business logic lives in handlers.

pub mod changes;
pub mod groups;
