//! Group lookup, permission checks and membership edits.

pub mod collection;
pub mod control;
pub mod members;
