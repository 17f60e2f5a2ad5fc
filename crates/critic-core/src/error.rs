//! Core error types for critic-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering
//! request-parameter parsing failures in the core data model.

use thiserror::Error;

/// Core errors produced by the critic-core crate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// An output option token did not name a known option.
    #[error("\"{token}\" is not a valid value for \"-o\"")]
    UnknownOption { token: String },

    /// The `-O` argument was not a hexadecimal integer.
    #[error("invalid option flags: \"{value}\" is not a hexadecimal integer")]
    InvalidOptionHex { value: String },

    /// The `-O` bitmask set bits with no option assigned to them.
    #[error("unknown option flag bits: 0x{bits:x}")]
    UndefinedOptionBits { bits: u64 },

    /// A string was not a 40-character hex object id.
    #[error("invalid object id: {value}")]
    InvalidObjectId { value: String },

    /// A username failed syntax validation.
    #[error("invalid username '{username}'")]
    InvalidUsername { username: String },

    /// An authentication backend name was not recognised.
    #[error("unknown auth type '{value}'")]
    UnknownAuthType { value: String },
}
