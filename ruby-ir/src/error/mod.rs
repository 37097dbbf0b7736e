//! Error types for IR model operations

use crate::core::scope::ScopeRef;
use thiserror::Error;

/// Main error type for IR model operations
#[derive(Error, Debug)]
pub enum IrError {
    #[error("Invalid operation code: {0:#04x}")]
    InvalidOpcode(u8),

    #[error("Invalid {what} code: {code:#04x}")]
    InvalidCode { what: &'static str, code: u8 },

    #[error("Unknown character encoding: {0:?}")]
    UnknownEncoding(String),

    #[error("Scope {0} does not belong to this tree")]
    UnknownScope(ScopeRef),

    #[error("Invalid scope tree: {0}")]
    InvalidTree(String),

    #[error("Deferred instruction load failed: {0}")]
    Load(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Convenient Result type
pub type Result<T> = std::result::Result<T, IrError>;
