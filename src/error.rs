//! Error types for xiaolongbaodb
//!
//! Provides a unified error type for all operations. "Not found" is not an
//! error anywhere in the crate: lookups return `Ok(None)`.

use thiserror::Error;

/// Result type alias using XlbError
pub type Result<T> = std::result::Result<T, XlbError>;

/// Unified error type for xiaolongbaodb operations
#[derive(Debug, Error)]
pub enum XlbError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    // -------------------------------------------------------------------------
    // Page Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt page {page}: {reason}")]
    CorruptPage { page: u32, reason: String },

    #[error("Page image has wrong length: expected {expected} bytes, got {actual}")]
    PageLength { expected: usize, actual: usize },

    // -------------------------------------------------------------------------
    // Tree Errors
    // -------------------------------------------------------------------------
    #[error("Key too large: {len} bytes (max {max})")]
    KeyTooLarge { len: usize, max: usize },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    InvalidConfig(String),
}

impl XlbError {
    pub(crate) fn corrupt(page: u32, reason: impl Into<String>) -> Self {
        XlbError::CorruptPage {
            page,
            reason: reason.into(),
        }
    }
}

impl From<bincode::Error> for XlbError {
    fn from(e: bincode::Error) -> Self {
        XlbError::Serialization(e.to_string())
    }
}
