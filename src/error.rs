//! Error types for SpecVault
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using VaultError
pub type Result<T> = std::result::Result<T, VaultError>;

/// Unified error type for SpecVault operations
#[derive(Debug, Error)]
pub enum VaultError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Container Errors
    // -------------------------------------------------------------------------
    #[error("Container corruption detected: {0}")]
    Container(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Query Errors
    // -------------------------------------------------------------------------
    #[error("Unknown survey: {0}")]
    UnknownSurvey(String),

    #[error("Partial coverage: identifier {missing_id} not in survey {survey} after filtering")]
    PartialCoverage { survey: String, missing_id: u64 },

    #[error("Invalid query parameter: {0}")]
    InvalidQueryParameter(String),
}
