//! Error types for platsign operations
//!
//! This module defines the error hierarchy for all platsign operations.
//! Errors are organized hierarchically and use thiserror for implementation.
//! Native status codes are carried opaquely so a failure can be diagnosed
//! without re-running the handshake.

use thiserror::Error;

/// Result type alias for platsign operations
///
/// This is a convenience alias for `Result<T, PlatsignError>`.
pub type PlatsignResult<T> = Result<T, PlatsignError>;

/// Top-level error type for all platsign operations
#[derive(Error, Debug)]
pub enum PlatsignError {
    /// Credential store errors
    #[error("credential store error: {0}")]
    Store(#[from] StoreError),

    /// Identity selection errors
    #[error("identity selection error: {0}")]
    Selection(#[from] SelectionError),

    /// Signature scheme negotiation errors
    #[error("signature negotiation error: {0}")]
    Negotiation(#[from] NegotiationError),

    /// Signing operation errors
    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    /// TLS configuration errors from rustls
    #[error("TLS configuration error: {0}")]
    Tls(#[from] rustls::Error),
}

/// Native credential store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be opened
    #[error("failed to open credential store: {reason}")]
    OpenFailed { reason: String },

    /// A store query could not be executed
    #[error("credential store query failed: {reason}")]
    QueryFailed { reason: String },

    /// A native store call returned a failure status
    #[error("{operation} failed with native status {code}")]
    Native { operation: &'static str, code: i64 },
}

/// Errors from client identity selection
#[derive(Error, Debug)]
pub enum SelectionError {
    /// No matching, non-expired identity exists in the store
    #[error("no valid client identity found for common name {common_name:?}")]
    NotFound { common_name: String },

    /// A candidate certificate could not be decoded
    ///
    /// Selection recovers from this locally by skipping the candidate;
    /// it only surfaces through APIs that decode a single certificate.
    #[error("certificate decode failed: {reason}")]
    Decode { reason: String },
}

/// Errors from signature scheme negotiation
#[derive(Error, Debug)]
pub enum NegotiationError {
    /// The peer's advertised scheme list does not contain the one scheme
    /// this signer supports
    #[error("peer does not accept {supported} (offered: {offered:#06x?})")]
    UnsupportedScheme {
        supported: &'static str,
        offered: Vec<u16>,
    },
}

/// Errors from the signing operation
#[derive(Error, Debug)]
pub enum SigningError {
    /// The caller requested a scheme this signer never advertised
    #[error("signer does not support scheme {requested}")]
    UnsupportedScheme { requested: String },

    /// The requested hash or padding parameters cannot be produced
    #[error("unsupported signing parameters: {reason}")]
    UnsupportedParameters { reason: String },

    /// The private key handle was already released
    #[error("private key handle already released")]
    KeyReleased,

    /// A native signing call returned a failure status
    #[error("{operation} failed with native status {code}")]
    Native { operation: &'static str, code: i64 },

    /// Signing failed for a non-native reason
    #[error("signing failed: {reason}")]
    Failed { reason: String },
}

impl StoreError {
    /// Create a query error from a reason.
    pub fn query(reason: impl Into<String>) -> Self {
        Self::QueryFailed {
            reason: reason.into(),
        }
    }
}

impl SelectionError {
    /// Create a decode error from a reason.
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }
}
