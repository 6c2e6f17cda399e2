//! Error taxonomy for the confirmation protocol.
//!
//! Orchestrator-level errors are always converted into a structured
//! `ConfirmationResult` before crossing the execution boundary — nothing in
//! this taxonomy is ever thrown across it. Transport-level failures
//! (`Timeout`, `Disconnected`) reject the caller's pending request directly
//! and are kept distinct from flow-level cancellation.

use thiserror::Error;

use crate::result::ConfirmationResult;

/// Everything that can go wrong while driving a confirmation flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfirmError {
    /// The request envelope failed shape or schema-version validation.
    #[error("Invalid secure confirm request: {0}")]
    Validation(String),

    /// The request envelope was well-formed but carried an unknown type tag.
    #[error("Unsupported confirmation type: {0}")]
    UnsupportedType(String),

    /// A required secret extension output was absent from the credential.
    #[error("missing secret extension output: {0}")]
    MissingSecretOutput(&'static str),

    /// Nonce context fetch or sequence-number reservation failed.
    #[error("nonce acquisition failed: {0}")]
    NonceAcquisition(String),

    /// The user (or the flow's cancellation signal) declined the request.
    /// Cancellation is not an error: it surfaces as a plain decline.
    #[error("confirmation cancelled")]
    Cancelled,

    /// No terminal message arrived within the transport deadline.
    #[error("request timed out")]
    Timeout,

    /// The transport to the isolated execution context was lost.
    #[error("transport disconnected")]
    Disconnected,
}

impl ConfirmError {
    /// Map this error to the terminal result for the request.
    ///
    /// Cancellation becomes a plain decline with no error string; every
    /// other variant surfaces its human-readable message alongside
    /// `confirmed: false`.
    #[must_use]
    pub fn to_result(&self) -> ConfirmationResult {
        match self {
            Self::Cancelled => ConfirmationResult::declined(),
            other => ConfirmationResult::failed(other.to_string()),
        }
    }

    /// Whether this error represents user-level cancellation rather than
    /// an infrastructure failure.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
