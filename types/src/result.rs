//! Terminal results and the signing context they may carry.

use serde::{Deserialize, Serialize};

use crate::credential::{BlockReference, Challenge, Credential};

/// Minimal material forwarded to the external signing operation once the
/// user has authorized it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningContext {
    pub credential: Credential,
    pub challenge: Challenge,
    /// Ordered sequence numbers reserved for this flow's sub-requests.
    pub reserved_nonces: Vec<String>,
    pub block: BlockReference,
}

/// Exactly one of these is produced per confirmation request.
///
/// A decline carries no error string (cancellation is not an error);
/// infrastructure failures carry a human-readable message; only a confirm
/// carries a signing context. The constructors keep those combinations
/// from drifting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResult {
    pub confirmed: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signing_context: Option<SigningContext>,
}

impl ConfirmationResult {
    /// The user authorized the operation.
    #[must_use]
    pub fn confirmed(signing_context: SigningContext) -> Self {
        Self {
            confirmed: true,
            error: None,
            signing_context: Some(signing_context),
        }
    }

    /// The user authorized a flow that releases no signing material
    /// (e.g. the private-key viewer).
    #[must_use]
    pub fn confirmed_without_context() -> Self {
        Self {
            confirmed: true,
            error: None,
            signing_context: None,
        }
    }

    /// The user declined. No error string by construction.
    #[must_use]
    pub fn declined() -> Self {
        Self {
            confirmed: false,
            error: None,
            signing_context: None,
        }
    }

    /// The flow failed with a human-readable reason.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            confirmed: false,
            error: Some(error.into()),
            signing_context: None,
        }
    }
}
