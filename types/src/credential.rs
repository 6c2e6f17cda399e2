//! Collaborator output types: block context, challenges, and credentials.

use serde::{Deserialize, Serialize};

use crate::error::ConfirmError;

/// A block the challenge (and any signed transaction) is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockReference {
    pub block_height: u64,
    pub block_hash: String,
}

/// Current account context returned by the nonce collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceContext {
    /// The next unreserved sequence number for the signing key.
    pub next_nonce: u64,
    #[serde(flatten)]
    pub block: BlockReference,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub access_key_info: Option<String>,
}

/// A verifiable random challenge bound to a block reference.
///
/// Substitutes for a server-issued nonce in the credential ceremony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub output: String,
    pub proof: String,
    #[serde(flatten)]
    pub block: BlockReference,
}

/// Registration-time challenge variant: the challenge plus the public key
/// derived from the bootstrap keypair that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapChallenge {
    #[serde(flatten)]
    pub challenge: Challenge,
    pub derived_public_key: String,
}

/// Platform authenticator result.
///
/// Carries the secret extension outputs used as key-derivation inputs.
/// Single-output flows need `first`; recovery needs both `first` and
/// `second`. The raw payload is opaque to the core and forwarded verbatim
/// to the external signing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub credential_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub first_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub second_output: Option<String>,
    /// Serialized authenticator response, opaque to the core.
    pub raw: serde_json::Value,
}

impl Credential {
    /// Check the secret-output precondition for key-material release.
    ///
    /// Errors name the first missing output so the caller can surface a
    /// precise message.
    pub fn require_outputs(&self, needs_second: bool) -> Result<(), ConfirmError> {
        if self.first_output.as_deref().is_none_or(str::is_empty) {
            return Err(ConfirmError::MissingSecretOutput("first"));
        }
        if needs_second && self.second_output.as_deref().is_none_or(str::is_empty) {
            return Err(ConfirmError::MissingSecretOutput("second"));
        }
        Ok(())
    }
}
