//! The confirmation request envelope and its per-type payloads.
//!
//! Requests arrive as untyped JSON from the other side of the execution
//! boundary, so parsing is staged: envelope shape first (missing fields are
//! validation failures), then the type tag against the closed set (an
//! unknown tag is its own outcome, not a serde fallthrough), then the
//! per-type payload shape.

use serde::{Deserialize, Serialize};

use crate::error::ConfirmError;
use crate::ids::RequestId;

/// Wire schema version this crate understands.
pub const SCHEMA_VERSION: u32 = 2;

/// Type tags in the closed set, as they appear on the wire.
const KNOWN_TYPES: [&str; 4] = [
    "SIGN_TRANSACTION",
    "REGISTER_ACCOUNT",
    "RECOVER_KEYPAIR",
    "SHOW_SECURE_PRIVATE_KEY_UI",
];

/// One signing sub-request inside a `SIGN_TRANSACTION` flow.
///
/// Each sub-request consumes one reserved sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub receiver_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deposit: Option<String>,
}

/// Per-type request payloads — a closed tagged union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationKind {
    /// Authorize signing of one or more transactions.
    SignTransaction { tx_requests: Vec<TransactionSummary> },
    /// Register a new account with a fresh credential ceremony.
    RegisterAccount {
        account_id: String,
        device_number: Option<u8>,
    },
    /// Recover a keypair from an existing credential. Requires both
    /// secret extension outputs.
    RecoverKeypair { account_id: String },
    /// Reveal the private key in a persistent viewer. The one sticky flow:
    /// its surface outlives the terminal result.
    ShowSecurePrivateKeyUi {
        account_id: String,
        public_key: String,
    },
}

impl ConfirmationKind {
    /// The wire tag for this kind.
    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::SignTransaction { .. } => "SIGN_TRANSACTION",
            Self::RegisterAccount { .. } => "REGISTER_ACCOUNT",
            Self::RecoverKeypair { .. } => "RECOVER_KEYPAIR",
            Self::ShowSecurePrivateKeyUi { .. } => "SHOW_SECURE_PRIVATE_KEY_UI",
        }
    }

    /// Number of sequence numbers this flow must reserve before any user
    /// interaction. Zero for flows that never sign.
    #[must_use]
    pub fn reservation_count(&self) -> usize {
        match self {
            Self::SignTransaction { tx_requests } => tx_requests.len(),
            Self::RegisterAccount { .. }
            | Self::RecoverKeypair { .. }
            | Self::ShowSecurePrivateKeyUi { .. } => 0,
        }
    }

    /// Whether the credential must expose the second secret output.
    #[must_use]
    pub fn needs_second_output(&self) -> bool {
        matches!(self, Self::RecoverKeypair { .. })
    }

    /// Whether this flow's surface stays mounted after the terminal result.
    #[must_use]
    pub fn is_sticky(&self) -> bool {
        matches!(self, Self::ShowSecurePrivateKeyUi { .. })
    }
}

/// A validated confirmation request. Immutable once dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub schema_version: u32,
    pub request_id: RequestId,
    pub kind: ConfirmationKind,
    pub summary: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    schema_version: Option<u32>,
    request_id: Option<RequestId>,
    #[serde(rename = "type")]
    type_tag: Option<String>,
    payload: Option<serde_json::Value>,
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignTransactionPayload {
    tx_requests: Vec<TransactionSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterAccountPayload {
    account_id: String,
    #[serde(default)]
    device_number: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecoverKeypairPayload {
    account_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShowPrivateKeyPayload {
    account_id: String,
    public_key: String,
}

fn payload_of<T: serde::de::DeserializeOwned>(
    tag: &str,
    payload: serde_json::Value,
) -> Result<T, ConfirmError> {
    serde_json::from_value(payload)
        .map_err(|e| ConfirmError::Validation(format!("malformed {tag} payload: {e}")))
}

impl ConfirmationRequest {
    /// Parse and validate a raw request envelope.
    ///
    /// Staged: shape errors come back as `Validation`, an unknown type tag
    /// as `UnsupportedType`, and only a fully valid envelope produces a
    /// request.
    pub fn parse(value: serde_json::Value) -> Result<Self, ConfirmError> {
        let envelope: Envelope = serde_json::from_value(value)
            .map_err(|e| ConfirmError::Validation(format!("malformed envelope: {e}")))?;

        let schema_version = envelope
            .schema_version
            .ok_or_else(|| ConfirmError::Validation("missing schemaVersion".to_string()))?;
        if schema_version != SCHEMA_VERSION {
            return Err(ConfirmError::Validation(format!(
                "unsupported schemaVersion {schema_version}, expected {SCHEMA_VERSION}"
            )));
        }

        let request_id = envelope
            .request_id
            .ok_or_else(|| ConfirmError::Validation("missing requestId".to_string()))?;

        let type_tag = envelope
            .type_tag
            .ok_or_else(|| ConfirmError::Validation("missing type".to_string()))?;

        let payload = match envelope.payload {
            Some(p) if !p.is_null() => p,
            _ => return Err(ConfirmError::Validation("missing payload".to_string())),
        };

        if !KNOWN_TYPES.contains(&type_tag.as_str()) {
            return Err(ConfirmError::UnsupportedType(type_tag));
        }

        let kind = match type_tag.as_str() {
            "SIGN_TRANSACTION" => {
                let p: SignTransactionPayload = payload_of(&type_tag, payload)?;
                if p.tx_requests.is_empty() {
                    return Err(ConfirmError::Validation(
                        "SIGN_TRANSACTION requires at least one txRequest".to_string(),
                    ));
                }
                ConfirmationKind::SignTransaction {
                    tx_requests: p.tx_requests,
                }
            }
            "REGISTER_ACCOUNT" => {
                let p: RegisterAccountPayload = payload_of(&type_tag, payload)?;
                ConfirmationKind::RegisterAccount {
                    account_id: p.account_id,
                    device_number: p.device_number,
                }
            }
            "RECOVER_KEYPAIR" => {
                let p: RecoverKeypairPayload = payload_of(&type_tag, payload)?;
                ConfirmationKind::RecoverKeypair {
                    account_id: p.account_id,
                }
            }
            "SHOW_SECURE_PRIVATE_KEY_UI" => {
                let p: ShowPrivateKeyPayload = payload_of(&type_tag, payload)?;
                ConfirmationKind::ShowSecurePrivateKeyUi {
                    account_id: p.account_id,
                    public_key: p.public_key,
                }
            }
            // KNOWN_TYPES membership was checked above.
            other => return Err(ConfirmError::UnsupportedType(other.to_string())),
        };

        Ok(Self {
            schema_version,
            request_id,
            kind,
            summary: envelope.summary,
        })
    }
}
