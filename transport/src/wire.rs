//! Wire frames crossing the execution boundary.
//!
//! Frames are serde-tagged so the same contract holds whether the boundary
//! is an in-process channel pair (tests, embedders) or a serialized
//! postMessage-style pipe.

use serde::{Deserialize, Serialize};

use sigil_types::RequestId;

/// One frame on the boundary channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum WireMessage {
    /// Caller → host: open the session.
    Connect,
    /// Host → caller: ready to accept actions.
    Ready,
    /// Caller → host: run `action` with `payload`.
    Action {
        request_id: RequestId,
        action: String,
        payload: serde_json::Value,
    },
    /// Host → caller: non-terminal progress for a request.
    Progress {
        request_id: RequestId,
        payload: serde_json::Value,
    },
    /// Host → caller: the terminal frame for a request.
    PmResult {
        request_id: RequestId,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        result: Option<serde_json::Value>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        error: Option<String>,
    },
    /// Host → caller: failure outside (or instead of) a request context.
    Error {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        request_id: Option<RequestId>,
        message: String,
    },
}

impl WireMessage {
    /// Build a successful terminal frame.
    #[must_use]
    pub fn result_ok(request_id: RequestId, result: serde_json::Value) -> Self {
        Self::PmResult {
            request_id,
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    /// Build a failed terminal frame.
    #[must_use]
    pub fn result_err(request_id: RequestId, error: impl Into<String>) -> Self {
        Self::PmResult {
            request_id,
            ok: false,
            result: None,
            error: Some(error.into()),
        }
    }
}
