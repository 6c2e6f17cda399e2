//! Progress events emitted while a confirmation flow runs.
//!
//! Zero or more per request, always strictly before that request's terminal
//! result. The visibility controller keys its show/hide heuristic off the
//! phase tag, so the tag set is closed.

use serde::{Deserialize, Serialize};

use crate::ids::RequestId;

/// Where in the flow a request currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressPhase {
    ReadingConfig,
    AcquiringContext,
    ReservingNonces,
    GeneratingChallenge,
    /// The platform authenticator is (about to be) showing its own prompt.
    AwaitingCredential,
    /// The confirmation surface is waiting for an explicit decision.
    AwaitingDecision,
    Authorizing,
    Complete,
    Error,
}

impl ProgressPhase {
    /// Phases during which the user must act on the confirmation surface.
    #[must_use]
    pub fn requires_user_activation(self) -> bool {
        matches!(self, Self::AwaitingCredential | Self::AwaitingDecision)
    }

    /// Whether this phase terminates the progress stream's useful life.
    #[must_use]
    pub fn is_final(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// One progress notification for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub request_id: RequestId,
    pub phase: ProgressPhase,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ProgressEvent {
    #[must_use]
    pub fn new(request_id: RequestId, phase: ProgressPhase) -> Self {
        Self {
            request_id,
            phase,
            payload: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}
