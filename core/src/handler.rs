//! Glue between the transport host and the orchestrator.
//!
//! The host delivers raw action frames; this adapter routes the
//! confirmation action to the orchestrator and bridges the transport's
//! progress emitter onto the orchestrator's progress seam. Orchestrator
//! failures are *successful* transports of a `confirmed: false` result —
//! only an unknown action is a transport-level error.

use std::sync::Arc;

use async_trait::async_trait;

use sigil_transport::{ActionHandler, HandlerContext, ProgressEmitter};
use sigil_types::ProgressPhase;

use crate::orchestrator::{Orchestrator, RequestContext};
use crate::traits::ProgressSink;

/// The action tag for confirmation requests.
pub const ACTION_PROMPT_CONFIRM: &str = "PROMPT_CONFIRM";

struct EmitterSink(ProgressEmitter);

#[async_trait]
impl ProgressSink for EmitterSink {
    async fn emit(&self, phase: ProgressPhase, payload: serde_json::Value) {
        self.0.emit(phase, payload).await;
    }
}

/// [`ActionHandler`] serving `PROMPT_CONFIRM` via an [`Orchestrator`].
pub struct ConfirmHandler {
    orchestrator: Arc<Orchestrator>,
}

impl ConfirmHandler {
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl ActionHandler for ConfirmHandler {
    async fn handle(
        &self,
        action: &str,
        payload: serde_json::Value,
        ctx: HandlerContext,
    ) -> Result<serde_json::Value, String> {
        if action != ACTION_PROMPT_CONFIRM {
            return Err(format!("unknown action: {action}"));
        }

        let request_ctx = RequestContext {
            progress: Arc::new(EmitterSink(ctx.progress)),
            cancel: ctx.cancel,
        };
        let result = self.orchestrator.handle(payload, &request_ctx).await;
        serde_json::to_value(result).map_err(|e| format!("unserializable result: {e}"))
    }
}
