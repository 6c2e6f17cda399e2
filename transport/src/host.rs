//! Isolated-side host: executes actions and guarantees terminal delivery.
//!
//! Every accepted action produces exactly one `PM_RESULT` frame, on every
//! code path including handler panics. Progress frames are funneled through
//! the same outbound channel ahead of the terminal, and the per-request
//! emitter disarms itself once the terminal is sent so a leaked clone (a
//! sticky surface, a stray task) can never violate the ordering contract.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use sigil_types::{ProgressEvent, ProgressPhase, RequestId};

use crate::cancel::{CancelSignal, CancelSource};
use crate::wire::WireMessage;

/// Executes one action on behalf of the host.
///
/// `Ok` and `Err` both become terminal frames — an `Err` here means the
/// action itself could not run (unknown action, malformed glue), not that
/// the domain operation failed. Domain failures travel inside the `Ok`
/// payload.
#[async_trait]
pub trait ActionHandler: Send + Sync + 'static {
    async fn handle(
        &self,
        action: &str,
        payload: serde_json::Value,
        ctx: HandlerContext,
    ) -> Result<serde_json::Value, String>;
}

/// Per-request context handed to the handler.
pub struct HandlerContext {
    pub request_id: RequestId,
    pub progress: ProgressEmitter,
    /// Fires when the host shuts down or the embedder cancels.
    pub cancel: CancelSignal,
}

/// Sends progress frames for one request.
///
/// Cheap to clone; all clones share the disarm flag.
#[derive(Clone)]
pub struct ProgressEmitter {
    request_id: RequestId,
    outbound_tx: mpsc::Sender<WireMessage>,
    terminal_sent: Arc<AtomicBool>,
}

impl ProgressEmitter {
    fn new(request_id: RequestId, outbound_tx: mpsc::Sender<WireMessage>) -> Self {
        Self {
            request_id,
            outbound_tx,
            terminal_sent: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Emit a progress event for this request.
    ///
    /// Silently dropped once the terminal has been sent.
    pub async fn emit(&self, phase: ProgressPhase, payload: serde_json::Value) {
        if self.terminal_sent.load(Ordering::Acquire) {
            tracing::debug!(
                request_id = %self.request_id,
                ?phase,
                "progress after terminal suppressed"
            );
            return;
        }
        let event = ProgressEvent::new(self.request_id, phase).with_payload(payload);
        let frame = WireMessage::Progress {
            request_id: self.request_id,
            payload: match serde_json::to_value(&event) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(request_id = %self.request_id, "unserializable progress: {e}");
                    return;
                }
            },
        };
        if self.outbound_tx.send(frame).await.is_err() {
            tracing::debug!(request_id = %self.request_id, "outbound closed, progress dropped");
        }
    }

    fn disarm(&self) {
        self.terminal_sent.store(true, Ordering::Release);
    }
}

/// Isolated-side endpoint of the boundary.
///
/// Owns the inbound receiver; `run` consumes the host and loops until the
/// transport closes.
pub struct Host<H: ActionHandler> {
    handler: Arc<H>,
    outbound_tx: mpsc::Sender<WireMessage>,
    inbound_rx: mpsc::Receiver<WireMessage>,
    cancel_root: CancelSource,
    connected: bool,
}

impl<H: ActionHandler> Host<H> {
    #[must_use]
    pub fn new(
        handler: Arc<H>,
        outbound_tx: mpsc::Sender<WireMessage>,
        inbound_rx: mpsc::Receiver<WireMessage>,
    ) -> Self {
        Self {
            handler,
            outbound_tx,
            inbound_rx,
            cancel_root: CancelSource::new(),
            connected: false,
        }
    }

    /// Source whose cancellation propagates to every in-flight request.
    #[must_use]
    pub fn cancellation_root(&self) -> CancelSource {
        self.cancel_root.clone()
    }

    /// Serve actions until the inbound channel closes.
    pub async fn run(mut self) {
        while let Some(frame) = self.inbound_rx.recv().await {
            match frame {
                WireMessage::Connect => {
                    self.connected = true;
                    if self.outbound_tx.send(WireMessage::Ready).await.is_err() {
                        tracing::warn!("outbound closed during handshake");
                        return;
                    }
                    tracing::info!("host handshake complete");
                }
                WireMessage::Action {
                    request_id,
                    action,
                    payload: _,
                } if !self.connected => {
                    tracing::warn!(request_id = %request_id, action, "action before CONNECT rejected");
                    let _ = self
                        .outbound_tx
                        .send(WireMessage::Error {
                            request_id: Some(request_id),
                            message: "action received before CONNECT".to_string(),
                        })
                        .await;
                }
                WireMessage::Action {
                    request_id,
                    action,
                    payload,
                } => {
                    self.spawn_action(request_id, action, payload);
                }
                other => {
                    tracing::debug!("host ignoring caller-bound frame: {other:?}");
                }
            }
        }
        tracing::info!("host transport closed, shutting down");
        self.cancel_root.cancel();
    }

    fn spawn_action(&self, request_id: RequestId, action: String, payload: serde_json::Value) {
        let handler = self.handler.clone();
        let outbound_tx = self.outbound_tx.clone();
        let emitter = ProgressEmitter::new(request_id, outbound_tx.clone());
        let cancel = self.cancel_root.signal();

        tokio::spawn(async move {
            let ctx = HandlerContext {
                request_id,
                progress: emitter.clone(),
                cancel,
            };

            // Run the handler in its own task so a panic is caught at the
            // join instead of silently dropping the terminal.
            let inner_action = action.clone();
            let joined = tokio::spawn(async move {
                handler.handle(&inner_action, payload, ctx).await
            })
            .await;

            let terminal = match joined {
                Ok(Ok(result)) => WireMessage::result_ok(request_id, result),
                Ok(Err(error)) => {
                    tracing::warn!(request_id = %request_id, action, "action failed: {error}");
                    WireMessage::result_err(request_id, error)
                }
                Err(join_err) => {
                    tracing::error!(request_id = %request_id, action, "handler panicked: {join_err}");
                    WireMessage::result_err(request_id, "internal error in action handler")
                }
            };

            // Progress already enqueued is ahead of this frame in the same
            // FIFO channel; disarming blocks anything after it.
            emitter.disarm();
            if outbound_tx.send(terminal).await.is_err() {
                tracing::warn!(request_id = %request_id, "outbound closed, terminal undeliverable");
            }
        });
    }
}
