//! Caller-side router: pending-request registry and terminal resolution.
//!
//! The registry is scoped to the `Router` instance, never a module global,
//! so multiple routers (one per test, one per embedder frame) never share
//! state. A single reader task dispatches inbound frames; FIFO channels
//! give the ordering guarantee that progress for an id precedes and never
//! follows that id's terminal.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, mpsc, oneshot};

use sigil_types::{ProgressEvent, RequestId};

use crate::wire::WireMessage;

/// Transport-level failures surfaced to the caller.
///
/// Distinct from orchestrator-level cancellation: a timeout or disconnect
/// means the transport gave up, not that the user declined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    #[error("router is not connected (handshake incomplete)")]
    NotConnected,
    #[error("no terminal message within the deadline")]
    Timeout,
    #[error("transport disconnected with requests outstanding")]
    Disconnected,
    #[error("outbound channel closed")]
    ChannelClosed,
}

/// The terminal payload for a request, as reported by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterOutcome {
    Ok(serde_json::Value),
    Err(String),
}

#[derive(Debug)]
struct PendingEntry {
    result_tx: oneshot::Sender<Result<RouterOutcome, RouterError>>,
    progress_tx: mpsc::UnboundedSender<ProgressEvent>,
}

type PendingMap = Arc<Mutex<HashMap<RequestId, PendingEntry>>>;

/// Caller-side endpoint of the boundary.
#[derive(Debug)]
pub struct Router {
    outbound_tx: mpsc::Sender<WireMessage>,
    pending: PendingMap,
    default_deadline: Duration,
    #[allow(dead_code)]
    reader_handle: tokio::task::JoinHandle<()>,
}

/// An in-flight request: a consumable progress stream plus the awaitable
/// terminal outcome.
pub struct PendingRequest {
    request_id: RequestId,
    deadline: Duration,
    progress_rx: mpsc::UnboundedReceiver<ProgressEvent>,
    result_rx: oneshot::Receiver<Result<RouterOutcome, RouterError>>,
    pending: PendingMap,
}

impl Router {
    /// Perform the CONNECT/READY handshake over the given channel pair and
    /// return a connected router.
    ///
    /// No action frame is sent before READY arrives; a handshake that does
    /// not complete within `handshake_timeout` fails with
    /// [`RouterError::Timeout`].
    pub async fn connect(
        outbound_tx: mpsc::Sender<WireMessage>,
        inbound_rx: mpsc::Receiver<WireMessage>,
        handshake_timeout: Duration,
        default_deadline: Duration,
    ) -> Result<Self, RouterError> {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (ready_tx, ready_rx) = oneshot::channel();

        let reader_pending = pending.clone();
        let reader_handle =
            tokio::spawn(Self::read_loop(inbound_rx, reader_pending, Some(ready_tx)));

        outbound_tx
            .send(WireMessage::Connect)
            .await
            .map_err(|_| RouterError::ChannelClosed)?;

        match tokio::time::timeout(handshake_timeout, ready_rx).await {
            Ok(Ok(())) => Ok(Self {
                outbound_tx,
                pending,
                default_deadline,
                reader_handle,
            }),
            // Transport closed before READY ever arrived.
            Ok(Err(_)) => Err(RouterError::NotConnected),
            Err(_) => Err(RouterError::Timeout),
        }
    }

    /// Dispatch an action to the host and register a pending entry for it.
    ///
    /// The returned [`PendingRequest`] owns the progress stream and the
    /// terminal future; dropping it abandons the request (a later terminal
    /// is dropped by the reader).
    pub async fn request(
        &self,
        action: &str,
        payload: serde_json::Value,
    ) -> Result<PendingRequest, RouterError> {
        let request_id = RequestId::generate();
        let (result_tx, result_rx) = oneshot::channel();
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();

        self.pending.lock().await.insert(
            request_id,
            PendingEntry {
                result_tx,
                progress_tx,
            },
        );

        let frame = WireMessage::Action {
            request_id,
            action: action.to_string(),
            payload,
        };
        if self.outbound_tx.send(frame).await.is_err() {
            // Failed to enqueue: don't leak the pending entry.
            self.pending.lock().await.remove(&request_id);
            return Err(RouterError::ChannelClosed);
        }

        Ok(PendingRequest {
            request_id,
            deadline: self.default_deadline,
            progress_rx,
            result_rx,
            pending: self.pending.clone(),
        })
    }

    /// Number of requests still awaiting a terminal.
    pub async fn outstanding(&self) -> usize {
        self.pending.lock().await.len()
    }

    async fn read_loop(
        mut inbound_rx: mpsc::Receiver<WireMessage>,
        pending: PendingMap,
        mut ready_tx: Option<oneshot::Sender<()>>,
    ) {
        while let Some(frame) = inbound_rx.recv().await {
            match frame {
                WireMessage::Ready => {
                    if let Some(tx) = ready_tx.take() {
                        let _ = tx.send(());
                    } else {
                        tracing::debug!("duplicate READY ignored");
                    }
                }
                WireMessage::Progress {
                    request_id,
                    payload,
                } => {
                    let guard = pending.lock().await;
                    match guard.get(&request_id) {
                        Some(entry) => match serde_json::from_value::<ProgressEvent>(payload) {
                            Ok(event) => {
                                let _ = entry.progress_tx.send(event);
                            }
                            Err(e) => {
                                tracing::warn!(request_id = %request_id, "malformed progress frame: {e}");
                            }
                        },
                        None => {
                            tracing::debug!(
                                request_id = %request_id,
                                "progress for unknown or completed request dropped"
                            );
                        }
                    }
                }
                WireMessage::PmResult {
                    request_id,
                    ok,
                    result,
                    error,
                } => {
                    let outcome = if ok {
                        RouterOutcome::Ok(result.unwrap_or(serde_json::Value::Null))
                    } else {
                        RouterOutcome::Err(error.unwrap_or_else(|| "unknown host error".to_string()))
                    };
                    Self::resolve(&pending, request_id, Ok(outcome)).await;
                }
                WireMessage::Error {
                    request_id: Some(request_id),
                    message,
                } => {
                    Self::resolve(&pending, request_id, Ok(RouterOutcome::Err(message))).await;
                }
                WireMessage::Error {
                    request_id: None,
                    message,
                } => {
                    tracing::warn!("host error outside request context: {message}");
                }
                WireMessage::Connect | WireMessage::Action { .. } => {
                    tracing::warn!("caller-bound channel received a host-bound frame, ignoring");
                }
            }
        }

        // Transport gone: reject everything still outstanding.
        let mut guard = pending.lock().await;
        let count = guard.len();
        if count > 0 {
            tracing::warn!(count, "transport disconnected with requests outstanding");
        }
        for (_, entry) in guard.drain() {
            let _ = entry.result_tx.send(Err(RouterError::Disconnected));
        }
    }

    /// Deliver a terminal for `request_id`, if it is still pending.
    ///
    /// A second terminal for the same id finds no entry and is dropped —
    /// at-most-one terminal delivery.
    async fn resolve(
        pending: &PendingMap,
        request_id: RequestId,
        outcome: Result<RouterOutcome, RouterError>,
    ) {
        match pending.lock().await.remove(&request_id) {
            Some(entry) => {
                let _ = entry.result_tx.send(outcome);
            }
            None => {
                tracing::debug!(
                    request_id = %request_id,
                    "late or duplicate terminal dropped"
                );
            }
        }
    }
}

impl PendingRequest {
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.request_id
    }

    /// Receive the next progress event, or `None` once the stream is done.
    pub async fn next_progress(&mut self) -> Option<ProgressEvent> {
        self.progress_rx.recv().await
    }

    /// Drain progress events that have already arrived, without waiting.
    pub fn drain_progress(&mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.progress_rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Take the progress stream, leaving the terminal awaitable behind.
    ///
    /// Lets a visibility controller consume progress independently of the
    /// task awaiting the result.
    pub fn take_progress_stream(&mut self) -> mpsc::UnboundedReceiver<ProgressEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(tx);
        std::mem::replace(&mut self.progress_rx, rx)
    }

    /// Await the terminal outcome, subject to the router's deadline.
    ///
    /// On timeout the pending entry is discarded so a late terminal is
    /// dropped rather than delivered.
    pub async fn wait(self) -> Result<RouterOutcome, RouterError> {
        let Self {
            request_id,
            deadline,
            result_rx,
            pending,
            ..
        } = self;

        match tokio::time::timeout(deadline, result_rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(RouterError::Disconnected),
            Err(_) => {
                pending.lock().await.remove(&request_id);
                tracing::warn!(request_id = %request_id, "request deadline elapsed");
                Err(RouterError::Timeout)
            }
        }
    }
}
