//! Cross-boundary request/response/progress transport.
//!
//! The caller side ([`Router`]) and the isolated side ([`Host`]) exchange
//! [`WireMessage`] frames over a duplex pair of channels. The contract:
//!
//! - A CONNECT/READY handshake completes before any action is accepted.
//! - Every action receives exactly one terminal frame on every code path,
//!   including handler panics — silent drops are structurally impossible.
//! - Any number of progress frames may precede the terminal, delivered in
//!   emission order, never after the terminal.
//! - Router-side timeouts and transport loss reject the caller's pending
//!   request directly; a late terminal for a discarded id is dropped.

pub mod cancel;
pub mod host;
pub mod router;
pub mod wire;

pub use cancel::{CancelSignal, CancelSource};
pub use host::{ActionHandler, HandlerContext, Host, ProgressEmitter};
pub use router::{PendingRequest, Router, RouterError, RouterOutcome};
pub use wire::WireMessage;

/// Create a connected pair of channel endpoints for the boundary.
///
/// Returns `(caller_side, host_side)` where each side is a
/// `(sender, receiver)` pair wired to the other.
#[must_use]
pub fn boundary_channels(
    capacity: usize,
) -> (
    (
        tokio::sync::mpsc::Sender<WireMessage>,
        tokio::sync::mpsc::Receiver<WireMessage>,
    ),
    (
        tokio::sync::mpsc::Sender<WireMessage>,
        tokio::sync::mpsc::Receiver<WireMessage>,
    ),
) {
    let (caller_tx, host_rx) = tokio::sync::mpsc::channel(capacity);
    let (host_tx, caller_rx) = tokio::sync::mpsc::channel(capacity);
    ((caller_tx, caller_rx), (host_tx, host_rx))
}
