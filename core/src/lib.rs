//! Confirmation orchestrator: the per-request state machine that mediates
//! biometric/platform-credential authorization before key material is
//! released.
//!
//! # Architecture
//!
//! - [`Orchestrator`] drives one request through validation, context
//!   acquisition, nonce reservation, challenge generation, the credential
//!   ceremony, and the decision wait — emitting progress throughout and
//!   exactly one [`sigil_types::ConfirmationResult`] at the end.
//! - Collaborators ([`NonceManager`], [`ChallengeWorker`],
//!   [`CredentialPrompt`], [`ConfirmationSurface`], [`ConfigSource`]) are
//!   trait seams; the orchestrator owns none of the resources behind them.
//! - [`ConfirmHandler`] plugs the orchestrator into the
//!   `sigil-transport` host so the whole pipeline runs behind the
//!   CONNECT/READY boundary.
//! - [`VisibilityController`] turns the caller-side progress stream into
//!   show/hide decisions for the confirmation surface.

pub mod handler;
pub mod orchestrator;
pub mod reservation;
pub mod traits;
pub mod visibility;

pub use handler::{ACTION_PROMPT_CONFIRM, ConfirmHandler};
pub use orchestrator::{Collaborators, Orchestrator, RequestContext};
pub use reservation::NonceReservation;
pub use traits::{
    ChallengeWorker, ConfigSource, ConfirmationSurface, CredentialPrompt, Decision, NonceManager,
    ProgressSink,
};
pub use visibility::VisibilityController;
