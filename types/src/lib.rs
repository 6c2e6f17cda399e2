//! Core domain types for Sigil.
//!
//! This crate contains pure domain types with no IO, no async, and minimal
//! dependencies. Everything here can be used from any layer: the transport,
//! the orchestrator, and embedders that only need the message contracts.

mod config;
mod credential;
mod error;
mod ids;
mod progress;
mod request;
mod result;

pub use config::{ConfirmBehavior, ConfirmationConfig, Theme, UiMode};
pub use credential::{BlockReference, BootstrapChallenge, Challenge, Credential, NonceContext};
pub use error::ConfirmError;
pub use ids::RequestId;
pub use progress::{ProgressEvent, ProgressPhase};
pub use request::{ConfirmationKind, ConfirmationRequest, SCHEMA_VERSION, TransactionSummary};
pub use result::{ConfirmationResult, SigningContext};
