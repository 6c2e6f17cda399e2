//! Collaborator seams consumed by the orchestrator.
//!
//! The orchestrator never owns the sequence-number pool, the challenge
//! generator, the platform authenticator, or the UI — it drives them
//! through these traits. Implementations decide their own serialization
//! discipline; the orchestrator only calls through the interface.

use async_trait::async_trait;

use sigil_types::{
    BlockReference, BootstrapChallenge, Challenge, ConfirmError, ConfirmationConfig,
    ConfirmationRequest, Credential, NonceContext,
};

/// Owner of the transaction sequence-number pool.
#[async_trait]
pub trait NonceManager: Send + Sync {
    /// Current account context: next sequence number plus block reference.
    async fn get_context(&self) -> Result<NonceContext, ConfirmError>;

    /// Reserve `count` sequence numbers, ordered. The reservation is
    /// provisional until consumed or released.
    async fn reserve(&self, count: usize) -> Result<Vec<String>, ConfirmError>;

    /// Return one sequence number to the pool. Idempotent — releasing an
    /// already-released nonce is a no-op.
    async fn release(&self, nonce: &str) -> Result<(), ConfirmError>;
}

/// Produces verifiable random challenges bound to a block reference.
#[async_trait]
pub trait ChallengeWorker: Send + Sync {
    /// Plain challenge for signing and login ceremonies.
    async fn generate_challenge(
        &self,
        block: &BlockReference,
    ) -> Result<Challenge, ConfirmError>;

    /// Registration variant: challenge from a bootstrap keypair, plus the
    /// derived public key.
    async fn generate_bootstrap_challenge(
        &self,
        input: &str,
    ) -> Result<BootstrapChallenge, ConfirmError>;
}

/// Invokes the platform authenticator.
#[async_trait]
pub trait CredentialPrompt: Send + Sync {
    /// Authentication ceremony against an existing credential.
    async fn authenticate(&self) -> Result<Credential, ConfirmError>;

    /// Registration ceremony creating a new credential.
    async fn register(&self) -> Result<Credential, ConfirmError>;
}

/// Explicit user decision from the confirmation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirmed,
    Cancelled,
}

/// The abstract confirmation UI.
///
/// The orchestrator mounts and unmounts it per request, except for sticky
/// flows whose viewer manages its own lifecycle after `mount_viewer`.
#[async_trait]
pub trait ConfirmationSurface: Send + Sync {
    async fn mount(&self, request: &ConfirmationRequest, config: &ConfirmationConfig);

    /// Resolve the next explicit user decision. May wait indefinitely; the
    /// orchestrator races this against cancellation and the auto-proceed
    /// countdown.
    async fn decision(&self) -> Decision;

    async fn unmount(&self);

    /// Mount the persistent private-key viewer. Stays mounted after the
    /// terminal result; the surface, not the orchestrator, tears it down.
    async fn mount_viewer(&self, request: &ConfirmationRequest);
}

/// External preferences collaborator. Read once per request.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn confirmation_config(&self) -> ConfirmationConfig;
}

/// Consumes the orchestrator's progress stream.
///
/// Decouples the orchestrator from the transport: the host-side glue
/// adapts this onto its wire emitter, tests collect into a vec.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn emit(&self, phase: sigil_types::ProgressPhase, payload: serde_json::Value);
}
