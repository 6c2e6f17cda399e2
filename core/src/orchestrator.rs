//! The per-request confirmation state machine.
//!
//! `handle` never lets an error escape across the boundary: every exit path
//! — validation failure, collaborator failure, missing secret output,
//! cancellation, confirm — produces exactly one [`ConfirmationResult`].
//!
//! Flow order is load-bearing: sequence numbers are reserved *before* any
//! user interaction so a later cancel has something to roll back, and they
//! are released *before* any error is surfaced so no exit path leaks them.

use std::sync::Arc;

use sigil_transport::CancelSignal;

use sigil_types::{
    BlockReference, Challenge, ConfirmBehavior, ConfirmError, ConfirmationConfig,
    ConfirmationKind, ConfirmationRequest, ConfirmationResult, Credential, ProgressPhase,
    SigningContext,
};

use crate::reservation::NonceReservation;
use crate::traits::{
    ChallengeWorker, ConfigSource, ConfirmationSurface, CredentialPrompt, Decision, NonceManager,
    ProgressSink,
};

/// The collaborator set the orchestrator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub nonce: Arc<dyn NonceManager>,
    pub challenge: Arc<dyn ChallengeWorker>,
    pub prompt: Arc<dyn CredentialPrompt>,
    pub surface: Arc<dyn ConfirmationSurface>,
    pub config: Arc<dyn ConfigSource>,
}

/// Per-request context: progress sink plus a single-fire cancellation
/// signal scoped to this request's mount point.
pub struct RequestContext {
    pub progress: Arc<dyn ProgressSink>,
    pub cancel: CancelSignal,
}

impl RequestContext {
    pub async fn emit(&self, phase: ProgressPhase) {
        self.progress.emit(phase, serde_json::Value::Null).await;
    }

    pub async fn emit_with(&self, phase: ProgressPhase, payload: serde_json::Value) {
        self.progress.emit(phase, payload).await;
    }
}

/// Await a collaborator call, discarding it if the request is cancelled.
///
/// A future dropped here may have side effects already in flight; callers
/// that hold provisional resources roll them back on the `Cancelled` path.
async fn cancellable<T>(
    cancel: &CancelSignal,
    fut: impl Future<Output = Result<T, ConfirmError>>,
) -> Result<T, ConfirmError> {
    tokio::select! {
        () = cancel.cancelled() => Err(ConfirmError::Cancelled),
        out = fut => out,
    }
}

/// Drives confirmation flows against the collaborator set.
///
/// Instances are cheap to share; concurrent `handle` calls are independent,
/// each scoped to its own [`RequestContext`].
pub struct Orchestrator {
    collab: Collaborators,
}

impl Orchestrator {
    #[must_use]
    pub fn new(collab: Collaborators) -> Self {
        Self { collab }
    }

    /// Run one confirmation request to its terminal result.
    ///
    /// Accepts the raw envelope so that validation failures are results,
    /// not errors: the caller always gets exactly one result back.
    pub async fn handle(
        &self,
        raw: serde_json::Value,
        ctx: &RequestContext,
    ) -> ConfirmationResult {
        let request = match ConfirmationRequest::parse(raw) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("rejected confirmation request: {e}");
                ctx.emit_with(
                    ProgressPhase::Error,
                    serde_json::json!({ "error": e.to_string() }),
                )
                .await;
                return e.to_result();
            }
        };

        tracing::info!(
            request_id = %request.request_id,
            kind = request.kind.type_tag(),
            "confirmation flow started"
        );

        match self.run(&request, ctx).await {
            Ok(result) => {
                tracing::info!(request_id = %request.request_id, "confirmation flow confirmed");
                ctx.emit(ProgressPhase::Complete).await;
                result
            }
            Err(e) if e.is_cancellation() => {
                tracing::info!(request_id = %request.request_id, "confirmation flow cancelled");
                ctx.emit(ProgressPhase::Complete).await;
                e.to_result()
            }
            Err(e) => {
                tracing::warn!(request_id = %request.request_id, "confirmation flow failed: {e}");
                ctx.emit_with(
                    ProgressPhase::Error,
                    serde_json::json!({ "error": e.to_string() }),
                )
                .await;
                e.to_result()
            }
        }
    }

    async fn run(
        &self,
        request: &ConfirmationRequest,
        ctx: &RequestContext,
    ) -> Result<ConfirmationResult, ConfirmError> {
        ctx.emit(ProgressPhase::ReadingConfig).await;
        let config = self.collab.config.confirmation_config().await.normalized();
        if config.behavior == ConfirmBehavior::AutoProceed {
            tracing::debug!(request_id = %request.request_id, "auto-proceed behavior active");
        }

        match &request.kind {
            ConfirmationKind::SignTransaction { tx_requests } => {
                self.run_sign(request, tx_requests.len(), &config, ctx).await
            }
            ConfirmationKind::RegisterAccount { account_id, .. } => {
                self.run_register(request, account_id, &config, ctx).await
            }
            ConfirmationKind::RecoverKeypair { .. } => {
                self.run_recover(request, &config, ctx).await
            }
            ConfirmationKind::ShowSecurePrivateKeyUi { .. } => {
                self.run_viewer(request, &config, ctx).await
            }
        }
    }

    /// SIGN_TRANSACTION: reserve one sequence number per sub-request before
    /// any user interaction, roll back on every non-confirm exit.
    async fn run_sign(
        &self,
        request: &ConfirmationRequest,
        sub_requests: usize,
        config: &ConfirmationConfig,
        ctx: &RequestContext,
    ) -> Result<ConfirmationResult, ConfirmError> {
        ctx.emit(ProgressPhase::AcquiringContext).await;
        let nonce_ctx = cancellable(&ctx.cancel, self.collab.nonce.get_context()).await?;

        if ctx.cancel.is_cancelled() {
            return Err(ConfirmError::Cancelled);
        }
        ctx.emit_with(
            ProgressPhase::ReservingNonces,
            serde_json::json!({ "count": sub_requests }),
        )
        .await;
        // Reservation is not raced against cancellation: it either fully
        // happens (and is tracked for rollback) or fully fails.
        let nonces = self.collab.nonce.reserve(sub_requests).await?;
        let mut reservation = NonceReservation::new(request.request_id, nonces);

        let authorized = self
            .authorize(request, &nonce_ctx.block, config, ctx, false)
            .await;

        match authorized {
            Ok((credential, challenge)) => {
                let reserved_nonces = reservation.consume();
                Ok(ConfirmationResult::confirmed(SigningContext {
                    credential,
                    challenge,
                    reserved_nonces,
                    block: nonce_ctx.block,
                }))
            }
            Err(e) => {
                // Release the full reserved multiset before the error (or
                // the decline) becomes visible to anyone.
                if let Err(release_err) = reservation.release_all(&*self.collab.nonce).await {
                    tracing::warn!(
                        request_id = %request.request_id,
                        "rollback incomplete: {release_err}"
                    );
                }
                Err(e)
            }
        }
    }

    /// REGISTER_ACCOUNT: bootstrap challenge + registration ceremony.
    /// No reservation — registration signs nothing of its own.
    async fn run_register(
        &self,
        request: &ConfirmationRequest,
        account_id: &str,
        config: &ConfirmationConfig,
        ctx: &RequestContext,
    ) -> Result<ConfirmationResult, ConfirmError> {
        ctx.emit(ProgressPhase::AcquiringContext).await;
        let nonce_ctx = cancellable(&ctx.cancel, self.collab.nonce.get_context()).await?;

        ctx.emit(ProgressPhase::GeneratingChallenge).await;
        let bootstrap = cancellable(
            &ctx.cancel,
            self.collab.challenge.generate_bootstrap_challenge(account_id),
        )
        .await?;

        ctx.emit(ProgressPhase::AwaitingCredential).await;
        let credential = cancellable(&ctx.cancel, self.collab.prompt.register()).await?;
        credential.require_outputs(false)?;

        self.await_decision(request, config, ctx).await?;
        ctx.emit(ProgressPhase::Authorizing).await;

        Ok(ConfirmationResult::confirmed(SigningContext {
            credential,
            challenge: bootstrap.challenge,
            reserved_nonces: Vec::new(),
            block: nonce_ctx.block,
        }))
    }

    /// RECOVER_KEYPAIR: authentication ceremony requiring both secret
    /// outputs. No reservation.
    async fn run_recover(
        &self,
        request: &ConfirmationRequest,
        config: &ConfirmationConfig,
        ctx: &RequestContext,
    ) -> Result<ConfirmationResult, ConfirmError> {
        ctx.emit(ProgressPhase::AcquiringContext).await;
        let nonce_ctx = cancellable(&ctx.cancel, self.collab.nonce.get_context()).await?;

        let (credential, challenge) = self
            .authorize(request, &nonce_ctx.block, config, ctx, true)
            .await?;

        Ok(ConfirmationResult::confirmed(SigningContext {
            credential,
            challenge,
            reserved_nonces: Vec::new(),
            block: nonce_ctx.block,
        }))
    }

    /// SHOW_SECURE_PRIVATE_KEY_UI: the sticky flow. On confirm the viewer
    /// is mounted and left mounted — its lifecycle belongs to the surface.
    async fn run_viewer(
        &self,
        request: &ConfirmationRequest,
        config: &ConfirmationConfig,
        ctx: &RequestContext,
    ) -> Result<ConfirmationResult, ConfirmError> {
        ctx.emit(ProgressPhase::AwaitingCredential).await;
        let credential = cancellable(&ctx.cancel, self.collab.prompt.authenticate()).await?;
        credential.require_outputs(false)?;

        self.await_decision(request, config, ctx).await?;

        ctx.emit(ProgressPhase::Authorizing).await;
        self.collab.surface.mount_viewer(request).await;

        Ok(ConfirmationResult::confirmed_without_context())
    }

    /// Challenge + credential ceremony + decision wait, shared by the
    /// signing and recovery flows.
    async fn authorize(
        &self,
        request: &ConfirmationRequest,
        block: &BlockReference,
        config: &ConfirmationConfig,
        ctx: &RequestContext,
        needs_second_output: bool,
    ) -> Result<(Credential, Challenge), ConfirmError> {
        ctx.emit(ProgressPhase::GeneratingChallenge).await;
        let challenge =
            cancellable(&ctx.cancel, self.collab.challenge.generate_challenge(block)).await?;

        ctx.emit(ProgressPhase::AwaitingCredential).await;
        let credential = cancellable(&ctx.cancel, self.collab.prompt.authenticate()).await?;
        credential.require_outputs(needs_second_output)?;

        self.await_decision(request, config, ctx).await?;
        ctx.emit(ProgressPhase::Authorizing).await;

        Ok((credential, challenge))
    }

    /// Race the three decision outcomes: explicit confirm, explicit cancel
    /// (surface event or request signal), and the auto-proceed countdown.
    async fn await_decision(
        &self,
        request: &ConfirmationRequest,
        config: &ConfirmationConfig,
        ctx: &RequestContext,
    ) -> Result<(), ConfirmError> {
        if !config.requires_decision() {
            return if ctx.cancel.is_cancelled() {
                Err(ConfirmError::Cancelled)
            } else {
                Ok(())
            };
        }

        self.collab.surface.mount(request, config).await;
        ctx.emit_with(
            ProgressPhase::AwaitingDecision,
            serde_json::json!({ "summary": request.summary }),
        )
        .await;

        let delay = config.auto_proceed_delay;
        let outcome = tokio::select! {
            decision = self.collab.surface.decision() => match decision {
                Decision::Confirmed => Ok(()),
                Decision::Cancelled => Err(ConfirmError::Cancelled),
            },
            () = ctx.cancel.cancelled() => Err(ConfirmError::Cancelled),
            // Countdown elapsing counts as confirm.
            () = tokio::time::sleep(std::time::Duration::from_millis(delay.unwrap_or(0))),
                if delay.is_some() => Ok(()),
        };

        if !request.kind.is_sticky() {
            self.collab.surface.unmount().await;
        }
        outcome
    }
}
