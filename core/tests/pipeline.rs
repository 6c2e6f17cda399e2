//! End-to-end pipeline tests: Router → Host → ConfirmHandler → Orchestrator,
//! with the visibility controller consuming the caller-side progress stream.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use sigil_core::{
    ACTION_PROMPT_CONFIRM, ChallengeWorker, Collaborators, ConfigSource, ConfirmHandler,
    ConfirmationSurface, CredentialPrompt, Decision, NonceManager, Orchestrator,
    VisibilityController,
};
use sigil_transport::{Host, Router, RouterError, RouterOutcome, boundary_channels};
use sigil_types::{
    BlockReference, BootstrapChallenge, Challenge, ConfirmBehavior, ConfirmError,
    ConfirmationConfig, ConfirmationRequest, ConfirmationResult, Credential, NonceContext,
    ProgressPhase, RequestId, SCHEMA_VERSION, Theme, UiMode,
};

const DEADLINE: Duration = Duration::from_secs(2);

// ── Mock collaborators ──────────────────────────────────────────────────

struct PoolNonce {
    base: u64,
    released: Mutex<Vec<String>>,
}

#[async_trait]
impl NonceManager for PoolNonce {
    async fn get_context(&self) -> Result<NonceContext, ConfirmError> {
        Ok(NonceContext {
            next_nonce: self.base,
            block: BlockReference {
                block_height: 77,
                block_hash: "pipeline-block".to_string(),
            },
            access_key_info: None,
        })
    }

    async fn reserve(&self, count: usize) -> Result<Vec<String>, ConfirmError> {
        Ok((1..=count as u64).map(|i| (self.base + i).to_string()).collect())
    }

    async fn release(&self, nonce: &str) -> Result<(), ConfirmError> {
        self.released.lock().unwrap().push(nonce.to_string());
        Ok(())
    }
}

struct StaticChallenge;

#[async_trait]
impl ChallengeWorker for StaticChallenge {
    async fn generate_challenge(&self, block: &BlockReference) -> Result<Challenge, ConfirmError> {
        Ok(Challenge {
            output: "out".to_string(),
            proof: "proof".to_string(),
            block: block.clone(),
        })
    }

    async fn generate_bootstrap_challenge(
        &self,
        input: &str,
    ) -> Result<BootstrapChallenge, ConfirmError> {
        Ok(BootstrapChallenge {
            challenge: Challenge {
                output: format!("boot:{input}"),
                proof: "proof".to_string(),
                block: BlockReference {
                    block_height: 77,
                    block_hash: "pipeline-block".to_string(),
                },
            },
            derived_public_key: "ed25519:derived".to_string(),
        })
    }
}

struct StaticPrompt;

#[async_trait]
impl CredentialPrompt for StaticPrompt {
    async fn authenticate(&self) -> Result<Credential, ConfirmError> {
        Ok(Credential {
            credential_id: "cred".to_string(),
            first_output: Some("prf-1".to_string()),
            second_output: Some("prf-2".to_string()),
            raw: serde_json::json!({}),
        })
    }

    async fn register(&self) -> Result<Credential, ConfirmError> {
        self.authenticate().await
    }
}

#[derive(Default)]
struct ScriptedSurface {
    decisions: Mutex<VecDeque<Decision>>,
    viewer_mounted: Mutex<bool>,
}

#[async_trait]
impl ConfirmationSurface for ScriptedSurface {
    async fn mount(&self, _request: &ConfirmationRequest, _config: &ConfirmationConfig) {}

    async fn decision(&self) -> Decision {
        let queued = self.decisions.lock().unwrap().pop_front();
        match queued {
            Some(decision) => decision,
            None => std::future::pending().await,
        }
    }

    async fn unmount(&self) {}

    async fn mount_viewer(&self, _request: &ConfirmationRequest) {
        *self.viewer_mounted.lock().unwrap() = true;
    }
}

struct AutoProceedConfig;

#[async_trait]
impl ConfigSource for AutoProceedConfig {
    async fn confirmation_config(&self) -> ConfirmationConfig {
        ConfirmationConfig {
            ui_mode: UiMode::Modal,
            behavior: ConfirmBehavior::AutoProceed,
            auto_proceed_delay: None,
            theme: Theme::Dark,
        }
    }
}

struct RequireClickConfig;

#[async_trait]
impl ConfigSource for RequireClickConfig {
    async fn confirmation_config(&self) -> ConfirmationConfig {
        ConfirmationConfig {
            ui_mode: UiMode::Modal,
            behavior: ConfirmBehavior::RequireClick,
            auto_proceed_delay: None,
            theme: Theme::Dark,
        }
    }
}

// ── Harness ─────────────────────────────────────────────────────────────

struct Pipeline {
    router: Router,
    surface: Arc<ScriptedSurface>,
    nonce: Arc<PoolNonce>,
}

async fn pipeline(surface: ScriptedSurface, config: impl ConfigSource + 'static) -> Pipeline {
    let nonce = Arc::new(PoolNonce {
        base: 300,
        released: Mutex::new(Vec::new()),
    });
    let surface = Arc::new(surface);

    let orchestrator = Arc::new(Orchestrator::new(Collaborators {
        nonce: nonce.clone(),
        challenge: Arc::new(StaticChallenge),
        prompt: Arc::new(StaticPrompt),
        surface: surface.clone(),
        config: Arc::new(config),
    }));

    let ((caller_tx, caller_rx), (host_tx, host_rx)) = boundary_channels(32);
    let host = Host::new(Arc::new(ConfirmHandler::new(orchestrator)), host_tx, host_rx);
    tokio::spawn(host.run());

    let router = Router::connect(caller_tx, caller_rx, DEADLINE, DEADLINE)
        .await
        .expect("handshake");

    Pipeline {
        router,
        surface,
        nonce,
    }
}

fn sign_envelope() -> serde_json::Value {
    serde_json::json!({
        "schemaVersion": SCHEMA_VERSION,
        "requestId": RequestId::generate(),
        "type": "SIGN_TRANSACTION",
        "payload": { "txRequests": [{ "receiverId": "shop.example" }] },
        "summary": "pipeline transfer"
    })
}

fn parse_result(outcome: RouterOutcome) -> ConfirmationResult {
    match outcome {
        RouterOutcome::Ok(value) => serde_json::from_value(value).expect("result shape"),
        RouterOutcome::Err(e) => panic!("transport-level error: {e}"),
    }
}

// ── Tests ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sign_flow_confirms_end_to_end() {
    let p = pipeline(ScriptedSurface::default(), AutoProceedConfig).await;

    let pending = p
        .router
        .request(ACTION_PROMPT_CONFIRM, sign_envelope())
        .await
        .unwrap();
    let result = parse_result(pending.wait().await.unwrap());

    assert!(result.confirmed);
    let ctx = result.signing_context.unwrap();
    assert_eq!(ctx.reserved_nonces, vec!["301".to_string()]);
    assert_eq!(ctx.block.block_hash, "pipeline-block");
    assert!(p.nonce.released.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_cancel_crosses_boundary_as_plain_decline() {
    let surface = ScriptedSurface::default();
    surface.decisions.lock().unwrap().push_back(Decision::Cancelled);
    let p = pipeline(surface, RequireClickConfig).await;

    let pending = p
        .router
        .request(ACTION_PROMPT_CONFIRM, sign_envelope())
        .await
        .unwrap();
    let result = parse_result(pending.wait().await.unwrap());

    assert!(!result.confirmed);
    assert!(result.error.is_none());
    assert_eq!(*p.nonce.released.lock().unwrap(), vec!["301".to_string()]);
}

#[tokio::test]
async fn test_validation_failure_is_one_ok_terminal() {
    let p = pipeline(ScriptedSurface::default(), AutoProceedConfig).await;

    // Missing payload: the orchestrator converts this to a result, so the
    // transport sees a *successful* delivery of a confirmed:false result.
    let pending = p
        .router
        .request(
            ACTION_PROMPT_CONFIRM,
            serde_json::json!({
                "schemaVersion": SCHEMA_VERSION,
                "requestId": RequestId::generate(),
                "type": "SIGN_TRANSACTION"
            }),
        )
        .await
        .unwrap();
    let result = parse_result(pending.wait().await.unwrap());

    assert!(!result.confirmed);
    assert!(result.error.unwrap().contains("Invalid secure confirm request"));
    assert_eq!(p.router.outstanding().await, 0);
}

#[tokio::test]
async fn test_unsupported_type_round_trips() {
    let p = pipeline(ScriptedSurface::default(), AutoProceedConfig).await;

    let pending = p
        .router
        .request(
            ACTION_PROMPT_CONFIRM,
            serde_json::json!({
                "schemaVersion": SCHEMA_VERSION,
                "requestId": RequestId::generate(),
                "type": "unsupported_type",
                "payload": { "x": 1 }
            }),
        )
        .await
        .unwrap();
    let result = parse_result(pending.wait().await.unwrap());

    assert!(!result.confirmed);
    assert!(result.error.unwrap().contains("Unsupported"));
}

#[tokio::test]
async fn test_unknown_action_is_transport_error() {
    let p = pipeline(ScriptedSurface::default(), AutoProceedConfig).await;

    let pending = p
        .router
        .request("NO_SUCH_ACTION", serde_json::json!({}))
        .await
        .unwrap();
    match pending.wait().await.unwrap() {
        RouterOutcome::Err(e) => assert!(e.contains("unknown action")),
        RouterOutcome::Ok(v) => panic!("expected transport error, got {v}"),
    }
}

#[tokio::test]
async fn test_progress_stream_drives_visibility() {
    let p = pipeline(ScriptedSurface::default(), AutoProceedConfig).await;

    let mut pending = p
        .router
        .request(ACTION_PROMPT_CONFIRM, sign_envelope())
        .await
        .unwrap();
    let mut progress = pending.take_progress_stream();

    let result = parse_result(pending.wait().await.unwrap());
    assert!(result.confirmed);

    let mut vis = VisibilityController::new();
    let mut was_visible = false;
    let mut phases = Vec::new();
    while let Some(event) = progress.recv().await {
        vis.observe(event.phase, false);
        was_visible |= vis.visible();
        phases.push(event.phase);
    }

    assert!(was_visible, "credential phase must have shown the surface");
    assert!(!vis.visible(), "surface hidden after completion");
    assert_eq!(phases.last(), Some(&ProgressPhase::Complete));
    // Progress strictly precedes the terminal: the stream closed without
    // any post-terminal event.
    let position = phases
        .iter()
        .position(|p| *p == ProgressPhase::AwaitingCredential)
        .expect("credential phase emitted");
    assert!(position < phases.len() - 1);
}

#[tokio::test]
async fn test_sticky_viewer_survives_terminal() {
    let surface = ScriptedSurface::default();
    surface.decisions.lock().unwrap().push_back(Decision::Confirmed);
    let p = pipeline(surface, RequireClickConfig).await;

    let pending = p
        .router
        .request(
            ACTION_PROMPT_CONFIRM,
            serde_json::json!({
                "schemaVersion": SCHEMA_VERSION,
                "requestId": RequestId::generate(),
                "type": "SHOW_SECURE_PRIVATE_KEY_UI",
                "payload": { "accountId": "alice.example", "publicKey": "ed25519:abc" }
            }),
        )
        .await
        .unwrap();
    let result = parse_result(pending.wait().await.unwrap());

    assert!(result.confirmed);
    assert!(result.signing_context.is_none());
    assert!(
        *p.surface.viewer_mounted.lock().unwrap(),
        "viewer stays mounted after the terminal result"
    );
}

#[tokio::test]
async fn test_concurrent_requests_isolated() {
    let p = pipeline(ScriptedSurface::default(), AutoProceedConfig).await;

    let a = p
        .router
        .request(ACTION_PROMPT_CONFIRM, sign_envelope())
        .await
        .unwrap();
    let b = p
        .router
        .request(ACTION_PROMPT_CONFIRM, sign_envelope())
        .await
        .unwrap();
    assert_ne!(a.id(), b.id());

    let (ra, rb) = tokio::join!(a.wait(), b.wait());
    assert!(parse_result(ra.unwrap()).confirmed);
    assert!(parse_result(rb.unwrap()).confirmed);
    assert_eq!(p.router.outstanding().await, 0);
}

#[tokio::test]
async fn test_router_timeout_when_user_never_decides() {
    // RequireClick with no scripted decision and no countdown: the host
    // never produces a terminal within the router's deadline.
    let nonce = Arc::new(PoolNonce {
        base: 300,
        released: Mutex::new(Vec::new()),
    });
    let orchestrator = Arc::new(Orchestrator::new(Collaborators {
        nonce,
        challenge: Arc::new(StaticChallenge),
        prompt: Arc::new(StaticPrompt),
        surface: Arc::new(ScriptedSurface::default()),
        config: Arc::new(RequireClickConfig),
    }));

    let ((caller_tx, caller_rx), (host_tx, host_rx)) = boundary_channels(32);
    tokio::spawn(Host::new(Arc::new(ConfirmHandler::new(orchestrator)), host_tx, host_rx).run());

    let router = Router::connect(caller_tx, caller_rx, DEADLINE, Duration::from_millis(100))
        .await
        .unwrap();

    let pending = router
        .request(ACTION_PROMPT_CONFIRM, sign_envelope())
        .await
        .unwrap();
    assert_eq!(pending.wait().await.unwrap_err(), RouterError::Timeout);
    assert_eq!(router.outstanding().await, 0);
}

#[tokio::test]
async fn test_disconnect_rejects_pending() {
    let p = pipeline(ScriptedSurface::default(), RequireClickConfig).await;

    let pending = p
        .router
        .request(ACTION_PROMPT_CONFIRM, sign_envelope())
        .await
        .unwrap();

    // Dropping the router closes the caller-side sender; the host exits,
    // its sender drops, and the reader rejects everything outstanding.
    drop(p.router);
    let outcome = tokio::time::timeout(DEADLINE, pending.wait()).await;
    assert!(outcome.is_ok(), "pending request must not hang after disconnect");
}

#[tokio::test]
async fn test_boundary_channels_are_cross_wired() {
    use sigil_transport::WireMessage;

    let ((caller_tx, mut caller_rx), (host_tx, mut host_rx)) = boundary_channels(4);

    caller_tx.send(WireMessage::Connect).await.unwrap();
    assert_eq!(host_rx.recv().await, Some(WireMessage::Connect));

    host_tx.send(WireMessage::Ready).await.unwrap();
    assert_eq!(caller_rx.recv().await, Some(WireMessage::Ready));
}
