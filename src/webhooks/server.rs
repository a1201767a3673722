//! Webhook HTTP server handlers
//!
//! Serves the MutatingAdmissionWebhook endpoint for pods. Every review is
//! answered with HTTP 200; failures are reported inside the review.

use axum::{
    Json, Router, body::Bytes, extract::State, http::StatusCode, response::IntoResponse,
    routing::post,
};
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use super::mutation::MutationEngine;
use super::review::{AdmissionResponse, AdmissionReview, AdmissionReviewResponse};
use crate::health::HealthState;

/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/webhook/certs/tls.crt";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/webhook/certs/tls.key";
/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 8443;
/// Mutation endpoint path
pub const MUTATE_PATH: &str = "/mutate";

/// Shared state for webhook handlers
pub struct WebhookState {
    pub engine: MutationEngine,
    pub health_state: Option<Arc<HealthState>>,
}

impl WebhookState {
    pub fn new(engine: MutationEngine, health_state: Option<Arc<HealthState>>) -> Self {
        Self {
            engine,
            health_state,
        }
    }

    fn record(&self, response: &AdmissionResponse) {
        if let Some(ref state) = self.health_state {
            state.metrics.record_admission(outcome_label(response));
        }
    }
}

fn outcome_label(response: &AdmissionResponse) -> &'static str {
    match (response.allowed, response.patch.is_some()) {
        (true, true) => "patched",
        (true, false) => "allowed",
        (false, _) => "denied",
    }
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(MUTATE_PATH, post(mutate_pod))
        .with_state(state)
}

/// Pod mutation admission webhook handler
///
/// The body is decoded by hand so a malformed review still gets an
/// AdmissionReview answer instead of an axum rejection.
pub(crate) async fn mutate_pod(
    State(state): State<Arc<WebhookState>>,
    body: Bytes,
) -> impl IntoResponse {
    let review: AdmissionReview = match serde_json::from_slice(&body) {
        Ok(review) => review,
        Err(e) => {
            error!(error = %e, "Failed to decode AdmissionReview");
            let response = AdmissionResponse::deny(
                "",
                400,
                &format!("Failed to decode AdmissionReview: {}", e),
                Some("BadRequest"),
            );
            state.record(&response);
            return (StatusCode::OK, Json(create_response(response)));
        }
    };

    let Some(request) = review.request else {
        error!("Admission review missing request");
        let response = AdmissionResponse::deny(
            "",
            400,
            "Missing request in AdmissionReview",
            Some("BadRequest"),
        );
        state.record(&response);
        return (StatusCode::OK, Json(create_response(response)));
    };

    info!(
        uid = %request.uid,
        operation = %request.operation,
        kind = %request.kind.kind,
        namespace = ?request.namespace,
        name = ?request.name,
        dry_run = request.dry_run.unwrap_or(false),
        "Processing admission request"
    );

    let response = state.engine.mutate(&request);
    state.record(&response);
    info!(
        uid = %response.uid,
        allowed = response.allowed,
        patched = response.patch.is_some(),
        "Admission request answered"
    );

    (StatusCode::OK, Json(create_response(response)))
}

/// Wrap a response in an AdmissionReview envelope
fn create_response(response: AdmissionResponse) -> AdmissionReviewResponse {
    AdmissionReviewResponse::new(response)
}

/// Run the webhook server with TLS
///
/// Binds to 0.0.0.0:`port` and serves the /mutate endpoint. The replica is
/// marked ready once the listener is bound, independent of leadership.
///
/// # Arguments
/// * `engine` - Mutation engine answering the reviews
/// * `health_state` - Optional readiness and metrics sink
/// * `cert_path` - Path to TLS certificate file (PEM format)
/// * `key_path` - Path to TLS private key file (PEM format)
/// * `port` - Listen port
pub async fn run_webhook_server(
    engine: MutationEngine,
    health_state: Option<Arc<HealthState>>,
    cert_path: &str,
    key_path: &str,
    port: u16,
) -> Result<(), WebhookError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    serve_webhook(engine, health_state, cert_path, key_path, addr, Handle::new()).await
}

async fn serve_webhook(
    engine: MutationEngine,
    health_state: Option<Arc<HealthState>>,
    cert_path: &str,
    key_path: &str,
    addr: SocketAddr,
    handle: Handle,
) -> Result<(), WebhookError> {
    let config = RustlsConfig::from_pem_file(PathBuf::from(cert_path), PathBuf::from(key_path))
        .await
        .map_err(|e| WebhookError::TlsConfig(e.to_string()))?;

    if let Some(state) = health_state.clone() {
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Some(bound) = handle.listening().await {
                info!("Webhook server listening on {} with TLS", bound);
                state.set_ready(true).await;
            }
        });
    }

    let state = Arc::new(WebhookState::new(engine, health_state));
    let app = create_webhook_router(state);

    axum_server::bind_rustls(addr, config)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .map_err(|e| WebhookError::Server(e.to_string()))?;

    Ok(())
}

/// Errors that can occur when running the webhook server
#[derive(Error, Debug)]
pub enum WebhookError {
    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),
    /// Server error
    #[error("Webhook server error: {0}")]
    Server(String),
}
