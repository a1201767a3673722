//! Health server for Kubernetes probes and Prometheus metrics
//!
//! Provides HTTP endpoints for:
//! - `/healthz` - Liveness probe (is the process alive?)
//! - `/readyz` - Readiness probe (is the operator ready to serve?)
//! - `/metrics` - Prometheus metrics

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

/// Port of the health and metrics server
pub const HEALTH_PORT: u16 = 8080;

/// Namespace labels for reconcile and claim write metrics.
///
/// Pods are short-lived, so no series is keyed by pod name.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct NamespaceLabels {
    pub namespace: String,
}

impl prometheus_client::encoding::EncodeLabelSet for NamespaceLabels {
    fn encode(
        &self,
        mut encoder: prometheus_client::encoding::LabelSetEncoder<'_>,
    ) -> Result<(), std::fmt::Error> {
        use prometheus_client::encoding::EncodeLabel;
        ("namespace", self.namespace.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Labels for admission decisions
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct AdmissionLabels {
    pub outcome: String,
}

impl prometheus_client::encoding::EncodeLabelSet for AdmissionLabels {
    fn encode(
        &self,
        mut encoder: prometheus_client::encoding::LabelSetEncoder<'_>,
    ) -> Result<(), std::fmt::Error> {
        use prometheus_client::encoding::EncodeLabel;
        ("outcome", self.outcome.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Shared metrics state
pub struct Metrics {
    /// Total reconciliations counter
    pub reconciliations_total: Family<NamespaceLabels, Counter>,
    /// Failed reconciliations counter
    pub reconciliation_errors_total: Family<NamespaceLabels, Counter>,
    /// Reconciliation duration histogram
    pub reconcile_duration_seconds: Family<NamespaceLabels, Histogram>,

    /// Claims created by the controller
    pub pvcs_created_total: Family<NamespaceLabels, Counter>,
    /// Claims deleted by the controller
    pub pvcs_deleted_total: Family<NamespaceLabels, Counter>,

    /// Admission reviews by outcome (allowed, patched, denied)
    pub admissions_total: Family<AdmissionLabels, Counter>,

    /// Prometheus registry
    registry: Registry,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let reconciliations_total = Family::<NamespaceLabels, Counter>::default();
        registry.register(
            "pvc_webhook_reconciliations",
            "Total number of reconciliations",
            reconciliations_total.clone(),
        );

        let reconciliation_errors_total = Family::<NamespaceLabels, Counter>::default();
        registry.register(
            "pvc_webhook_reconciliation_errors",
            "Total number of reconciliation errors",
            reconciliation_errors_total.clone(),
        );

        let reconcile_duration_seconds =
            Family::<NamespaceLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(exponential_buckets(0.001, 2.0, 15))
            });
        registry.register(
            "pvc_webhook_reconcile_duration_seconds",
            "Duration of reconciliation in seconds",
            reconcile_duration_seconds.clone(),
        );

        let pvcs_created_total = Family::<NamespaceLabels, Counter>::default();
        registry.register(
            "pvc_webhook_pvcs_created",
            "Total number of PersistentVolumeClaims created",
            pvcs_created_total.clone(),
        );

        let pvcs_deleted_total = Family::<NamespaceLabels, Counter>::default();
        registry.register(
            "pvc_webhook_pvcs_deleted",
            "Total number of PersistentVolumeClaims deleted",
            pvcs_deleted_total.clone(),
        );

        let admissions_total = Family::<AdmissionLabels, Counter>::default();
        registry.register(
            "pvc_webhook_admissions",
            "Total number of pod admission reviews by outcome",
            admissions_total.clone(),
        );

        Self {
            reconciliations_total,
            reconciliation_errors_total,
            reconcile_duration_seconds,
            pvcs_created_total,
            pvcs_deleted_total,
            admissions_total,
            registry,
        }
    }

    /// Record a successful reconciliation
    pub fn record_reconcile(&self, namespace: &str, duration_secs: f64) {
        let labels = NamespaceLabels {
            namespace: namespace.to_string(),
        };
        self.reconciliations_total.get_or_create(&labels).inc();
        self.reconcile_duration_seconds
            .get_or_create(&labels)
            .observe(duration_secs);
    }

    /// Record a failed reconciliation
    pub fn record_error(&self, namespace: &str) {
        let labels = NamespaceLabels {
            namespace: namespace.to_string(),
        };
        self.reconciliation_errors_total
            .get_or_create(&labels)
            .inc();
    }

    pub fn record_claim_created(&self, namespace: &str) {
        self.pvcs_created_total
            .get_or_create(&NamespaceLabels {
                namespace: namespace.to_string(),
            })
            .inc();
    }

    pub fn record_claim_deleted(&self, namespace: &str) {
        self.pvcs_deleted_total
            .get_or_create(&NamespaceLabels {
                namespace: namespace.to_string(),
            })
            .inc();
    }

    pub fn record_admission(&self, outcome: &str) {
        self.admissions_total
            .get_or_create(&AdmissionLabels {
                outcome: outcome.to_string(),
            })
            .inc();
    }

    /// Encode metrics to Prometheus text format
    ///
    /// Returns an empty string if encoding fails.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if let Err(e) = encode(&mut buffer, &self.registry) {
            tracing::error!("Failed to encode metrics: {}", e);
            return String::new();
        }
        buffer
    }
}

/// Shared state for the health server
pub struct HealthState {
    /// Whether the operator is ready (connected to K8s API)
    pub ready: RwLock<bool>,
    /// Metrics registry
    pub metrics: Metrics,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            ready: RwLock::new(false),
            metrics: Metrics::new(),
        }
    }

    /// Mark the operator as ready
    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Check if the operator is ready
    pub async fn is_ready(&self) -> bool {
        *self.ready.read().await
    }
}

/// Liveness probe handler
async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness probe handler
///
/// Returns 503 Service Unavailable until the operator has a working client.
async fn readyz(State(state): State<Arc<HealthState>>) -> Response {
    if state.is_ready().await {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
    }
}

async fn metrics(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let body = state.metrics.encode();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

/// Create the health server router
pub fn create_router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Run the health server
///
/// Binds to 0.0.0.0:8080 and serves health/metrics endpoints.
pub async fn run_health_server(state: Arc<HealthState>) -> Result<(), std::io::Error> {
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], HEALTH_PORT));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Health server listening on {}", addr);

    axum::serve(listener, app).await
}
