pub mod annotations;
pub mod config;
pub mod controller;
pub mod health;
pub mod resources;
pub mod webhooks;

pub use config::{OperatorMode, StorageDefaults};
pub use controller::{
    BackoffConfig, ClaimClient, Context, Error, ReconcileOutcome, Result, error_policy, reconcile,
};
pub use health::{HealthState, Metrics};
pub use webhooks::{
    MutationEngine, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT, WebhookError,
    run_webhook_server,
};

use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use kube::runtime::Controller;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;

use crate::resources::common::FIELD_MANAGER;

/// Helper to create a namespaced or cluster-wide API based on scope.
fn scoped_api<T>(client: Client, namespace: Option<&str>) -> Api<T>
where
    T: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    <T as Resource>::DynamicType: Default,
    T: Clone + DeserializeOwned + std::fmt::Debug,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

/// Run the claim controller (cluster-wide).
///
/// Watches pods and the claims created for them. Claim phase changes
/// re-trigger the owning pod through its owner reference.
///
/// If health_state is provided, metrics will be recorded for reconciliations.
pub async fn run_controller(client: Client, health_state: Option<Arc<HealthState>>) {
    run_controller_scoped(client, health_state, None).await
}

/// Run the claim controller with optional namespace scoping.
///
/// When `namespace` is `Some(ns)`, only watches resources in that namespace.
/// When `namespace` is `None`, watches resources cluster-wide.
pub async fn run_controller_scoped(
    client: Client,
    health_state: Option<Arc<HealthState>>,
    namespace: Option<&str>,
) {
    let scope_msg = namespace.unwrap_or("cluster-wide");
    tracing::info!("Starting controller for Pod claims (scope: {})", scope_msg);

    // Mark as ready once we start the controller
    if let Some(ref state) = health_state {
        state.set_ready(true).await;
    }

    let ctx = Arc::new(Context::new(client.clone(), health_state));

    let pods: Api<Pod> = scoped_api(client.clone(), namespace);
    let claims: Api<PersistentVolumeClaim> = scoped_api(client, namespace);

    let pod_config = WatcherConfig::default().any_semantic();
    // Only claims this operator created can have a pod owner we care about
    let claim_config = WatcherConfig::default()
        .any_semantic()
        .labels(&format!("app.kubernetes.io/managed-by={}", FIELD_MANAGER));

    Controller::new(pods, pod_config)
        .owns(claims, claim_config)
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => {
                    tracing::debug!(
                        "Reconciled: {}/{}",
                        obj.namespace.as_deref().unwrap_or(""),
                        obj.name
                    );
                }
                Err(e) => {
                    // Pods vanish between the watch event and the reconcile
                    let is_not_found = matches!(
                        &e,
                        kube::runtime::controller::Error::ReconcilerFailed(err, _) if err.is_not_found()
                    );
                    if is_not_found {
                        tracing::debug!("Object no longer exists (likely deleted): {:?}", e);
                    } else {
                        tracing::error!("Reconciliation error: {:?}", e);
                    }
                }
            }
        })
        .await;

    // This should never complete in normal operation
    tracing::error!("Controller stream ended unexpectedly");
}
