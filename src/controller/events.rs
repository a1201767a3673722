//! Kubernetes Events emitted on pods whose claims the controller manages
//!
//! Events are fire-and-forget: a failed publish is logged and never fails
//! the reconcile that produced it.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::Client;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use tracing::warn;

#[cfg(test)]
use mockall::automock;

/// Reporting component shown on published events
pub const REPORTING_CONTROLLER: &str = "pvc-webhook";

/// Event reasons, shown in the REASON column of `kubectl get events`
pub mod reasons {
    /// A claim was created for a pod volume
    pub const PVC_PROVISIONED: &str = "PVCProvisioned";
    /// The claim of a terminating pod was deleted
    pub const PVC_DELETED: &str = "PVCDeleted";
}

/// Event actions
pub mod actions {
    pub const PROVISION: &str = "Provision";
    pub const DELETE: &str = "Delete";
}

/// Publishes Events about a pod
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    );
}

/// [`EventPublisher`] backed by `kube::runtime::events::Recorder`
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    pub fn new(client: Client) -> Self {
        let reporter = Reporter {
            controller: REPORTING_CONTROLLER.to_string(),
            instance: None,
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let event = Event {
            type_,
            reason: reason.to_string(),
            note,
            action: action.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, resource_ref).await {
            warn!(reason, action, error = %e, "Failed to publish pod event");
        }
    }
}

/// Drops every event
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        _type_: EventType,
        _reason: &str,
        _action: &str,
        _note: Option<String>,
    ) {
    }
}
