use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use k8s_openapi::api::core::v1::Pod;
use kube::Client;
use kube::runtime::reflector::ObjectRef;

use crate::controller::client::{ClaimClient, KubeClaimClient};
use crate::controller::error::BackoffConfig;
use crate::controller::events::{EventPublisher, KubeEventPublisher, NoopEventPublisher};
use crate::health::HealthState;

/// Shared context for the controller
pub struct Context {
    /// Claim operations against the cluster
    pub claims: Arc<dyn ClaimClient>,
    /// Events published on pods
    pub events: Arc<dyn EventPublisher>,
    /// Health state for recording metrics
    pub health_state: Option<Arc<HealthState>>,
    /// Retry delays for failed passes
    pub backoff: BackoffConfig,
    /// Consecutive failed passes per pod, cleared on success
    failures: Mutex<HashMap<ObjectRef<Pod>, u32>>,
}

impl Context {
    pub fn new(client: Client, health_state: Option<Arc<HealthState>>) -> Self {
        Self::with_claims(Arc::new(KubeClaimClient::new(client.clone())), health_state)
            .with_events(Arc::new(KubeEventPublisher::new(client)))
    }

    /// Context over any claim client; events are dropped until
    /// [`Context::with_events`] sets a publisher
    pub fn with_claims(
        claims: Arc<dyn ClaimClient>,
        health_state: Option<Arc<HealthState>>,
    ) -> Self {
        Self {
            claims,
            events: Arc::new(NoopEventPublisher),
            health_state,
            backoff: BackoffConfig::default(),
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = events;
        self
    }

    /// Count a failed pass for `pod`, returning how many failed before it
    pub fn record_failure(&self, pod: &Pod) -> u32 {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let count = failures.entry(ObjectRef::from_obj(pod)).or_insert(0);
        let previous = *count;
        *count = count.saturating_add(1);
        previous
    }

    /// Forget the failure streak of `pod`
    pub fn clear_failures(&self, pod: &Pod) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&ObjectRef::from_obj(pod));
    }
}
