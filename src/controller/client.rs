//! PersistentVolumeClaim access used by the reconciler
//!
//! The reconciler only ever needs get, create and delete of claims in a pod's
//! namespace. Keeping those behind a trait lets the state machine be driven
//! against a mock in tests and the real API server in production.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::api::{DeleteParams, PostParams};
use kube::{Api, Client};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::controller::error::Result;
use crate::resources::common::FIELD_MANAGER;

/// Claim operations against the cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClaimClient: Send + Sync {
    /// Fetch a claim, `None` if it does not exist
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<PersistentVolumeClaim>>;

    /// Create a claim; an existing claim surfaces as a 409 API error
    async fn create(&self, namespace: &str, claim: &PersistentVolumeClaim) -> Result<()>;

    /// Delete a claim by name
    async fn delete(&self, namespace: &str, name: &str) -> Result<()>;
}

/// [`ClaimClient`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeClaimClient {
    client: Client,
}

impl KubeClaimClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<PersistentVolumeClaim> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClaimClient for KubeClaimClient {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<PersistentVolumeClaim>> {
        Ok(self.api(namespace).get_opt(name).await?)
    }

    async fn create(&self, namespace: &str, claim: &PersistentVolumeClaim) -> Result<()> {
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        let created = self.api(namespace).create(&params, claim).await?;
        debug!(
            pvc = ?created.metadata.name,
            uid = ?created.metadata.uid,
            "Claim accepted by API server"
        );
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        self.api(namespace)
            .delete(name, &DeleteParams::background())
            .await?;
        Ok(())
    }
}
