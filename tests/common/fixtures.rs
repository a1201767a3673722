//! Test fixtures and builders for pods and admission requests
//!
//! ```rust,ignore
//! let pod = PodBuilder::new("web-0", "default")
//!     .with_empty_dir("data")
//!     .with_annotation("pvc-webhook.vol/data.size", "5Gi")
//!     .build();
//! let request = admission_request(&pod, "uid-1");
//! ```

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    EmptyDirVolumeSource, HostPathVolumeSource, PersistentVolumeClaimVolumeSource, Pod, PodSpec,
    Volume,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::core::ObjectMeta;
use pvc_webhook::webhooks::{AdmissionRequest, GroupVersionKind};

/// Builder for Pod test fixtures
#[allow(dead_code)]
pub struct PodBuilder {
    name: Option<String>,
    namespace: Option<String>,
    generate_name: Option<String>,
    uid: Option<String>,
    annotations: Option<BTreeMap<String, String>>,
    volumes: Vec<Volume>,
    deleting: bool,
}

#[allow(dead_code)]
impl PodBuilder {
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            generate_name: None,
            uid: None,
            annotations: None,
            volumes: Vec::new(),
            deleting: false,
        }
    }

    /// Pod that only carries a `generateName` prefix
    pub fn generated(prefix: &str) -> Self {
        Self {
            name: None,
            namespace: None,
            generate_name: Some(prefix.to_string()),
            ..Self::new("", "")
        }
    }

    pub fn with_uid(mut self, uid: &str) -> Self {
        self.uid = Some(uid.to_string());
        self
    }

    pub fn with_annotation(mut self, key: &str, value: &str) -> Self {
        self.annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Present but empty annotation map
    pub fn with_empty_annotations(mut self) -> Self {
        self.annotations.get_or_insert_with(BTreeMap::new);
        self
    }

    pub fn with_empty_dir(mut self, volume: &str) -> Self {
        self.volumes.push(Volume {
            name: volume.to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        });
        self
    }

    pub fn with_host_path(mut self, volume: &str) -> Self {
        self.volumes.push(Volume {
            name: volume.to_string(),
            host_path: Some(HostPathVolumeSource {
                path: format!("/var/lib/{}", volume),
                type_: None,
            }),
            ..Default::default()
        });
        self
    }

    pub fn with_claim_volume(mut self, volume: &str, claim: &str) -> Self {
        self.volumes.push(Volume {
            name: volume.to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: claim.to_string(),
                read_only: None,
            }),
            ..Default::default()
        });
        self
    }

    pub fn deleting(mut self) -> Self {
        self.deleting = true;
        self
    }

    pub fn build(self) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: self.name.filter(|n| !n.is_empty()),
                namespace: self.namespace.filter(|n| !n.is_empty()),
                generate_name: self.generate_name,
                uid: self.uid,
                annotations: self.annotations,
                deletion_timestamp: self.deleting.then(|| Time(Default::default())),
                ..Default::default()
            },
            spec: Some(PodSpec {
                volumes: Some(self.volumes),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// CREATE admission request for a core-group pod
#[allow(dead_code)]
pub fn admission_request(pod: &Pod, uid: &str) -> AdmissionRequest {
    AdmissionRequest {
        uid: uid.to_string(),
        kind: GroupVersionKind {
            group: String::new(),
            version: "v1".to_string(),
            kind: "Pod".to_string(),
        },
        operation: "CREATE".to_string(),
        namespace: pod.metadata.namespace.clone(),
        name: pod.metadata.name.clone(),
        object: Some(serde_json::to_value(pod).unwrap()),
        dry_run: None,
    }
}

/// Decoded JSON patch of a response, empty when there is none
#[allow(dead_code)]
pub fn decoded_patch(response: &pvc_webhook::webhooks::AdmissionResponse) -> Vec<serde_json::Value> {
    response
        .patch_bytes()
        .map(|bytes| serde_json::from_slice(&bytes).unwrap())
        .unwrap_or_default()
}
