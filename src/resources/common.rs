//! Common utilities for Kubernetes resource generation

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::ResourceExt;

use crate::annotations::POD_LABEL;

/// Operator field manager and `managed-by` label value
pub const FIELD_MANAGER: &str = "pvc-webhook";

/// Generate a controller owner reference pointing at a pod
///
/// Lets the garbage collector reclaim the claim once the pod is gone.
pub fn owner_reference(pod: &Pod) -> OwnerReference {
    OwnerReference {
        api_version: "v1".to_string(),
        kind: "Pod".to_string(),
        name: pod.name_any(),
        uid: pod.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// Whether `owner_refs` contain a reference to the pod with `uid`
pub fn is_owned_by(owner_refs: &[OwnerReference], uid: &str) -> bool {
    owner_refs
        .iter()
        .any(|r| r.kind == "Pod" && r.uid == uid)
}

/// Labels for a claim created on behalf of a pod
pub fn claim_labels(pod_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "app.kubernetes.io/managed-by".to_string(),
            FIELD_MANAGER.to_string(),
        ),
        (POD_LABEL.to_string(), label_value(pod_name)),
    ])
}

/// Clamp a pod name to a valid label value (63 chars, alphanumeric ends)
fn label_value(name: &str) -> String {
    let cut: String = name.chars().take(63).collect();
    cut.trim_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_string()
}
