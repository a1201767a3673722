//! Unit tests for the pod mutation engine
//!
//! These tests drive the public `MutationEngine` with typed pods serialized
//! into admission requests, the same way the API server would send them.

use serde_json::json;

use pvc_webhook::config::StorageDefaults;
use pvc_webhook::webhooks::{AdmissionResponse, MutationEngine};

use crate::common::{PodBuilder, admission_request, decoded_patch};

fn engine() -> MutationEngine {
    MutationEngine::new(StorageDefaults::default())
}

// =============================================================================
// Conversion
// =============================================================================

#[test]
fn test_single_empty_dir_is_converted() {
    let pod = PodBuilder::new("p", "ns1").with_empty_dir("data").build();
    let response = engine().mutate(&admission_request(&pod, "uid-1"));

    assert!(response.allowed);
    assert_eq!(response.uid, "uid-1");
    assert_eq!(response.patch_type.as_deref(), Some("JSONPatch"));

    let ops = decoded_patch(&response);
    let paths: Vec<&str> = ops.iter().map(|op| op["path"].as_str().unwrap()).collect();
    assert_eq!(
        paths,
        vec![
            "/spec/volumes/0",
            "/metadata/annotations",
            "/metadata/annotations/pvc-webhook.vol~1data.size",
            "/metadata/annotations/pvc-webhook.vol~1data.storageClass",
            "/metadata/annotations/pvc-webhook.vol~1data.accessModes",
            "/metadata/annotations/pvc-webhook.vol~1data.claimName",
            "/metadata/annotations/pvc-webhook~1converted",
        ]
    );
    assert_eq!(ops[0]["op"], json!("replace"));
    assert_eq!(
        ops[0]["value"],
        json!({"name": "data", "persistentVolumeClaim": {"claimName": "pvc-ns1-p-data"}})
    );
    assert!(ops[1..].iter().all(|op| op["op"] == json!("add")));
}

#[test]
fn test_only_empty_dirs_are_replaced() {
    let pod = PodBuilder::new("p", "ns1")
        .with_host_path("logs")
        .with_empty_dir("cache")
        .with_claim_volume("db", "existing")
        .with_empty_dir("scratch")
        .build();
    let ops = decoded_patch(&engine().mutate(&admission_request(&pod, "uid-1")));

    let replaced: Vec<&str> = ops
        .iter()
        .filter(|op| op["op"] == json!("replace"))
        .map(|op| op["path"].as_str().unwrap())
        .collect();
    assert_eq!(replaced, vec!["/spec/volumes/1", "/spec/volumes/3"]);
}

#[test]
fn test_existing_annotation_map_is_not_recreated() {
    let pod = PodBuilder::new("p", "ns1")
        .with_empty_annotations()
        .with_empty_dir("data")
        .build();
    let ops = decoded_patch(&engine().mutate(&admission_request(&pod, "uid-1")));

    assert_eq!(ops.len(), 6);
    assert!(ops.iter().all(|op| op["path"] != json!("/metadata/annotations")));
}

#[test]
fn test_per_volume_overrides_win_over_defaults() {
    let pod = PodBuilder::new("p", "ns1")
        .with_annotation("pvc-webhook.vol/data.size", "5Gi")
        .with_annotation("pvc-webhook.vol/data.accessModes", "ReadWriteMany")
        .with_empty_dir("data")
        .with_empty_dir("other")
        .build();
    let engine = MutationEngine::new(StorageDefaults {
        size: "1Gi".to_string(),
        storage_class: "fast".to_string(),
        access_modes: "ReadWriteOnce".to_string(),
    });
    let ops = decoded_patch(&engine.mutate(&admission_request(&pod, "uid-1")));

    let value_of = |path: &str| {
        ops.iter()
            .find(|op| op["path"] == json!(path))
            .map(|op| op["value"].clone())
            .unwrap()
    };
    assert_eq!(value_of("/metadata/annotations/pvc-webhook.vol~1data.size"), json!("5Gi"));
    assert_eq!(
        value_of("/metadata/annotations/pvc-webhook.vol~1data.storageClass"),
        json!("fast")
    );
    assert_eq!(
        value_of("/metadata/annotations/pvc-webhook.vol~1data.accessModes"),
        json!("ReadWriteMany")
    );
    assert_eq!(value_of("/metadata/annotations/pvc-webhook.vol~1other.size"), json!("1Gi"));
}

#[test]
fn test_long_names_produce_valid_claims() {
    let pod = PodBuilder::new(&"x".repeat(80), "ns1")
        .with_empty_dir("data")
        .build();
    let ops = decoded_patch(&engine().mutate(&admission_request(&pod, "uid-1")));

    let claim = ops[0]["value"]["persistentVolumeClaim"]["claimName"]
        .as_str()
        .unwrap();
    assert!(claim.len() <= 63);
    assert!(claim.starts_with("pvc-ns1-"));
    assert!(!claim.ends_with('-'));
}

// =============================================================================
// No-op paths
// =============================================================================

#[test]
fn test_converted_pod_is_left_alone() {
    let pod = PodBuilder::new("p", "ns1")
        .with_annotation("pvc-webhook/converted", "true")
        .with_empty_dir("data")
        .build();
    let response = engine().mutate(&admission_request(&pod, "uid-1"));
    assert_eq!(response, AdmissionResponse::allow("uid-1"));
}

#[test]
fn test_pod_without_empty_dir_is_allowed() {
    let pod = PodBuilder::new("p", "ns1").with_host_path("logs").build();
    let response = engine().mutate(&admission_request(&pod, "uid-1"));
    assert_eq!(response, AdmissionResponse::allow("uid-1"));
}

#[test]
fn test_non_pod_kind_is_allowed() {
    let pod = PodBuilder::new("p", "ns1").with_empty_dir("data").build();
    let mut request = admission_request(&pod, "uid-1");
    request.kind.kind = "Deployment".to_string();
    request.kind.group = "apps".to_string();
    assert_eq!(
        engine().mutate(&request),
        AdmissionResponse::allow("uid-1")
    );
}

// =============================================================================
// Denials
// =============================================================================

#[test]
fn test_malformed_pod_is_denied_with_uid() {
    let pod = PodBuilder::new("p", "ns1").build();
    let mut request = admission_request(&pod, "uid-9");
    request.object = Some(json!({"metadata": {"name": 42}}));

    let response = engine().mutate(&request);
    assert!(!response.allowed);
    assert_eq!(response.uid, "uid-9");
    assert!(response.patch.is_none());
    assert_eq!(response.status.unwrap().code, Some(500));
}

// =============================================================================
// generateName pods
// =============================================================================

#[test]
fn test_generate_name_pod_uses_request_namespace() {
    let pod = PodBuilder::generated("job-").with_empty_dir("work").build();
    let mut request = admission_request(&pod, "uid-7");
    request.namespace = Some("batch".to_string());

    let ops = decoded_patch(&engine().mutate(&request));
    let claim = ops[0]["value"]["persistentVolumeClaim"]["claimName"]
        .as_str()
        .unwrap();
    assert!(claim.starts_with("pvc-batch-job-"));
    assert!(claim.ends_with("-work"));
}
