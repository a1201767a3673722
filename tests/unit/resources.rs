//! Unit tests for claim generation and validation
//!
//! These tests go through `validate_claim` and `generate_claim` together,
//! which is the path the reconciler takes before creating a claim.

use pvc_webhook::annotations::VolumeClaimAnnotations;
use pvc_webhook::controller::validation::{parse_access_modes, validate_claim, validate_storage_size};
use pvc_webhook::resources::pvc::generate_claim;

use crate::common::PodBuilder;

fn recorded(size: &str, class: &str, modes: &str) -> VolumeClaimAnnotations {
    VolumeClaimAnnotations {
        volume: "data".to_string(),
        claim_name: "pvc-ns1-web-0-data".to_string(),
        size: size.to_string(),
        storage_class: class.to_string(),
        access_modes: modes.to_string(),
    }
}

#[test]
fn test_generated_claim_carries_recorded_parameters() {
    let pod = PodBuilder::new("web-0", "ns1").with_uid("uid-1").build();
    let spec = validate_claim(&recorded("5Gi", "fast", "ReadWriteOnce,ReadOnlyMany")).unwrap();
    let pvc = generate_claim(&pod, &spec);

    assert_eq!(pvc.metadata.name.as_deref(), Some("pvc-ns1-web-0-data"));
    assert_eq!(pvc.metadata.namespace.as_deref(), Some("ns1"));

    let owner = &pvc.metadata.owner_references.as_ref().unwrap()[0];
    assert_eq!(owner.kind, "Pod");
    assert_eq!(owner.uid, "uid-1");
    assert_eq!(owner.controller, Some(true));

    let labels = pvc.metadata.labels.as_ref().unwrap();
    assert_eq!(labels["app.kubernetes.io/managed-by"], "pvc-webhook");
    assert_eq!(labels["pvc-webhook/pod"], "web-0");

    let claim_spec = pvc.spec.as_ref().unwrap();
    assert_eq!(claim_spec.storage_class_name.as_deref(), Some("fast"));
    assert_eq!(
        claim_spec.access_modes,
        Some(vec!["ReadWriteOnce".to_string(), "ReadOnlyMany".to_string()])
    );
    let requests = claim_spec.resources.as_ref().unwrap().requests.as_ref().unwrap();
    assert_eq!(requests["storage"].0, "5Gi");
}

#[test]
fn test_blank_storage_class_leaves_cluster_default() {
    let spec = validate_claim(&recorded("1Gi", "  ", "ReadWriteOnce")).unwrap();
    assert!(spec.storage_class.is_none());

    let pod = PodBuilder::new("web-0", "ns1").with_uid("uid-1").build();
    let pvc = generate_claim(&pod, &spec);
    assert!(pvc.spec.unwrap().storage_class_name.is_none());
}

#[test]
fn test_unparseable_size_is_rejected() {
    assert!(validate_claim(&recorded("ten gigs", "standard", "ReadWriteOnce")).is_err());
    assert!(validate_claim(&recorded("", "standard", "ReadWriteOnce")).is_err());
    assert!(validate_claim(&recorded("0Gi", "standard", "ReadWriteOnce")).is_err());
}

#[test]
fn test_storage_size_forms() {
    for size in ["10Gi", "500M", "1.5Ti", "1e3", "+2Gi", "100"] {
        assert!(validate_storage_size(size).is_ok(), "{} should be valid", size);
    }
    for size in ["Gi", "10GB", "-1Gi", "1..5Gi"] {
        assert!(validate_storage_size(size).is_err(), "{} should be invalid", size);
    }
}

#[test]
fn test_access_mode_lists() {
    assert_eq!(
        parse_access_modes(" ReadWriteOnce , ReadWriteOnce,ReadWriteOncePod ").unwrap(),
        vec!["ReadWriteOnce".to_string(), "ReadWriteOncePod".to_string()]
    );
    assert!(parse_access_modes("ReadWriteSometimes").is_err());
    assert!(parse_access_modes(" , ").is_err());
}
