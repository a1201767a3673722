//! Unit tests for claim name derivation

use pvc_webhook::resources::naming::{
    MAX_NAME_LENGTH, claim_name, is_dns_label, sanitize_name, short_digest,
};

#[test]
fn test_claim_name_matches_pattern() {
    assert_eq!(claim_name("default", "web-0", "data"), "pvc-default-web-0-data");
    assert_eq!(claim_name("Team_A", "Web.0", "Cache_Dir"), "pvc-team-a-web-0-cache-dir");
}

#[test]
fn test_claim_name_is_deterministic() {
    let a = claim_name("ns", &"p".repeat(70), "data");
    let b = claim_name("ns", &"p".repeat(70), "data");
    assert_eq!(a, b);
}

#[test]
fn test_long_inputs_sharing_a_prefix_stay_distinct() {
    let base = "a".repeat(60);
    let first = claim_name("ns", &base, "data-one");
    let second = claim_name("ns", &base, "data-two");
    assert_ne!(first, second);
    assert_eq!(first.len(), MAX_NAME_LENGTH);
    assert!(is_dns_label(&first));
    assert!(is_dns_label(&second));
}

#[test]
fn test_shortened_name_ends_with_digest() {
    let full = sanitize_name(&format!("pvc-ns-{}-data", "b".repeat(70)), usize::MAX);
    let name = claim_name("ns", &"b".repeat(70), "data");
    assert!(name.ends_with(&format!("-{}", short_digest(&full))));
}

#[test]
fn test_exactly_max_length_is_untouched() {
    // "pvc-" + "ns-" + pod + "-" + "v" = 63
    let pod = "c".repeat(63 - "pvc-ns--v".len());
    let name = claim_name("ns", &pod, "v");
    assert_eq!(name.len(), MAX_NAME_LENGTH);
    assert_eq!(name, format!("pvc-ns-{}-v", pod));
}

#[test]
fn test_sanitize_truncation_never_ends_with_hyphen() {
    assert_eq!(sanitize_name("abc-def", 4), "abc");
    assert_eq!(sanitize_name("--a--b--", 63), "a-b");
    assert_eq!(sanitize_name("___", 63), "");
}

#[test]
fn test_claim_name_valid_without_alphanumeric_parts() {
    let name = claim_name("___", "!!!", "***");
    assert_eq!(name, "pvc");
    assert!(is_dns_label(&name));
}

#[test]
fn test_short_digest_is_hex() {
    let digest = short_digest("anything");
    assert_eq!(digest.len(), 8);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
}
