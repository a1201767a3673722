//! Unit tests for configuration layering

use pvc_webhook::config::{
    DEFAULT_ACCESS_MODES, DEFAULT_SIZE, DEFAULT_STORAGE_CLASS, OperatorMode, StorageDefaults, pick,
};

#[test]
fn test_annotation_beats_default() {
    assert_eq!(pick(&["5Gi", DEFAULT_SIZE]), "5Gi");
}

#[test]
fn test_blank_annotation_falls_through() {
    assert_eq!(pick(&["", DEFAULT_SIZE]), DEFAULT_SIZE);
    assert_eq!(pick(&[" \t", DEFAULT_SIZE]), DEFAULT_SIZE);
}

#[test]
fn test_all_blank_is_empty() {
    assert_eq!(pick(&["", "  "]), "");
    assert_eq!(pick(&[]), "");
}

#[test]
fn test_defaults_from_lookup() {
    let defaults = StorageDefaults::from_lookup(|key| match key {
        "DEFAULT_SIZE" => Some("20Gi".to_string()),
        "DEFAULT_STORAGE_CLASS" => Some(String::new()),
        _ => None,
    });
    assert_eq!(defaults.size, "20Gi");
    assert_eq!(defaults.storage_class, DEFAULT_STORAGE_CLASS);
    assert_eq!(defaults.access_modes, DEFAULT_ACCESS_MODES);
}

#[test]
fn test_operator_mode_round_trips_display() {
    for mode in [OperatorMode::All, OperatorMode::Webhook, OperatorMode::Controller] {
        assert_eq!(mode.to_string().parse::<OperatorMode>().unwrap(), mode);
    }
    assert_eq!(OperatorMode::default(), OperatorMode::All);
}
