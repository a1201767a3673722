//! Annotation contract between the webhook and the controller
//!
//! The two subsystems never call each other. The webhook writes the keys
//! defined here once at admission time and the controller only reads them.
//!
//! Per converted volume `<v>`:
//! - `pvc-webhook.vol/<v>.size`
//! - `pvc-webhook.vol/<v>.storageClass`
//! - `pvc-webhook.vol/<v>.accessModes`
//! - `pvc-webhook.vol/<v>.claimName`
//!
//! Per pod: `pvc-webhook/converted = "true"`.

use std::collections::BTreeMap;

/// Prefix for volume-scoped keys
pub const VOLUME_PREFIX: &str = "pvc-webhook.vol";

/// Idempotency marker written once a pod has been converted
pub const CONVERTED: &str = "pvc-webhook/converted";

/// Value of [`CONVERTED`] on a converted pod
pub const CONVERTED_VALUE: &str = "true";

/// Label placed on created claims naming the owning pod
pub const POD_LABEL: &str = "pvc-webhook/pod";

/// Keys of the single-claim schema used by early releases.
///
/// Only recognized so the controller can warn about pods that still carry
/// them; they are never used to provision anything.
pub const LEGACY_KEYS: [&str; 3] = [
    "pvc-webhook/claim",
    "pvc-webhook/storage-size",
    "pvc-webhook/storage-class",
];

/// The four annotation keys describing one converted volume
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VolumeKeys {
    pub size: String,
    pub storage_class: String,
    pub access_modes: String,
    pub claim_name: String,
}

impl VolumeKeys {
    pub fn for_volume(volume: &str) -> Self {
        let base = format!("{}/{}", VOLUME_PREFIX, volume);
        Self {
            size: format!("{}.size", base),
            storage_class: format!("{}.storageClass", base),
            access_modes: format!("{}.accessModes", base),
            claim_name: format!("{}.claimName", base),
        }
    }
}

/// Claim parameters recorded for one volume
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VolumeClaimAnnotations {
    pub volume: String,
    pub claim_name: String,
    pub size: String,
    pub storage_class: String,
    pub access_modes: String,
}

impl VolumeClaimAnnotations {
    /// Annotation entries in the order the webhook writes them
    pub fn entries(&self) -> [(String, String); 4] {
        let keys = VolumeKeys::for_volume(&self.volume);
        [
            (keys.size, self.size.clone()),
            (keys.storage_class, self.storage_class.clone()),
            (keys.access_modes, self.access_modes.clone()),
            (keys.claim_name, self.claim_name.clone()),
        ]
    }

    /// Read the recorded parameters of `volume`.
    ///
    /// Returns `None` unless a non-blank claim name is recorded. Missing
    /// parameter keys read as empty strings and are judged by the caller.
    pub fn read(annotations: &BTreeMap<String, String>, volume: &str) -> Option<Self> {
        let keys = VolumeKeys::for_volume(volume);
        let claim_name = annotations.get(&keys.claim_name)?.trim();
        if claim_name.is_empty() {
            return None;
        }

        let value = |key: &str| annotations.get(key).cloned().unwrap_or_default();
        Some(Self {
            volume: volume.to_string(),
            claim_name: claim_name.to_string(),
            size: value(&keys.size),
            storage_class: value(&keys.storage_class),
            access_modes: value(&keys.access_modes),
        })
    }
}

/// Whether the pod already carries the idempotency marker
pub fn is_converted(annotations: Option<&BTreeMap<String, String>>) -> bool {
    annotations
        .and_then(|a| a.get(CONVERTED))
        .is_some_and(|v| v == CONVERTED_VALUE)
}

/// Whether any key of the retired single-claim schema is present
pub fn has_legacy_keys(annotations: &BTreeMap<String, String>) -> bool {
    LEGACY_KEYS.iter().any(|k| annotations.contains_key(*k))
}
