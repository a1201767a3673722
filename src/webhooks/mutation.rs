//! Pod mutation engine
//!
//! Rewrites every `emptyDir` volume of a newly created pod into a
//! `persistentVolumeClaim` volume and records the claim parameters as pod
//! annotations for the controller. A pod is converted at most once; the
//! `pvc-webhook/converted` marker short-circuits any later review.

use std::collections::BTreeMap;
use std::sync::Arc;

use json_patch::Patch;
use k8s_openapi::api::core::v1::{PersistentVolumeClaimVolumeSource, Pod, Volume};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::annotations::{
    CONVERTED, CONVERTED_VALUE, VolumeClaimAnnotations, VolumeKeys, is_converted,
};
use crate::config::{StorageDefaults, pick};
use crate::resources::naming::{claim_name, short_digest};
use crate::webhooks::patch::{add, annotation_path, annotations_path, replace, volume_path};
use crate::webhooks::review::{AdmissionRequest, AdmissionResponse};

/// Message attached to a patched response
pub const CONVERTED_MESSAGE: &str = "converted emptyDir to PVC";

const OPERATION_CREATE: &str = "CREATE";

/// Failures that turn into a denied admission
#[derive(Error, Debug)]
pub enum MutationError {
    #[error("admission request carries no object")]
    MissingObject,

    #[error("decode pod: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("marshal patch: {0}")]
    Encode(#[source] serde_json::Error),
}

impl MutationError {
    pub fn reason(&self) -> &'static str {
        match self {
            MutationError::MissingObject | MutationError::Decode(_) => "DecodeFailed",
            MutationError::Encode(_) => "PatchFailed",
        }
    }
}

/// The parts of a pod the engine looks at
#[derive(Debug, Clone, PartialEq)]
pub struct PodView {
    pub namespace: String,
    pub name: String,
    /// `None` when the pod has no annotation map at all
    pub annotations: Option<BTreeMap<String, String>>,
    pub volumes: Vec<Volume>,
}

impl PodView {
    /// Build the view, falling back to request coordinates for pods that
    /// have not been assigned a namespace or name yet
    pub fn from_pod(pod: Pod, request: &AdmissionRequest) -> Self {
        let meta = pod.metadata;
        let namespace = meta
            .namespace
            .filter(|ns| !ns.is_empty())
            .or_else(|| request.namespace.clone())
            .unwrap_or_default();
        let name = meta
            .name
            .filter(|n| !n.is_empty())
            .or_else(|| request.name.clone().filter(|n| !n.is_empty()))
            .unwrap_or_else(|| {
                // generateName pods: stable per admission request
                format!(
                    "{}{}",
                    meta.generate_name.unwrap_or_default(),
                    short_digest(&request.uid)
                )
            });

        Self {
            namespace,
            name,
            annotations: meta.annotations,
            volumes: pod.spec.and_then(|s| s.volumes).unwrap_or_default(),
        }
    }

    fn annotation(&self, key: &str) -> &str {
        self.annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Conversion decided for one `emptyDir` volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeConversionPlan {
    pub index: usize,
    pub claim: VolumeClaimAnnotations,
}

/// Admission-time mutation logic, shared read-only across requests
#[derive(Debug, Clone)]
pub struct MutationEngine {
    defaults: Arc<StorageDefaults>,
}

impl MutationEngine {
    pub fn new(defaults: StorageDefaults) -> Self {
        Self {
            defaults: Arc::new(defaults),
        }
    }

    /// Answer one admission request. The response always echoes its uid.
    pub fn mutate(&self, request: &AdmissionRequest) -> AdmissionResponse {
        let uid = request.uid.as_str();

        if !request.kind.is_pod() {
            debug!(uid = %uid, kind = %request.kind.kind, "Not a pod, allowing");
            return AdmissionResponse::allow(uid);
        }
        if request.operation != OPERATION_CREATE {
            debug!(uid = %uid, operation = %request.operation, "Not a create, allowing");
            return AdmissionResponse::allow(uid);
        }

        match self.patch_for(request) {
            Ok(Some(patch)) => AdmissionResponse::patched(uid, &patch, CONVERTED_MESSAGE),
            Ok(None) => AdmissionResponse::allow(uid),
            Err(e) => {
                warn!(uid = %uid, error = %e, "Denying pod admission");
                AdmissionResponse::deny(uid, 500, &e.to_string(), Some(e.reason()))
            }
        }
    }

    /// Serialized patch for the request's pod, `None` when nothing changes
    pub fn patch_for(&self, request: &AdmissionRequest) -> Result<Option<Vec<u8>>, MutationError> {
        let object = request.object.clone().ok_or(MutationError::MissingObject)?;
        let pod: Pod = serde_json::from_value(object).map_err(MutationError::Decode)?;
        let view = PodView::from_pod(pod, request);

        if is_converted(view.annotations.as_ref()) {
            debug!(uid = %request.uid, pod = %view.name, "Pod already converted");
            return Ok(None);
        }

        let plans = self.plan(&view);
        if plans.is_empty() {
            return Ok(None);
        }

        let ops = build_patch(&view, &plans).map_err(MutationError::Encode)?;
        let bytes = serde_json::to_vec(&ops).map_err(MutationError::Encode)?;

        info!(
            uid = %request.uid,
            namespace = %view.namespace,
            pod = %view.name,
            volumes = plans.len(),
            "Converting emptyDir volumes"
        );
        Ok(Some(bytes))
    }

    /// Decide the conversion of every `emptyDir` volume, in volume order
    pub fn plan(&self, pod: &PodView) -> Vec<VolumeConversionPlan> {
        pod.volumes
            .iter()
            .enumerate()
            .filter(|(_, volume)| volume.empty_dir.is_some())
            .map(|(index, volume)| {
                let keys = VolumeKeys::for_volume(&volume.name);
                let claim = VolumeClaimAnnotations {
                    volume: volume.name.clone(),
                    claim_name: claim_name(&pod.namespace, &pod.name, &volume.name),
                    size: pick(&[pod.annotation(&keys.size), &self.defaults.size]).to_string(),
                    storage_class: pick(&[
                        pod.annotation(&keys.storage_class),
                        &self.defaults.storage_class,
                    ])
                    .to_string(),
                    access_modes: pick(&[
                        pod.annotation(&keys.access_modes),
                        &self.defaults.access_modes,
                    ])
                    .to_string(),
                };
                VolumeConversionPlan { index, claim }
            })
            .collect()
    }
}

/// Ordered patch: volume replacements, then the annotation map if absent,
/// then recorded parameters per volume, then the marker
pub fn build_patch(
    pod: &PodView,
    plans: &[VolumeConversionPlan],
) -> Result<Patch, serde_json::Error> {
    let mut ops = Vec::with_capacity(plans.len() * 5 + 2);

    for plan in plans {
        let volume = Volume {
            name: plan.claim.volume.clone(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: plan.claim.claim_name.clone(),
                read_only: None,
            }),
            ..Default::default()
        };
        ops.push(replace(volume_path(plan.index), &volume)?);
    }

    if pod.annotations.is_none() {
        ops.push(add(annotations_path(), &BTreeMap::<String, String>::new())?);
    }

    for plan in plans {
        for (key, value) in plan.claim.entries() {
            ops.push(add(annotation_path(&key), &value)?);
        }
    }
    ops.push(add(annotation_path(CONVERTED), &CONVERTED_VALUE)?);

    Ok(Patch(ops))
}
