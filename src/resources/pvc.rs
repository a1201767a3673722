//! PersistentVolumeClaim generation for converted pod volumes

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, Pod, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::ResourceExt;
use kube::core::ObjectMeta;

use crate::controller::validation::ClaimSpec;
use crate::resources::common::{claim_labels, owner_reference};

/// Claim phase once a volume has been bound
pub const PHASE_BOUND: &str = "Bound";
/// Claim phase while waiting for a volume
pub const PHASE_PENDING: &str = "Pending";

/// Generate the claim backing one converted volume of `pod`
pub fn generate_claim(pod: &Pod, spec: &ClaimSpec) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(spec.name.clone()),
            namespace: pod.namespace(),
            labels: Some(claim_labels(&pod.name_any())),
            owner_references: Some(vec![owner_reference(pod)]),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(spec.access_modes.clone()),
            storage_class_name: spec.storage_class.clone(),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(spec.size.clone()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Phase reported in the claim status, if any
pub fn claim_phase(pvc: &PersistentVolumeClaim) -> Option<&str> {
    pvc.status.as_ref().and_then(|s| s.phase.as_deref())
}
