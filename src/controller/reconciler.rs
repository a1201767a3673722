//! Reconciliation logic for pods converted by the webhook
//!
//! The webhook records, per converted volume, the claim the pod expects.
//! This module makes sure that claim exists while the pod lives and removes
//! it once the pod is being deleted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use k8s_openapi::api::core::v1::Pod;
use kube::runtime::controller::Action;
use kube::runtime::events::EventType;
use kube::{Resource, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

use crate::annotations::{VolumeClaimAnnotations, has_legacy_keys};
use crate::controller::context::Context;
use crate::controller::error::{Error, Result};
use crate::controller::events::{actions, reasons};
use crate::controller::state_machine::{ClaimState, ReconcileOutcome};
use crate::controller::validation::validate_claim;
use crate::resources::common::is_owned_by;
use crate::resources::pvc::generate_claim;

/// Main reconciliation function
#[instrument(skip(pod, ctx), fields(name = %pod.name_any(), namespace = %pod.namespace().unwrap_or_default()))]
pub async fn reconcile(pod: Arc<Pod>, ctx: Arc<Context>) -> Result<Action> {
    let start = Instant::now();
    let ns = pod.namespace().unwrap_or_default();

    let result = reconcile_pod(&pod, &ctx).await;

    if let Some(ref state) = ctx.health_state {
        match &result {
            Ok(_) => state
                .metrics
                .record_reconcile(&ns, start.elapsed().as_secs_f64()),
            Err(_) => state.metrics.record_error(&ns),
        }
    }

    match result {
        Ok(outcome) => {
            ctx.clear_failures(&pod);
            debug!(outcome = %outcome, "Reconciliation completed");
            Ok(outcome.into_action())
        }
        Err(e) => {
            error!("Reconciliation failed: {}", e);
            Err(e)
        }
    }
}

/// Error policy for the controller with exponential backoff
pub fn error_policy(pod: Arc<Pod>, error: &Error, ctx: Arc<Context>) -> Action {
    let name = pod.name_any();
    let delay = retry_delay(&pod, error, &ctx);

    if error.is_retryable() {
        warn!(
            "Retryable error for {}: {:?}, requeuing in {:?}",
            name, error, delay
        );
    } else {
        error!(
            "Non-retryable error for {}: {:?}, requeuing in {:?}",
            name, error, delay
        );
    }

    Action::requeue(delay)
}

/// Delay before retrying a failed pass, growing with each consecutive
/// failure of the same pod
pub fn retry_delay(pod: &Pod, error: &Error, ctx: &Context) -> Duration {
    let attempt = ctx.record_failure(pod);
    ctx.backoff.delay_for_error(error, attempt)
}

/// Run one pass over every claim recorded on `pod`
pub async fn reconcile_pod(pod: &Pod, ctx: &Context) -> Result<ReconcileOutcome> {
    if let Some(annotations) = pod.metadata.annotations.as_ref()
        && has_legacy_keys(annotations)
    {
        warn!(
            "Pod carries retired single-claim annotations (pvc-webhook/claim); \
             recreate it so the webhook records per-volume claims"
        );
    }

    let claims = recorded_claims(pod);
    if claims.is_empty() {
        debug!(state = %ClaimState::NoClaim, "No recorded claims");
        return Ok(ReconcileOutcome::NoOp);
    }

    let ns = pod
        .namespace()
        .ok_or(Error::MissingObjectKey(".metadata.namespace"))?;
    let deleting = pod.metadata.deletion_timestamp.is_some();

    let mut outcome = ReconcileOutcome::NoOp;
    for claim in &claims {
        let step = if deleting {
            release_claim(pod, &ns, claim, ctx).await?
        } else {
            ensure_claim(pod, &ns, claim, ctx).await?
        };
        outcome = outcome.combine(step);
    }

    Ok(outcome)
}

/// Claims the webhook recorded for this pod, in volume order.
///
/// Only volumes that actually reference a claim are considered, and only
/// when the recorded claim name matches the one in the volume source.
pub fn recorded_claims(pod: &Pod) -> Vec<VolumeClaimAnnotations> {
    let Some(annotations) = pod.metadata.annotations.as_ref() else {
        return Vec::new();
    };
    let volumes = pod
        .spec
        .as_ref()
        .and_then(|s| s.volumes.as_deref())
        .unwrap_or_default();

    volumes
        .iter()
        .filter_map(|volume| {
            let source = volume.persistent_volume_claim.as_ref()?;
            let recorded = VolumeClaimAnnotations::read(annotations, &volume.name)?;
            if recorded.claim_name != source.claim_name {
                warn!(
                    volume = %volume.name,
                    recorded = %recorded.claim_name,
                    referenced = %source.claim_name,
                    "Recorded claim name does not match volume source, ignoring"
                );
                return None;
            }
            Some(recorded)
        })
        .collect()
}

/// Make sure the claim exists and report how far it has progressed
async fn ensure_claim(
    pod: &Pod,
    ns: &str,
    claim: &VolumeClaimAnnotations,
    ctx: &Context,
) -> Result<ReconcileOutcome> {
    let existing = ctx.claims.get(ns, &claim.claim_name).await?;
    let state = ClaimState::observe(false, existing.as_ref());
    debug!(pvc = %claim.claim_name, state = %state, "Observed claim");

    if let Some(outcome) = state.passive_outcome() {
        return Ok(outcome);
    }

    let spec = match validate_claim(claim) {
        Ok(spec) => spec,
        Err(e) => {
            // Retried only once the pod is re-admitted with corrected annotations
            warn!(
                pvc = %claim.claim_name,
                volume = %claim.volume,
                error = %e,
                "Skipping claim with invalid parameters"
            );
            return Ok(ReconcileOutcome::NoOp);
        }
    };

    if pod.metadata.uid.is_none() {
        return Err(Error::MissingObjectKey(".metadata.uid"));
    }

    let pvc = generate_claim(pod, &spec);
    match ctx.claims.create(ns, &pvc).await {
        Ok(()) => {
            info!(
                pvc = %spec.name,
                size = %spec.size,
                storage_class = spec.storage_class.as_deref().unwrap_or("<cluster default>"),
                access_modes = %spec.access_modes.join(","),
                "Created claim for pod"
            );
            if let Some(ref state) = ctx.health_state {
                state.metrics.record_claim_created(ns);
            }
            ctx.events
                .publish(
                    &pod.object_ref(&()),
                    EventType::Normal,
                    reasons::PVC_PROVISIONED,
                    actions::PROVISION,
                    Some(format!("Created PVC {} for Pod {}", spec.name, pod.name_any())),
                )
                .await;
            Ok(ReconcileOutcome::Created)
        }
        Err(e) if e.is_already_exists() => {
            debug!(pvc = %spec.name, "Claim created concurrently");
            Ok(ReconcileOutcome::Created)
        }
        Err(e) => Err(e),
    }
}

/// Delete the claim of a pod that is going away
async fn release_claim(
    pod: &Pod,
    ns: &str,
    claim: &VolumeClaimAnnotations,
    ctx: &Context,
) -> Result<ReconcileOutcome> {
    let existing = ctx.claims.get(ns, &claim.claim_name).await?;
    let state = ClaimState::observe(true, existing.as_ref());
    debug!(pvc = %claim.claim_name, state = %state, "Observed claim");

    let Some(existing) = existing else {
        debug!(pvc = %claim.claim_name, "Claim already gone");
        return Ok(ReconcileOutcome::NoOp);
    };

    if existing.metadata.deletion_timestamp.is_some() {
        debug!(pvc = %claim.claim_name, "Claim already terminating");
        return Ok(ReconcileOutcome::NoOp);
    }

    if let Some(uid) = pod.metadata.uid.as_deref()
        && !is_owned_by(existing.owner_references(), uid)
    {
        warn!(
            pvc = %claim.claim_name,
            "Claim is not owned by this pod, leaving it in place"
        );
        return Ok(ReconcileOutcome::NoOp);
    }

    match ctx.claims.delete(ns, &claim.claim_name).await {
        Ok(()) => {
            info!(pvc = %claim.claim_name, "Deleted claim of terminating pod");
            if let Some(ref state) = ctx.health_state {
                state.metrics.record_claim_deleted(ns);
            }
            ctx.events
                .publish(
                    &pod.object_ref(&()),
                    EventType::Normal,
                    reasons::PVC_DELETED,
                    actions::DELETE,
                    Some(format!(
                        "Deleted PVC {} of terminating Pod {}",
                        claim.claim_name,
                        pod.name_any()
                    )),
                )
                .await;
            Ok(ReconcileOutcome::Deleted)
        }
        Err(e) if e.is_not_found() => Ok(ReconcileOutcome::NoOp),
        Err(e) => Err(e),
    }
}
