//! Claim lifecycle state machine
//!
//! Every reconcile classifies each recorded claim of a pod from current
//! object contents alone, then maps that state onto an outcome. Nothing is
//! remembered between passes, so coalesced or replayed notifications all
//! converge on the same end state.

use std::fmt;
use std::time::Duration;

use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::runtime::controller::Action;

use crate::resources::pvc::{PHASE_BOUND, PHASE_PENDING, claim_phase};

/// Requeue interval while a claim waits to be bound
pub const PENDING_REQUEUE: Duration = Duration::from_secs(5);

/// Requeue interval for a claim in an unexpected phase
pub const UNKNOWN_PHASE_REQUEUE: Duration = Duration::from_secs(10);

/// Observed state of one recorded claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimState {
    /// The pod records no claim
    NoClaim,
    /// A claim is recorded but no PVC exists yet
    PendingCreate,
    /// The PVC exists and is not bound; carries the reported phase
    Created { phase: Option<String> },
    /// The PVC is bound
    Bound,
    /// A PVC with the claim name exists but is itself being deleted
    Terminating,
    /// The pod has a deletion timestamp
    PodDeleting,
}

impl ClaimState {
    /// Classify a recorded claim from the pod's deletion state and the PVC
    /// currently stored under the claim name.
    pub fn observe(pod_deleting: bool, pvc: Option<&PersistentVolumeClaim>) -> Self {
        if pod_deleting {
            return ClaimState::PodDeleting;
        }
        match pvc {
            None => ClaimState::PendingCreate,
            Some(pvc) if pvc.metadata.deletion_timestamp.is_some() => ClaimState::Terminating,
            Some(pvc) => match claim_phase(pvc) {
                Some(PHASE_BOUND) => ClaimState::Bound,
                phase => ClaimState::Created {
                    phase: phase.map(String::from),
                },
            },
        }
    }

    /// Outcome for states that need no write.
    ///
    /// Returns `None` for `PendingCreate` and `PodDeleting`, which the
    /// reconciler resolves by talking to the API server.
    pub fn passive_outcome(&self) -> Option<ReconcileOutcome> {
        match self {
            ClaimState::NoClaim | ClaimState::Bound => Some(ReconcileOutcome::NoOp),
            ClaimState::Created { phase } if phase.as_deref() == Some(PHASE_PENDING) => {
                Some(ReconcileOutcome::RequeueAfter(PENDING_REQUEUE))
            }
            ClaimState::Created { .. } => {
                Some(ReconcileOutcome::RequeueAfter(UNKNOWN_PHASE_REQUEUE))
            }
            // The old claim has to disappear before a fresh one can be created
            ClaimState::Terminating => Some(ReconcileOutcome::RequeueAfter(PENDING_REQUEUE)),
            ClaimState::PendingCreate | ClaimState::PodDeleting => None,
        }
    }
}

impl fmt::Display for ClaimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimState::NoClaim => write!(f, "NoClaim"),
            ClaimState::PendingCreate => write!(f, "ClaimPendingCreate"),
            ClaimState::Created { phase } => {
                write!(f, "ClaimCreated({})", phase.as_deref().unwrap_or("unknown"))
            }
            ClaimState::Bound => write!(f, "ClaimBound"),
            ClaimState::Terminating => write!(f, "ClaimTerminating"),
            ClaimState::PodDeleting => write!(f, "PodDeleting"),
        }
    }
}

/// Result of one reconcile pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing to do until the pod or its claims change
    NoOp,
    /// A claim was created (or found already created by a concurrent pass)
    Created,
    /// A claim was deleted
    Deleted,
    /// Check again after the given delay
    RequeueAfter(Duration),
}

impl ReconcileOutcome {
    /// Delay before the next pass, if one is scheduled
    pub fn requeue_delay(&self) -> Option<Duration> {
        match self {
            ReconcileOutcome::NoOp | ReconcileOutcome::Deleted => None,
            // Re-check binding progress of the fresh claim
            ReconcileOutcome::Created => Some(PENDING_REQUEUE),
            ReconcileOutcome::RequeueAfter(delay) => Some(*delay),
        }
    }

    /// Merge the outcomes of two claims of the same pod.
    ///
    /// The earliest requeue wins; without requeues a write outranks a no-op.
    pub fn combine(self, other: ReconcileOutcome) -> ReconcileOutcome {
        let key = |o: &ReconcileOutcome| (o.requeue_delay().unwrap_or(Duration::MAX), o.rank());
        if key(&other) < key(&self) { other } else { self }
    }

    fn rank(&self) -> u8 {
        match self {
            ReconcileOutcome::Created => 0,
            ReconcileOutcome::RequeueAfter(_) => 1,
            ReconcileOutcome::Deleted => 2,
            ReconcileOutcome::NoOp => 3,
        }
    }

    /// Translate into the controller runtime's scheduling decision
    pub fn into_action(self) -> Action {
        match self.requeue_delay() {
            Some(delay) => Action::requeue(delay),
            None => Action::await_change(),
        }
    }
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileOutcome::NoOp => write!(f, "no-op"),
            ReconcileOutcome::Created => write!(f, "created"),
            ReconcileOutcome::Deleted => write!(f, "deleted"),
            ReconcileOutcome::RequeueAfter(d) => write!(f, "requeue-after({}s)", d.as_secs()),
        }
    }
}
