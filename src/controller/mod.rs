pub mod client;
pub mod context;
pub mod error;
pub mod events;
pub mod reconciler;
pub mod state_machine;
pub mod validation;

pub use client::{ClaimClient, KubeClaimClient};
pub use context::Context;
pub use error::{BackoffConfig, Error, Result};
pub use events::{EventPublisher, KubeEventPublisher, NoopEventPublisher};
pub use reconciler::{error_policy, reconcile, reconcile_pod, recorded_claims, retry_delay};
pub use state_machine::{ClaimState, PENDING_REQUEUE, ReconcileOutcome, UNKNOWN_PHASE_REQUEUE};
pub use validation::{ClaimSpec, validate_claim};
