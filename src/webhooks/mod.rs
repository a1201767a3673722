//! Mutating admission webhook for pods
//!
//! Converts `emptyDir` volumes into claim-backed volumes at admission time.
//! The controller picks up the recorded claim parameters afterwards.

pub mod mutation;
pub mod patch;
pub mod review;
mod server;

pub use mutation::{MutationEngine, MutationError, PodView, VolumeConversionPlan, build_patch};
pub use patch::{annotation_path, escape_segment, unescape_segment, volume_path};
pub use review::{AdmissionRequest, AdmissionResponse, AdmissionReview, GroupVersionKind};
pub use server::{
    MUTATE_PATH, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT, WebhookError, WebhookState,
    create_webhook_router, run_webhook_server,
};
