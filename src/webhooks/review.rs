//! admission.k8s.io/v1 AdmissionReview wire types
//!
//! Only the fields the mutating webhook reads or writes are modelled.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// API version of every review the webhook answers
pub const REVIEW_API_VERSION: &str = "admission.k8s.io/v1";
/// Kind of the review envelope
pub const REVIEW_KIND: &str = "AdmissionReview";
/// Patch type announced with every patch
pub const PATCH_TYPE_JSON: &str = "JSONPatch";

/// Kubernetes AdmissionReview request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    pub request: Option<AdmissionRequest>,
}

/// AdmissionRequest contains the details of the admission request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    pub uid: String,
    pub kind: GroupVersionKind,
    #[serde(default)]
    pub operation: String,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub object: Option<serde_json::Value>,
    #[serde(default)]
    pub dry_run: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    /// Core-group pod
    pub fn is_pod(&self) -> bool {
        self.group.is_empty() && self.kind == "Pod"
    }
}

/// AdmissionReview response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReviewResponse {
    pub api_version: String,
    pub kind: String,
    pub response: AdmissionResponse,
}

impl AdmissionReviewResponse {
    pub fn new(response: AdmissionResponse) -> Self {
        Self {
            api_version: REVIEW_API_VERSION.to_string(),
            kind: REVIEW_KIND.to_string(),
            response,
        }
    }
}

/// AdmissionResponse contains the result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
    /// Base64 encoded JSON patch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AdmissionStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AdmissionResponse {
    /// Allow without changes
    pub fn allow(uid: &str) -> Self {
        Self {
            uid: uid.to_string(),
            allowed: true,
            patch: None,
            patch_type: None,
            status: None,
        }
    }

    /// Allow with a serialized JSON patch
    pub fn patched(uid: &str, patch: &[u8], message: &str) -> Self {
        Self {
            uid: uid.to_string(),
            allowed: true,
            patch: Some(STANDARD.encode(patch)),
            patch_type: Some(PATCH_TYPE_JSON.to_string()),
            status: Some(AdmissionStatus {
                code: None,
                message: message.to_string(),
                reason: None,
            }),
        }
    }

    /// Deny with a diagnostic
    pub fn deny(uid: &str, code: u16, message: &str, reason: Option<&str>) -> Self {
        Self {
            uid: uid.to_string(),
            allowed: false,
            patch: None,
            patch_type: None,
            status: Some(AdmissionStatus {
                code: Some(code),
                message: message.to_string(),
                reason: reason.map(String::from),
            }),
        }
    }

    /// Decoded patch bytes, if any
    pub fn patch_bytes(&self) -> Option<Vec<u8>> {
        self.patch.as_deref().and_then(|p| STANDARD.decode(p).ok())
    }
}
