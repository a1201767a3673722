//! Validation of recorded claim parameters
//!
//! The webhook records whatever the pod author wrote in the per-volume
//! override annotations. Those values are only judged here, right before a
//! claim is built, so a bad value never reaches the API server.

use crate::annotations::VolumeClaimAnnotations;
use crate::controller::error::{Error, Result};
use crate::resources::naming::is_dns_label;

/// Access modes accepted on a claim
pub const VALID_ACCESS_MODES: [&str; 4] = [
    "ReadWriteOnce",
    "ReadOnlyMany",
    "ReadWriteMany",
    "ReadWriteOncePod",
];

const BINARY_SUFFIXES: [&str; 6] = ["Ki", "Mi", "Gi", "Ti", "Pi", "Ei"];
const DECIMAL_SUFFIXES: [&str; 9] = ["n", "u", "m", "k", "M", "G", "T", "P", "E"];

/// Validated parameters of a claim to create
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimSpec {
    pub name: String,
    pub size: String,
    pub access_modes: Vec<String>,
    /// `None` leaves the choice to the cluster's default storage class
    pub storage_class: Option<String>,
}

/// Validate the recorded parameters of one volume
pub fn validate_claim(claim: &VolumeClaimAnnotations) -> Result<ClaimSpec> {
    if !is_dns_label(&claim.claim_name) {
        return Err(Error::ValidationError(format!(
            "claim name '{}' is not a valid DNS-1123 label",
            claim.claim_name
        )));
    }

    let size = validate_storage_size(&claim.size)?;
    let access_modes = parse_access_modes(&claim.access_modes)?;
    let storage_class = Some(claim.storage_class.trim())
        .filter(|s| !s.is_empty())
        .map(String::from);

    Ok(ClaimSpec {
        name: claim.claim_name.clone(),
        size,
        access_modes,
        storage_class,
    })
}

/// Validate a storage quantity such as `10Gi`, `500M` or `1.5Ti`.
///
/// Returns the trimmed quantity. Zero and negative sizes are rejected.
pub fn validate_storage_size(size: &str) -> Result<String> {
    let size = size.trim();
    let invalid = || Error::ValidationError(format!("invalid storage size '{}'", size));

    let unsigned = size.strip_prefix('+').unwrap_or(size);
    let number_len = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(number_len);

    if number.is_empty() || number == "." || number.matches('.').count() > 1 {
        return Err(invalid());
    }

    let suffix_ok = suffix.is_empty()
        || BINARY_SUFFIXES.contains(&suffix)
        || DECIMAL_SUFFIXES.contains(&suffix)
        || is_exponent(suffix);
    if !suffix_ok {
        return Err(invalid());
    }

    if !number.chars().any(|c| matches!(c, '1'..='9')) {
        return Err(Error::ValidationError(format!(
            "storage size '{}' must be greater than zero",
            size
        )));
    }

    Ok(size.to_string())
}

/// `e3`, `E-2`, ... as accepted by Kubernetes quantities
fn is_exponent(suffix: &str) -> bool {
    let Some(rest) = suffix.strip_prefix(['e', 'E']) else {
        return false;
    };
    let digits = rest.strip_prefix(['+', '-']).unwrap_or(rest);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Parse a comma separated access mode list, preserving order and dropping
/// duplicates.
pub fn parse_access_modes(modes: &str) -> Result<Vec<String>> {
    let mut parsed: Vec<String> = Vec::new();
    for mode in modes.split(',').map(str::trim).filter(|m| !m.is_empty()) {
        if !VALID_ACCESS_MODES.contains(&mode) {
            return Err(Error::ValidationError(format!(
                "unsupported access mode '{}', expected one of {}",
                mode,
                VALID_ACCESS_MODES.join(", ")
            )));
        }
        if !parsed.iter().any(|m| m == mode) {
            parsed.push(mode.to_string());
        }
    }

    if parsed.is_empty() {
        return Err(Error::ValidationError(
            "at least one access mode is required".to_string(),
        ));
    }
    Ok(parsed)
}
