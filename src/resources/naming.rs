//! Resource name derivation
//!
//! Claim names are derived from namespace, pod and volume so that a
//! replayed admission always lands on the same claim.

use sha2::{Digest, Sha256};

/// Maximum length of a DNS-1123 label
pub const MAX_NAME_LENGTH: usize = 63;

/// Hex characters of digest appended to names that had to be shortened
const DIGEST_SUFFIX_LEN: usize = 8;

/// Turn an arbitrary string into a DNS-1123 label of at most `max_len` chars.
///
/// Lowercases, maps `_` and every character outside `[a-z0-9-]` to `-`,
/// collapses hyphen runs, trims hyphens at both ends, then truncates. A cut
/// that ends on a hyphen is trimmed again so the result stays valid.
///
/// The result is a valid label only when `input` contains at least one
/// ASCII letter or digit; otherwise it is empty. [`claim_name`] always
/// passes a `pvc-` prefix, so claim names are never empty.
pub fn sanitize_name(input: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars().flat_map(char::to_lowercase) {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '-'
        };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim_matches('-');
    // Only ASCII remains, so byte and char positions coincide.
    let cut = trimmed.get(..max_len).unwrap_or(trimmed);
    cut.trim_end_matches('-').to_string()
}

/// Derive the claim name for a volume of a pod.
///
/// Short names are the sanitized `pvc-<namespace>-<pod>-<volume>`. When that
/// exceeds [`MAX_NAME_LENGTH`], the name is shortened and suffixed with a
/// digest of the full sanitized name so distinct long inputs sharing a
/// prefix do not collide.
pub fn claim_name(namespace: &str, pod: &str, volume: &str) -> String {
    let full = sanitize_name(
        &format!("pvc-{}-{}-{}", namespace, pod, volume),
        usize::MAX,
    );
    if full.len() <= MAX_NAME_LENGTH {
        return full;
    }

    let digest = short_digest(&full);
    let head = sanitize_name(&full, MAX_NAME_LENGTH - DIGEST_SUFFIX_LEN - 1);
    format!("{}-{}", head, digest)
}

/// First eight hex characters of the SHA-256 of `input`
pub fn short_digest(input: &str) -> String {
    let hash = Sha256::digest(input.as_bytes());
    let mut encoded = hex::encode(hash);
    encoded.truncate(DIGEST_SUFFIX_LEN);
    encoded
}

/// Whether `name` is a valid DNS-1123 label
pub fn is_dns_label(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_NAME_LENGTH {
        return false;
    }
    let alnum = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    let first_last_ok = bytes.first().is_some_and(alnum) && bytes.last().is_some_and(alnum);
    first_last_ok && bytes.iter().all(|b| alnum(b) || *b == b'-')
}
