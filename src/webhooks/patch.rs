//! JSON patch operations emitted by the mutation engine
//!
//! Operations are collected into a `json_patch::Patch` in the exact order
//! the engine pushes them. Target existence is never checked here.

use json_patch::{AddOperation, PatchOperation, ReplaceOperation};
use jsonptr::{PointerBuf, Token};
use serde::Serialize;

/// `add` operation with a serialized value
pub fn add<T: Serialize>(path: PointerBuf, value: &T) -> Result<PatchOperation, serde_json::Error> {
    Ok(PatchOperation::Add(AddOperation {
        path,
        value: serde_json::to_value(value)?,
    }))
}

/// `replace` operation with a serialized value
pub fn replace<T: Serialize>(
    path: PointerBuf,
    value: &T,
) -> Result<PatchOperation, serde_json::Error> {
    Ok(PatchOperation::Replace(ReplaceOperation {
        path,
        value: serde_json::to_value(value)?,
    }))
}

/// Escape one JSON pointer reference token
pub fn escape_segment(segment: &str) -> String {
    Token::new(segment).encoded().to_string()
}

/// Inverse of [`escape_segment`]. Malformed escapes are returned unchanged.
pub fn unescape_segment(segment: &str) -> String {
    match Token::from_encoded(segment) {
        Ok(token) => token.decoded().into_owned(),
        Err(_) => segment.to_string(),
    }
}

/// Pointer to the pod annotation map
pub fn annotations_path() -> PointerBuf {
    PointerBuf::from_tokens(["metadata", "annotations"])
}

/// Pointer to a single annotation key
pub fn annotation_path(key: &str) -> PointerBuf {
    PointerBuf::from_tokens(["metadata", "annotations", key])
}

/// Pointer to the volume at `index`
pub fn volume_path(index: usize) -> PointerBuf {
    let index = index.to_string();
    PointerBuf::from_tokens(["spec", "volumes", index.as_str()])
}
