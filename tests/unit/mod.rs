// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Unit tests for pvc-webhook
//!
//! This module contains unit tests for:
//! - The pod mutation engine and its patches
//! - Claim naming
//! - Claim generation and validation
//! - Reconciler convergence against an in-memory claim store
//! - Process configuration

#[path = "../common/mod.rs"]
mod common;

mod config;
mod naming;
mod resources;
mod webhooks;
