//! Shared test utilities for nodecluster
//!
//! This crate provides test helpers used by the provider's integration
//! tests. It depends on the provider, so the provider's own unit tests use
//! mockall instead.
//!
//! ## Modules
//!
//! - [`fake`]: In-process provisioning service with scripted reads
//! - [`fixtures`]: Ready-made configurations and fast timings

pub mod fake;
pub mod fixtures;

// Re-export commonly used items
pub use fake::{FakeCall, FakeNodeClusterApi, FakeRead};
pub use fixtures::{fast_timeouts, test_cluster_config, unique_cluster_name};
