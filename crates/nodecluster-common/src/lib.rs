//! nodecluster-common - Shared node cluster types
//!
//! This crate provides the types shared by the provider and its test
//! helpers, without any HTTP or runtime dependencies.
//!
//! ## Modules
//!
//! - [`cluster`]: Snapshot and request bodies exchanged with the provisioning service
//! - [`config`]: Declared node cluster configuration and validation
//! - [`defaults`]: Default lifecycle timings
//! - [`error`]: Configuration errors
//! - [`state`]: Lifecycle state labels

pub mod cluster;
pub mod config;
pub mod defaults;
pub mod error;
pub mod state;

// Re-export commonly used types
pub use cluster::{NodeCluster, NodeClusterRequest, NodeClusterUpdate, NodeTag};
pub use config::{IamOptions, NodeClusterConfig, ProviderOptions, VpcOptions};
pub use error::ConfigError;
pub use state::ClusterState;
