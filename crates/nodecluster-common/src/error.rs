//! Declared configuration errors

use thiserror::Error;

/// Node cluster configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required string field is empty
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    /// node_count is zero
    #[error("node_count must be at least 1")]
    InvalidNodeCount,

    /// disk is zero
    #[error("disk must be greater than 0")]
    InvalidDisk,

    /// provider_options.vpc.id is empty
    #[error("provider_options.vpc.id cannot be empty")]
    EmptyVpcId,

    /// provider_options.iam.instance_profile_name is empty
    #[error("provider_options.iam.instance_profile_name cannot be empty")]
    EmptyInstanceProfile,

    /// An immutable field differs between the old and new configuration
    #[error("changing '{field}' requires replacing the node cluster")]
    RequiresReplacement { field: &'static str },

    /// Failed to parse JSON configuration
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Failed to read configuration file
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create an IO error with path context
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
