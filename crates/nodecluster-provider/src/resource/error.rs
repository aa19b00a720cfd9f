//! Lifecycle operation errors

use crate::api::ApiError;
use crate::wait::WaitError;
use nodecluster_common::ConfigError;
use thiserror::Error;

/// Failure of a node cluster lifecycle operation.
///
/// Every variant raised after the cluster was created carries its id, so the
/// caller can record or clean up the partially created cluster.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Rejected before any remote call
    #[error("invalid node cluster configuration")]
    Config(#[from] ConfigError),

    /// A single provisioning API call failed
    #[error("Error {action} node cluster{}", describe_id(id.as_deref()))]
    Api {
        action: &'static str,
        id: Option<String>,
        /// The cluster was created before this call failed
        created: bool,
        #[source]
        source: ApiError,
    },

    /// Waiting for the cluster to settle failed
    #[error("Error waiting for node cluster ({id}) to {goal}")]
    Wait {
        id: String,
        goal: &'static str,
        /// The cluster was created before the wait started
        created: bool,
        #[source]
        source: WaitError,
    },

    /// The cluster disappeared while it was expected to exist
    #[error("node cluster ({id}) no longer exists")]
    Gone { id: String },
}

fn describe_id(id: Option<&str>) -> String {
    id.map(|id| format!(" ({id})")).unwrap_or_default()
}

impl ClusterError {
    pub(crate) fn api(action: &'static str, id: &str, source: ApiError) -> Self {
        ClusterError::Api {
            action,
            id: Some(id.to_string()),
            created: false,
            source,
        }
    }

    /// Mark a failure that happened after the create call returned an id
    pub(crate) fn after_create(self) -> Self {
        match self {
            ClusterError::Api {
                action, id, source, ..
            } => ClusterError::Api {
                action,
                id,
                created: true,
                source,
            },
            ClusterError::Wait { id, goal, source, .. } => ClusterError::Wait {
                id,
                goal,
                created: true,
                source,
            },
            other => other,
        }
    }

    /// Id of the cluster the operation was working on, if one was assigned
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            ClusterError::Config(_) => None,
            ClusterError::Api { id, .. } => id.as_deref(),
            ClusterError::Wait { id, .. } | ClusterError::Gone { id } => Some(id),
        }
    }

    /// True if the cluster is known to exist remotely despite the failure
    ///
    /// A create that failed this way has left a cluster behind that must be
    /// tracked so a later delete can remove it.
    pub fn resource_exists(&self) -> bool {
        match self {
            ClusterError::Config(_) | ClusterError::Gone { .. } => false,
            ClusterError::Api {
                id,
                created,
                source,
                ..
            } => *created || (id.is_some() && !source.is_not_found()),
            ClusterError::Wait {
                created, source, ..
            } => *created || source.observed(),
        }
    }

    /// True if the operation gave up waiting rather than failing outright
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClusterError::Wait { source, .. } if source.is_timeout())
    }

    /// Underlying API error, if the failure came from the service
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            ClusterError::Api { source, .. } => Some(source),
            ClusterError::Wait {
                source: WaitError::Remote { source, .. },
                ..
            } => source.downcast_ref::<ApiError>(),
            _ => None,
        }
    }
}
