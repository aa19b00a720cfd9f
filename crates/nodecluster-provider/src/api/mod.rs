//! Provisioning service access
//!
//! [`NodeClusterApi`] is the seam between lifecycle operations and the remote
//! service. [`HttpNodeClusterApi`] talks to the real service; tests use the
//! generated mock or the in-memory fake from the test utilities.

mod error;
mod http;

pub use error::{ApiError, classify_status};
pub use http::HttpNodeClusterApi;

use nodecluster_common::{NodeCluster, NodeClusterRequest, NodeClusterUpdate};

/// Node cluster calls offered by the provisioning service.
///
/// Every call is a single request. Nothing here waits for the cluster to
/// settle; that is the job of [`crate::wait`].
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait NodeClusterApi: Send + Sync {
    /// Register a new node cluster. The cluster starts in "Init".
    async fn create_node_cluster(
        &self,
        request: &NodeClusterRequest,
    ) -> Result<NodeCluster, ApiError>;

    /// Ask the service to start provisioning nodes
    async fn deploy_node_cluster(&self, id: &str) -> Result<(), ApiError>;

    /// Read the current snapshot
    async fn get_node_cluster(&self, id: &str) -> Result<NodeCluster, ApiError>;

    /// Change node count and/or tags
    async fn update_node_cluster(
        &self,
        id: &str,
        update: &NodeClusterUpdate,
    ) -> Result<(), ApiError>;

    /// Start tearing the cluster down
    async fn terminate_node_cluster(&self, id: &str) -> Result<(), ApiError>;
}
