//! Node cluster snapshot and request types
//!
//! `NodeCluster` is what the provisioning service returns when a cluster is
//! read. `NodeClusterRequest` and `NodeClusterUpdate` are the bodies sent for
//! create and update.

use crate::state::ClusterState;
use serde::{Deserialize, Serialize};

/// Tag attached to a node cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTag {
    pub name: String,
}

impl NodeTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A node cluster as read from the provisioning service at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeCluster {
    /// Stable identifier for the lifetime of the cluster
    pub uuid: String,
    pub name: String,
    /// Lifecycle state label (see [`crate::ClusterState`])
    pub state: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub node_type: String,
    #[serde(default)]
    pub disk: u32,
    #[serde(default)]
    pub target_num_nodes: u32,
    #[serde(default)]
    pub current_num_nodes: u32,
    #[serde(default)]
    pub tags: Vec<NodeTag>,
}

impl NodeCluster {
    /// Known lifecycle state, or None for a label this provider does not know
    pub fn lifecycle_state(&self) -> Option<ClusterState> {
        ClusterState::parse(&self.state)
    }

    /// True once the cluster has settled on Deployed or Terminated
    pub fn is_settled(&self) -> bool {
        self.lifecycle_state().is_some_and(ClusterState::is_terminal)
    }

    /// Tag names in service order
    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name.clone()).collect()
    }
}

/// VPC placement sent to the provisioning service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VpcRequest {
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<String>,
}

/// IAM settings sent to the provisioning service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IamRequest {
    pub instance_profile_name: String,
}

/// Provider specific options sent to the provisioning service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderOptionsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc: Option<VpcRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iam: Option<IamRequest>,
}

/// Body of a create call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeClusterRequest {
    pub name: String,
    /// Region resource URI
    pub region: String,
    /// Node type resource URI
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_num_nodes: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<NodeTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_options: Option<ProviderOptionsRequest>,
}

/// Body of an update call: only the fields that changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeClusterUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_num_nodes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<NodeTag>>,
}

impl NodeClusterUpdate {
    /// True when there is nothing to send
    pub fn is_empty(&self) -> bool {
        self.target_num_nodes.is_none() && self.tags.is_none()
    }
}

/// Region resource URI for a provider and region name
pub fn region_uri(provider: &str, region: &str) -> String {
    format!("/api/infra/v1/region/{}/{}/", provider, region)
}

/// Node type resource URI for a provider and size
pub fn node_type_uri(provider: &str, size: &str) -> String {
    format!("/api/infra/v1/nodetype/{}/{}/", provider, size)
}
