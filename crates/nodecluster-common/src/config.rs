//! Declared node cluster configuration
//!
//! This is the strongly-typed form of what a user declares for a node
//! cluster. It is validated once, before any remote call, and then turned
//! into a create request or an update delta.

use crate::cluster::{
    IamRequest, NodeClusterRequest, NodeClusterUpdate, NodeTag, ProviderOptionsRequest,
    VpcRequest, node_type_uri, region_uri,
};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// VPC placement for the cluster's nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcOptions {
    pub id: String,
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub security_groups: Vec<String>,
}

/// IAM settings for the cluster's nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IamOptions {
    pub instance_profile_name: String,
}

/// Provider specific options, each part optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderOptions {
    #[serde(default)]
    pub vpc: Option<VpcOptions>,
    #[serde(default)]
    pub iam: Option<IamOptions>,
}

/// Declared configuration of one node cluster
///
/// `name`, `node_provider`, `size`, `region`, `disk` and `provider_options`
/// are fixed for the lifetime of a cluster. Only `node_count` and `tags` can
/// be changed in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeClusterConfig {
    pub name: String,
    /// Infrastructure provider (e.g., "aws", "digitalocean")
    pub node_provider: String,
    /// Node size (e.g., "t2.micro")
    pub size: String,
    /// Provider region (e.g., "us-east-1")
    pub region: String,
    /// Disk size in GB
    #[serde(default)]
    pub disk: Option<u32>,
    /// Target number of nodes
    #[serde(default)]
    pub node_count: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub provider_options: Option<ProviderOptions>,
}

impl NodeClusterConfig {
    /// Create a configuration with the required fields
    pub fn new(
        name: impl Into<String>,
        node_provider: impl Into<String>,
        size: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            node_provider: node_provider.into(),
            size: size.into(),
            region: region.into(),
            disk: None,
            node_count: None,
            tags: Vec::new(),
            provider_options: None,
        }
    }

    /// Set the target node count
    pub fn with_node_count(mut self, node_count: u32) -> Self {
        self.node_count = Some(node_count);
        self
    }

    /// Set the disk size in GB
    pub fn with_disk(mut self, disk: u32) -> Self {
        self.disk = Some(disk);
        self
    }

    /// Set the tags
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the provider options
    pub fn with_provider_options(mut self, options: ProviderOptions) -> Self {
        self.provider_options = Some(options);
        self
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("name", &self.name),
            ("node_provider", &self.node_provider),
            ("size", &self.size),
            ("region", &self.region),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyField(field));
            }
        }

        if self.node_count == Some(0) {
            return Err(ConfigError::InvalidNodeCount);
        }
        if self.disk == Some(0) {
            return Err(ConfigError::InvalidDisk);
        }

        if let Some(options) = &self.provider_options {
            if options.vpc.as_ref().is_some_and(|v| v.id.trim().is_empty()) {
                return Err(ConfigError::EmptyVpcId);
            }
            if options
                .iam
                .as_ref()
                .is_some_and(|i| i.instance_profile_name.trim().is_empty())
            {
                return Err(ConfigError::EmptyInstanceProfile);
            }
        }

        Ok(())
    }

    /// Build the create request body
    pub fn to_request(&self) -> NodeClusterRequest {
        NodeClusterRequest {
            name: self.name.clone(),
            region: region_uri(&self.node_provider, &self.region),
            node_type: node_type_uri(&self.node_provider, &self.size),
            disk: self.disk,
            target_num_nodes: self.node_count,
            tags: self.tags.iter().map(NodeTag::new).collect(),
            provider_options: self.provider_options.as_ref().map(|o| ProviderOptionsRequest {
                vpc: o.vpc.as_ref().map(|v| VpcRequest {
                    id: v.id.clone(),
                    subnets: v.subnets.clone(),
                    security_groups: v.security_groups.clone(),
                }),
                iam: o.iam.as_ref().map(|i| IamRequest {
                    instance_profile_name: i.instance_profile_name.clone(),
                }),
            }),
        }
    }

    /// Compute the update delta from `self` (current) to `new`
    ///
    /// Only `node_count` and `tags` may differ; any other change is rejected.
    pub fn diff(&self, new: &NodeClusterConfig) -> Result<NodeClusterUpdate, ConfigError> {
        let immutable = [
            ("name", self.name == new.name),
            ("node_provider", self.node_provider == new.node_provider),
            ("size", self.size == new.size),
            ("region", self.region == new.region),
            ("disk", self.disk == new.disk),
            (
                "provider_options",
                self.provider_options == new.provider_options,
            ),
        ];
        if let Some((field, _)) = immutable.iter().find(|(_, same)| !same) {
            return Err(ConfigError::RequiresReplacement { field: *field });
        }

        let mut update = NodeClusterUpdate::default();
        if self.node_count != new.node_count {
            update.target_num_nodes = new.node_count;
        }
        if self.tags != new.tags {
            update.tags = Some(new.tags.iter().map(NodeTag::new).collect());
        }
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn base() -> NodeClusterConfig {
        NodeClusterConfig::new("build-farm", "aws", "t2.micro", "us-east-1")
    }

    #[test]
    fn test_load_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
                "name": "build-farm",
                "node_provider": "aws",
                "size": "t2.micro",
                "region": "us-east-1",
                "node_count": 3,
                "tags": ["ci", "linux"],
                "provider_options": {{
                    "vpc": {{"id": "vpc-123", "subnets": ["subnet-a"]}},
                    "iam": {{"instance_profile_name": "nodes"}}
                }}
            }}"#
        )
        .unwrap();

        let config = NodeClusterConfig::load(file.path()).unwrap();
        assert_eq!(config.name, "build-farm");
        assert_eq!(config.node_count, Some(3));
        assert_eq!(config.disk, None);
        let vpc = config.provider_options.unwrap().vpc.unwrap();
        assert_eq!(vpc.subnets, vec!["subnet-a".to_string()]);
        assert!(vpc.security_groups.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let err = NodeClusterConfig::load(Path::new("/nonexistent/cluster.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_validate() {
        assert!(base().validate().is_ok());

        let mut config = base();
        config.size = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyField("size"))
        ));

        assert!(matches!(
            base().with_node_count(0).validate(),
            Err(ConfigError::InvalidNodeCount)
        ));
        assert!(matches!(
            base().with_disk(0).validate(),
            Err(ConfigError::InvalidDisk)
        ));

        let config = base().with_provider_options(ProviderOptions {
            vpc: Some(VpcOptions {
                id: String::new(),
                subnets: vec![],
                security_groups: vec![],
            }),
            iam: None,
        });
        assert!(matches!(config.validate(), Err(ConfigError::EmptyVpcId)));

        let config = base().with_provider_options(ProviderOptions {
            vpc: None,
            iam: Some(IamOptions {
                instance_profile_name: String::new(),
            }),
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyInstanceProfile)
        ));
    }

    #[test]
    fn test_to_request() {
        let request = base().with_node_count(2).with_tags(["ci"]).to_request();
        assert_eq!(request.region, "/api/infra/v1/region/aws/us-east-1/");
        assert_eq!(request.node_type, "/api/infra/v1/nodetype/aws/t2.micro/");
        assert_eq!(request.target_num_nodes, Some(2));
        assert_eq!(request.tags, vec![NodeTag::new("ci")]);
        assert!(request.provider_options.is_none());

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("disk").is_none());
    }

    #[test]
    fn test_diff_only_changed_fields() {
        let old = base().with_node_count(2).with_tags(["ci"]);

        let update = old.diff(&old.clone()).unwrap();
        assert!(update.is_empty());

        let update = old.diff(&old.clone().with_node_count(4)).unwrap();
        assert_eq!(update.target_num_nodes, Some(4));
        assert!(update.tags.is_none());

        let update = old.diff(&old.clone().with_tags(["ci", "gpu"])).unwrap();
        assert!(update.target_num_nodes.is_none());
        assert_eq!(update.tags.unwrap().len(), 2);
    }

    #[test]
    fn test_diff_rejects_immutable_change() {
        let old = base();
        let mut new = base();
        new.region = "eu-west-1".to_string();
        assert!(matches!(
            old.diff(&new),
            Err(ConfigError::RequiresReplacement { field: "region" })
        ));

        assert!(matches!(
            old.diff(&base().with_disk(100)),
            Err(ConfigError::RequiresReplacement { field: "disk" })
        ));
    }
}
