//! In-process provisioning service
//!
//! `FakeNodeClusterApi` keeps clusters in memory and lets a test script what
//! each read returns after a mutating call, so lifecycle operations can be
//! driven through realistic state sequences without a network.

use nodecluster_common::cluster::{node_type_uri, region_uri};
use nodecluster_common::{NodeCluster, NodeClusterRequest, NodeClusterUpdate};
use nodecluster_provider::api::{ApiError, NodeClusterApi};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

/// What one read of a cluster returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeRead {
    /// 404 this time; the cluster stays stored
    Missing,
    /// Move the stored cluster to this state and return it
    State(&'static str),
    /// Drop the cluster from the store and return 404
    Removed,
    /// 500 from the service
    Error,
}

/// Calls received by the fake, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    Create { name: String },
    Deploy { id: String },
    Get { id: String },
    Update { id: String, update: NodeClusterUpdate },
    Terminate { id: String },
}

#[derive(Default)]
struct Inner {
    clusters: BTreeMap<String, NodeCluster>,
    scripts: HashMap<String, VecDeque<FakeRead>>,
    after_deploy: Vec<FakeRead>,
    after_update: Vec<FakeRead>,
    after_terminate: Vec<FakeRead>,
    fail_mutations: bool,
    next_id: u32,
    calls: Vec<FakeCall>,
}

/// Scriptable in-memory implementation of [`NodeClusterApi`].
///
/// Reads with an empty script return the stored cluster unchanged.
#[derive(Default)]
pub struct FakeNodeClusterApi {
    inner: Mutex<Inner>,
}

impl FakeNodeClusterApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads that follow a deploy call
    pub fn on_deploy(self, reads: impl IntoIterator<Item = FakeRead>) -> Self {
        self.inner.lock().unwrap().after_deploy = reads.into_iter().collect();
        self
    }

    /// Reads that follow an update call
    pub fn on_update(self, reads: impl IntoIterator<Item = FakeRead>) -> Self {
        self.inner.lock().unwrap().after_update = reads.into_iter().collect();
        self
    }

    /// Reads that follow a terminate call
    pub fn on_terminate(self, reads: impl IntoIterator<Item = FakeRead>) -> Self {
        self.inner.lock().unwrap().after_terminate = reads.into_iter().collect();
        self
    }

    /// Reject every mutating call with a 500
    pub fn failing_mutations(self) -> Self {
        self.inner.lock().unwrap().fail_mutations = true;
        self
    }

    /// Store an existing cluster
    pub fn with_cluster(self, cluster: NodeCluster) -> Self {
        self.inner
            .lock()
            .unwrap()
            .clusters
            .insert(cluster.uuid.clone(), cluster);
        self
    }

    /// Replace the pending reads for one cluster
    pub fn script_reads(&self, id: &str, reads: impl IntoIterator<Item = FakeRead>) {
        self.inner
            .lock()
            .unwrap()
            .scripts
            .insert(id.to_string(), reads.into_iter().collect());
    }

    /// Stored cluster, if any
    pub fn cluster(&self, id: &str) -> Option<NodeCluster> {
        self.inner.lock().unwrap().clusters.get(id).cloned()
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Number of reads issued for `id`
    pub fn read_count(&self, id: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| matches!(c, FakeCall::Get { id: got } if got == id))
            .count()
    }

    /// Number of calls that would change remote state
    pub fn mutation_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| !matches!(c, FakeCall::Get { .. }))
            .count()
    }
}

/// A stored cluster in `state`
pub fn cluster(id: &str, state: &str) -> NodeCluster {
    NodeCluster {
        uuid: id.to_string(),
        name: format!("cluster-{id}"),
        state: state.to_string(),
        region: region_uri("aws", "us-east-1"),
        node_type: node_type_uri("aws", "t2.micro"),
        disk: 60,
        target_num_nodes: 1,
        current_num_nodes: 1,
        tags: Vec::new(),
    }
}

fn server_error() -> ApiError {
    ApiError::Http {
        status: 500,
        message: "injected failure".to_string(),
    }
}

fn not_found(id: &str) -> ApiError {
    ApiError::NotFound { id: id.to_string() }
}

impl Inner {
    fn mutate(&mut self, id: &str) -> Result<&mut NodeCluster, ApiError> {
        if self.fail_mutations {
            return Err(server_error());
        }
        self.clusters.get_mut(id).ok_or_else(|| not_found(id))
    }

    fn script(&mut self, id: &str, reads: Vec<FakeRead>) {
        self.scripts.insert(id.to_string(), reads.into());
    }
}

impl NodeClusterApi for FakeNodeClusterApi {
    async fn create_node_cluster(
        &self,
        request: &NodeClusterRequest,
    ) -> Result<NodeCluster, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(FakeCall::Create {
            name: request.name.clone(),
        });
        if inner.fail_mutations {
            return Err(server_error());
        }

        inner.next_id += 1;
        let created = NodeCluster {
            uuid: format!("nc-{:04}", inner.next_id),
            name: request.name.clone(),
            state: "Init".to_string(),
            region: request.region.clone(),
            node_type: request.node_type.clone(),
            disk: request.disk.unwrap_or(60),
            target_num_nodes: request.target_num_nodes.unwrap_or(1),
            current_num_nodes: 0,
            tags: request.tags.clone(),
        };
        inner
            .clusters
            .insert(created.uuid.clone(), created.clone());
        Ok(created)
    }

    async fn deploy_node_cluster(&self, id: &str) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(FakeCall::Deploy { id: id.to_string() });
        inner.mutate(id)?.state = "Deploying".to_string();
        let reads = inner.after_deploy.clone();
        inner.script(id, reads);
        Ok(())
    }

    async fn get_node_cluster(&self, id: &str) -> Result<NodeCluster, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(FakeCall::Get { id: id.to_string() });

        let step = inner.scripts.get_mut(id).and_then(VecDeque::pop_front);
        match step {
            Some(FakeRead::Missing) => Err(not_found(id)),
            Some(FakeRead::Error) => Err(server_error()),
            Some(FakeRead::Removed) => {
                inner.clusters.remove(id);
                Err(not_found(id))
            }
            Some(FakeRead::State(state)) => {
                let cluster = inner.clusters.get_mut(id).ok_or_else(|| not_found(id))?;
                cluster.state = state.to_string();
                if state == "Deployed" {
                    cluster.current_num_nodes = cluster.target_num_nodes;
                }
                Ok(cluster.clone())
            }
            None => inner.clusters.get(id).cloned().ok_or_else(|| not_found(id)),
        }
    }

    async fn update_node_cluster(
        &self,
        id: &str,
        update: &NodeClusterUpdate,
    ) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(FakeCall::Update {
            id: id.to_string(),
            update: update.clone(),
        });

        let cluster = inner.mutate(id)?;
        if let Some(n) = update.target_num_nodes {
            cluster.target_num_nodes = n;
        }
        if let Some(tags) = &update.tags {
            cluster.tags = tags.clone();
        }
        cluster.state = "Scaling".to_string();

        let reads = inner.after_update.clone();
        inner.script(id, reads);
        Ok(())
    }

    async fn terminate_node_cluster(&self, id: &str) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(FakeCall::Terminate { id: id.to_string() });
        inner.mutate(id)?.state = "Terminating".to_string();
        let reads = inner.after_terminate.clone();
        inner.script(id, reads);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_reads_then_stored_state() {
        let fake = FakeNodeClusterApi::new().with_cluster(cluster("a", "Deployed"));
        fake.script_reads("a", [FakeRead::Missing, FakeRead::State("Scaling")]);

        assert!(fake.get_node_cluster("a").await.unwrap_err().is_not_found());
        assert_eq!(fake.get_node_cluster("a").await.unwrap().state, "Scaling");
        assert_eq!(fake.get_node_cluster("a").await.unwrap().state, "Scaling");
        assert_eq!(fake.read_count("a"), 3);
        assert_eq!(fake.mutation_count(), 0);
    }

    #[tokio::test]
    async fn removed_cluster_stays_gone() {
        let fake = FakeNodeClusterApi::new().with_cluster(cluster("a", "Terminating"));
        fake.script_reads("a", [FakeRead::Removed]);

        assert!(fake.get_node_cluster("a").await.unwrap_err().is_not_found());
        assert!(fake.cluster("a").is_none());
        assert!(fake.get_node_cluster("a").await.unwrap_err().is_not_found());
    }
}
