//! Node cluster lifecycle operations
//!
//! Each operation issues at most one mutating call and then waits for the
//! cluster to settle before returning.

use super::ClusterError;
use crate::api::NodeClusterApi;
use crate::config::Timeouts;
use crate::wait::{Observation, PollConfig, Settled, wait_for_state};
use futures::future::join_all;
use nodecluster_common::{ClusterState, NodeCluster, NodeClusterConfig};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Node cluster state handed back to the caller after an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeClusterRecord {
    pub id: String,
    pub name: String,
    pub state: String,
    pub node_count: u32,
    pub disk: u32,
    pub tags: Vec<String>,
}

impl From<NodeCluster> for NodeClusterRecord {
    fn from(cluster: NodeCluster) -> Self {
        let tags = cluster.tag_names();
        Self {
            id: cluster.uuid,
            name: cluster.name,
            state: cluster.state,
            node_count: cluster.target_num_nodes,
            disk: cluster.disk,
            tags,
        }
    }
}

/// Read one snapshot for the reconciler. A 404 is absence, not an error.
pub async fn refresh_node_cluster<A: NodeClusterApi>(
    api: &A,
    id: &str,
) -> anyhow::Result<Observation<NodeCluster>> {
    match api.get_node_cluster(id).await {
        Ok(cluster) => {
            let state = cluster.state.clone();
            Ok(Observation::found(cluster, state))
        }
        Err(e) if e.is_not_found() => Ok(Observation::NotFound),
        Err(e) => Err(e.into()),
    }
}

async fn wait_for_cluster<A: NodeClusterApi>(
    api: &A,
    id: &str,
    goal: &'static str,
    config: &PollConfig,
) -> Result<Settled<NodeCluster>, ClusterError> {
    let resource_name = format!("node cluster {id}");
    wait_for_state(config, move || refresh_node_cluster(api, id), &resource_name)
        .await
        .map_err(|source| ClusterError::Wait {
            id: id.to_string(),
            goal,
            created: false,
            source,
        })
}

/// Create a node cluster, deploy it and wait until it is deployed.
pub async fn create<A: NodeClusterApi>(
    api: &A,
    config: &NodeClusterConfig,
    timeouts: &Timeouts,
) -> Result<NodeClusterRecord, ClusterError> {
    config.validate()?;
    let request = config.to_request();

    info!(
        name = %config.name,
        provider = %config.node_provider,
        size = %config.size,
        region = %config.region,
        node_count = ?config.node_count,
        "Creating node cluster"
    );

    let cluster = api
        .create_node_cluster(&request)
        .await
        .map_err(|source| ClusterError::Api {
            action: "creating",
            id: None,
            created: false,
            source,
        })?;
    let id = cluster.uuid;
    debug!(id = %id, "Node cluster registered, deploying");

    api.deploy_node_cluster(&id)
        .await
        .map_err(|e| ClusterError::api("deploying", &id, e).after_create())?;

    let settled = wait_for_cluster(api, &id, "become ready", &timeouts.create_poll_config())
        .await
        .map_err(ClusterError::after_create)?;
    let cluster = settled
        .into_snapshot()
        .ok_or_else(|| ClusterError::Gone { id: id.clone() })?;

    info!(id = %id, nodes = cluster.current_num_nodes, "Node cluster deployed");
    Ok(cluster.into())
}

/// Read the current record, or `None` if the cluster is gone.
pub async fn read<A: NodeClusterApi>(
    api: &A,
    id: &str,
) -> Result<Option<NodeClusterRecord>, ClusterError> {
    match api.get_node_cluster(id).await {
        Ok(cluster) if cluster.lifecycle_state() == Some(ClusterState::Terminated) => {
            info!(id = %id, "Node cluster is terminated");
            Ok(None)
        }
        Ok(cluster) => {
            if !cluster.is_settled() {
                debug!(id = %id, state = %cluster.state, "Node cluster is still changing");
            }
            Ok(Some(cluster.into()))
        }
        Err(e) if e.is_not_found() => {
            info!(id = %id, "Node cluster not found");
            Ok(None)
        }
        Err(e) => Err(ClusterError::api("reading", id, e)),
    }
}

/// Apply node count and tag changes from `old` to `new` and wait for them to
/// take effect.
pub async fn update<A: NodeClusterApi>(
    api: &A,
    id: &str,
    old: &NodeClusterConfig,
    new: &NodeClusterConfig,
    timeouts: &Timeouts,
) -> Result<NodeClusterRecord, ClusterError> {
    new.validate()?;
    let delta = old.diff(new)?;

    if delta.is_empty() {
        debug!(id = %id, "Nothing to update");
        return read(api, id)
            .await?
            .ok_or_else(|| ClusterError::Gone { id: id.to_string() });
    }

    info!(
        id = %id,
        node_count = ?delta.target_num_nodes,
        retag = delta.tags.is_some(),
        "Updating node cluster"
    );

    api.update_node_cluster(id, &delta)
        .await
        .map_err(|e| ClusterError::api("updating", id, e))?;

    let settled = wait_for_cluster(api, id, "scale", &timeouts.update_poll_config()).await?;
    let cluster = settled
        .into_snapshot()
        .ok_or_else(|| ClusterError::Gone { id: id.to_string() })?;

    info!(id = %id, "Node cluster updated");
    Ok(cluster.into())
}

/// Terminate a node cluster and wait until it is gone.
///
/// A cluster that is already absent or terminated is treated as deleted.
pub async fn delete<A: NodeClusterApi>(
    api: &A,
    id: &str,
    timeouts: &Timeouts,
) -> Result<(), ClusterError> {
    match api.get_node_cluster(id).await {
        Ok(cluster) if cluster.lifecycle_state() == Some(ClusterState::Terminated) => {
            debug!(id = %id, "Node cluster already terminated");
            return Ok(());
        }
        Ok(_) => {}
        Err(e) if e.is_not_found() => {
            debug!(id = %id, "Node cluster already gone");
            return Ok(());
        }
        Err(e) => return Err(ClusterError::api("reading", id, e)),
    }

    info!(id = %id, "Terminating node cluster");
    api.terminate_node_cluster(id)
        .await
        .map_err(|e| ClusterError::api("terminating", id, e))?;

    let settled =
        wait_for_cluster(api, id, "terminate", &timeouts.delete_poll_config()).await?;
    if settled.is_gone() {
        info!(id = %id, "Node cluster removed");
    } else {
        info!(id = %id, "Node cluster terminated");
    }
    Ok(())
}

/// Delete several node clusters concurrently.
///
/// Each cluster gets its own independent wait; one failure does not stop the
/// others. Results are returned in input order.
pub async fn delete_all<A: NodeClusterApi>(
    api: &A,
    ids: &[String],
    timeouts: &Timeouts,
) -> Vec<(String, Result<(), ClusterError>)> {
    let results = join_all(ids.iter().map(|id| delete(api, id, timeouts))).await;

    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        warn!(total = ids.len(), failed, "Some node clusters failed to delete");
    }

    ids.iter().cloned().zip(results).collect()
}

/// Check whether the cluster exists, without polling.
pub async fn exists<A: NodeClusterApi>(api: &A, id: &str) -> Result<bool, ClusterError> {
    match api.get_node_cluster(id).await {
        Ok(cluster) => Ok(cluster.uuid == id),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(ClusterError::api("checking", id, e)),
    }
}
