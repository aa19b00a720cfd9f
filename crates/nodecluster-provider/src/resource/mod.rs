//! Lifecycle operations on node clusters

mod error;
mod node_cluster;

pub use error::ClusterError;
pub use node_cluster::{
    NodeClusterRecord, create, delete, delete_all, exists, read, refresh_node_cluster, update,
};
