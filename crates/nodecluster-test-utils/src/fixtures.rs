//! Test fixtures

use nodecluster_common::NodeClusterConfig;
use nodecluster_provider::config::Timeouts;
use std::time::Duration;

/// Timings small enough that a full lifecycle takes a few virtual seconds.
///
/// Tests still run with a paused tokio clock; these only keep the number of
/// polls readable.
pub fn fast_timeouts() -> Timeouts {
    Timeouts {
        create: Duration::from_secs(30),
        update: Duration::from_secs(30),
        delete: Duration::from_secs(30),
        initial_delay: Duration::from_secs(1),
        min_poll_interval: Duration::from_secs(1),
        create_not_found_retries: 5,
    }
}

/// Generate a unique cluster name for tests.
///
/// # Example
///
/// ```
/// use nodecluster_test_utils::unique_cluster_name;
///
/// let name = unique_cluster_name();
/// assert!(name.starts_with("test-"));
/// ```
pub fn unique_cluster_name() -> String {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("test-{}-{}", std::process::id(), counter)
}

/// A valid two-node configuration
pub fn test_cluster_config() -> NodeClusterConfig {
    NodeClusterConfig::new(unique_cluster_name(), "aws", "t2.micro", "us-east-1")
        .with_node_count(2)
        .with_tags(["test"])
}
