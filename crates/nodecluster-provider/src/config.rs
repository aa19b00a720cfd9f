//! Configuration types for the provider

use crate::wait::PollConfig;
use nodecluster_common::ClusterState;
use nodecluster_common::defaults::{
    DEFAULT_API_URL, DEFAULT_CREATE_NOT_FOUND_RETRIES, DEFAULT_REQUEST_TIMEOUT_SECS,
    default_initial_delay, default_min_poll_interval, default_operation_timeout,
};
use std::fmt;
use std::time::Duration;

/// Provisioning service connection settings
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL of the provisioning service
    pub base_url: String,
    /// Account user name
    pub user: String,
    /// API key used as the basic auth password
    pub apikey: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl ApiConfig {
    pub fn new(user: impl Into<String>, apikey: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            user: user.into(),
            apikey: apikey.into(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

// Keep the API key out of logs
impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Lifecycle timings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
    /// Delay before the first poll of every wait
    pub initial_delay: Duration,
    /// Minimum delay between polls
    pub min_poll_interval: Duration,
    /// Not-found reads tolerated while a new cluster becomes visible
    pub create_not_found_retries: u32,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: default_operation_timeout(),
            update: default_operation_timeout(),
            delete: default_operation_timeout(),
            initial_delay: default_initial_delay(),
            min_poll_interval: default_min_poll_interval(),
            create_not_found_retries: DEFAULT_CREATE_NOT_FOUND_RETRIES,
        }
    }
}

impl Timeouts {
    /// Wait for a freshly deployed cluster: Deploying until Deployed.
    ///
    /// A new cluster may briefly read as not found, so absence is tolerated.
    pub fn create_poll_config(&self) -> PollConfig {
        PollConfig::new([ClusterState::Deploying.label()], [ClusterState::Deployed.label()])
            .with_initial_delay(self.initial_delay)
            .with_min_poll_interval(self.min_poll_interval)
            .with_timeout(self.create)
            .with_not_found_retries(self.create_not_found_retries)
    }

    /// Wait for a scale or retag: Scaling until Deployed.
    pub fn update_poll_config(&self) -> PollConfig {
        PollConfig::new([ClusterState::Scaling.label()], [ClusterState::Deployed.label()])
            .with_initial_delay(self.initial_delay)
            .with_min_poll_interval(self.min_poll_interval)
            .with_timeout(self.update)
    }

    /// Wait for teardown: Terminating or Empty cluster until Terminated.
    ///
    /// The service may drop a terminated cluster entirely, so the first
    /// not-found read also counts as success.
    pub fn delete_poll_config(&self) -> PollConfig {
        PollConfig::new(
            [
                ClusterState::Terminating.label(),
                ClusterState::EmptyCluster.label(),
            ],
            [ClusterState::Terminated.label()],
        )
        .with_initial_delay(self.initial_delay)
        .with_min_poll_interval(self.min_poll_interval)
        .with_timeout(self.delete)
        .accept_not_found()
    }
}

/// Configuration for a provider session
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api: ApiConfig,
    pub timeouts: Timeouts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_apikey() {
        let config = ApiConfig::new("alice", "s3cret-key");
        let debug = format!("{config:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("s3cret-key"));
    }

    #[test]
    fn default_timings() {
        let t = Timeouts::default();
        assert_eq!(t.create, Duration::from_secs(60 * 60));
        assert_eq!(t.initial_delay, Duration::from_secs(10));
        assert_eq!(t.min_poll_interval, Duration::from_secs(3));
        assert_eq!(t.create_not_found_retries, 60);
    }

    #[test]
    fn per_operation_poll_configs() {
        let t = Timeouts::default();

        let create = t.create_poll_config();
        assert!(create.pending.contains("Deploying"));
        assert!(create.target.contains("Deployed"));
        assert_eq!(create.max_not_found_retries, 60);
        assert!(!create.not_found_is_success);

        let update = t.update_poll_config();
        assert!(update.pending.contains("Scaling"));
        assert_eq!(update.max_not_found_retries, 0);

        let delete = t.delete_poll_config();
        assert!(delete.pending.contains("Terminating"));
        assert!(delete.pending.contains("Empty cluster"));
        assert!(delete.target.contains("Terminated"));
        assert_eq!(delete.max_not_found_retries, 0);
        assert!(delete.not_found_is_success);
    }
}
