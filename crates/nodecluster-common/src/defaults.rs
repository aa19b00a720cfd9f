//! Default timing values for node cluster lifecycle operations
//!
//! These match the waits the provisioning service historically needs: a
//! cluster can take most of an hour to deploy and may not be readable for a
//! while after the create call is accepted.

use std::time::Duration;

/// Overall timeout for create, update and delete (60 minutes)
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 60 * 60;

/// Delay before the first poll after a mutating call
pub const DEFAULT_INITIAL_DELAY_SECS: u64 = 10;

/// Minimum interval between two polls
pub const DEFAULT_MIN_POLL_INTERVAL_SECS: u64 = 3;

/// Consecutive not-found reads tolerated while a new cluster becomes visible
pub const DEFAULT_CREATE_NOT_FOUND_RETRIES: u32 = 60;

/// Default base URL of the provisioning API
pub const DEFAULT_API_URL: &str = "https://cloud.docker.com";

/// Default per-request HTTP timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Returns the default operation timeout
pub fn default_operation_timeout() -> Duration {
    Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS)
}

/// Returns the default initial delay
pub fn default_initial_delay() -> Duration {
    Duration::from_secs(DEFAULT_INITIAL_DELAY_SECS)
}

/// Returns the default minimum poll interval
pub fn default_min_poll_interval() -> Duration {
    Duration::from_secs(DEFAULT_MIN_POLL_INTERVAL_SECS)
}
