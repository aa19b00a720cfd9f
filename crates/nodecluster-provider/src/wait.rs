//! Waiting for a remote resource to reach a target state.
//!
//! A lifecycle operation issues one mutating call and then polls the resource
//! through a refresh function until the reported state is in the target set.
//! Polling is sequential at a fixed minimum interval, absence is tolerated a
//! bounded number of times, and the whole run is bounded by a timeout.

use nodecluster_common::defaults;
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Configuration for one wait run.
///
/// Built fresh for every lifecycle operation; never shared between runs.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// States in which polling continues
    pub pending: BTreeSet<String>,
    /// States that end the run successfully
    pub target: BTreeSet<String>,
    /// Delay before the first poll
    pub initial_delay: Duration,
    /// Minimum delay between two polls
    pub min_poll_interval: Duration,
    /// Maximum total time for the run, including the initial delay
    pub timeout: Duration,
    /// Consecutive not-found reads tolerated before giving up
    pub max_not_found_retries: u32,
    /// Treat an exhausted not-found budget as success (the resource is gone)
    pub not_found_is_success: bool,
}

impl PollConfig {
    /// Create a configuration with the given pending and target states and
    /// default timings. Not-found is not tolerated.
    pub fn new<P, T, S>(pending: P, target: T) -> Self
    where
        P: IntoIterator<Item = S>,
        T: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pending: pending.into_iter().map(Into::into).collect(),
            target: target.into_iter().map(Into::into).collect(),
            initial_delay: defaults::default_initial_delay(),
            min_poll_interval: defaults::default_min_poll_interval(),
            timeout: defaults::default_operation_timeout(),
            max_not_found_retries: 0,
            not_found_is_success: false,
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_min_poll_interval(mut self, interval: Duration) -> Self {
        self.min_poll_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_not_found_retries(mut self, retries: u32) -> Self {
        self.max_not_found_retries = retries;
        self
    }

    /// Accept absence as the successful end of the run
    pub fn accept_not_found(mut self) -> Self {
        self.not_found_is_success = true;
        self
    }

    /// Target states joined for messages
    pub fn target_label(&self) -> String {
        join_states(&self.target)
    }
}

fn join_states(states: &BTreeSet<String>) -> String {
    states
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("', '")
}

/// Result of one refresh call that reached the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation<S> {
    /// The resource exists and reports `state`
    Found { snapshot: S, state: String },
    /// The service reports the resource as absent
    NotFound,
}

impl<S> Observation<S> {
    pub fn found(snapshot: S, state: impl Into<String>) -> Self {
        Self::Found {
            snapshot,
            state: state.into(),
        }
    }
}

/// Successful end of a wait run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled<S> {
    /// The resource reached a target state
    Reached { snapshot: S, state: String },
    /// The resource is gone and the configuration accepts that as success
    Gone,
}

impl<S> Settled<S> {
    pub fn snapshot(&self) -> Option<&S> {
        match self {
            Settled::Reached { snapshot, .. } => Some(snapshot),
            Settled::Gone => None,
        }
    }

    pub fn into_snapshot(self) -> Option<S> {
        match self {
            Settled::Reached { snapshot, .. } => Some(snapshot),
            Settled::Gone => None,
        }
    }

    pub fn is_gone(&self) -> bool {
        matches!(self, Settled::Gone)
    }
}

/// Failed end of a wait run.
#[derive(Debug, Error)]
pub enum WaitError {
    /// The refresh call itself failed; never retried
    #[error("refresh failed on poll {attempts}")]
    Remote {
        attempts: u32,
        last_state: Option<String>,
        #[source]
        source: anyhow::Error,
    },

    /// Target state not reached within the timeout
    #[error(
        "timeout after {timeout:?} waiting for state to become '{target}' (last state: {}, {attempts} polls)",
        describe_state(last_state.as_deref())
    )]
    Timeout {
        timeout: Duration,
        attempts: u32,
        target: String,
        last_state: Option<String>,
    },

    /// The resource stayed absent for longer than the not-found tolerance
    #[error("resource not found after {checks} consecutive checks")]
    NotFoundExhausted {
        checks: u32,
        last_state: Option<String>,
    },

    /// The resource reported a state outside both the pending and target sets
    #[error("unexpected state '{state}', wanted target '{expected}'")]
    UnexpectedState { state: String, expected: String },

    /// The caller's cancellation token fired
    #[error("wait cancelled after {attempts} polls")]
    Cancelled {
        attempts: u32,
        last_state: Option<String>,
    },

    /// A state is listed as both pending and target
    #[error("state '{state}' is both pending and target")]
    OverlappingStates { state: String },
}

fn describe_state(state: Option<&str>) -> String {
    match state {
        Some(s) => format!("'{}'", s),
        None => "never observed".to_string(),
    }
}

impl WaitError {
    /// Last state label observed before the run ended, if any
    pub fn last_state(&self) -> Option<&str> {
        match self {
            WaitError::Remote { last_state, .. }
            | WaitError::Timeout { last_state, .. }
            | WaitError::NotFoundExhausted { last_state, .. }
            | WaitError::Cancelled { last_state, .. } => last_state.as_deref(),
            WaitError::UnexpectedState { state, .. } => Some(state),
            WaitError::OverlappingStates { .. } => None,
        }
    }

    /// True if the resource was seen at least once during the run
    pub fn observed(&self) -> bool {
        self.last_state().is_some()
    }

    /// True if the run gave up waiting rather than hitting an error
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            WaitError::Timeout { .. } | WaitError::NotFoundExhausted { .. }
        )
    }
}

/// Wait for a resource to reach one of the target states.
///
/// `refresh` performs exactly one read per call. The run ends when the
/// observed state is a target, when the state is neither pending nor target,
/// when refresh fails, when not-found reads exceed the tolerance, or when the
/// timeout elapses.
///
/// # Example
/// ```ignore
/// let config = PollConfig::new(["Deploying"], ["Deployed"]).with_not_found_retries(60);
/// let settled = wait_for_state(&config, || refresh_node_cluster(&api, id), "node cluster").await?;
/// ```
pub async fn wait_for_state<S, F, Fut>(
    config: &PollConfig,
    refresh: F,
    resource_name: &str,
) -> Result<Settled<S>, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<Observation<S>>>,
{
    wait_for_state_with_cancel(config, None, refresh, resource_name).await
}

/// Same as [`wait_for_state`], but stops early when `cancel` fires.
///
/// Cancellation is only observed at sleep points; an in-flight refresh is
/// never interrupted.
pub async fn wait_for_state_with_cancel<S, F, Fut>(
    config: &PollConfig,
    cancel: Option<&CancellationToken>,
    mut refresh: F,
    resource_name: &str,
) -> Result<Settled<S>, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<Observation<S>>>,
{
    if let Some(state) = config.pending.intersection(&config.target).next() {
        return Err(WaitError::OverlappingStates {
            state: state.clone(),
        });
    }

    let start = Instant::now();
    let mut attempts = 0u32;
    let mut not_found = 0u32;
    let mut last_state: Option<String> = None;

    debug!(
        resource = %resource_name,
        target = %config.target_label(),
        timeout_secs = config.timeout.as_secs(),
        "Waiting for resource state"
    );

    if !pause(config.initial_delay, cancel).await {
        return Err(WaitError::Cancelled {
            attempts,
            last_state,
        });
    }

    loop {
        attempts += 1;

        match refresh().await {
            Err(e) => {
                warn!(resource = %resource_name, attempt = attempts, error = ?e, "Refresh failed");
                return Err(WaitError::Remote {
                    attempts,
                    last_state,
                    source: e,
                });
            }
            Ok(Observation::NotFound) => {
                not_found += 1;
                if not_found > config.max_not_found_retries {
                    if config.not_found_is_success {
                        info!(resource = %resource_name, attempts, "Resource is gone");
                        return Ok(Settled::Gone);
                    }
                    warn!(
                        resource = %resource_name,
                        checks = not_found,
                        "Resource still not found, giving up"
                    );
                    return Err(WaitError::NotFoundExhausted {
                        checks: not_found,
                        last_state,
                    });
                }
                debug!(
                    resource = %resource_name,
                    attempt = attempts,
                    not_found,
                    "Resource not found yet"
                );
            }
            Ok(Observation::Found { snapshot, state }) => {
                if config.target.contains(&state) {
                    info!(
                        resource = %resource_name,
                        state = %state,
                        attempts,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Resource reached target state"
                    );
                    return Ok(Settled::Reached { snapshot, state });
                }
                if !config.pending.contains(&state) {
                    warn!(
                        resource = %resource_name,
                        state = %state,
                        expected = %config.target_label(),
                        "Resource entered unexpected state"
                    );
                    return Err(WaitError::UnexpectedState {
                        state,
                        expected: config.target_label(),
                    });
                }
                // A pending read means the resource exists now
                not_found = 0;
                debug!(
                    resource = %resource_name,
                    attempt = attempts,
                    state = %state,
                    "Resource still pending"
                );
                last_state = Some(state);
            }
        }

        let elapsed = start.elapsed();
        if elapsed >= config.timeout {
            warn!(
                resource = %resource_name,
                attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                last_state = ?last_state,
                "Timed out waiting for resource state"
            );
            return Err(WaitError::Timeout {
                timeout: config.timeout,
                attempts,
                target: config.target_label(),
                last_state,
            });
        }

        if !pause(config.min_poll_interval, cancel).await {
            return Err(WaitError::Cancelled {
                attempts,
                last_state,
            });
        }
    }
}

/// Sleep for `delay`, returning false if `cancel` fired first.
async fn pause(delay: Duration, cancel: Option<&CancellationToken>) -> bool {
    match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => false,
                _ = tokio::time::sleep(delay) => true,
            }
        }
        None => {
            tokio::time::sleep(delay).await;
            true
        }
    }
}
