//! Node cluster lifecycle states
//!
//! The provisioning service reports a free-form state label for every node
//! cluster. `ClusterState` names the labels this provider knows about so the
//! pending/target sets of each lifecycle operation are spelled once.
//!
//! The serialized strings are the exact labels used on the wire and must not
//! change.

/// Lifecycle state labels reported by the provisioning service
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::IntoStaticStr,
)]
pub enum ClusterState {
    /// Created but not yet deployed
    #[strum(serialize = "Init")]
    Init,
    /// Nodes are being provisioned
    #[strum(serialize = "Deploying")]
    Deploying,
    /// All nodes are up
    #[strum(serialize = "Deployed")]
    Deployed,
    /// Some nodes failed to deploy
    #[strum(serialize = "Partly deployed")]
    PartlyDeployed,
    /// Node count is being changed
    #[strum(serialize = "Scaling")]
    Scaling,
    /// Nodes are being torn down
    #[strum(serialize = "Terminating")]
    Terminating,
    /// All nodes are gone but the cluster record is still being removed
    #[strum(serialize = "Empty cluster")]
    EmptyCluster,
    /// Cluster is gone
    #[strum(serialize = "Terminated")]
    Terminated,
    /// Service cannot currently reach the nodes
    #[strum(serialize = "Unavailable")]
    Unavailable,
}

impl ClusterState {
    /// The wire label for this state
    pub fn label(self) -> &'static str {
        self.into()
    }

    /// Check if the state is one a lifecycle operation settles on
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Deployed | Self::Terminated)
    }

    /// Parse a wire label, returning None for labels this provider does not know
    pub fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}
