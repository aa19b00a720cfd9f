//! nodecluster-provider - Node cluster lifecycle management
//!
//! This crate drives node clusters on a remote provisioning service through
//! their lifecycle, waiting after every mutating call until the cluster
//! reports a settled state.

pub mod api;
pub mod config;
pub mod resource;
pub mod wait;
