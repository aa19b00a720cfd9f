//! nodecluster: manage node clusters on a provisioning service
//!
//! Every command that changes a cluster waits until the service reports the
//! cluster as settled before exiting.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nodecluster_common::NodeClusterConfig;
use nodecluster_common::defaults::{DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
use nodecluster_provider::api::{ApiError, HttpNodeClusterApi};
use nodecluster_provider::config::{ApiConfig, ProviderConfig, Timeouts};
use nodecluster_provider::resource::{self, ClusterError};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "nodecluster")]
#[command(about = "Create, scale and delete node clusters")]
#[command(version)]
struct Args {
    #[command(flatten)]
    api: ApiArgs,

    #[command(flatten)]
    timeouts: TimeoutArgs,

    #[command(subcommand)]
    command: Command,
}

/// Provisioning service connection
#[derive(clap::Args, Debug)]
struct ApiArgs {
    /// Base URL of the provisioning service
    #[arg(long, env = "NODECLUSTER_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Account user name
    #[arg(long, env = "NODECLUSTER_USER")]
    user: String,

    /// API key
    #[arg(long, env = "NODECLUSTER_APIKEY", hide_env_values = true)]
    apikey: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    request_timeout: u64,
}

/// Per-operation wait limits (default: 60 minutes each)
#[derive(clap::Args, Debug)]
struct TimeoutArgs {
    /// Minutes to wait for a new cluster to deploy
    #[arg(long, global = true)]
    create_timeout_mins: Option<u64>,

    /// Minutes to wait for a cluster to scale
    #[arg(long, global = true)]
    update_timeout_mins: Option<u64>,

    /// Minutes to wait for a cluster to terminate
    #[arg(long, global = true)]
    delete_timeout_mins: Option<u64>,
}

impl From<ApiArgs> for ApiConfig {
    fn from(args: ApiArgs) -> Self {
        ApiConfig::new(args.user, args.apikey)
            .with_base_url(args.api_url)
            .with_request_timeout(Duration::from_secs(args.request_timeout))
    }
}

impl From<TimeoutArgs> for Timeouts {
    fn from(args: TimeoutArgs) -> Self {
        let mins = |m: u64| Duration::from_secs(m.saturating_mul(60));
        let defaults = Timeouts::default();
        Self {
            create: args.create_timeout_mins.map_or(defaults.create, mins),
            update: args.update_timeout_mins.map_or(defaults.update, mins),
            delete: args.delete_timeout_mins.map_or(defaults.delete, mins),
            ..defaults
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a node cluster and wait until it is deployed
    Create {
        /// JSON file with the cluster configuration
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Print the current state of a node cluster
    Read {
        /// Node cluster id
        id: String,
    },

    /// Change node count or tags and wait until the cluster is deployed again
    Update {
        /// Node cluster id
        id: String,

        /// Configuration the cluster was created or last updated with
        #[arg(long)]
        from: PathBuf,

        /// Desired configuration
        #[arg(long)]
        to: PathBuf,
    },

    /// Terminate node clusters and wait until they are gone
    Delete {
        /// Node cluster ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Check whether a node cluster exists
    Exists {
        /// Node cluster id
        id: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Format an error and its cause chain, plus a hint when one is known
fn format_error(e: &anyhow::Error) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(out, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(out, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    let suggestion = e
        .chain()
        .find_map(|cause| {
            cause
                .downcast_ref::<ClusterError>()
                .and_then(ClusterError::api_error)
                .or_else(|| cause.downcast_ref::<ApiError>())
        })
        .and_then(ApiError::suggestion);
    if let Some(hint) = suggestion {
        let _ = writeln!(out, "\n\x1b[36mHint:\x1b[0m {hint}");
    }
    out
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();
    let _ = write!(stderr, "{}", format_error(e));

    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    } else {
        let backtrace = e.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(stderr, "\n\x1b[2mBacktrace:\x1b[0m\n{backtrace}");
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays machine readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ProviderConfig {
        api: args.api.into(),
        timeouts: args.timeouts.into(),
    };
    info!(api = %config.api.base_url, user = %config.api.user, "Using provisioning service");

    let api = HttpNodeClusterApi::new(&config.api).context("Failed to build HTTP client")?;
    let timeouts = &config.timeouts;

    match args.command {
        Command::Create { config: path } => {
            let cluster = NodeClusterConfig::load(&path)?;
            match resource::create(&api, &cluster, timeouts).await {
                Ok(record) => print_json(&record)?,
                Err(e) => {
                    if let Some(id) = e.resource_id().filter(|_| e.resource_exists()) {
                        warn!(id = %id, "Node cluster was created but did not become ready");
                        eprintln!("Remove it with: nodecluster delete {id}");
                    }
                    return Err(e.into());
                }
            }
        }

        Command::Read { id } => match resource::read(&api, &id).await? {
            Some(record) => print_json(&record)?,
            None => anyhow::bail!("Node cluster {id} does not exist"),
        },

        Command::Update { id, from, to } => {
            let old = NodeClusterConfig::load(&from)?;
            let new = NodeClusterConfig::load(&to)?;
            let record = resource::update(&api, &id, &old, &new, timeouts).await?;
            print_json(&record)?;
        }

        Command::Delete { ids } => {
            let results = resource::delete_all(&api, &ids, timeouts).await;
            let mut failed = 0usize;
            for (id, result) in results {
                match result {
                    Ok(()) => println!("{id}: deleted"),
                    Err(e) => {
                        failed += 1;
                        // The backtrace hint is printed once, with the summary error
                        eprint!("{}", format_error(&anyhow::Error::new(e)));
                        eprintln!("{id}: failed");
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{failed} of {} node clusters failed to delete", ids.len());
            }
        }

        Command::Exists { id } => {
            println!("{}", resource::exists(&api, &id).await?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_minutes_override_defaults() {
        let timeouts = Timeouts::from(TimeoutArgs {
            create_timeout_mins: Some(5),
            update_timeout_mins: None,
            delete_timeout_mins: Some(u64::MAX),
        });
        assert_eq!(timeouts.create, Duration::from_secs(300));
        assert_eq!(timeouts.update, Timeouts::default().update);
        // Huge values saturate instead of overflowing
        assert_eq!(timeouts.delete, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn error_report_has_chain_and_hint_but_no_backtrace_note() {
        let err = ClusterError::Api {
            action: "terminating",
            id: Some("nc-1".to_string()),
            created: false,
            source: ApiError::Unauthorized {
                message: "bad key".to_string(),
            },
        };
        let report = format_error(&anyhow::Error::new(err));

        assert!(report.contains("Error terminating node cluster (nc-1)"));
        assert!(report.contains("bad key"));
        assert!(report.contains("NODECLUSTER_APIKEY"));
        assert!(!report.contains("RUST_BACKTRACE"));
    }

    #[test]
    fn cli_parses_delete_ids() {
        let args = Args::try_parse_from([
            "nodecluster",
            "--user",
            "alice",
            "--apikey",
            "key",
            "delete",
            "nc-1",
            "nc-2",
        ])
        .unwrap();
        assert!(matches!(args.command, Command::Delete { ids } if ids.len() == 2));
    }
}
