use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sso_reconciler::{ReconcilerSettings, WorkerConfig, preview_diff, run_pass, run_worker};

#[derive(Parser)]
#[command(
    name = "sso-reconciler",
    version,
    about = "Converges the RHSSO identity server and realm for a local cluster state file"
)]
struct Cli {
    /// Cluster state file (default: $SSO_STATE_PATH or sso-state.json).
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Product configuration file (default: $SSO_CONFIG_PATH, else kept in the state file).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CommandKind,
}

#[derive(Subcommand)]
enum CommandKind {
    /// Reconcile on a fixed interval until interrupted.
    Run {
        /// Seconds between passes (default: $SSO_SYNC_INTERVAL_SECS or 30).
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval_secs: Option<u64>,
    },
    /// Run a single pass and print the resulting phase.
    Once,
    /// Print the users the next pass would add to or remove from the realm.
    Diff,
}

#[tokio::main]
async fn main() -> Result<()> {
    sso_telemetry::install("sso-reconciler", env!("CARGO_PKG_VERSION"))?;
    let cli = Cli::parse();

    let mut config = WorkerConfig::from_env()?;
    if let Some(state) = cli.state {
        config.state_path = state;
    }
    if let Some(path) = cli.config {
        config.config_path = Some(path);
    }
    let settings = ReconcilerSettings::from_env();

    match cli.command {
        CommandKind::Run { interval_secs } => {
            if let Some(secs) = interval_secs {
                config.sync_interval = Duration::from_secs(secs);
            }
            run_worker(config, settings).await
        }
        CommandKind::Once => {
            let summary =
                run_pass(&config.state_path, config.config_path.as_deref(), &settings).await?;
            println!("{summary}");
            Ok(())
        }
        CommandKind::Diff => {
            let preview = preview_diff(&config.state_path).await?;
            for name in &preview.added {
                println!("+ {name}");
            }
            for name in &preview.removed {
                println!("- {name}");
            }
            if preview.added.is_empty() && preview.removed.is_empty() {
                println!("realm users match the directory");
            }
            Ok(())
        }
    }
}
