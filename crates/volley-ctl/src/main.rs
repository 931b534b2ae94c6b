//! volley-ctl — drive an Open Traffic Generator controller from the shell.
//!
//! ```bash
//! volley-ctl traffic                      # flow1 + flow2 between eth1 and eth2
//! volley-ctl bgp --timeout 90             # two eBGP peers, poll until up
//! volley-ctl stop protocol
//! volley-ctl validate --intent lab.toml   # offline, prints the OTG config
//! volley-ctl metrics flow flow1 --format json
//! ```

mod cmd;
mod output;
mod presets;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use volley_core::config::{OutputFormat, VolleyConfig};
use volley_core::{MetricsKind, Scope};

#[derive(Parser)]
#[command(name = "volley-ctl")]
#[command(version)]
#[command(about = "Open Traffic Generator session orchestrator", long_about = None)]
struct Cli {
    /// Controller base URL (overrides the config file)
    #[arg(long, global = true)]
    controller: Option<String>,

    /// Verify the controller's TLS certificate
    #[arg(long, global = true)]
    verify_tls: bool,

    /// Output format: table or json
    #[arg(long, short, global = true)]
    format: Option<OutputFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure flows, start traffic, wait, report flow counters
    Traffic {
        /// TOML intent file; the eth1/eth2 preset when omitted
        #[arg(long)]
        intent: Option<PathBuf>,
        /// Preset only: skip the eth2 → eth1 flow
        #[arg(long)]
        no_reverse: bool,
        /// Seconds to wait before collecting (overrides [wait].traffic)
        #[arg(long)]
        wait: Option<u64>,
        /// Stop traffic after collecting
        #[arg(long)]
        stop_after: bool,
    },
    /// Configure BGP peers, start protocols, wait for sessions, report peers
    Bgp {
        /// TOML intent file; the dut-eth1/dut-eth2 preset when omitted
        #[arg(long)]
        intent: Option<PathBuf>,
        /// Fixed wait in seconds instead of polling
        #[arg(long, conflicts_with = "timeout")]
        wait: Option<u64>,
        /// Give up polling for peers after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Stop protocols after collecting
        #[arg(long)]
        stop_after: bool,
    },
    /// Stop traffic or protocols on the controller
    Stop {
        /// traffic | protocol
        scope: Scope,
    },
    /// Build an intent file without contacting the controller
    Validate {
        #[arg(long)]
        intent: PathBuf,
    },
    /// Query metrics once
    Metrics {
        /// flow | bgp
        kind: MetricsKind,
        /// Entity names; all when omitted
        names: Vec<String>,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write the default config if none exists
    Init,
    /// Print the resolved config
    Show,
}

fn resolve_config(cli: &Cli) -> Result<VolleyConfig> {
    let mut config = VolleyConfig::load().context("failed to load config")?;
    if let Some(location) = &cli.controller {
        config.controller.location = location.clone();
    }
    if cli.verify_tls {
        config.controller.verify_tls = true;
    }
    if let Some(format) = cli.format {
        config.output.format = format;
    }
    config.validate()?;
    Ok(config)
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Config {
        action: ConfigCommands::Init,
    } = &cli.command
    {
        return cmd::config::cmd_config_init();
    }

    let config = resolve_config(&cli)?;
    tracing::debug!(controller = %config.controller.location, "config resolved");

    match cli.command {
        Commands::Traffic {
            intent,
            no_reverse,
            wait,
            stop_after,
        } => {
            cmd::traffic::cmd_traffic(
                &config,
                cmd::traffic::TrafficArgs {
                    intent: intent.as_deref(),
                    reverse: !no_reverse,
                    wait_secs: wait,
                    stop_after,
                },
            )
            .await
        }
        Commands::Bgp {
            intent,
            wait,
            timeout,
            stop_after,
        } => {
            cmd::bgp::cmd_bgp(
                &config,
                cmd::bgp::BgpArgs {
                    intent: intent.as_deref(),
                    wait_secs: wait,
                    timeout_secs: timeout,
                    stop_after,
                },
            )
            .await
        }
        Commands::Stop { scope } => cmd::stop::cmd_stop(&config, scope).await,
        Commands::Validate { intent } => cmd::validate::cmd_validate(&intent),
        Commands::Metrics { kind, names } => cmd::metrics::cmd_metrics(&config, kind, names).await,
        Commands::Config { action } => match action {
            ConfigCommands::Init => cmd::config::cmd_config_init(),
            ConfigCommands::Show => cmd::config::cmd_config_show(&config),
        },
    }
}
