//! DPDK checkup console tool.
//!
//! Drives the TRex VM's serial console through `virtctl console`: wait for the
//! TRex server, run one-off console commands, and dump service diagnostics.

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Instant;

use dpdk_checkup::{
    format_results, CheckupConfig, CheckupStatus, Context, TrexClient, VirtctlTransport,
};

#[derive(Parser)]
#[command(name = "dpdk-checkup")]
#[command(about = "Serial-console driver for the KubeVirt DPDK checkup")]
struct Cli {
    /// Namespace of the checkup VMs
    #[arg(long, short = 'n', global = true, default_value = "default")]
    namespace: String,

    /// Path to the virtctl binary
    #[arg(long, global = true, default_value = "virtctl")]
    virtctl: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait until the TRex server answers on the VM console
    WaitReady {
        /// TRex VM name
        vm: String,

        /// Print progress on every poll and collect diagnostics on timeout
        #[arg(long, short)]
        verbose: bool,

        /// Print the checkup status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a single trex-console command and print its cleaned output
    Exec {
        /// TRex VM name
        vm: String,

        /// Console command, e.g. "stats --port 0"
        command: String,
    },

    /// Print systemd status and journal lines of the TRex service
    Diagnose {
        /// TRex VM name
        vm: String,
    },

    /// Validate a checkup parameter file and print the effective config
    Config {
        /// TOML file with a [params] table
        params: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let transport = VirtctlTransport::new(&cli.virtctl);
    let ctx = Context::background();
    let canceller = ctx.clone();
    ctrlc::set_handler(move || canceller.cancel()).context("failed to set Ctrl+C handler")?;

    match cli.command {
        Commands::WaitReady { vm, verbose, json } => {
            let client = TrexClient::new(&transport, &cli.namespace, verbose);
            wait_ready(&ctx, &client, &vm, json)
        }
        Commands::Exec { vm, command } => {
            let client = TrexClient::new(&transport, &cli.namespace, false);
            let output = client
                .run_console_command(&ctx, &vm, &command)
                .with_context(|| format!("running '{}' on {}/{}", command, cli.namespace, vm))?;
            println!("{}", output.trim());
            Ok(())
        }
        Commands::Diagnose { vm } => {
            let client = TrexClient::new(&transport, &cli.namespace, true);
            let diagnostics = client
                .collect_failure_diagnostics(&ctx, &vm)
                .with_context(|| format!("collecting diagnostics from {}/{}", cli.namespace, vm))?;
            println!("{}", "systemd service status:".blue().bold());
            println!("{}", diagnostics.status.trim_end());
            println!();
            println!("{}", "journalctl logs:".blue().bold());
            println!("{}", diagnostics.journal.trim_end());
            Ok(())
        }
        Commands::Config { params } => {
            let contents = std::fs::read_to_string(&params)
                .with_context(|| format!("reading {}", params.display()))?;
            let config = CheckupConfig::from_toml_str(&contents)
                .with_context(|| format!("invalid parameters in {}", params.display()))?;
            config.log_summary();
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn wait_ready(
    ctx: &Context,
    client: &TrexClient<'_, VirtctlTransport>,
    vm: &str,
    json: bool,
) -> Result<()> {
    println!(
        "{} {}/{}",
        "Waiting for trex-server on".cyan(),
        client.namespace(),
        vm
    );

    let start = Instant::now();
    let mut status = CheckupStatus::default();
    if let Err(e) = client.wait_for_server_to_be_ready(ctx, vm) {
        status.fail(e.to_string());
    }
    status.finalize();

    if json {
        let report = serde_json::json!({
            "status": status,
            "results": format_results(&status),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if status.succeeded {
        println!(
            "{} trex-server ready ({:.1}s)",
            "✓".green().bold(),
            start.elapsed().as_secs_f64()
        );
        Ok(())
    } else {
        println!(
            "{} trex-server not ready ({:.1}s)",
            "✗".red().bold(),
            start.elapsed().as_secs_f64()
        );
        for reason in &status.failure_reason {
            println!("    {}", reason);
        }
        bail!("trex-server readiness check failed")
    }
}
