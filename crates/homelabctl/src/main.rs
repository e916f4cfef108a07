//! Homelab setup CLI.
//!
//! Unified front-end for the setup operations. Only the pre-flight
//! checks are implemented natively so far; the remaining steps still
//! live in the legacy bash scripts and their subcommands say so.

use clap::{Parser, Subcommand};
use homelab_common::display;
use homelabctl::preflight;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "homelabctl")]
#[command(about = "UBlue uCore homelab setup tooling", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run pre-flight system checks
    Preflight,

    /// Run all setup steps
    RunAll,

    /// Configure user account for container management
    User,

    /// Create directory structure for containers and data
    Directories,

    /// Configure WireGuard VPN
    Wireguard,

    /// Configure NFS mounts
    Nfs,

    /// Configure container services
    Containers,

    /// Deploy and start all services
    Deploy,

    /// Run system diagnostics and troubleshooting
    Troubleshoot {
        /// Run all diagnostics
        #[arg(long, short = 'a')]
        all: bool,

        /// Check services only
        #[arg(long, short = 's')]
        services: bool,

        /// Check network only
        #[arg(long, short = 'n')]
        network: bool,

        /// Check storage only
        #[arg(long, short = 'd')]
        storage: bool,

        /// Collect diagnostic logs
        #[arg(long, short = 'l')]
        logs: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let code = match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            display::error(&format!("Fatal error: {:#}", e));
            1
        }
    };

    std::process::exit(code);
}

fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Preflight => preflight::run(),
        Commands::RunAll => run_all(),
        Commands::User
        | Commands::Directories
        | Commands::Wireguard
        | Commands::Nfs
        | Commands::Containers
        | Commands::Deploy
        | Commands::Troubleshoot { .. } => Ok(not_implemented()),
    }
}

fn run_all() -> anyhow::Result<i32> {
    display::header("Starting full homelab setup");

    display::info("Step 1/7: Preflight checks");
    if preflight::run()? != 0 {
        println!();
        display::error("Preflight checks failed. Aborting setup.");
        return Ok(1);
    }

    println!();
    display::success("Preflight checks passed");
    println!();

    Ok(not_implemented())
}

fn not_implemented() -> i32 {
    display::error("Not yet implemented - use the bash scripts for now");
    1
}
