mod checks;
mod client;
mod config;
mod report;

use clap::Parser;
use client::ProxmoxClient;
use config::Config;
use report::{print_report, ScanReport, PLUGIN_ID};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pvescan")]
#[command(version)]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        print!("{}", Config::example_yaml());
        return;
    }

    let cfg = match Config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let secret = match cfg.resolve_secret() {
        Ok(secret) => secret,
        Err(err) => {
            error!(error = %err, "failed to resolve API token secret");
            std::process::exit(1);
        }
    };

    let client = match ProxmoxClient::new(&cfg, &secret) {
        Ok(client) => client,
        Err(err) => {
            error!(error = %err, "failed to build Proxmox client");
            std::process::exit(1);
        }
    };

    // Probe failure is fatal: no report is produced. Later degradations are
    // logged inside run_checks and still yield a (partial) report.
    let checks = match checks::run_checks(&client).await {
        Ok(checks) => checks,
        Err(err) => {
            error!(error = %err, "failed to connect to Proxmox");
            std::process::exit(1);
        }
    };

    let scan = ScanReport {
        plugin_id: PLUGIN_ID,
        checks,
    };
    if let Err(err) = print_report(&scan) {
        error!(error = %err, "failed to emit report");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
