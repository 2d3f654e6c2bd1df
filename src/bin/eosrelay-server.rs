#![forbid(unsafe_code)]
//! Relay server entrypoint

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eosrelay::api::{run_server, RelayApp};
use eosrelay::config::load_config;
use eosrelay::ledger::client::HttpLedgerClient;

#[derive(Debug, Parser)]
#[command(name = "eosrelay-server", about = "HTTP relay for EOS-compatible ledgers")]
struct Args {
    /// Path to the configuration file (defaults to ./config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    tracing::info!(
        sponsor = %config.sponsor.creator,
        max_actions = config.relay.max_actions,
        "starting eosrelay"
    );

    let ledger = Arc::new(HttpLedgerClient::new(Duration::from_secs(
        config.relay.request_timeout_secs,
    ))?);
    let app = Arc::new(RelayApp::new(config, ledger));

    run_server(app).await
}
