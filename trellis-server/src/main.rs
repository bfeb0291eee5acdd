//! Trellis host server.
//!
//! Usage:
//!   trellis-server --config trellis.toml
//!   trellis-server --issue-admin-token alice
//!
//! Loads extensions once at startup, then serves their routes together with
//! the page registry endpoint until interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use trellis_auth::{load_or_generate_signing_key, TokenSigner};
use trellis_server::boot::boot;
use trellis_server::config::ServerConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trellis_types::{Claims, Role};

#[derive(Parser, Debug)]
#[command(name = "trellis-server")]
#[command(about = "Trellis host with runtime extensions")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "trellis.toml")]
    config: PathBuf,

    /// Address to listen on, overriding `server.bind`
    #[arg(short, long)]
    bind: Option<String>,

    /// Print an admin bearer token for USERNAME and exit
    #[arg(long, value_name = "USERNAME")]
    issue_admin_token: Option<String>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Trellis starting...");
    let mut config = ServerConfig::load(&args.config);
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    let key = load_or_generate_signing_key(&config.auth.key_path)
        .with_context(|| format!("Failed to load signing key {:?}", config.auth.key_path))?;
    let signer = TokenSigner::new(key);

    if let Some(username) = args.issue_admin_token {
        let token = signer.issue(&Claims::new(1, username, Role::Admin), None)?;
        println!("{token}");
        return Ok(());
    }
    let verifier = signer.verifier();

    let booted = boot(&config, Arc::new(verifier))?;
    info!(pages = booted.registry.page_count()?, "Page registry ready");

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, booted.router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Trellis stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
    }
}
