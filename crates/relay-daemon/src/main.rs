// SPDX-License-Identifier: MIT OR Apache-2.0
use anyhow::{Context, Result};
use clap::Parser;
use relay_config::{ConfigWarning, RelayConfig, load_config, merge_configs, validate_config};
use relay_daemon::{AppState, build_app};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "relay-daemon",
    version,
    about = "OpenAI-compatible bridge to the assistant CLI"
)]
struct Args {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config and RELAY_BIND).
    #[arg(long)]
    bind: Option<String>,

    /// Assistant CLI executable (overrides config and RELAY_CLI_COMMAND).
    #[arg(long)]
    cli_command: Option<String>,

    /// Enable debug logging for all relay components.
    #[arg(long)]
    debug: bool,
}

/// Command-line settings as a config layer over file and environment.
fn flag_overlay(args: &Args) -> RelayConfig {
    let mut overlay = RelayConfig::default();
    if let Some(bind) = &args.bind {
        overlay.bind = bind.clone();
    }
    if let Some(command) = &args.cli_command {
        overlay.cli.command = command.clone();
    }
    if args.debug {
        overlay.log_level = "debug".into();
    }
    overlay
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = merge_configs(
        load_config(args.config.as_deref()).context("load config")?,
        flag_overlay(&args),
    );

    let filter = if args.debug {
        EnvFilter::new("relay=debug")
    } else {
        EnvFilter::new(format!("relay={}", config.log_level))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let warnings: Vec<ConfigWarning> = validate_config(&config).context("validate config")?;
    for warning in &warnings {
        warn!(target: "relay_daemon", "{warning}");
    }

    let state = Arc::new(AppState::from_config(&config));
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("bind {}", config.bind))?;
    info!(
        target: "relay_daemon",
        bind = %config.bind,
        cli = %config.cli.command,
        provider = %config.provider,
        "relay-daemon listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!(target: "relay_daemon", "shutting down");
    }
}
