// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 robotat.dev

//! Robotat Telemetry Bridge CLI
//!
//! # Usage
//!
//! ```bash
//! # Default lab topics, broker on localhost
//! robotat-bridge
//!
//! # Point at the lab broker
//! robotat-bridge --broker-host 192.168.50.200 --broker-port 1880
//!
//! # Using a configuration file
//! robotat-bridge --config bridge.toml
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use robotat_bridge::config::BridgeConfig;
use robotat_bridge::hub::BroadcastHub;
use robotat_bridge::server::{self, AppState};
use robotat_bridge::topics::TopicRegistry;
use robotat_bridge::BrokerClient;

/// Robotat Telemetry Bridge
#[derive(Parser, Debug)]
#[command(name = "robotat-bridge")]
#[command(about = "MQTT to WebSocket telemetry bridge for the Robotat arena")]
#[command(version)]
struct Args {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// MQTT broker host
    #[arg(long)]
    broker_host: Option<String>,

    /// MQTT broker port
    #[arg(long)]
    broker_port: Option<u16>,

    /// WebSocket server bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// WebSocket server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Maximum concurrent viewer connections
    #[arg(long)]
    max_clients: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = build_config(&args)?;

    let filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Robotat Telemetry Bridge v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "broker: {}:{} (keepalive {}s)",
        config.broker.host, config.broker.port, config.broker.keepalive_secs
    );
    info!(
        "subscriptions: {:?}, command topic: '{}'",
        config.subscriptions(),
        config.topics.command
    );

    let registry = Arc::new(TopicRegistry::new());
    let (broker, supervisor, ingest_rx) = BrokerClient::new(&config, Arc::clone(&registry));
    tokio::spawn(supervisor.run());

    let hub = Arc::new(BroadcastHub::new(
        registry,
        Arc::clone(&broker),
        config.channels.session_capacity,
    ));
    hub.run(ingest_rx);

    let state = Arc::new(AppState {
        hub,
        broker,
        max_clients: config.server.max_clients,
    });
    let app = server::router(state);

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("viewer endpoint: ws://{}/ws", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("bridge stopped");
    Ok(())
}

fn build_config(args: &Args) -> Result<BridgeConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => BridgeConfig::from_file(path)?,
        None => BridgeConfig::default(),
    };

    // CLI flags override the file.
    if let Some(host) = &args.broker_host {
        config.broker.host = host.clone();
    }
    if let Some(port) = args.broker_port {
        config.broker.port = port;
    }
    if let Some(bind) = &args.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(max_clients) = args.max_clients {
        config.server.max_clients = max_clients;
    }
    if let Some(log_level) = &args.log_level {
        config.log_level = log_level.clone();
    }

    config.validate()?;
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}
