use anyhow::Context;
use axum::Router;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};

use weather_core::{
    Config, GatewayState, ResolverState, gateway_router, logging::init_tracing, resolver_router,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-service", version, about = "Postal-code weather gateway and resolver")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence.
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Public front door: validates and forwards to the resolver.
    Gateway {
        #[arg(long, env = "GATEWAY_HOST", default_value = "0.0.0.0")]
        host: String,

        #[arg(short, long, env = "GATEWAY_PORT", default_value_t = 8080)]
        port: u16,
    },

    /// Internal back end: resolves locality, then weather.
    Resolver {
        #[arg(long, env = "RESOLVER_HOST", default_value = "0.0.0.0")]
        host: String,

        #[arg(short, long, env = "RESOLVER_PORT", default_value_t = 8181)]
        port: u16,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        init_tracing(&self.log_level);
        info!("Starting weather-service v{}", env!("CARGO_PKG_VERSION"));

        let config = Config::load()?;
        config.validate().context("Invalid configuration")?;

        match self.command {
            Command::Gateway { host, port } => {
                info!(resolver_url = %config.resolver_url, "Gateway configured");
                let state = GatewayState::from_config(&config)?;
                serve(gateway_router(Arc::new(state)), &host, port, "gateway").await
            }
            Command::Resolver { host, port } => {
                if config.weather_api_key().is_none() {
                    warn!("WEATHER_API_KEY is not set; lookups will fail until it is configured");
                }
                let state = ResolverState::from_config(&config)?;
                serve(resolver_router(Arc::new(state)), &host, port, "resolver").await
            }
        }
    }
}

async fn serve(router: Router, host: &str, port: u16, service: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {service} to {host}:{port}"))?;

    info!(service, addr = %listener.local_addr()?, "Server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .with_context(|| format!("{service} server error"))?;

    info!(service, "Server has been gracefully shut down");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}
