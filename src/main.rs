mod config;
mod engine;
mod errors;
mod estimator;
mod feeds;
mod models;
mod report;
mod server;
mod state;

use crate::engine::PricingService;
use crate::feeds::quotes::{FileQuoteProvider, QuoteProvider};
use crate::state::AppState;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("mc_pricer starting");

    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    let pricer = match PricingService::new(cfg.engine) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("pricing engine init error: {e}");
            std::process::exit(1);
        }
    };

    // A bad quote file only disables /stock-data; pricing still works
    let quotes: Option<Arc<dyn QuoteProvider>> = match &cfg.quotes_file {
        Some(path) => match FileQuoteProvider::load(path) {
            Ok(provider) => {
                tracing::info!(source = provider.name(), path = %path.display(), "quote source ready");
                Some(Arc::new(provider) as Arc<dyn QuoteProvider>)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "quote file unusable, lookups disabled: {e}");
                None
            }
        },
        None => {
            tracing::info!("QUOTES_FILE not set, ticker lookups disabled");
            None
        }
    };

    let port = cfg.server_port;
    let app_state = AppState::new(cfg, pricer, quotes);
    let app = server::router(app_state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("HTTP server listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("server error: {e}");
    }

    tracing::info!("mc_pricer stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("ctrl-c handler failed: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
