use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use futures::FutureExt;

mod api;
mod app;
mod config;
mod db;
mod digest;
mod email;
mod error;
mod feed;
mod index;
mod mail;
mod models;
mod services;
#[cfg(test)]
mod testing;

use app::App;
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (info by default, override with RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Check for --config flag
    let config_path = if args.len() >= 3 && args[1] == "--config" {
        Some(PathBuf::from(&args[2]))
    } else {
        None
    };

    let config = Config::load(config_path.as_deref()).context("failed to load configuration")?;
    let addr = config.socket_addr()?;

    let app = App::new(&config)
        .await
        .context("failed to initialize services")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("Listening on {} (public base URL {})", addr, config.base_url());

    // Completes when the server should exit
    let shutdown = tokio::signal::ctrl_c().map(|_| ()).shared();

    axum::serve(listener, api::router(Arc::new(app)))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
