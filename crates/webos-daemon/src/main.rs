//! WebOS Daemon - REST API for the WebOS desktop
//!
//! Serves the assistant, developer and notification endpoints over HTTP.

mod assistant;
mod developer;
mod notifications;
mod rpc;
mod state;

use anyhow::{Context, Result};
use axum::routing::get;
use chrono::Utc;
use clap::Parser;
use notifications::NotificationStore;
use state::DaemonState;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use webos_protocol::DEFAULT_API_ADDR;

#[derive(Parser)]
#[command(name = "webos-daemon", about = "WebOS REST API server")]
struct Cli {
    /// Listen address
    #[arg(long, default_value = DEFAULT_API_ADDR)]
    listen: String,

    /// Simulated assistant processing time in milliseconds
    #[arg(long, default_value_t = 1000)]
    ai_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    info!("Starting WebOS daemon on {}", cli.listen);

    let state = Arc::new(DaemonState::new(
        NotificationStore::seeded(Utc::now()),
        Duration::from_millis(cli.ai_delay_ms),
    ));

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&cli.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", cli.listen))?;
    info!("Listening on {}", cli.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}

fn router(state: Arc<DaemonState>) -> axum::Router {
    axum::Router::new()
        .route("/api/ai", axum::routing::post(rpc::post_ai))
        .route("/api/developer", get(rpc::get_developer).post(rpc::post_developer))
        .route(
            "/api/notifications",
            get(rpc::get_notifications)
                .post(rpc::post_notification)
                .delete(rpc::delete_notification),
        )
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(state)
}
