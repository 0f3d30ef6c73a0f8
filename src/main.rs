// RYVYN Backend Server
// Transaction-history aggregation, treasury/reward derivation and the
// protocol write path, fronted by a small HTTP API

mod abi;
mod api;
mod chain;
mod config;
mod events;
mod explorer;
mod format;
mod history;
mod models;
mod ops;
mod parse;
mod rewards;
mod treasury;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use chain::ChainClient;
use config::Config;
use explorer::ExplorerClient;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    pub chain: ChainClient,
    pub explorer: ExplorerClient,
    pub config: Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ryvyn_backend=info".parse().unwrap())
                .add_directive("hyper=warn".parse().unwrap()),
        )
        .init();

    info!("Starting RYVYN Backend Server");

    let config = Config::from_env()?;

    info!("Configuration:");
    info!("  Chain RPC: {}", config.rpc_url);
    info!("  Explorer API: {}", config.explorer_api_url);
    info!("  Chain ID: {}", config.chain_id);
    info!("  Server Port: {}", config.port);

    let state = Arc::new(AppState {
        chain: ChainClient::new(config.rpc_url.clone()),
        explorer: ExplorerClient::new(config.explorer_api_url.clone()),
        config: config.clone(),
    });

    // Setup CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .route("/health", get(api::health_check))
        // read path
        .route("/api/history", post(api::get_history))
        .route("/api/history/stats", post(api::get_history_stats))
        .route("/api/balances", post(api::get_balances))
        .route("/api/treasury", get(api::get_treasury))
        .route("/api/reward", post(api::get_reward_stream))
        .route("/api/prediction", post(api::get_prediction_state))
        // write path
        .route("/api/mint", post(api::post_mint))
        .route("/api/withdraw", post(api::post_withdraw))
        .route("/api/transfer", post(api::post_transfer))
        .route("/api/transfer/preview", post(api::post_transfer_preview))
        .route("/api/claim", post(api::post_claim))
        .route("/api/predict", post(api::post_predict))
        .route("/api/predict/resolve", post(api::post_resolve))
        .route("/api/predict/reset", post(api::post_reset_multiplier))
        .route("/api/faucet", post(api::post_faucet))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("RYVYN Backend listening on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
