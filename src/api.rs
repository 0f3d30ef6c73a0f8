// HTTP handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use alloy_primitives::Address;

use crate::chain::ChainSource;
use crate::history;
use crate::models::{
    AddressRequest, BalanceView, Currency, HistoryRequest, HistoryResponse, HistoryStats,
    PredictionState, RewardPreview, RewardStream, TreasuryOverview,
};
use crate::ops::{Ops, TxError};
use crate::rewards;
use crate::treasury;
use crate::AppState;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error(transparent)]
    Tx(#[from] TxError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Tx(tx) => match tx {
                TxError::Rejected => StatusCode::BAD_REQUEST,
                TxError::Invalid(_) => StatusCode::BAD_REQUEST,
                TxError::Reverted(_) => StatusCode::UNPROCESSABLE_ENTITY,
                TxError::ConfirmTimeout => StatusCode::GATEWAY_TIMEOUT,
                TxError::Network(_) => StatusCode::BAD_GATEWAY,
                TxError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        };
        let body = Json(json!({
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    raw.parse::<Address>()
        .map_err(|_| ApiError::BadRequest(format!("invalid address {:?}", raw)))
}

fn upstream(e: crate::chain::ChainError) -> ApiError {
    error!("chain read failed: {}", e);
    ApiError::Upstream(e.to_string())
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let chain_up = state.chain.block_number().await.is_ok();
    Json(json!({
        "status": if chain_up { "healthy" } else { "unhealthy" },
        "chain_rpc": if chain_up { "up" } else { "down" },
    }))
}

/// Aggregated, filtered transaction history for an address
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HistoryRequest>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let address = parse_address(&req.address)?;
    let transactions =
        history::fetch_transaction_history(&state.chain, &state.config, address, &req.filters)
            .await
            .map_err(upstream)?;

    Ok(Json(HistoryResponse {
        total: transactions.len(),
        transactions,
    }))
}

/// Summary statistics over the unfiltered history
pub async fn get_history_stats(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddressRequest>,
) -> Result<Json<HistoryStats>, ApiError> {
    let address = parse_address(&req.address)?;
    let transactions = history::fetch_transaction_history(
        &state.chain,
        &state.config,
        address,
        &Default::default(),
    )
    .await
    .map_err(upstream)?;

    Ok(Json(history::history_stats(&transactions)))
}

pub async fn get_treasury(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TreasuryOverview>, ApiError> {
    let overview = treasury::fetch_treasury_overview(&state.chain, &state.config)
        .await
        .map_err(upstream)?;
    Ok(Json(overview))
}

pub async fn get_reward_stream(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddressRequest>,
) -> Result<Json<RewardStream>, ApiError> {
    let address = parse_address(&req.address)?;
    let stream = rewards::fetch_reward_stream(&state.chain, &state.config, address)
        .await
        .map_err(upstream)?;
    Ok(Json(stream))
}

pub async fn get_prediction_state(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddressRequest>,
) -> Result<Json<PredictionState>, ApiError> {
    let address = parse_address(&req.address)?;
    let prediction = rewards::fetch_prediction_state(&state.chain, &state.config, address)
        .await
        .map_err(upstream)?;
    Ok(Json(prediction))
}

/// Underlying/stablecoin balances and the standing allowance for a track
pub async fn get_balances(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<BalanceView>, ApiError> {
    let address = parse_address(&req.address)?;
    let ops = Ops::new(&state.chain, &state.explorer, &state.config);
    let balances = ops.balances(address, req.currency).await?;
    Ok(Json(balances))
}

// ---- write path ----

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub address: String,
    pub currency: Currency,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub address: String,
    pub currency: Currency,
    pub to: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub address: String,
    pub currency: Currency,
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub address: String,
    pub target_price: String,
    pub is_above: bool,
    pub expiry_hours: u64,
    pub tier: u8,
}

fn tx_response(tx_hash: String) -> Json<serde_json::Value> {
    Json(json!({ "tx_hash": tx_hash, "status": "success" }))
}

pub async fn post_mint(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let address = parse_address(&req.address)?;
    let ops = Ops::new(&state.chain, &state.explorer, &state.config);
    let outcome = ops.deposit(address, req.currency, &req.amount).await?;
    Ok(Json(json!({
        "approve_tx": outcome.approve_tx,
        "deposit_tx": outcome.deposit_tx,
        "status": "success",
    })))
}

pub async fn post_withdraw(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let address = parse_address(&req.address)?;
    let ops = Ops::new(&state.chain, &state.explorer, &state.config);
    let tx = ops.withdraw(address, req.currency, &req.amount).await?;
    Ok(tx_response(tx))
}

pub async fn post_transfer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let address = parse_address(&req.address)?;
    let to = parse_address(&req.to)?;
    let ops = Ops::new(&state.chain, &state.explorer, &state.config);
    let tx = ops.transfer(address, req.currency, to, &req.amount).await?;
    Ok(tx_response(tx))
}

pub async fn post_transfer_preview(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<RewardPreview>, ApiError> {
    let address = parse_address(&req.address)?;
    let ops = Ops::new(&state.chain, &state.explorer, &state.config);
    let preview = ops
        .preview_transfer_rewards(address, req.currency, &req.amount)
        .await?;
    Ok(Json(preview))
}

pub async fn post_claim(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let address = parse_address(&req.address)?;
    let ops = Ops::new(&state.chain, &state.explorer, &state.config);
    let tx = ops.claim(address, req.currency).await?;
    Ok(tx_response(tx))
}

pub async fn post_predict(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let address = parse_address(&req.address)?;
    let ops = Ops::new(&state.chain, &state.explorer, &state.config);
    let tx = ops
        .predict(
            address,
            &req.target_price,
            req.is_above,
            req.expiry_hours,
            req.tier,
        )
        .await?;
    Ok(tx_response(tx))
}

pub async fn post_resolve(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddressRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let address = parse_address(&req.address)?;
    let ops = Ops::new(&state.chain, &state.explorer, &state.config);
    let tx = ops.resolve_prediction(address).await?;
    Ok(tx_response(tx))
}

pub async fn post_reset_multiplier(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddressRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let address = parse_address(&req.address)?;
    let ops = Ops::new(&state.chain, &state.explorer, &state.config);
    let tx = ops.reset_multiplier(address).await?;
    Ok(tx_response(tx))
}

pub async fn post_faucet(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let address = parse_address(&req.address)?;
    let ops = Ops::new(&state.chain, &state.explorer, &state.config);
    let tx = ops.claim_faucet(address, req.currency).await?;
    Ok(tx_response(tx))
}
