// View models for the RYVYN backend

use serde::{Deserialize, Serialize};

/// Stablecoin track a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    USD,
    IDR,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::IDR => "IDR",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Mint,
    Withdraw,
    Claim,
    TransferSent,
    TransferReceived,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Mint => "mint",
            TransactionType::Withdraw => "withdraw",
            TransactionType::Claim => "claim",
            TransactionType::TransferSent => "transfer_sent",
            TransactionType::TransferReceived => "transfer_received",
        }
    }
}

/// Historical records are built from mined logs only, so they are always
/// `Success`; the other variants exist for live write-path reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Success,
    Pending,
    Failed,
}

/// One entry of the unified, per-address transaction log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique within one merged set: type + currency + source id + index.
    pub id: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    /// Display value, raw fixed-point amount / 10^6. Not for settlement.
    pub amount: f64,
    /// Unix seconds.
    pub timestamp: i64,
    pub block_number: u64,
    pub tx_hash: String,
    /// Counterparty address, only on received transfers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Counterparty address, only on sent transfers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub status: TransactionStatus,
    pub currency: Currency,
}

/// Optional constraints over the merged transaction list. An omitted field
/// means no constraint for that dimension; present fields AND-combine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilters {
    #[serde(rename = "type")]
    pub tx_type: Option<TransactionType>,
    pub currency: Option<Currency>,
    /// Inclusive lower bound, Unix seconds.
    pub date_from: Option<i64>,
    /// Inclusive upper bound, Unix seconds.
    pub date_to: Option<i64>,
    /// Case-insensitive substring over tx hash and type.
    pub search: Option<String>,
}

/// Request to fetch the transaction history for an address
#[derive(Debug, Deserialize)]
pub struct HistoryRequest {
    pub address: String,
    #[serde(default)]
    pub filters: TransactionFilters,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub transactions: Vec<Transaction>,
    pub total: usize,
}

/// Request for per-address views (stats, rewards, predictions)
#[derive(Debug, Deserialize)]
pub struct AddressRequest {
    pub address: String,
}

/// Summary counters over the merged transaction list
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct HistoryStats {
    pub mints: u64,
    pub withdrawals: u64,
    pub transfers_sent: u64,
    pub transfers_received: u64,
    pub claims: u64,
    pub usd_volume: f64,
    pub idr_volume: f64,
}

/// Vesting reward accrual view
#[derive(Debug, Clone, Serialize)]
pub struct RewardStream {
    /// Currently claimable balance.
    pub claimable_balance: f64,
    /// Accrual per second at the current flow rate.
    pub flow_rate_per_second: f64,
    /// Vesting cap: locked + vested.
    pub max_claimable: f64,
    pub is_streaming: bool,
    /// Unix seconds the view was derived.
    pub last_updated: i64,
}

/// An open price prediction, absent when stake or expiry is zero
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivePrediction {
    /// Oracle units, 8 decimals, converted for display.
    pub target_price: f64,
    /// Unix seconds.
    pub expiry: i64,
    pub stake_amount: f64,
    pub tier: u8,
    pub is_above: bool,
    pub resolved: bool,
    pub won: bool,
}

/// Stake requirement and multipliers for one risk tier
#[derive(Debug, Clone, Serialize)]
pub struct TierQuote {
    pub name: &'static str,
    pub stake_percent: f64,
    pub required_stake: f64,
    pub win_multiplier: f64,
    pub loss_multiplier: f64,
}

/// Prediction-boost view for one address
#[derive(Debug, Serialize)]
pub struct PredictionState {
    pub current_price: f64,
    pub active_prediction: Option<ActivePrediction>,
    pub can_resolve: bool,
    /// Current flow multiplier, e.g. 1.25.
    pub multiplier: f64,
    /// Total reward-token balance (locked + vested).
    pub bond_balance: f64,
    pub tiers: Vec<TierQuote>,
}

/// Token balances for one track, with formatted display strings
#[derive(Debug, Serialize)]
pub struct BalanceView {
    pub currency: Currency,
    pub underlying: f64,
    pub underlying_display: String,
    pub stablecoin: f64,
    pub stablecoin_display: String,
    /// Standing approval toward the stablecoin contract.
    pub allowance: f64,
}

/// Reward split preview for a pending transfer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardPreview {
    pub sender_reward: f64,
    pub receiver_reward: f64,
    /// Percent shares as the handler reports them.
    pub sender_share: u64,
    pub receiver_share: u64,
}

/// One treasury allocation bucket for display
#[derive(Debug, Clone, Serialize)]
pub struct TreasuryAsset {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Percent of total deposited funds, two decimals.
    pub allocation: f64,
    pub value: f64,
    pub apy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidityStatus {
    Healthy,
    Warning,
}

/// Hot-wallet liquidity health for one track
#[derive(Debug, Serialize)]
pub struct LiquidityState {
    pub hot_wallet_value: f64,
    /// Minimum healthy hot-wallet share of TVL.
    pub threshold: f64,
    pub status: LiquidityStatus,
    pub strategy_value: f64,
    pub strategy_label: &'static str,
    pub total_tvl: f64,
}

/// Pool-wide yield figures
#[derive(Debug, Serialize)]
pub struct YieldMetrics {
    pub unallocated_pool: f64,
    pub current_apy: f64,
    pub yield_per_second: f64,
    pub seven_day_volume: f64,
    /// Percent of deposited funds put to work.
    pub utilization_rate: f64,
    pub last_updated: i64,
}

#[derive(Debug, Serialize)]
pub struct TreasuryOverview {
    pub usd_assets: Vec<TreasuryAsset>,
    pub idr_assets: Vec<TreasuryAsset>,
    pub usd_liquidity: LiquidityState,
    pub idr_liquidity: LiquidityState,
    pub yield_metrics: YieldMetrics,
}
