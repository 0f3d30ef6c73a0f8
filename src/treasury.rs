// Treasury allocation and yield derivation

use crate::abi;
use crate::chain::{ChainError, ChainSource};
use crate::config::Config;
use crate::models::{
    Currency, LiquidityState, LiquidityStatus, TreasuryAsset, TreasuryOverview, YieldMetrics,
};
use crate::parse::display_amount;
use chrono::Utc;

/// 365 days; leap years are ignored for display rates.
pub const SECONDS_PER_YEAR: f64 = 31_536_000.0;
/// Minimum healthy hot-wallet share of TVL.
pub const HOT_WALLET_THRESHOLD: f64 = 0.05;

/// `getAllocationInfo` in display units.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllocationInfo {
    pub total_deposited: f64,
    pub total_allocated: f64,
    pub hot_wallet_balance: f64,
}

/// `getYieldStats` in display units.
#[derive(Debug, Clone, Copy, Default)]
pub struct YieldStats {
    pub unallocated_pool: f64,
    pub total_allocated: f64,
    /// Percent, e.g. 5.8.
    pub dynamic_reward_rate: f64,
    pub moving_average_volume: f64,
}

/// value / total as a percentage, rounded to two decimals. A zero total
/// yields 0, never NaN or infinity.
pub fn percentage(value: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    round2(value / total * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The USD treasury splits its allocated funds 40/30/15/10 across four
/// yield vaults; the remainder sits in the hot wallet.
pub fn derive_usd_assets(info: &AllocationInfo) -> Vec<TreasuryAsset> {
    let allocated = info.total_allocated;
    let total = info.total_deposited;

    let usyc = allocated * 0.40;
    let aave = allocated * 0.30;
    let aerodrome = allocated * 0.15;
    let thetanuts = allocated * 0.10;

    vec![
        TreasuryAsset {
            id: "usyc",
            name: "USYC Vault",
            description: "US Treasury Bills",
            allocation: percentage(usyc, total),
            value: usyc,
            apy: 5.0,
        },
        TreasuryAsset {
            id: "aave",
            name: "Aave Lending",
            description: "DeFi Lending Protocol",
            allocation: percentage(aave, total),
            value: aave,
            apy: 4.5,
        },
        TreasuryAsset {
            id: "aerodrome",
            name: "Aerodrome LP",
            description: "Liquidity Pool Strategy",
            allocation: percentage(aerodrome, total),
            value: aerodrome,
            apy: 8.0,
        },
        TreasuryAsset {
            id: "thetanuts",
            name: "Thetanuts Options",
            description: "Options Vault Strategy",
            allocation: percentage(thetanuts, total),
            value: thetanuts,
            apy: 10.0,
        },
        TreasuryAsset {
            id: "buffer",
            name: "Hot Wallet",
            description: "Instant withdrawal liquidity",
            allocation: percentage(info.hot_wallet_balance, total),
            value: info.hot_wallet_balance,
            apy: 0.0,
        },
    ]
}

/// The IDR treasury is single-strategy: 95% of allocated funds in the
/// IDRX vault, the rest liquid.
pub fn derive_idr_assets(info: &AllocationInfo) -> Vec<TreasuryAsset> {
    let idrx = info.total_allocated * 0.95;
    let total = info.total_deposited;

    vec![
        TreasuryAsset {
            id: "idrx",
            name: "IDRX Vault",
            description: "Indonesian Rupiah Yield",
            allocation: percentage(idrx, total),
            value: idrx,
            apy: 3.5,
        },
        TreasuryAsset {
            id: "idr-buffer",
            name: "Hot Wallet",
            description: "Instant withdrawal liquidity",
            allocation: percentage(info.hot_wallet_balance, total),
            value: info.hot_wallet_balance,
            apy: 0.0,
        },
    ]
}

/// Hot-wallet liquidity health: warn when the liquid share of TVL drops
/// under the threshold.
pub fn derive_liquidity(
    assets: &[TreasuryAsset],
    hot_wallet_id: &str,
    strategy_label: &'static str,
) -> LiquidityState {
    let hot_wallet_value = assets
        .iter()
        .find(|a| a.id == hot_wallet_id)
        .map(|a| a.value)
        .unwrap_or(0.0);
    let total_tvl: f64 = assets.iter().map(|a| a.value).sum();
    let strategy_value = total_tvl - hot_wallet_value;

    let ratio = if total_tvl > 0.0 {
        hot_wallet_value / total_tvl
    } else {
        0.0
    };

    LiquidityState {
        hot_wallet_value,
        threshold: HOT_WALLET_THRESHOLD,
        status: if ratio < HOT_WALLET_THRESHOLD {
            LiquidityStatus::Warning
        } else {
            LiquidityStatus::Healthy
        },
        strategy_value,
        strategy_label,
        total_tvl,
    }
}

pub fn derive_yield_metrics(stats: &YieldStats, info: &AllocationInfo, now: i64) -> YieldMetrics {
    YieldMetrics {
        unallocated_pool: stats.unallocated_pool,
        current_apy: stats.dynamic_reward_rate,
        yield_per_second: stats.total_allocated * (stats.dynamic_reward_rate / 100.0)
            / SECONDS_PER_YEAR,
        seven_day_volume: stats.moving_average_volume,
        utilization_rate: percentage(info.total_allocated, info.total_deposited),
        last_updated: now,
    }
}

fn decode_allocation_info(data: &[u8]) -> AllocationInfo {
    let words = abi::decode_words(data);
    let field = |i: usize| words.get(i).map(abi::word_to_u128).unwrap_or(0);
    AllocationInfo {
        total_deposited: display_amount(field(0)),
        total_allocated: display_amount(field(1)),
        hot_wallet_balance: display_amount(field(2)),
    }
}

fn decode_yield_stats(data: &[u8]) -> YieldStats {
    let words = abi::decode_words(data);
    let field = |i: usize| words.get(i).map(abi::word_to_u128).unwrap_or(0);
    YieldStats {
        unallocated_pool: display_amount(field(0)),
        total_allocated: display_amount(field(1)),
        // reward rate is percent-scaled by 100 on chain: 580 reads as 5.8%
        dynamic_reward_rate: field(2) as f64 / 100.0,
        moving_average_volume: display_amount(field(3)),
    }
}

pub async fn fetch_treasury_overview<S: ChainSource>(
    source: &S,
    config: &Config,
) -> Result<TreasuryOverview, ChainError> {
    let usd = config.currency_config(Currency::USD);
    let idr = config.currency_config(Currency::IDR);
    let allocation_call = abi::calldata("getAllocationInfo()", &[]);

    let (usd_info, idr_info, yield_stats) = tokio::try_join!(
        source.call(usd.treasury_manager, allocation_call.clone()),
        source.call(idr.treasury_manager, allocation_call.clone()),
        source.call(config.contracts.yield_manager, abi::calldata("getYieldStats()", &[])),
    )?;

    let usd_info = decode_allocation_info(&usd_info);
    let idr_info = decode_allocation_info(&idr_info);
    let stats = decode_yield_stats(&yield_stats);

    let usd_assets = derive_usd_assets(&usd_info);
    let idr_assets = derive_idr_assets(&idr_info);
    let usd_liquidity = derive_liquidity(&usd_assets, "buffer", "Multi-Strategy");
    let idr_liquidity = derive_liquidity(&idr_assets, "idr-buffer", "IDRX Vault");
    let yield_metrics = derive_yield_metrics(&stats, &usd_info, Utc::now().timestamp());

    Ok(TreasuryOverview {
        usd_assets,
        idr_assets,
        usd_liquidity,
        idr_liquidity,
        yield_metrics,
    })
}
