// Vesting-reward and prediction-boost derivation

use alloy_primitives::Address;
use chrono::Utc;

use crate::abi;
use crate::chain::{ChainError, ChainSource};
use crate::config::Config;
use crate::models::{ActivePrediction, PredictionState, RewardStream, TierQuote};
use crate::parse::display_amount;

/// The flow-rate read is 24-decimal fixed point (token units per second).
const FLOW_RATE_SCALE: f64 = 1e24;
/// Oracle prices are 8-decimal fixed point.
const ORACLE_PRICE_SCALE: f64 = 1e8;
/// Flow multipliers are percent-scaled: 125 reads as 1.25x.
const MULTIPLIER_SCALE: f64 = 100.0;

/// One prediction risk tier: stake requirement in basis points of the
/// locked balance, and the multipliers applied on resolution.
#[derive(Debug, Clone, Copy)]
pub struct TierConfig {
    pub name: &'static str,
    pub stake_bps: u128,
    pub win_multiplier: f64,
    pub loss_multiplier: f64,
}

pub const TIERS: [TierConfig; 3] = [
    TierConfig { name: "LOW", stake_bps: 200, win_multiplier: 1.10, loss_multiplier: 0.90 },
    TierConfig { name: "MEDIUM", stake_bps: 500, win_multiplier: 1.25, loss_multiplier: 0.90 },
    TierConfig { name: "HIGH", stake_bps: 1000, win_multiplier: 1.50, loss_multiplier: 0.90 },
];

/// Stake required to open a prediction at `tier`, in display units.
pub fn required_stake(locked_raw: u128, tier: usize) -> f64 {
    let Some(config) = TIERS.get(tier) else {
        return 0.0;
    };
    display_amount(locked_raw * config.stake_bps / 10_000)
}

pub fn display_multiplier(raw: u128) -> f64 {
    raw as f64 / MULTIPLIER_SCALE
}

pub fn display_oracle_price(raw: u128) -> f64 {
    raw as f64 / ORACLE_PRICE_SCALE
}

/// Build the reward-stream view from the three raw reads.
pub fn derive_reward_stream(
    pending_raw: u128,
    flow_rate_raw: u128,
    locked_raw: u128,
    vested_raw: u128,
    now: i64,
) -> RewardStream {
    let flow_rate_per_second = flow_rate_raw as f64 / FLOW_RATE_SCALE;
    RewardStream {
        claimable_balance: display_amount(pending_raw),
        flow_rate_per_second,
        max_claimable: display_amount(locked_raw + vested_raw),
        is_streaming: flow_rate_per_second > 0.0,
        last_updated: now,
    }
}

/// Decode `userPredictions` return words. Absent (all-zero stake or
/// expiry) means no open prediction.
pub fn parse_prediction(words: &[[u8; abi::WORD]]) -> Option<ActivePrediction> {
    if words.len() < 7 {
        return None;
    }
    let stake_raw = abi::word_to_u128(&words[2]);
    let expiry = abi::word_to_u64(&words[1]) as i64;
    if stake_raw == 0 || expiry == 0 {
        return None;
    }

    Some(ActivePrediction {
        target_price: display_oracle_price(abi::word_to_u128(&words[0])),
        expiry,
        stake_amount: display_amount(stake_raw),
        tier: abi::word_to_u64(&words[3]) as u8,
        is_above: abi::word_to_bool(&words[4]),
        resolved: abi::word_to_bool(&words[5]),
        won: abi::word_to_bool(&words[6]),
    })
}

/// A prediction resolves once it has expired and was not resolved yet.
pub fn can_resolve(prediction: &ActivePrediction, now: i64) -> bool {
    now > prediction.expiry && !prediction.resolved
}

/// `userInfo` leads with the locked and vested balances.
fn locked_and_vested(words: &[[u8; abi::WORD]]) -> (u128, u128) {
    let locked = words.first().map(abi::word_to_u128).unwrap_or(0);
    let vested = words.get(1).map(abi::word_to_u128).unwrap_or(0);
    (locked, vested)
}

pub async fn fetch_reward_stream<S: ChainSource>(
    source: &S,
    config: &Config,
    user: Address,
) -> Result<RewardStream, ChainError> {
    let bond = config.contracts.ry_bond;
    let user_arg = [abi::encode_address(user)];

    let (pending, flow_rate, user_info) = tokio::try_join!(
        source.call(bond, abi::calldata("pendingRyBond(address)", &user_arg)),
        source.call(bond, abi::calldata("getFlowRate(address)", &user_arg)),
        source.call(bond, abi::calldata("userInfo(address)", &user_arg)),
    )?;

    let pending_raw = abi::decode_words(&pending)
        .first()
        .map(abi::word_to_u128)
        .unwrap_or(0);
    let flow_rate_raw = abi::decode_words(&flow_rate)
        .first()
        .map(abi::word_to_u128)
        .unwrap_or(0);
    let (locked, vested) = locked_and_vested(&abi::decode_words(&user_info));

    Ok(derive_reward_stream(
        pending_raw,
        flow_rate_raw,
        locked,
        vested,
        Utc::now().timestamp(),
    ))
}

pub async fn fetch_prediction_state<S: ChainSource>(
    source: &S,
    config: &Config,
    user: Address,
) -> Result<PredictionState, ChainError> {
    let boost = config.contracts.prediction_boost;
    let bond = config.contracts.ry_bond;
    let user_arg = [abi::encode_address(user)];

    let (price, prediction, multiplier, user_info) = tokio::try_join!(
        source.call(boost, abi::calldata("getCurrentPrice()", &[])),
        source.call(boost, abi::calldata("userPredictions(address)", &user_arg)),
        source.call(bond, abi::calldata("flowMultiplier(address)", &user_arg)),
        source.call(bond, abi::calldata("userInfo(address)", &user_arg)),
    )?;

    let price_raw = abi::decode_words(&price)
        .first()
        .map(abi::word_to_u128)
        .unwrap_or(0);
    let multiplier_raw = abi::decode_words(&multiplier)
        .first()
        .map(abi::word_to_u128)
        // neutral multiplier when the read degrades
        .unwrap_or(100);
    let (locked, vested) = locked_and_vested(&abi::decode_words(&user_info));

    let active_prediction = parse_prediction(&abi::decode_words(&prediction));
    let now = Utc::now().timestamp();
    let can_resolve_now = active_prediction
        .as_ref()
        .map(|p| can_resolve(p, now))
        .unwrap_or(false);

    let tiers = TIERS
        .iter()
        .enumerate()
        .map(|(i, t)| TierQuote {
            name: t.name,
            stake_percent: t.stake_bps as f64 / 100.0,
            required_stake: required_stake(locked, i),
            win_multiplier: t.win_multiplier,
            loss_multiplier: t.loss_multiplier,
        })
        .collect();

    Ok(PredictionState {
        current_price: display_oracle_price(price_raw),
        active_prediction,
        can_resolve: can_resolve_now,
        multiplier: display_multiplier(multiplier_raw),
        bond_balance: display_amount(locked + vested),
        tiers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_table_matches_the_protocol() {
        assert_eq!(TIERS[0].stake_bps, 200);
        assert_eq!(TIERS[0].win_multiplier, 1.10);
        assert_eq!(TIERS[1].stake_bps, 500);
        assert_eq!(TIERS[1].win_multiplier, 1.25);
        assert_eq!(TIERS[2].stake_bps, 1000);
        assert_eq!(TIERS[2].win_multiplier, 1.50);
        assert!(TIERS.iter().all(|t| t.loss_multiplier == 0.90));
    }

    #[test]
    fn required_stake_scales_with_locked_balance() {
        // 100 tokens locked
        let locked = 100_000_000;
        assert_eq!(required_stake(locked, 0), 2.0);
        assert_eq!(required_stake(locked, 1), 5.0);
        assert_eq!(required_stake(locked, 2), 10.0);
        assert_eq!(required_stake(locked, 3), 0.0);
    }

    #[test]
    fn reward_stream_derivation() {
        let stream = derive_reward_stream(
            2_500_000,          // 2.5 claimable
            5 * 10u128.pow(23), // 0.5 per second
            10_000_000,
            2_000_000,
            1_700_000_000,
        );
        assert_eq!(stream.claimable_balance, 2.5);
        assert_eq!(stream.flow_rate_per_second, 0.5);
        assert_eq!(stream.max_claimable, 12.0);
        assert!(stream.is_streaming);
    }

    #[test]
    fn zero_flow_rate_is_not_streaming() {
        let stream = derive_reward_stream(0, 0, 0, 0, 0);
        assert!(!stream.is_streaming);
        assert_eq!(stream.claimable_balance, 0.0);
    }

    fn prediction_words(
        target: u128,
        expiry: u64,
        stake: u128,
        tier: u64,
        flags: (bool, bool, bool),
    ) -> Vec<[u8; abi::WORD]> {
        vec![
            abi::encode_u128(target),
            abi::encode_u128(expiry as u128),
            abi::encode_u128(stake),
            abi::encode_u128(tier as u128),
            abi::encode_bool(flags.0),
            abi::encode_bool(flags.1),
            abi::encode_bool(flags.2),
        ]
    }

    #[test]
    fn open_prediction_decodes() {
        let words = prediction_words(
            350_000_000_000, // $3,500.00 at 8 decimals
            1_700_003_600,
            2_000_000,
            1,
            (true, false, false),
        );
        let p = parse_prediction(&words).unwrap();
        assert_eq!(p.target_price, 3500.0);
        assert_eq!(p.stake_amount, 2.0);
        assert_eq!(p.tier, 1);
        assert!(p.is_above);
        assert!(!p.resolved);
    }

    #[test]
    fn zero_stake_or_expiry_means_no_prediction() {
        assert!(parse_prediction(&prediction_words(1, 0, 5, 0, (false, false, false))).is_none());
        assert!(parse_prediction(&prediction_words(1, 5, 0, 0, (false, false, false))).is_none());
        assert!(parse_prediction(&[]).is_none());
    }

    #[test]
    fn resolution_requires_expiry_and_unresolved() {
        let p = parse_prediction(&prediction_words(1, 100, 5, 0, (true, false, false))).unwrap();
        assert!(!can_resolve(&p, 100));
        assert!(can_resolve(&p, 101));

        let resolved = parse_prediction(&prediction_words(1, 100, 5, 0, (true, true, true))).unwrap();
        assert!(!can_resolve(&resolved, 200));
    }

    #[test]
    fn display_scalers() {
        assert_eq!(display_multiplier(125), 1.25);
        assert_eq!(display_oracle_price(350_000_000_000), 3500.0);
    }
}
