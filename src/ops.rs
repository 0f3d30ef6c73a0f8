// Write-path operations against the protocol contracts

use alloy_primitives::Address;
use chrono::Utc;
use tracing::info;

use crate::abi;
use crate::chain::{ChainClient, ChainError, ChainSource};
use crate::config::Config;
use crate::explorer::{ConfirmStatus, ExplorerClient, RetryPolicy, CLAIM_CONFIRM, TRANSFER_CONFIRM};
use crate::format::{format_balance, parse_units};
use crate::models::{BalanceView, Currency, RewardPreview};
use crate::parse::display_amount;

/// Oracle target prices are entered in 8-decimal fixed point.
const ORACLE_PRICE_DECIMALS: u32 = 8;

/// Write-path failure taxonomy. Every variant renders to a human-readable
/// message via `Display`.
#[derive(Debug, thiserror::Error)]
pub enum TxError {
    #[error("transaction rejected by user")]
    Rejected,
    #[error("transaction reverted on-chain: {0}")]
    Reverted(String),
    #[error("transaction confirmation timeout - please check the block explorer")]
    ConfirmTimeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("{0}")]
    Unknown(String),
}

/// Classify a failed submission. Wallet-side rejections surface as RPC
/// error 4001 or a "user rejected" message; revert data comes back with a
/// revert marker; everything transport-shaped is a network failure.
pub fn classify_send_error(err: ChainError) -> TxError {
    match err {
        ChainError::Rpc { code, message } => {
            let lowered = message.to_lowercase();
            if code == 4001 || lowered.contains("user rejected") || lowered.contains("user denied")
            {
                TxError::Rejected
            } else if lowered.contains("revert") {
                TxError::Reverted(friendly_revert(&message))
            } else {
                TxError::Unknown(message)
            }
        }
        ChainError::Transport(e) => TxError::Network(e.to_string()),
        ChainError::InvalidResponse(msg) => TxError::Network(msg),
    }
}

/// Translate known contract revert reasons into actionable messages.
fn friendly_revert(message: &str) -> String {
    let lowered = message.to_lowercase();
    if lowered.contains("only ryusd can call") || lowered.contains("onlyryusdcancall") {
        return "this stablecoin is not yet authorized for minting; use ryUSD".to_string();
    }
    if lowered.contains("already claimed") {
        return "tokens were already claimed from this faucet".to_string();
    }
    if lowered.contains("nothing to claim") {
        return "no rewards available to claim".to_string();
    }
    if lowered.contains("insufficient balance") {
        return "vault has insufficient balance, try again later".to_string();
    }
    if lowered.contains("out of gas") {
        return "vault may not have sufficient funds to pay out, contact the operator".to_string();
    }
    message.to_string()
}

/// A mint may need a preceding approval; both confirmed hashes are
/// reported.
#[derive(Debug)]
pub struct DepositOutcome {
    pub approve_tx: Option<String>,
    pub deposit_tx: String,
}

pub struct Ops<'a> {
    chain: &'a ChainClient,
    explorer: &'a ExplorerClient,
    config: &'a Config,
}

impl<'a> Ops<'a> {
    pub fn new(chain: &'a ChainClient, explorer: &'a ExplorerClient, config: &'a Config) -> Self {
        Self {
            chain,
            explorer,
            config,
        }
    }

    async fn send_and_confirm(
        &self,
        from: Address,
        to: Address,
        data: Vec<u8>,
        policy: RetryPolicy,
    ) -> Result<String, TxError> {
        let tx_hash = self
            .chain
            .send_transaction(from, to, data)
            .await
            .map_err(classify_send_error)?;

        match self.explorer.wait_for_transaction(&tx_hash, policy).await {
            ConfirmStatus::Confirmed => Ok(tx_hash),
            ConfirmStatus::Reverted(message) => Err(TxError::Reverted(friendly_revert(&message))),
            ConfirmStatus::TimedOut => Err(TxError::ConfirmTimeout),
        }
    }

    fn parse_amount(&self, amount: &str, decimals: u32) -> Result<u128, TxError> {
        parse_units(amount, decimals)
            .filter(|raw| *raw > 0)
            .ok_or_else(|| TxError::Invalid(format!("invalid amount {:?}", amount)))
    }

    /// Read-only: underlying, stablecoin and allowance balances for one
    /// track, with formatted display strings.
    pub async fn balances(&self, user: Address, currency: Currency) -> Result<BalanceView, TxError> {
        let track = self.config.currency_config(currency);
        let user_arg = [abi::encode_address(user)];
        let balance_of = abi::calldata("balanceOf(address)", &user_arg);
        let allowance_call = abi::calldata(
            "allowance(address,address)",
            &[abi::encode_address(user), abi::encode_address(track.stablecoin)],
        );

        let (underlying, stablecoin, allowance) = tokio::try_join!(
            self.chain.call(track.underlying_token, balance_of.clone()),
            self.chain.call(track.stablecoin, balance_of.clone()),
            self.chain.call(track.underlying_token, allowance_call),
        )
        .map_err(classify_send_error)?;

        let first_word = |data: &[u8]| {
            abi::decode_words(data)
                .first()
                .map(abi::word_to_u128)
                .unwrap_or(0)
        };
        let underlying = display_amount(first_word(&underlying));
        let stablecoin = display_amount(first_word(&stablecoin));

        Ok(BalanceView {
            currency: track.currency,
            underlying,
            underlying_display: format_balance(underlying, track.currency),
            stablecoin,
            stablecoin_display: format_balance(stablecoin, track.currency),
            allowance: display_amount(first_word(&allowance)),
        })
    }

    /// Mint: approve the underlying spend when the standing allowance is
    /// short, then deposit. Each step is confirmed before the next.
    pub async fn deposit(
        &self,
        from: Address,
        currency: Currency,
        amount: &str,
    ) -> Result<DepositOutcome, TxError> {
        let track = self.config.currency_config(currency);
        let raw = self.parse_amount(amount, track.decimals)?;

        let allowance_call = abi::calldata(
            "allowance(address,address)",
            &[abi::encode_address(from), abi::encode_address(track.stablecoin)],
        );
        let allowance = self
            .chain
            .call(track.underlying_token, allowance_call)
            .await
            .map_err(classify_send_error)?;
        let allowance = abi::decode_words(&allowance)
            .first()
            .map(abi::word_to_u128)
            .unwrap_or(0);

        let approve_tx = if allowance < raw {
            info!("approving {} {} for deposit", amount, track.underlying_symbol);
            let data = abi::calldata(
                "approve(address,uint256)",
                &[abi::encode_address(track.stablecoin), abi::encode_u128(raw)],
            );
            Some(
                self.send_and_confirm(from, track.underlying_token, data, TRANSFER_CONFIRM)
                    .await?,
            )
        } else {
            None
        };

        info!("depositing {} {}", amount, track.underlying_symbol);
        let data = abi::calldata("deposit(uint256)", &[abi::encode_u128(raw)]);
        let deposit_tx = self
            .send_and_confirm(from, track.stablecoin, data, TRANSFER_CONFIRM)
            .await?;

        Ok(DepositOutcome {
            approve_tx,
            deposit_tx,
        })
    }

    pub async fn withdraw(
        &self,
        from: Address,
        currency: Currency,
        amount: &str,
    ) -> Result<String, TxError> {
        let track = self.config.currency_config(currency);
        let raw = self.parse_amount(amount, track.decimals)?;
        let data = abi::calldata("withdraw(uint256)", &[abi::encode_u128(raw)]);
        self.send_and_confirm(from, track.stablecoin, data, TRANSFER_CONFIRM)
            .await
    }

    pub async fn transfer(
        &self,
        from: Address,
        currency: Currency,
        to: Address,
        amount: &str,
    ) -> Result<String, TxError> {
        let track = self.config.currency_config(currency);
        let raw = self.parse_amount(amount, track.decimals)?;
        let data = abi::calldata(
            "transfer(address,uint256)",
            &[abi::encode_address(to), abi::encode_u128(raw)],
        );
        self.send_and_confirm(from, track.stablecoin, data, TRANSFER_CONFIRM)
            .await
    }

    /// Read-only: the reward split the handler would grant for a transfer.
    pub async fn preview_transfer_rewards(
        &self,
        from: Address,
        currency: Currency,
        amount: &str,
    ) -> Result<RewardPreview, TxError> {
        let track = self.config.currency_config(currency);
        let raw = self.parse_amount(amount, track.decimals)?;
        let data = abi::calldata(
            "previewTransferRewards(address,address,uint256)",
            &[
                abi::encode_address(from),
                abi::encode_address(track.stablecoin),
                abi::encode_u128(raw),
            ],
        );
        let ret = self
            .chain
            .call(self.config.contracts.ryvyn_handler, data)
            .await
            .map_err(classify_send_error)?;

        let words = abi::decode_words(&ret);
        let field = |i: usize| words.get(i).map(abi::word_to_u128).unwrap_or(0);
        Ok(RewardPreview {
            sender_reward: display_amount(field(0)),
            receiver_reward: display_amount(field(1)),
            sender_share: field(2) as u64,
            receiver_share: field(3) as u64,
        })
    }

    /// Convert vested rewards into the chosen stablecoin.
    pub async fn claim(&self, from: Address, currency: Currency) -> Result<String, TxError> {
        let track = self.config.currency_config(currency);
        info!("claiming rewards as {}", track.symbol);
        let data = abi::calldata("claim(address)", &[abi::encode_address(track.stablecoin)]);
        self.send_and_confirm(from, self.config.contracts.ry_bond, data, CLAIM_CONFIRM)
            .await
    }

    pub async fn predict(
        &self,
        from: Address,
        target_price: &str,
        is_above: bool,
        expiry_hours: u64,
        tier: u8,
    ) -> Result<String, TxError> {
        if tier > 2 {
            return Err(TxError::Invalid(format!("unknown tier {}", tier)));
        }
        let target_raw = parse_units(target_price, ORACLE_PRICE_DECIMALS)
            .filter(|raw| *raw > 0)
            .ok_or_else(|| TxError::Invalid(format!("invalid target price {:?}", target_price)))?;
        let expiry = Utc::now().timestamp() as u128 + expiry_hours as u128 * 3600;

        let data = abi::calldata(
            "predict(uint256,bool,uint256,uint8)",
            &[
                abi::encode_u128(target_raw),
                abi::encode_bool(is_above),
                abi::encode_u128(expiry),
                abi::encode_u128(tier as u128),
            ],
        );
        self.send_and_confirm(
            from,
            self.config.contracts.prediction_boost,
            data,
            TRANSFER_CONFIRM,
        )
        .await
    }

    pub async fn resolve_prediction(&self, from: Address) -> Result<String, TxError> {
        let data = abi::calldata("resolve()", &[]);
        self.send_and_confirm(
            from,
            self.config.contracts.prediction_boost,
            data,
            TRANSFER_CONFIRM,
        )
        .await
    }

    pub async fn reset_multiplier(&self, from: Address) -> Result<String, TxError> {
        let data = abi::calldata("resetMultiplier()", &[]);
        self.send_and_confirm(
            from,
            self.config.contracts.prediction_boost,
            data,
            TRANSFER_CONFIRM,
        )
        .await
    }

    /// Testnet faucet on the mock underlying token.
    pub async fn claim_faucet(&self, from: Address, currency: Currency) -> Result<String, TxError> {
        let track = self.config.currency_config(currency);
        let data = abi::calldata("claimFaucet()", &[]);
        self.send_and_confirm(from, track.underlying_token, data, TRANSFER_CONFIRM)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc_err(code: i64, message: &str) -> ChainError {
        ChainError::Rpc {
            code,
            message: message.to_string(),
        }
    }

    #[test]
    fn wallet_rejections_classify_as_rejected() {
        assert!(matches!(
            classify_send_error(rpc_err(4001, "User rejected the request")),
            TxError::Rejected
        ));
        assert!(matches!(
            classify_send_error(rpc_err(-32000, "MetaMask: User denied transaction signature")),
            TxError::Rejected
        ));
    }

    #[test]
    fn reverts_classify_as_reverted() {
        assert!(matches!(
            classify_send_error(rpc_err(3, "execution reverted: nothing to claim")),
            TxError::Reverted(_)
        ));
    }

    #[test]
    fn unknown_rpc_errors_stay_unknown() {
        assert!(matches!(
            classify_send_error(rpc_err(-32602, "invalid params")),
            TxError::Unknown(_)
        ));
    }

    #[test]
    fn known_reverts_get_actionable_messages() {
        assert_eq!(
            friendly_revert("execution reverted: nothing to claim"),
            "no rewards available to claim"
        );
        assert_eq!(
            friendly_revert("execution reverted: Already claimed"),
            "tokens were already claimed from this faucet"
        );
        assert_eq!(
            friendly_revert("execution reverted: OnlyRyUSDCanCall()"),
            "this stablecoin is not yet authorized for minting; use ryUSD"
        );
        assert_eq!(friendly_revert("some other reason"), "some other reason");
    }

    #[test]
    fn every_tx_error_renders_a_message() {
        let errors = [
            TxError::Rejected,
            TxError::Reverted("reason".to_string()),
            TxError::ConfirmTimeout,
            TxError::Network("down".to_string()),
            TxError::Invalid("bad".to_string()),
            TxError::Unknown("odd".to_string()),
        ];
        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }
}
