// Normalizers: each raw record shape maps into the unified Transaction

use std::collections::HashMap;

use alloy_primitives::Address;
use chrono::Utc;

use crate::abi::MintRecord;
use crate::events::EventWithTimestamp;
use crate::models::{Currency, Transaction, TransactionStatus, TransactionType};

/// Divisor for 6-decimal fixed-point display conversion.
const AMOUNT_SCALE: f64 = 1_000_000.0;

pub fn display_amount(raw: u128) -> f64 {
    raw as f64 / AMOUNT_SCALE
}

/// Placeholder hash derived from a block number. It is recognizably
/// synthetic: zero-padded to hash width, it never resolves on an explorer.
pub fn synthetic_tx_hash(block_number: u64) -> String {
    format!("0x{:064x}", block_number)
}

/// Mint-history records joined against `Deposit` events to recover the
/// originating transaction hash. Exact mint-index correspondence is tried
/// first, then a block-number match, then a synthetic placeholder, so every
/// record yields a transaction with a non-empty hash.
pub fn parse_mint_history(
    mint_history: &[MintRecord],
    deposit_events: &[EventWithTimestamp],
    currency: Currency,
) -> Vec<Transaction> {
    let mut by_mint_index: HashMap<u64, &EventWithTimestamp> = HashMap::new();
    let mut by_block: HashMap<u64, &EventWithTimestamp> = HashMap::new();
    for event in deposit_events {
        // Deposit(user indexed, amount, mintIndex)
        if let Some(mint_index) = event.data_u64(1) {
            by_mint_index.insert(mint_index, event);
        }
        by_block.insert(event.block_number, event);
    }

    mint_history
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let deposit = by_mint_index
                .get(&(index as u64))
                .or_else(|| by_block.get(&record.block_number));

            Transaction {
                id: format!("mint-{}-{}", currency, index),
                tx_type: TransactionType::Mint,
                amount: display_amount(record.amount),
                timestamp: record.timestamp,
                block_number: record.block_number,
                tx_hash: deposit
                    .map(|e| e.transaction_hash.clone())
                    .unwrap_or_else(|| synthetic_tx_hash(record.block_number)),
                from: None,
                to: None,
                status: TransactionStatus::Success,
                currency,
            }
        })
        .collect()
}

/// Transfer events classified against the querying user. Transfers touching
/// the zero address are mint/burn side effects already captured elsewhere
/// and are dropped; only the counterparty address is recorded.
pub fn parse_transfer_events(
    transfer_events: &[EventWithTimestamp],
    user: Address,
    currency: Currency,
) -> Vec<Transaction> {
    transfer_events
        .iter()
        .filter_map(|event| {
            let from = event.topic_address(1)?;
            let to = event.topic_address(2)?;
            if from == Address::ZERO || to == Address::ZERO {
                return None;
            }
            Some((event, from, to))
        })
        .enumerate()
        .map(|(index, (event, from, to))| {
            let is_sent = from == user;
            Transaction {
                id: format!(
                    "transfer-{}-{}-{}",
                    currency, event.transaction_hash, index
                ),
                tx_type: if is_sent {
                    TransactionType::TransferSent
                } else {
                    TransactionType::TransferReceived
                },
                amount: display_amount(event.data_u128(0)),
                timestamp: event.block_timestamp,
                block_number: event.block_number,
                tx_hash: event.transaction_hash.clone(),
                from: (!is_sent).then(|| format!("{from:#x}")),
                to: is_sent.then(|| format!("{to:#x}")),
                status: TransactionStatus::Success,
                currency,
            }
        })
        .collect()
}

/// Withdrawal events map one-to-one.
pub fn parse_withdrawal_events(
    withdrawal_events: &[EventWithTimestamp],
    currency: Currency,
) -> Vec<Transaction> {
    withdrawal_events
        .iter()
        .enumerate()
        .map(|(index, event)| Transaction {
            id: format!(
                "withdraw-{}-{}-{}",
                currency, event.transaction_hash, index
            ),
            tx_type: TransactionType::Withdraw,
            // Withdrawal(user indexed, amount)
            amount: display_amount(event.data_u128(0)),
            timestamp: event.block_timestamp,
            block_number: event.block_number,
            tx_hash: event.transaction_hash.clone(),
            from: None,
            to: None,
            status: TransactionStatus::Success,
            currency,
        })
        .collect()
}

/// Claim events carry the stablecoin the reward was paid out in; the track
/// is resolved from that address.
pub fn parse_claim_events(
    claim_events: &[EventWithTimestamp],
    usd_stablecoin: Address,
    idr_stablecoin: Address,
) -> Vec<Transaction> {
    claim_events
        .iter()
        .enumerate()
        .map(|(index, event)| {
            // RyBONDClaimed(user indexed, stablecoin, amount, timestamp)
            let stablecoin = event.data_address(0).unwrap_or(Address::ZERO);
            let currency = resolve_claim_currency(stablecoin, usd_stablecoin, idr_stablecoin);

            let timestamp = if event.block_timestamp > 0 {
                event.block_timestamp
            } else {
                match event.data_u64(2) {
                    Some(ts) if ts > 0 => ts as i64,
                    _ => Utc::now().timestamp(),
                }
            };

            Transaction {
                id: format!("claim-{}-{}", event.transaction_hash, index),
                tx_type: TransactionType::Claim,
                amount: display_amount(event.data_u128(1)),
                timestamp,
                block_number: event.block_number,
                tx_hash: event.transaction_hash.clone(),
                from: None,
                to: None,
                status: TransactionStatus::Success,
                currency,
            }
        })
        .collect()
}

/// Match the claimed stablecoin against the configured coins; unknown
/// addresses go through the label heuristic.
fn resolve_claim_currency(stablecoin: Address, usd: Address, idr: Address) -> Currency {
    if stablecoin == idr {
        Currency::IDR
    } else if stablecoin == usd {
        Currency::USD
    } else {
        infer_currency_from_label(&format!("{stablecoin:#x}"))
    }
}

/// Last-resort classification by an "idr" marker in the label. Defaults to
/// USD when the marker is absent.
fn infer_currency_from_label(label: &str) -> Currency {
    if label.to_lowercase().contains("idr") {
        Currency::IDR
    } else {
        Currency::USD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi;
    use alloy_primitives::{address, B256};

    const USER: Address = address!("00000000000000000000000000000000000000aa");
    const OTHER: Address = address!("00000000000000000000000000000000000000bb");
    const RY_USD: Address = address!("9e94BC6b8D81e94D5272d8e2F2BcCAC267C50E88");
    const RY_IDR: Address = address!("5403ff9c5c173eEe01255Eeb4d0925bD21748311");

    fn event(
        block: u64,
        tx_hash: &str,
        topics: Vec<B256>,
        data_words: Vec<[u8; abi::WORD]>,
    ) -> EventWithTimestamp {
        EventWithTimestamp {
            block_number: block,
            transaction_hash: tx_hash.to_string(),
            log_index: 0,
            topics,
            data: data_words.concat(),
            block_timestamp: 1_000 + block as i64,
        }
    }

    fn transfer_event(block: u64, tx_hash: &str, from: Address, to: Address) -> EventWithTimestamp {
        event(
            block,
            tx_hash,
            vec![
                abi::event_topic("Transfer(address,address,uint256)"),
                abi::address_topic(from),
                abi::address_topic(to),
            ],
            vec![abi::encode_u128(2_500_000)],
        )
    }

    fn deposit_event(block: u64, tx_hash: &str, mint_index: u64) -> EventWithTimestamp {
        event(
            block,
            tx_hash,
            vec![
                abi::event_topic("Deposit(address,uint256,uint256)"),
                abi::address_topic(USER),
            ],
            vec![abi::encode_u128(5_000_000), abi::encode_u128(mint_index as u128)],
        )
    }

    fn mint_record(amount: u128, block: u64) -> MintRecord {
        MintRecord {
            amount,
            timestamp: 2_000 + block as i64,
            block_number: block,
        }
    }

    #[test]
    fn mint_history_yields_one_transaction_per_record() {
        let history = vec![mint_record(5_000_000, 10), mint_record(250_000, 20)];
        let deposits = vec![deposit_event(10, "0xdep0", 0)];

        let txs = parse_mint_history(&history, &deposits, Currency::USD);
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].amount, 5.0);
        assert_eq!(txs[1].amount, 0.25);
        assert!(txs.iter().all(|t| !t.tx_hash.is_empty()));
        assert_eq!(txs[0].tx_hash, "0xdep0");
    }

    #[test]
    fn mint_history_falls_back_to_block_match_then_synthetic_hash() {
        let history = vec![mint_record(1_000_000, 10), mint_record(1_000_000, 20)];
        // mint index does not line up, but the block number does
        let deposits = vec![deposit_event(20, "0xdep-by-block", 7)];

        let txs = parse_mint_history(&history, &deposits, Currency::IDR);
        assert_eq!(txs[1].tx_hash, "0xdep-by-block");
        // no event at all: synthetic, zero-padded, recognizable
        assert_eq!(txs[0].tx_hash, synthetic_tx_hash(10));
        assert_eq!(txs[0].tx_hash.len(), 66);
        assert!(txs[0].tx_hash.ends_with('a'));
    }

    #[test]
    fn sent_transfers_record_only_the_counterparty() {
        let txs = parse_transfer_events(
            &[transfer_event(5, "0xt1", USER, OTHER)],
            USER,
            Currency::USD,
        );
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].tx_type, TransactionType::TransferSent);
        assert_eq!(txs[0].to, Some(format!("{OTHER:#x}")));
        assert_eq!(txs[0].from, None);
        assert_eq!(txs[0].amount, 2.5);
    }

    #[test]
    fn received_transfers_record_only_the_counterparty() {
        let txs = parse_transfer_events(
            &[transfer_event(5, "0xt1", OTHER, USER)],
            USER,
            Currency::IDR,
        );
        assert_eq!(txs[0].tx_type, TransactionType::TransferReceived);
        assert_eq!(txs[0].from, Some(format!("{OTHER:#x}")));
        assert_eq!(txs[0].to, None);
    }

    #[test]
    fn zero_address_transfers_are_dropped() {
        let txs = parse_transfer_events(
            &[
                transfer_event(1, "0xmint", Address::ZERO, USER),
                transfer_event(2, "0xburn", USER, Address::ZERO),
                transfer_event(3, "0xreal", USER, OTHER),
            ],
            USER,
            Currency::USD,
        );
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].tx_hash, "0xreal");
    }

    #[test]
    fn withdrawals_map_one_to_one() {
        let events = vec![event(
            7,
            "0xw1",
            vec![
                abi::event_topic("Withdrawal(address,uint256)"),
                abi::address_topic(USER),
            ],
            vec![abi::encode_u128(750_000)],
        )];
        let txs = parse_withdrawal_events(&events, Currency::USD);
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].tx_type, TransactionType::Withdraw);
        assert_eq!(txs[0].amount, 0.75);
        assert_eq!(txs[0].timestamp, 1_007);
    }

    fn claim_event(tx_hash: &str, stablecoin: Address) -> EventWithTimestamp {
        event(
            9,
            tx_hash,
            vec![
                abi::event_topic("RyBONDClaimed(address,address,uint256,uint256)"),
                abi::address_topic(USER),
            ],
            vec![
                abi::encode_address(stablecoin),
                abi::encode_u128(3_000_000),
                abi::encode_u128(1_700_000_000),
            ],
        )
    }

    #[test]
    fn claims_resolve_currency_from_configured_addresses() {
        let txs = parse_claim_events(
            &[claim_event("0xc1", RY_IDR), claim_event("0xc2", RY_USD)],
            RY_USD,
            RY_IDR,
        );
        assert_eq!(txs[0].currency, Currency::IDR);
        assert_eq!(txs[1].currency, Currency::USD);
        assert_eq!(txs[0].amount, 3.0);
        assert_eq!(txs[0].tx_type, TransactionType::Claim);
    }

    #[test]
    fn unknown_claim_stablecoin_defaults_to_usd() {
        let txs = parse_claim_events(&[claim_event("0xc1", OTHER)], RY_USD, RY_IDR);
        assert_eq!(txs[0].currency, Currency::USD);
    }

    #[test]
    fn claim_timestamp_falls_back_to_the_event_argument() {
        let mut ev = claim_event("0xc1", RY_USD);
        ev.block_timestamp = 0;
        let txs = parse_claim_events(&[ev], RY_USD, RY_IDR);
        assert_eq!(txs[0].timestamp, 1_700_000_000);
    }

    #[test]
    fn label_heuristic_only_matches_idr_marker() {
        assert_eq!(infer_currency_from_label("ryIDR"), Currency::IDR);
        assert_eq!(infer_currency_from_label("0xabc"), Currency::USD);
    }
}
