// Transaction-history aggregation: fetch, normalize, merge, sort, filter

use alloy_primitives::Address;

use crate::abi;
use crate::chain::{ChainError, ChainSource};
use crate::config::{Config, CurrencyConfig};
use crate::events::{fetch_events_in_chunks, EventQuery, EventWithTimestamp};
use crate::models::{
    Currency, HistoryStats, Transaction, TransactionFilters, TransactionType,
};
use crate::parse;

const TRANSFER_EVENT: &str = "Transfer(address,address,uint256)";
const DEPOSIT_EVENT: &str = "Deposit(address,uint256,uint256)";
const WITHDRAWAL_EVENT: &str = "Withdrawal(address,uint256)";
const CLAIM_EVENT: &str = "RyBONDClaimed(address,address,uint256,uint256)";

/// Event streams fetched for one currency track.
struct TrackEvents {
    transfers: Vec<EventWithTimestamp>,
    deposits: Vec<EventWithTimestamp>,
    withdrawals: Vec<EventWithTimestamp>,
}

/// Produce the ordered, filtered transaction log for `user`.
///
/// Both currency tracks (four event streams each), the shared claim stream
/// and both mint histories are fetched concurrently and awaited together;
/// there are no partial results. A transport-wide failure propagates as an
/// error, distinct from an address that simply has no transactions. Every
/// invocation re-fetches from scratch.
pub async fn fetch_transaction_history<S: ChainSource>(
    source: &S,
    config: &Config,
    user: Address,
    filters: &TransactionFilters,
) -> Result<Vec<Transaction>, ChainError> {
    let usd = config.currency_config(Currency::USD);
    let idr = config.currency_config(Currency::IDR);

    let claim_query = EventQuery {
        contract: config.contracts.ry_bond,
        event_signature: CLAIM_EVENT,
        topic1: Some(user),
        topic2: None,
    };

    let (usd_events, idr_events, claim_events, usd_mints, idr_mints) = tokio::try_join!(
        fetch_track_events(source, &usd, user),
        fetch_track_events(source, &idr, user),
        fetch_events_in_chunks(source, &claim_query),
        fetch_mint_history(source, usd.stablecoin, user),
        fetch_mint_history(source, idr.stablecoin, user),
    )?;

    let mut all = Vec::new();
    all.extend(parse::parse_mint_history(&usd_mints, &usd_events.deposits, Currency::USD));
    all.extend(parse::parse_transfer_events(&usd_events.transfers, user, Currency::USD));
    all.extend(parse::parse_withdrawal_events(&usd_events.withdrawals, Currency::USD));
    all.extend(parse::parse_mint_history(&idr_mints, &idr_events.deposits, Currency::IDR));
    all.extend(parse::parse_transfer_events(&idr_events.transfers, user, Currency::IDR));
    all.extend(parse::parse_withdrawal_events(&idr_events.withdrawals, Currency::IDR));
    all.extend(parse::parse_claim_events(
        &claim_events,
        usd.stablecoin,
        idr.stablecoin,
    ));

    // Most recent first; the sort is stable, so ties keep merge order.
    all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    Ok(apply_filters(all, filters))
}

/// The four per-track streams: transfers out, transfers in, deposits,
/// withdrawals. Issued concurrently; sent and received transfers land in
/// one list, in that order.
async fn fetch_track_events<S: ChainSource>(
    source: &S,
    track: &CurrencyConfig,
    user: Address,
) -> Result<TrackEvents, ChainError> {
    let sent = EventQuery {
        contract: track.stablecoin,
        event_signature: TRANSFER_EVENT,
        topic1: Some(user),
        topic2: None,
    };
    let received = EventQuery {
        contract: track.stablecoin,
        event_signature: TRANSFER_EVENT,
        topic1: None,
        topic2: Some(user),
    };
    let deposits = EventQuery {
        contract: track.stablecoin,
        event_signature: DEPOSIT_EVENT,
        topic1: Some(user),
        topic2: None,
    };
    let withdrawals = EventQuery {
        contract: track.stablecoin,
        event_signature: WITHDRAWAL_EVENT,
        topic1: Some(user),
        topic2: None,
    };

    let (sent, received, deposits, withdrawals) = tokio::try_join!(
        fetch_events_in_chunks(source, &sent),
        fetch_events_in_chunks(source, &received),
        fetch_events_in_chunks(source, &deposits),
        fetch_events_in_chunks(source, &withdrawals),
    )?;

    let mut transfers = sent;
    transfers.extend(received);

    Ok(TrackEvents {
        transfers,
        deposits,
        withdrawals,
    })
}

async fn fetch_mint_history<S: ChainSource>(
    source: &S,
    stablecoin: Address,
    user: Address,
) -> Result<Vec<abi::MintRecord>, ChainError> {
    let data = abi::calldata("getUserMintHistory(address)", &[abi::encode_address(user)]);
    let ret = source.call(stablecoin, data).await?;
    Ok(abi::decode_mint_history(&ret))
}

/// Apply each present filter in sequence, narrowing the previous result.
pub fn apply_filters(
    transactions: Vec<Transaction>,
    filters: &TransactionFilters,
) -> Vec<Transaction> {
    let mut filtered = transactions;

    if let Some(tx_type) = filters.tx_type {
        filtered.retain(|tx| tx.tx_type == tx_type);
    }
    if let Some(currency) = filters.currency {
        filtered.retain(|tx| tx.currency == currency);
    }
    if let Some(date_from) = filters.date_from {
        filtered.retain(|tx| tx.timestamp >= date_from);
    }
    if let Some(date_to) = filters.date_to {
        filtered.retain(|tx| tx.timestamp <= date_to);
    }
    if let Some(search) = &filters.search {
        let needle = search.to_lowercase();
        filtered.retain(|tx| {
            tx.tx_hash.to_lowercase().contains(&needle)
                || tx.tx_type.as_str().contains(&needle)
        });
    }

    filtered
}

/// Summary counters over a merged transaction list.
pub fn history_stats(transactions: &[Transaction]) -> HistoryStats {
    let mut stats = HistoryStats::default();
    for tx in transactions {
        match tx.tx_type {
            TransactionType::Mint => stats.mints += 1,
            TransactionType::Withdraw => stats.withdrawals += 1,
            TransactionType::TransferSent => stats.transfers_sent += 1,
            TransactionType::TransferReceived => stats.transfers_received += 1,
            TransactionType::Claim => stats.claims += 1,
        }
        match tx.currency {
            Currency::USD => stats.usd_volume += tx.amount,
            Currency::IDR => stats.idr_volume += tx.amount,
        }
    }
    stats
}
