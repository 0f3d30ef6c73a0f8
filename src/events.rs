// Windowed contract-event fetching

use alloy_primitives::{Address, B256};
use chrono::Utc;
use tracing::warn;

use crate::abi;
use crate::chain::{ChainError, ChainSource, LogFilter, RawLog};

/// How far back one aggregation pass looks.
pub const TOTAL_BLOCKS: u64 = 50_000;
/// Safety margin under the usual provider per-call block-range cap.
pub const BLOCK_RANGE: u64 = 9_000;

/// Decoded log annotated with the timestamp of its containing block.
#[derive(Debug, Clone)]
pub struct EventWithTimestamp {
    pub block_number: u64,
    pub transaction_hash: String,
    pub log_index: u64,
    pub topics: Vec<B256>,
    pub data: Vec<u8>,
    /// Unix seconds; wall clock when the block lookup failed.
    pub block_timestamp: i64,
}

impl EventWithTimestamp {
    /// Indexed argument at `topic_index` (1-based, topic 0 is the signature).
    pub fn topic_address(&self, topic_index: usize) -> Option<Address> {
        self.topics
            .get(topic_index)
            .map(|t| abi::word_to_address(&t.0))
    }

    fn data_word(&self, index: usize) -> Option<[u8; abi::WORD]> {
        abi::decode_words(&self.data).into_iter().nth(index)
    }

    /// Non-indexed amount argument at `index` in the data section.
    pub fn data_u128(&self, index: usize) -> u128 {
        self.data_word(index)
            .map(|w| abi::word_to_u128(&w))
            .unwrap_or(0)
    }

    pub fn data_u64(&self, index: usize) -> Option<u64> {
        self.data_word(index).map(|w| abi::word_to_u64(&w))
    }

    pub fn data_address(&self, index: usize) -> Option<Address> {
        self.data_word(index).map(|w| abi::word_to_address(&w))
    }
}

/// One event stream to fetch: a contract, an event signature, and optional
/// indexed-argument filters.
#[derive(Debug, Clone)]
pub struct EventQuery {
    pub contract: Address,
    pub event_signature: &'static str,
    pub topic1: Option<Address>,
    pub topic2: Option<Address>,
}

impl EventQuery {
    fn filter(&self, from_block: u64, to_block: u64) -> LogFilter {
        LogFilter {
            address: self.contract,
            topic0: abi::event_topic(self.event_signature),
            topic1: self.topic1.map(abi::address_topic),
            topic2: self.topic2.map(abi::address_topic),
            from_block,
            to_block,
        }
    }
}

/// Fetch every matching log in the most recent `TOTAL_BLOCKS` blocks,
/// annotated with block timestamps.
///
/// The range is partitioned into consecutive sub-windows of at most
/// `BLOCK_RANGE` blocks, queried sequentially in ascending order. A failed
/// sub-window is retried once, then skipped with a warning: the pass keeps
/// going and that range contributes zero events. A failed block-timestamp
/// lookup falls back to the current wall clock for that event only. Only a
/// failure to resolve the chain head aborts the whole fetch.
pub async fn fetch_events_in_chunks<S: ChainSource>(
    source: &S,
    query: &EventQuery,
) -> Result<Vec<EventWithTimestamp>, ChainError> {
    let latest = source.block_number().await?;
    // Clamp at genesis so a young chain never underflows the window.
    let mut current_from = latest.saturating_sub(TOTAL_BLOCKS);

    let mut all_events = Vec::new();

    while current_from <= latest {
        let current_to = latest.min(current_from + BLOCK_RANGE);
        let filter = query.filter(current_from, current_to);

        let logs = match source.get_logs(&filter).await {
            Ok(logs) => logs,
            Err(first_err) => match source.get_logs(&filter).await {
                Ok(logs) => logs,
                Err(retry_err) => {
                    warn!(
                        "skipping {} events in blocks {}..={}: {} (retry: {})",
                        query.event_signature, current_from, current_to, first_err, retry_err
                    );
                    current_from = current_to + 1;
                    continue;
                }
            },
        };

        for log in logs {
            all_events.push(annotate(source, log).await);
        }

        current_from = current_to + 1;
    }

    Ok(all_events)
}

async fn annotate<S: ChainSource>(source: &S, log: RawLog) -> EventWithTimestamp {
    let block_number = lenient_hex(&log.block_number);
    let block_timestamp = match source.block_timestamp(block_number).await {
        Ok(ts) => ts,
        Err(e) => {
            warn!("block {} timestamp lookup failed: {}", block_number, e);
            Utc::now().timestamp()
        }
    };

    let topics = log
        .topics
        .iter()
        .filter_map(|t| {
            let bytes = hex::decode(t.trim_start_matches("0x")).ok()?;
            (bytes.len() == abi::WORD).then(|| B256::from_slice(&bytes))
        })
        .collect();
    let data = hex::decode(log.data.trim_start_matches("0x")).unwrap_or_default();

    EventWithTimestamp {
        block_number,
        transaction_hash: log.transaction_hash,
        log_index: lenient_hex(&log.log_index),
        topics,
        data,
        block_timestamp,
    }
}

fn lenient_hex(raw: &str) -> u64 {
    u64::from_str_radix(raw.trim_start_matches("0x"), 16).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockSource {
        latest: u64,
        /// Recorded (from, to) ranges of every get_logs call.
        ranges: Mutex<Vec<(u64, u64)>>,
        /// Logs returned per call, popped front; empty means always empty.
        logs: Mutex<Vec<Result<Vec<RawLog>, ()>>>,
        /// Blocks whose timestamp lookup fails.
        broken_blocks: Vec<u64>,
    }

    impl MockSource {
        fn new(latest: u64) -> Self {
            Self {
                latest,
                ranges: Mutex::new(Vec::new()),
                logs: Mutex::new(Vec::new()),
                broken_blocks: Vec::new(),
            }
        }

        fn push_logs(&self, batch: Result<Vec<RawLog>, ()>) {
            self.logs.lock().unwrap().push(batch);
        }
    }

    #[async_trait]
    impl ChainSource for MockSource {
        async fn block_number(&self) -> Result<u64, ChainError> {
            Ok(self.latest)
        }

        async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, ChainError> {
            self.ranges
                .lock()
                .unwrap()
                .push((filter.from_block, filter.to_block));
            let mut logs = self.logs.lock().unwrap();
            if logs.is_empty() {
                return Ok(Vec::new());
            }
            logs.remove(0).map_err(|_| ChainError::Rpc {
                code: -32000,
                message: "window too large".to_string(),
            })
        }

        async fn block_timestamp(&self, block: u64) -> Result<i64, ChainError> {
            if self.broken_blocks.contains(&block) {
                return Err(ChainError::Rpc {
                    code: -32000,
                    message: "missing block".to_string(),
                });
            }
            Ok(1_000_000 + block as i64)
        }

        async fn call(&self, _to: Address, _data: Vec<u8>) -> Result<Vec<u8>, ChainError> {
            Ok(Vec::new())
        }
    }

    fn query() -> EventQuery {
        EventQuery {
            contract: address!("9e94BC6b8D81e94D5272d8e2F2BcCAC267C50E88"),
            event_signature: "Transfer(address,address,uint256)",
            topic1: None,
            topic2: None,
        }
    }

    fn raw_log(block: u64) -> RawLog {
        RawLog {
            address: "0x9e94bc6b8d81e94d5272d8e2f2bccac267c50e88".to_string(),
            topics: vec![format!(
                "{:#x}",
                abi::event_topic("Transfer(address,address,uint256)")
            )],
            data: format!("0x{}", hex::encode(abi::encode_u128(1_000_000))),
            block_number: format!("{block:#x}"),
            transaction_hash: format!("0xhash{block}"),
            log_index: "0x0".to_string(),
        }
    }

    #[tokio::test]
    async fn covers_the_window_in_six_gapless_chunks() {
        let source = MockSource::new(100_000);
        fetch_events_in_chunks(&source, &query()).await.unwrap();

        let ranges = source.ranges.lock().unwrap().clone();
        assert_eq!(ranges.len(), 6);
        assert_eq!(ranges.first().unwrap().0, 100_000 - TOTAL_BLOCKS);
        assert_eq!(ranges.last().unwrap().1, 100_000);
        for pair in ranges.windows(2) {
            assert_eq!(pair[1].0, pair[0].1 + 1, "gap or overlap between windows");
        }
        for (from, to) in &ranges {
            assert!(to - from <= BLOCK_RANGE);
        }
    }

    #[tokio::test]
    async fn clamps_to_genesis_on_young_chains() {
        let source = MockSource::new(1_000);
        fetch_events_in_chunks(&source, &query()).await.unwrap();

        let ranges = source.ranges.lock().unwrap().clone();
        assert_eq!(ranges.first().unwrap().0, 0);
        assert_eq!(ranges.last().unwrap().1, 1_000);
    }

    #[tokio::test]
    async fn a_failed_window_is_retried_then_skipped() {
        let source = MockSource::new(100_000);
        // window 1 fails twice, window 2 succeeds with one log
        source.push_logs(Err(()));
        source.push_logs(Err(()));
        source.push_logs(Ok(vec![raw_log(60_000)]));

        let events = fetch_events_in_chunks(&source, &query()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].block_number, 60_000);

        // 2 attempts for the failed window + 5 remaining windows
        assert_eq!(source.ranges.lock().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn timestamp_failure_hits_only_its_own_event() {
        let mut source = MockSource::new(100_000);
        source.broken_blocks = vec![60_001];
        source.push_logs(Ok(vec![raw_log(60_000), raw_log(60_001), raw_log(60_002)]));

        let before = Utc::now().timestamp();
        let events = fetch_events_in_chunks(&source, &query()).await.unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].block_timestamp, 1_000_000 + 60_000);
        assert_eq!(events[2].block_timestamp, 1_000_000 + 60_002);
        // the broken one fell back to wall clock, not zero and not an error
        assert!(events[1].block_timestamp >= before);
    }

    #[tokio::test]
    async fn chain_head_failure_aborts_the_fetch() {
        struct DeadSource;

        #[async_trait]
        impl ChainSource for DeadSource {
            async fn block_number(&self) -> Result<u64, ChainError> {
                Err(ChainError::Rpc {
                    code: -32000,
                    message: "down".to_string(),
                })
            }
            async fn get_logs(&self, _f: &LogFilter) -> Result<Vec<RawLog>, ChainError> {
                unreachable!()
            }
            async fn block_timestamp(&self, _b: u64) -> Result<i64, ChainError> {
                unreachable!()
            }
            async fn call(&self, _to: Address, _data: Vec<u8>) -> Result<Vec<u8>, ChainError> {
                unreachable!()
            }
        }

        assert!(fetch_events_in_chunks(&DeadSource, &query()).await.is_err());
    }
}
