// Block-explorer transaction confirmation

use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

/// Bounded polling schedule for one confirmation wait.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

/// Deposits, withdrawals and transfers: poll every second for a minute.
pub const TRANSFER_CONFIRM: RetryPolicy = RetryPolicy {
    max_attempts: 60,
    interval: Duration::from_secs(1),
};

/// Reward claims settle slower; poll every two seconds for a minute.
pub const CLAIM_CONFIRM: RetryPolicy = RetryPolicy {
    max_attempts: 30,
    interval: Duration::from_secs(2),
};

/// Terminal outcome of one confirmation wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmStatus {
    Confirmed,
    Reverted(String),
    /// Retries exhausted without a verdict; the transaction may still land.
    TimedOut,
}

pub struct ExplorerClient {
    http: HttpClient,
    base_url: String,
}

impl ExplorerClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: HttpClient::new(),
            base_url,
        }
    }

    /// Poll the explorer until the transaction reaches a terminal state or
    /// the policy is exhausted. Per-attempt network errors are logged and
    /// retried; only exhaustion surfaces as `TimedOut`.
    pub async fn wait_for_transaction(&self, tx_hash: &str, policy: RetryPolicy) -> ConfirmStatus {
        for attempt in 0..policy.max_attempts {
            match self.lookup(tx_hash).await {
                Ok(receipt) => {
                    if let Some(status) = classify_receipt(&receipt) {
                        return status;
                    }
                }
                Err(e) => {
                    warn!(
                        "explorer poll {}/{} for {} failed: {}",
                        attempt + 1,
                        policy.max_attempts,
                        tx_hash,
                        e
                    );
                }
            }
            tokio::time::sleep(policy.interval).await;
        }
        ConfirmStatus::TimedOut
    }

    async fn lookup(&self, tx_hash: &str) -> Result<Value, reqwest::Error> {
        self.http
            .get(format!("{}/api/v2/transactions/{}", self.base_url, tx_hash))
            .send()
            .await?
            .json()
            .await
    }
}

/// Map an explorer receipt to a terminal state; `None` means still pending.
pub fn classify_receipt(receipt: &Value) -> Option<ConfirmStatus> {
    match receipt["status"].as_str() {
        Some("ok") => return Some(ConfirmStatus::Confirmed),
        Some("error") => {
            let message = receipt["result"]["message"]
                .as_str()
                .unwrap_or("transaction reverted on-chain")
                .to_string();
            return Some(ConfirmStatus::Reverted(message));
        }
        _ => {}
    }

    // etherscan-style receipts nest a numeric status under result
    match receipt["result"]["status"].as_str() {
        Some("1") => Some(ConfirmStatus::Confirmed),
        Some("0") => Some(ConfirmStatus::Reverted(
            "transaction reverted on-chain".to_string(),
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_status_confirms() {
        assert_eq!(
            classify_receipt(&json!({"status": "ok"})),
            Some(ConfirmStatus::Confirmed)
        );
        assert_eq!(
            classify_receipt(&json!({"result": {"status": "1"}})),
            Some(ConfirmStatus::Confirmed)
        );
    }

    #[test]
    fn error_status_reverts_with_a_message() {
        assert_eq!(
            classify_receipt(&json!({"status": "error", "result": {"message": "out of gas"}})),
            Some(ConfirmStatus::Reverted("out of gas".to_string()))
        );
        assert!(matches!(
            classify_receipt(&json!({"result": {"status": "0"}})),
            Some(ConfirmStatus::Reverted(_))
        ));
    }

    #[test]
    fn anything_else_is_still_pending() {
        assert_eq!(classify_receipt(&json!({})), None);
        assert_eq!(classify_receipt(&json!({"status": "indexing"})), None);
    }

    #[test]
    fn policies_are_bounded() {
        assert_eq!(TRANSFER_CONFIRM.max_attempts, 60);
        assert_eq!(TRANSFER_CONFIRM.interval, Duration::from_secs(1));
        assert_eq!(CLAIM_CONFIRM.max_attempts, 30);
        assert_eq!(CLAIM_CONFIRM.interval, Duration::from_secs(2));
    }
}
