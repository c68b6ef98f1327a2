use super::ChainClient;
use crate::domain::{Action, Chain, Transfer};
use crate::errors::EngineError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Returned by both real clients when `MOCK_MODE` is set (§4.3 expansion):
/// a synthetic but deterministic transfer stream seeded from
/// `(wallet, chain, cursor)`, so repeated calls with the same cursor
/// reproduce the same transfers for tests and demos.
pub struct MockChainClient;

impl MockChainClient {
    pub fn new() -> Self {
        Self
    }

    fn seed(wallet: &str, chain: Chain, cursor: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        wallet.hash(&mut hasher);
        chain.as_str().hash(&mut hasher);
        cursor.hash(&mut hasher);
        hasher.finish()
    }
}

impl Default for MockChainClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn get_recent_token_transfers(
        &self,
        wallet: &str,
        chain: Chain,
        since_cursor: Option<String>,
    ) -> Result<(Vec<Transfer>, Option<String>), EngineError> {
        let cursor = since_cursor.unwrap_or_else(|| "0".to_string());
        let seed = Self::seed(wallet, chain, &cursor);
        let count = (seed % 3) as usize;

        let transfers = (0..count)
            .map(|i| {
                let item_seed = seed.wrapping_add(i as u64);
                Transfer {
                    wallet_address: wallet.to_string(),
                    chain,
                    tx_hash: format!("mock-{:x}-{}", seed, i),
                    token_address: format!("0xmock{:x}", item_seed % 997),
                    token_symbol: "MOCK".to_string(),
                    action: if item_seed % 2 == 0 { Action::Buy } else { Action::Sell },
                    amount: 10.0 + (item_seed % 100) as f64,
                    price_usd: 1.0 + (item_seed % 50) as f64 / 10.0,
                    total_value_usd: 0.0,
                    timestamp: Utc::now(),
                    block_number: Some(item_seed),
                }
            })
            .collect();

        let next_cursor = (seed % 1_000_000).to_string();
        Ok((transfers, Some(next_cursor)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_cursor_reproduces_the_same_stream() {
        let client = MockChainClient::new();
        let (first, cursor1) = client.get_recent_token_transfers("0xabc", Chain::Base, None).await.unwrap();
        let (second, cursor2) = client.get_recent_token_transfers("0xabc", Chain::Base, None).await.unwrap();

        assert_eq!(first.len(), second.len());
        assert_eq!(cursor1, cursor2);
    }

    #[tokio::test]
    async fn different_cursors_advance_the_stream() {
        let client = MockChainClient::new();
        let (_, cursor1) = client.get_recent_token_transfers("0xabc", Chain::Base, None).await.unwrap();
        let (_, cursor2) =
            client.get_recent_token_transfers("0xabc", Chain::Base, cursor1.clone()).await.unwrap();

        assert_ne!(cursor1, cursor2);
    }
}
