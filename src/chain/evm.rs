use super::transport::HttpTransport;
use super::{ChainClient, CursorMap};
use crate::domain::{Action, Chain, Transfer};
use crate::errors::EngineError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

const BASE_URL: &str = "https://api.etherscan.io/v2/api";

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: String,
    message: String,
    result: ExplorerResult,
}

/// The unified explorer returns `result` as either an array of transfers or
/// an error string ("No transactions found") depending on `status`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExplorerResult {
    Transfers(Vec<ExplorerTransfer>),
    Message(String),
}

#[derive(Debug, Deserialize)]
struct ExplorerTransfer {
    #[serde(rename = "hash")]
    tx_hash: String,
    from: String,
    to: String,
    #[serde(rename = "contractAddress")]
    contract_address: String,
    #[serde(rename = "tokenSymbol")]
    token_symbol: String,
    value: String,
    #[serde(rename = "tokenDecimal")]
    token_decimal: String,
    #[serde(rename = "blockNumber")]
    block_number: String,
    #[serde(rename = "timeStamp")]
    timestamp: String,
}

pub struct EvmChainClient {
    transport: HttpTransport,
    api_key: Option<String>,
    cursors: CursorMap<(String, String), u64>,
}

impl EvmChainClient {
    pub fn new(timeout_secs: u64, min_spacing_ms: u64, api_key: Option<String>, cursor_cap: usize) -> Self {
        Self {
            transport: HttpTransport::new(timeout_secs, min_spacing_ms),
            api_key,
            cursors: CursorMap::new(cursor_cap),
        }
    }

    fn cursor_key(wallet: &str, chain: Chain) -> (String, String) {
        (wallet.to_lowercase(), chain.as_str().to_string())
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    async fn get_recent_token_transfers(
        &self,
        wallet: &str,
        chain: Chain,
        since_cursor: Option<String>,
    ) -> Result<(Vec<Transfer>, Option<String>), EngineError> {
        let chain_id = chain.explorer_chain_id().ok_or_else(|| {
            EngineError::Configuration { field: "chain".to_string(), reason: format!("{} is not an EVM chain", chain) }
        })?;

        let key = self.api_key.as_deref().unwrap_or("");
        let start_block = since_cursor
            .or_else(|| self.cursors.get(&Self::cursor_key(wallet, chain)).map(|b| b.to_string()))
            .unwrap_or_else(|| "0".to_string());

        let url = format!(
            "{}?chainid={}&module=account&action=tokentx&address={}&startblock={}&sort=asc&apikey={}",
            BASE_URL, chain_id, wallet, start_block, key
        );

        let response = self.transport.get(&url).await.map_err(|e| EngineError::Network {
            endpoint: "explorer.tokentx".to_string(),
            message: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(EngineError::RpcProvider {
                provider: "explorer".to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        let body: ExplorerResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Data(format!("decoding explorer response: {}", e)))?;

        if body.status != "1" {
            // "No transactions found" is not an error, just an empty page.
            return Ok((Vec::new(), since_cursor));
        }

        let entries = match body.result {
            ExplorerResult::Transfers(entries) => entries,
            ExplorerResult::Message(_) => Vec::new(),
        };

        let mut transfers = Vec::with_capacity(entries.len());
        let mut max_block: u64 = start_block.parse().unwrap_or(0);

        for entry in entries {
            let block_number: u64 = entry.block_number.parse().unwrap_or(0);
            max_block = max_block.max(block_number);

            let decimals: u32 = entry.token_decimal.parse().unwrap_or(18);
            let raw_value: f64 = entry.value.parse().unwrap_or(0.0);
            let amount = raw_value / 10f64.powi(decimals as i32);

            let action =
                if entry.to.eq_ignore_ascii_case(wallet) { Action::Buy }
                else if entry.from.eq_ignore_ascii_case(wallet) { Action::Sell }
                else { continue };

            let timestamp_secs: i64 = entry.timestamp.parse().unwrap_or(0);
            let timestamp = DateTime::<Utc>::from_timestamp(timestamp_secs, 0).unwrap_or_else(Utc::now);

            transfers.push(Transfer {
                wallet_address: wallet.to_string(),
                chain,
                tx_hash: entry.tx_hash,
                token_address: entry.contract_address,
                token_symbol: entry.token_symbol,
                action,
                amount,
                price_usd: 0.0,
                total_value_usd: 0.0,
                timestamp,
                block_number: Some(block_number),
            });
        }

        let new_cursor = (max_block + 1).to_string();
        self.cursors.set(Self::cursor_key(wallet, chain), max_block + 1);

        if body.message.to_lowercase().contains("rate limit") {
            return Err(EngineError::RateLimit { provider: "explorer".to_string() });
        }

        Ok((transfers, Some(new_cursor)))
    }
}
