use super::transport::HttpTransport;
use super::{ChainClient, CursorMap};
use crate::domain::{Action, Chain, Transfer};
use crate::errors::EngineError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::json;

const SIGNATURE_LIMIT: usize = 25;

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SignatureEntry {
    signature: String,
}

#[derive(Debug, Deserialize)]
struct TransactionResult {
    #[serde(rename = "blockTime")]
    block_time: Option<i64>,
    meta: Option<TransactionMeta>,
}

#[derive(Debug, Deserialize)]
struct TransactionMeta {
    #[serde(rename = "preTokenBalances")]
    pre_token_balances: Vec<TokenBalance>,
    #[serde(rename = "postTokenBalances")]
    post_token_balances: Vec<TokenBalance>,
}

#[derive(Debug, Clone, Deserialize)]
struct TokenBalance {
    owner: Option<String>,
    mint: String,
    #[serde(rename = "uiTokenAmount")]
    ui_token_amount: UiTokenAmount,
}

#[derive(Debug, Clone, Deserialize)]
struct UiTokenAmount {
    #[serde(rename = "uiAmount")]
    ui_amount: Option<f64>,
}

pub struct SolanaChainClient {
    transport: HttpTransport,
    rpc_url: String,
    cursors: CursorMap<String, String>,
}

impl SolanaChainClient {
    pub fn new(timeout_secs: u64, min_spacing_ms: u64, rpc_url: String, api_key: Option<String>, cursor_cap: usize) -> Self {
        let rpc_url = match api_key {
            Some(key) if !key.is_empty() => format!("{}{}{}", rpc_url, if rpc_url.contains('?') { "&api-key=" } else { "?api-key=" }, key),
            _ => rpc_url,
        };
        Self { transport: HttpTransport::new(timeout_secs, min_spacing_ms), rpc_url, cursors: CursorMap::new(cursor_cap) }
    }

    async fn fetch_signatures(&self, wallet: &str, until: Option<&str>) -> Result<Vec<String>, EngineError> {
        let mut params = json!({"limit": SIGNATURE_LIMIT});
        if let Some(until) = until {
            params["until"] = json!(until);
        }

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getSignaturesForAddress",
            "params": [wallet, params],
        });

        let response = self.transport.post_json(&self.rpc_url, &body).await.map_err(|e| EngineError::Network {
            endpoint: "solana.getSignaturesForAddress".to_string(),
            message: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(EngineError::RpcProvider {
                provider: "solana".to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        let envelope: RpcEnvelope<Vec<SignatureEntry>> =
            response.json().await.map_err(|e| EngineError::Data(format!("decoding signatures: {}", e)))?;

        Ok(envelope.result.unwrap_or_default().into_iter().map(|e| e.signature).collect())
    }

    async fn fetch_transaction(&self, signature: &str) -> Option<TransactionResult> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getTransaction",
            "params": [signature, {"encoding": "jsonParsed", "maxSupportedTransactionVersion": 0}],
        });

        let response = self.transport.post_json(&self.rpc_url, &body).await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let envelope: RpcEnvelope<TransactionResult> = response.json().await.ok()?;
        envelope.result
    }

    /// Net SPL balance change for `wallet` in this transaction, keyed by
    /// mint: positive means the wallet gained the token (buy), negative
    /// means it lost it (sell).
    fn classify(meta: &TransactionMeta, wallet: &str) -> Vec<(String, f64)> {
        let mut deltas: std::collections::HashMap<String, f64> = std::collections::HashMap::new();

        for balance in &meta.pre_token_balances {
            if balance.owner.as_deref() == Some(wallet) {
                *deltas.entry(balance.mint.clone()).or_insert(0.0) -= balance.ui_token_amount.ui_amount.unwrap_or(0.0);
            }
        }
        for balance in &meta.post_token_balances {
            if balance.owner.as_deref() == Some(wallet) {
                *deltas.entry(balance.mint.clone()).or_insert(0.0) += balance.ui_token_amount.ui_amount.unwrap_or(0.0);
            }
        }

        deltas.into_iter().filter(|(_, delta)| delta.abs() > 1e-12).collect()
    }
}

#[async_trait]
impl ChainClient for SolanaChainClient {
    async fn get_recent_token_transfers(
        &self,
        wallet: &str,
        _chain: Chain,
        since_cursor: Option<String>,
    ) -> Result<(Vec<Transfer>, Option<String>), EngineError> {
        let until = since_cursor.clone().or_else(|| self.cursors.get(&wallet.to_string()));
        let signatures = self.fetch_signatures(wallet, until.as_deref()).await?;

        if signatures.is_empty() {
            return Ok((Vec::new(), until));
        }

        // Fetch transaction details concurrently (bounded by the shared
        // RateGate inside HttpTransport); the caller serializes the writes.
        let fetches = signatures.iter().map(|sig| self.fetch_transaction(sig));
        let results = join_all(fetches).await;

        let mut transfers = Vec::new();
        for (signature, tx) in signatures.iter().zip(results) {
            let Some(tx) = tx else { continue };
            let Some(meta) = tx.meta else { continue };
            let timestamp =
                tx.block_time.and_then(|t| DateTime::<Utc>::from_timestamp(t, 0)).unwrap_or_else(Utc::now);

            for (mint, delta) in Self::classify(&meta, wallet) {
                transfers.push(Transfer {
                    wallet_address: wallet.to_string(),
                    chain: Chain::Solana,
                    tx_hash: signature.clone(),
                    token_address: mint,
                    token_symbol: String::new(),
                    action: if delta > 0.0 { Action::Buy } else { Action::Sell },
                    amount: delta.abs(),
                    price_usd: 0.0,
                    total_value_usd: 0.0,
                    timestamp,
                    block_number: None,
                });
            }
        }

        let new_cursor = signatures.first().cloned();
        if let Some(cursor) = &new_cursor {
            self.cursors.set(wallet.to_string(), cursor.clone());
        }

        Ok((transfers, new_cursor))
    }
}
