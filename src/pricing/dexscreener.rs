use super::{PriceProvider, PriceResult, PriceSource};
use crate::domain::Chain;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

const BASE_URL: &str = "https://api.dexscreener.com/latest/dex/tokens";

fn chain_id(chain: Chain) -> &'static str {
    match chain {
        Chain::Ethereum => "ethereum",
        Chain::Base => "base",
        Chain::Arbitrum => "arbitrum",
        Chain::Optimism => "optimism",
        Chain::Polygon => "polygon",
        Chain::Solana => "solana",
    }
}

#[derive(Debug, Deserialize)]
struct DexScreenerResponse {
    pairs: Option<Vec<DexPair>>,
}

#[derive(Debug, Deserialize)]
struct DexPair {
    #[serde(rename = "chainId")]
    chain_id: String,
    #[serde(rename = "priceUsd")]
    price_usd: Option<String>,
    liquidity: Option<DexLiquidity>,
    #[serde(rename = "fdv")]
    fdv: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DexLiquidity {
    usd: Option<f64>,
}

/// No key required for the public API; `api_key` is an optional enhanced-tier
/// key some deployments pair with a higher rate limit.
pub struct DexScreenerSource {
    client: Client,
    api_key: Option<String>,
}

impl DexScreenerSource {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl PriceSource for DexScreenerSource {
    fn provider(&self) -> PriceProvider {
        PriceProvider::DexScreener
    }

    /// This is the key path for new/obscure tokens (§4.2), so it must work
    /// on every chain regardless of whether an enhanced-tier key is set.
    async fn fetch(&self, token_address: &str, chain: Chain) -> Option<PriceResult> {
        let url = format!("{}/{}", BASE_URL, token_address);
        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }

        let response = request.send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }

        let body: DexScreenerResponse = response.json().await.ok()?;
        let target_chain = chain_id(chain);

        let best_pair = body
            .pairs?
            .into_iter()
            .filter(|pair| pair.chain_id == target_chain)
            .max_by(|a, b| {
                let liq_a = a.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0);
                let liq_b = b.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0);
                liq_a.partial_cmp(&liq_b).unwrap_or(std::cmp::Ordering::Equal)
            })?;

        let price_usd: f64 = best_pair.price_usd?.parse().ok()?;
        Some(PriceResult { price_usd, market_cap_usd: best_pair.fdv, source: PriceProvider::DexScreener })
    }
}
