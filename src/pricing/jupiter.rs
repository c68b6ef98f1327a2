use super::{PriceProvider, PriceResult, PriceSource};
use crate::domain::Chain;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

const BASE_URL: &str = "https://price.jup.ag/v6/price";

#[derive(Debug, Deserialize)]
struct JupiterResponse {
    data: HashMap<String, JupiterEntry>,
}

#[derive(Debug, Deserialize)]
struct JupiterEntry {
    price: f64,
}

/// Final fallback, Solana-only (§4.2 step 5).
pub struct JupiterSource {
    client: Client,
}

impl JupiterSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PriceSource for JupiterSource {
    fn provider(&self) -> PriceProvider {
        PriceProvider::Jupiter
    }

    async fn fetch(&self, token_address: &str, chain: Chain) -> Option<PriceResult> {
        if chain != Chain::Solana {
            return None;
        }

        let url = format!("{}?ids={}", BASE_URL, token_address);
        let response = self.client.get(&url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }

        let body: JupiterResponse = response.json().await.ok()?;
        let entry = body.data.get(token_address)?;

        Some(PriceResult { price_usd: entry.price, market_cap_usd: None, source: PriceProvider::Jupiter })
    }
}
