use super::{PriceProvider, PriceResult, PriceSource};
use crate::domain::Chain;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

const BASE_URL: &str = "https://api.coingecko.com/api/v3";

fn platform_id(chain: Chain) -> Option<&'static str> {
    match chain {
        Chain::Ethereum => Some("ethereum"),
        Chain::Base => Some("base"),
        Chain::Arbitrum => Some("arbitrum-one"),
        Chain::Optimism => Some("optimistic-ethereum"),
        Chain::Polygon => Some("polygon-pos"),
        Chain::Solana => Some("solana"),
    }
}

#[derive(Debug, Deserialize)]
struct TokenPriceEntry {
    usd: Option<f64>,
    usd_market_cap: Option<f64>,
}

pub struct CoinGeckoSource {
    client: Client,
    api_key: Option<String>,
}

impl CoinGeckoSource {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    fn provider(&self) -> PriceProvider {
        PriceProvider::CoinGecko
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(&self, token_address: &str, chain: Chain) -> Option<PriceResult> {
        let platform = platform_id(chain)?;
        let api_key = self.api_key.as_ref()?;

        let url = format!(
            "{}/simple/token_price/{}?contract_addresses={}&vs_currencies=usd&include_market_cap=true",
            BASE_URL, platform, token_address
        );

        let response = self
            .client
            .get(&url)
            .header("x-cg-demo-api-key", api_key)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }

        let body: HashMap<String, TokenPriceEntry> = response.json().await.ok()?;
        let entry = body.get(&token_address.to_lowercase())?;
        let price_usd = entry.usd?;

        Some(PriceResult { price_usd, market_cap_usd: entry.usd_market_cap, source: PriceProvider::CoinGecko })
    }
}
