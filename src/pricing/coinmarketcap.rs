use super::{PriceProvider, PriceResult, PriceSource};
use crate::domain::Chain;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

const BASE_URL: &str = "https://pro-api.coinmarketcap.com/v2";

fn platform_slug(chain: Chain) -> Option<&'static str> {
    match chain {
        Chain::Ethereum => Some("ethereum"),
        Chain::Base => Some("base"),
        Chain::Arbitrum => Some("arbitrum"),
        Chain::Optimism => Some("optimism"),
        Chain::Polygon => Some("polygon"),
        Chain::Solana => Some("solana"),
    }
}

#[derive(Debug, Deserialize)]
struct CmcResponse {
    data: HashMap<String, Vec<CmcTokenEntry>>,
}

#[derive(Debug, Deserialize)]
struct CmcTokenEntry {
    quote: HashMap<String, CmcQuote>,
}

#[derive(Debug, Deserialize)]
struct CmcQuote {
    price: Option<f64>,
    market_cap: Option<f64>,
}

pub struct CoinMarketCapSource {
    client: Client,
    api_key: Option<String>,
}

impl CoinMarketCapSource {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl PriceSource for CoinMarketCapSource {
    fn provider(&self) -> PriceProvider {
        PriceProvider::CoinMarketCap
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(&self, token_address: &str, chain: Chain) -> Option<PriceResult> {
        let slug = platform_slug(chain)?;
        let api_key = self.api_key.as_ref()?;

        let url = format!(
            "{}/cryptocurrency/quotes/latest?address={}&platform={}&convert=USD",
            BASE_URL, token_address, slug
        );

        let response = self
            .client
            .get(&url)
            .header("X-CMC_PRO_API_KEY", api_key)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }

        let body: CmcResponse = response.json().await.ok()?;
        let entry = body.data.values().next()?.first()?;
        let quote = entry.quote.get("USD")?;
        let price_usd = quote.price?;

        Some(PriceResult { price_usd, market_cap_usd: quote.market_cap, source: PriceProvider::CoinMarketCap })
    }
}
