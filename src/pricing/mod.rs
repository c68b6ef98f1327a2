//! USD price resolution cascade (§4.2).
//!
//! `PriceOracle::get_price` tries a 60s-TTL cache, then each configured
//! `PriceSource` in order, caching the first non-nil winner. Sources never
//! bubble a typed error to the caller: a non-2xx response or a transport
//! failure just means "this source has no opinion", so the cascade falls
//! through to the next one, mirroring the teacher's gecko_terminal client's
//! "swallow and return the next best thing" posture.

mod coingecko;
mod coinmarketcap;
mod dexscreener;
mod jupiter;

use crate::config::PricingConfig;
use crate::domain::Chain;
use crate::logger::{self, LogTag};
use crate::util::BoundedCache;
use async_trait::async_trait;
use std::time::Duration;

pub use coingecko::CoinGeckoSource;
pub use coinmarketcap::CoinMarketCapSource;
pub use dexscreener::DexScreenerSource;
pub use jupiter::JupiterSource;

const HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceProvider {
    CoinGecko,
    CoinMarketCap,
    DexScreener,
    Jupiter,
}

impl PriceProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            PriceProvider::CoinGecko => "coingecko",
            PriceProvider::CoinMarketCap => "coinmarketcap",
            PriceProvider::DexScreener => "dexscreener",
            PriceProvider::Jupiter => "jupiter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceResult {
    pub price_usd: f64,
    pub market_cap_usd: Option<f64>,
    pub source: PriceProvider,
}

/// One upstream price lookup. Implementors own their `reqwest::Client` and
/// absorb their own errors; a `None` means "try the next source", not "this
/// token has no price" (§4.2: failures fall through, never propagate).
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn provider(&self) -> PriceProvider;

    /// `false` lets the oracle skip a source with no key configured without
    /// making a doomed HTTP call.
    fn is_available(&self) -> bool {
        true
    }

    async fn fetch(&self, token_address: &str, chain: Chain) -> Option<PriceResult>;
}

fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

pub struct PriceOracle {
    sources: Vec<Box<dyn PriceSource>>,
    cache: BoundedCache<(Chain, String), PriceResult>,
}

impl PriceOracle {
    pub fn new(config: &PricingConfig) -> Self {
        let sources: Vec<Box<dyn PriceSource>> = vec![
            Box::new(CoinGeckoSource::new(build_client(), config.coingecko_key.clone())),
            Box::new(CoinMarketCapSource::new(build_client(), config.coinmarketcap_key.clone())),
            Box::new(DexScreenerSource::new(build_client(), config.dex_provider_key.clone())),
            Box::new(JupiterSource::new(build_client())),
        ];

        Self {
            sources,
            cache: BoundedCache::new(
                Duration::from_secs(config.cache_ttl_secs),
                config.cache_max_entries,
            ),
        }
    }

    #[cfg(test)]
    fn with_sources(sources: Vec<Box<dyn PriceSource>>, ttl_secs: u64, max_entries: usize) -> Self {
        Self { sources, cache: BoundedCache::new(Duration::from_secs(ttl_secs), max_entries) }
    }

    /// Cascades through the cache then each source in order, never erroring;
    /// a total miss returns `None` and the caller handles the absence (§4.2).
    pub async fn get_price(&self, token_address: &str, chain: Chain) -> Option<PriceResult> {
        let key = (chain, token_address.to_string());
        if let Some(cached) = self.cache.get(&key) {
            return Some(cached);
        }

        for source in &self.sources {
            if !source.is_available() {
                continue;
            }
            match source.fetch(token_address, chain).await {
                Some(result) if result.price_usd > 0.0 => {
                    self.cache.insert(key, result);
                    return Some(result);
                }
                Some(_) => {
                    logger::warning(
                        LogTag::Pricing,
                        &format!("{} returned a zero price for {}, ignoring", source.provider().as_str(), token_address),
                    );
                }
                None => {}
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysHit(PriceProvider, f64);

    #[async_trait]
    impl PriceSource for AlwaysHit {
        fn provider(&self) -> PriceProvider {
            self.0
        }

        async fn fetch(&self, _token_address: &str, _chain: Chain) -> Option<PriceResult> {
            Some(PriceResult { price_usd: self.1, market_cap_usd: None, source: self.0 })
        }
    }

    struct AlwaysMiss(PriceProvider);

    #[async_trait]
    impl PriceSource for AlwaysMiss {
        fn provider(&self) -> PriceProvider {
            self.0
        }

        async fn fetch(&self, _token_address: &str, _chain: Chain) -> Option<PriceResult> {
            None
        }
    }

    #[tokio::test]
    async fn falls_through_to_the_next_source_on_a_miss() {
        let oracle = PriceOracle::with_sources(
            vec![
                Box::new(AlwaysMiss(PriceProvider::CoinGecko)),
                Box::new(AlwaysHit(PriceProvider::DexScreener, 1.25)),
            ],
            60,
            500,
        );

        let result = oracle.get_price("0xtoken", Chain::Base).await.unwrap();
        assert_eq!(result.source, PriceProvider::DexScreener);
        assert_eq!(result.price_usd, 1.25);
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let oracle = PriceOracle::with_sources(
            vec![Box::new(AlwaysHit(PriceProvider::CoinGecko, 2.0))],
            60,
            500,
        );

        oracle.get_price("0xtoken", Chain::Base).await.unwrap();
        let cached = oracle.cache.get(&(Chain::Base, "0xtoken".to_string())).unwrap();
        assert_eq!(cached.price_usd, 2.0);
    }

    #[tokio::test]
    async fn a_zero_price_never_poisons_the_cache() {
        let oracle = PriceOracle::with_sources(
            vec![
                Box::new(AlwaysHit(PriceProvider::CoinGecko, 0.0)),
                Box::new(AlwaysHit(PriceProvider::DexScreener, 3.0)),
            ],
            60,
            500,
        );

        let result = oracle.get_price("0xtoken", Chain::Base).await.unwrap();
        assert_eq!(result.price_usd, 3.0);
    }

    #[tokio::test]
    async fn total_miss_returns_none() {
        let oracle = PriceOracle::with_sources(vec![Box::new(AlwaysMiss(PriceProvider::CoinGecko))], 60, 500);
        assert!(oracle.get_price("0xtoken", Chain::Base).await.is_none());
    }
}
