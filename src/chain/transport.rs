//! Shared HTTP client the EVM and Solana clients build requests over, so the
//! 10s timeout (§5) and the `RateGate` spacing live in one place.

use super::rate_gate::RateGate;
use reqwest::Client;
use std::time::Duration;

pub struct HttpTransport {
    pub client: Client,
    pub rate_gate: RateGate,
}

impl HttpTransport {
    pub fn new(timeout_secs: u64, min_spacing_ms: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, rate_gate: RateGate::new(Duration::from_millis(min_spacing_ms)) }
    }

    pub async fn get(&self, url: &str) -> reqwest::Result<reqwest::Response> {
        self.rate_gate.wait_for_slot().await;
        self.client.get(url).send().await
    }

    pub async fn post_json(&self, url: &str, body: &serde_json::Value) -> reqwest::Result<reqwest::Response> {
        self.rate_gate.wait_for_slot().await;
        self.client.post(url).json(body).send().await
    }
}
