//! Upstream provider health probe (§4.10). Cached results only; never called
//! from the core trading loop, only surfaced on the HTTP boundary so a
//! flaky provider can't slow down a tick waiting on a probe.

use crate::logger::{self, LogTag};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::Client;
use std::collections::HashMap;
use std::time::{Duration, Instant};

const PROBE_INTERVAL: Duration = Duration::from_secs(60);
const PROBE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Critical,
    NonCritical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Ok,
    Warning,
    Down,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProviderStatus {
    pub provider: String,
    pub status: Health,
    pub last_ok: Option<DateTime<Utc>>,
    pub latency_ms: Option<u64>,
    pub tier: &'static str,
}

/// One provider to probe. `anchor` names another provider in the same
/// `ApiStatus` whose health downgrades this one's failure from a hard `Down`
/// to a `Warning` (e.g. the Solana indexer depends on Solana RPC being up).
pub struct ProbeSpec {
    pub provider: &'static str,
    pub url: String,
    pub tier: Tier,
    pub anchor: Option<&'static str>,
}

struct CachedProbe {
    spec: ProbeSpec,
    last_checked: Option<Instant>,
    last_ok: Option<DateTime<Utc>>,
    latency_ms: Option<u64>,
    healthy: bool,
}

pub struct ApiStatus {
    client: Client,
    probes: RwLock<HashMap<&'static str, CachedProbe>>,
}

impl ApiStatus {
    pub fn new(specs: Vec<ProbeSpec>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        let mut probes = HashMap::new();
        for spec in specs {
            probes.insert(
                spec.provider,
                CachedProbe { spec, last_checked: None, last_ok: None, latency_ms: None, healthy: false },
            );
        }
        Self { client, probes: RwLock::new(probes) }
    }

    /// Returns the current status of every configured provider, probing any
    /// entry whose cached result is older than the probe interval.
    pub async fn snapshot(&self, now: DateTime<Utc>) -> Vec<ProviderStatus> {
        let stale: Vec<&'static str> = {
            let probes = self.probes.read();
            probes
                .values()
                .filter(|p| p.last_checked.map(|t| t.elapsed() >= PROBE_INTERVAL).unwrap_or(true))
                .map(|p| p.spec.provider)
                .collect()
        };

        for provider in stale {
            self.refresh(provider, now).await;
        }

        let probes = self.probes.read();
        let anchors: HashMap<&str, bool> =
            probes.iter().map(|(id, p)| (*id, p.healthy)).collect();

        probes
            .values()
            .map(|p| {
                let status = if p.healthy {
                    Health::Ok
                } else if p.spec.tier == Tier::Critical {
                    Health::Down
                } else {
                    match p.spec.anchor.and_then(|a| anchors.get(a)) {
                        Some(true) => Health::Warning,
                        _ => Health::Down,
                    }
                };
                ProviderStatus {
                    provider: p.spec.provider.to_string(),
                    status,
                    last_ok: p.last_ok,
                    latency_ms: p.latency_ms,
                    tier: match p.spec.tier {
                        Tier::Critical => "critical",
                        Tier::NonCritical => "non_critical",
                    },
                }
            })
            .collect()
    }

    async fn refresh(&self, provider: &'static str, now: DateTime<Utc>) {
        let url = match self.probes.read().get(provider) {
            Some(p) => p.spec.url.clone(),
            None => return,
        };

        let started = Instant::now();
        let result = self.client.get(&url).send().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let mut probes = self.probes.write();
        let Some(entry) = probes.get_mut(provider) else { return };
        entry.last_checked = Some(Instant::now());
        entry.latency_ms = Some(elapsed_ms);

        match result {
            Ok(resp) if resp.status().is_success() => {
                entry.healthy = true;
                entry.last_ok = Some(now);
            }
            Ok(resp) => {
                entry.healthy = false;
                logger::warning(
                    LogTag::System,
                    &format!("provider {} responded with status {}", provider, resp.status()),
                );
            }
            Err(e) => {
                entry.healthy = false;
                logger::warning(LogTag::System, &format!("provider {} probe failed: {}", provider, e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn an_unreachable_provider_reports_down_when_critical() {
        let status = ApiStatus::new(vec![ProbeSpec {
            provider: "bogus",
            url: "http://127.0.0.1:1/does-not-exist".to_string(),
            tier: Tier::Critical,
            anchor: None,
        }]);
        let snapshot = status.snapshot(Utc::now()).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].status, Health::Down);
    }

    #[tokio::test]
    async fn a_failing_non_critical_provider_is_a_warning_when_its_anchor_is_healthy() {
        let status = ApiStatus::new(vec![
            ProbeSpec {
                provider: "anchor",
                url: "https://api.coingecko.com/api/v3/ping".to_string(),
                tier: Tier::Critical,
                anchor: None,
            },
            ProbeSpec {
                provider: "dependent",
                url: "http://127.0.0.1:1/does-not-exist".to_string(),
                tier: Tier::NonCritical,
                anchor: Some("anchor"),
            },
        ]);
        {
            let mut probes = status.probes.write();
            probes.get_mut("anchor").unwrap().healthy = true;
            probes.get_mut("anchor").unwrap().last_checked = Some(Instant::now());
        }
        let snapshot = status.snapshot(Utc::now()).await;
        let dependent = snapshot.iter().find(|p| p.provider == "dependent").unwrap();
        assert_eq!(dependent.status, Health::Warning);
    }
}
