//! Subsystem tags attached to every log line, so `grep` on one tag isolates
//! one subsystem's behavior.

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    Supervisor,
    Scheduler,
    Chain,
    Wallet,
    Trading,
    Strategy,
    Risk,
    Discovery,
    Pricing,
    Store,
    Webserver,
    System,
    Test,
    Other(String),
}

impl LogTag {
    /// Stable lowercase key, used for env-var based per-tag overrides.
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::Supervisor => "supervisor".to_string(),
            LogTag::Scheduler => "scheduler".to_string(),
            LogTag::Chain => "chain".to_string(),
            LogTag::Wallet => "wallet".to_string(),
            LogTag::Trading => "trading".to_string(),
            LogTag::Strategy => "strategy".to_string(),
            LogTag::Risk => "risk".to_string(),
            LogTag::Discovery => "discovery".to_string(),
            LogTag::Pricing => "pricing".to_string(),
            LogTag::Store => "store".to_string(),
            LogTag::Webserver => "webserver".to_string(),
            LogTag::System => "system".to_string(),
            LogTag::Test => "test".to_string(),
            LogTag::Other(s) => s.to_lowercase(),
        }
    }

    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::Supervisor => "SUPERVISOR".to_string(),
            LogTag::Scheduler => "SCHEDULER".to_string(),
            LogTag::Chain => "CHAIN".to_string(),
            LogTag::Wallet => "WALLET".to_string(),
            LogTag::Trading => "TRADING".to_string(),
            LogTag::Strategy => "STRATEGY".to_string(),
            LogTag::Risk => "RISK".to_string(),
            LogTag::Discovery => "DISCOVERY".to_string(),
            LogTag::Pricing => "PRICING".to_string(),
            LogTag::Store => "STORE".to_string(),
            LogTag::Webserver => "WEBSERVER".to_string(),
            LogTag::System => "SYSTEM".to_string(),
            LogTag::Test => "TEST".to_string(),
            LogTag::Other(s) => s.to_uppercase(),
        }
    }
}
