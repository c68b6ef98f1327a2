//! Chain observation boundary (§4.3).
//!
//! One contract, two real implementations (EVM via the unified explorer V2
//! endpoint, Solana via JSON-RPC) plus a `MockChainClient` substituted in
//! when `MOCK_MODE` is set. Both real clients share one `HttpTransport` per
//! instance so the 200ms request spacing and 10s timeout live in one place.

mod cursor;
mod evm;
mod mock;
mod rate_gate;
mod solana;
mod transport;

pub use cursor::CursorMap;
pub use evm::EvmChainClient;
pub use mock::MockChainClient;
pub use solana::SolanaChainClient;

use crate::domain::{Chain, Transfer};
use crate::errors::EngineError;
use async_trait::async_trait;

/// `GetRecentTokenTransfers(wallet, chain, since_cursor) → (transfers, new_cursor)`.
/// A `None` cursor means "from the beginning of what this provider retains".
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_recent_token_transfers(
        &self,
        wallet: &str,
        chain: Chain,
        since_cursor: Option<String>,
    ) -> Result<(Vec<Transfer>, Option<String>), EngineError>;
}
