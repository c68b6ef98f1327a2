//! Mutex-guarded "next slot" spacing, generalized from the teacher's
//! `rpc::rate_limiter` token-bucket manager down to the single invariant
//! §4.3 actually requires: never start a request less than `min_spacing`
//! after the previous one started.
//!
//! The ordering matters: acquire the lock, compute how long to wait, sleep,
//! *then* record the new slot. Recording the slot before sleeping would let
//! two callers both observe the old slot and burst through together.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub struct RateGate {
    min_spacing: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(min_spacing: Duration) -> Self {
        Self { min_spacing, next_slot: Mutex::new(None) }
    }

    /// Blocks the caller until it is this request's turn. The lock is held
    /// across the sleep so a second caller can't read the same stale slot
    /// and burst through alongside the first (§4.3: update-before-sleep is
    /// the race this avoids).
    pub async fn wait_for_slot(&self) {
        let mut next_slot = self.next_slot.lock().await;
        let now = Instant::now();
        let wait = match *next_slot {
            Some(slot) if slot > now => slot - now,
            _ => Duration::ZERO,
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        *next_slot = Some(Instant::now() + self.min_spacing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn back_to_back_calls_are_spaced_out() {
        let gate = RateGate::new(Duration::from_millis(40));
        let start = Instant::now();

        gate.wait_for_slot().await;
        gate.wait_for_slot().await;
        gate.wait_for_slot().await;

        assert!(start.elapsed() >= Duration::from_millis(80));
    }
}
