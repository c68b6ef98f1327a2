//! Available-capital accounting for `TradingEngine` (§4.7).
//!
//! A candidate's size is only ever subtracted once `try_reserve` confirms
//! there is room; a closed or failed-to-open trade calls `release` to give
//! the capital back. Both happen under the same lock so two transfers in the
//! same batch can never double-spend the same dollar.

use parking_lot::Mutex;

pub struct CapitalLedger {
    available: Mutex<f64>,
}

impl CapitalLedger {
    pub fn new(available: f64) -> Self {
        Self { available: Mutex::new(available.max(0.0)) }
    }

    /// Atomically checks and subtracts; `false` means the candidate does not
    /// fit and the caller must not open a trade for it.
    pub fn try_reserve(&self, amount_usd: f64) -> bool {
        let mut available = self.available.lock();
        if amount_usd <= 0.0 || *available < amount_usd {
            return false;
        }
        *available -= amount_usd;
        true
    }

    pub fn release(&self, amount_usd: f64) {
        if amount_usd <= 0.0 {
            return;
        }
        *self.available.lock() += amount_usd;
    }

    pub fn available(&self) -> f64 {
        *self.available.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserving_past_available_capital_is_refused() {
        let ledger = CapitalLedger::new(100.0);
        assert!(ledger.try_reserve(80.0));
        assert!(!ledger.try_reserve(50.0));
        assert_eq!(ledger.available(), 20.0);
    }

    #[test]
    fn release_restores_capital() {
        let ledger = CapitalLedger::new(100.0);
        ledger.try_reserve(60.0);
        ledger.release(60.0);
        assert_eq!(ledger.available(), 100.0);
    }
}
