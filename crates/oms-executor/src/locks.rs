//! Per-symbol critical sections.
//!
//! Every "read position, compute, submit" sequence on a symbol runs under
//! that symbol's lock. Different symbols never contend.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Map of per-symbol async mutexes, created on first use.
#[derive(Debug, Default)]
pub struct SymbolLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SymbolLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the lock of `symbol` (case-insensitive).
    pub async fn lock(&self, symbol: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(symbol.trim().to_ascii_uppercase())
            .or_default()
            .clone();
        mutex.lock_owned().await
    }

    /// Number of symbols that have been locked at least once.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_symbol_serializes() {
        let locks = Arc::new(SymbolLocks::new());
        let guard = locks.lock("btcusdt").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.lock("BTCUSDT").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn test_different_symbols_do_not_contend() {
        let locks = SymbolLocks::new();
        let _btc = locks.lock("BTCUSDT").await;
        let eth = tokio::time::timeout(Duration::from_millis(100), locks.lock("ETHUSDT")).await;
        assert!(eth.is_ok());
    }
}
