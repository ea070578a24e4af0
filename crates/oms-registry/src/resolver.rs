//! Precision resolver.
//!
//! Entries are fetched in bulk from futures exchange info and kept in a
//! concurrent map. Each entry remembers when it was fetched. An entry older
//! than `max_age` is treated as a miss, and the next `resolve` reloads the
//! whole table. Concurrent misses wait on one reload instead of each issuing
//! their own.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use oms_core::{InstrumentPrecision, ValidationError};
use oms_gateway::DynGateway;
use oms_telemetry::Metrics;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::RegistryResult;

#[derive(Debug, Clone)]
struct CacheEntry {
    spec: InstrumentPrecision,
    fetched_at: Instant,
}

/// Per-session instrument precision cache.
pub struct PrecisionResolver {
    gateway: DynGateway,
    entries: DashMap<String, CacheEntry>,
    /// Symbols listed with unusable filters, kept so `resolve` can report why.
    rejected: DashMap<String, ValidationError>,
    max_age: Duration,
    reload_lock: Mutex<()>,
}

impl PrecisionResolver {
    pub fn new(gateway: DynGateway, max_age: Duration) -> Self {
        Self {
            gateway,
            entries: DashMap::new(),
            rejected: DashMap::new(),
            max_age,
            reload_lock: Mutex::new(()),
        }
    }

    /// Precision filters for `symbol`.
    ///
    /// Fails with `InstrumentNotFound` if exchange info does not list the
    /// symbol, and with `InvalidInstrumentFilter` if it lists a zero or
    /// negative step/tick.
    pub async fn resolve(&self, symbol: &str) -> RegistryResult<InstrumentPrecision> {
        let symbol = symbol.trim().to_ascii_uppercase();
        if let Some(spec) = self.fresh(&symbol) {
            debug!(%symbol, "Precision cache hit");
            return Ok(spec);
        }

        let _guard = self.reload_lock.lock().await;
        // Another task may have reloaded while this one waited.
        if let Some(spec) = self.fresh(&symbol) {
            return Ok(spec);
        }
        self.reload().await?;

        if let Some(entry) = self.entries.get(&symbol) {
            return Ok(entry.spec.clone());
        }
        if let Some(err) = self.rejected.get(&symbol) {
            return Err(err.value().clone().into());
        }
        Err(ValidationError::InstrumentNotFound(symbol).into())
    }

    /// Force a full reload of the table.
    pub async fn refresh(&self) -> RegistryResult<()> {
        let _guard = self.reload_lock.lock().await;
        self.reload().await
    }

    /// Drop the cached entry for `symbol`. The next `resolve` reloads.
    pub fn invalidate(&self, symbol: &str) {
        let symbol = symbol.trim().to_ascii_uppercase();
        if self.entries.remove(&symbol).is_some() {
            debug!(%symbol, "Precision entry invalidated");
        }
    }

    /// Symbols currently cached, sorted.
    pub fn cached_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        symbols
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    fn fresh(&self, symbol: &str) -> Option<InstrumentPrecision> {
        self.entries
            .get(symbol)
            .filter(|entry| entry.fetched_at.elapsed() < self.max_age)
            .map(|entry| entry.spec.clone())
    }

    /// Caller must hold `reload_lock`.
    async fn reload(&self) -> RegistryResult<()> {
        let listed = self.gateway.futures_exchange_info().await?;
        Metrics::precision_refresh();

        let now = Instant::now();
        let mut seen = HashSet::with_capacity(listed.len());
        for info in listed {
            let symbol = info.symbol.to_ascii_uppercase();
            seen.insert(symbol.clone());

            let spec = match InstrumentPrecision::new(symbol.clone(), info.step_size, info.tick_size)
            {
                Ok(spec) => spec,
                Err(err) => {
                    warn!(%symbol, error = %err, "Unusable instrument filters");
                    self.entries.remove(&symbol);
                    self.rejected.insert(symbol, err);
                    continue;
                }
            };
            self.rejected.remove(&symbol);

            if let Some(existing) = self.entries.get(&symbol) {
                if !existing.spec.same_filters(&spec) {
                    warn!(
                        %symbol,
                        old_step = %existing.spec.step_size,
                        new_step = %spec.step_size,
                        old_tick = %existing.spec.tick_size,
                        new_tick = %spec.tick_size,
                        "Instrument filters changed on the exchange"
                    );
                }
            }
            self.entries.insert(
                symbol,
                CacheEntry {
                    spec,
                    fetched_at: now,
                },
            );
        }

        // Delisted symbols must not linger.
        self.entries.retain(|symbol, _| seen.contains(symbol));
        self.rejected.retain(|symbol, _| seen.contains(symbol));

        info!(instruments = self.entries.len(), "Precision table reloaded");
        Ok(())
    }
}
