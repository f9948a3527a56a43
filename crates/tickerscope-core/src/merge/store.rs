//! Persistence seams: the record store and the tracked-symbol list.
//!
//! The storage engine belongs to the host. These traits are what the pipeline
//! needs from it; the in-memory implementations back tests and hosts without
//! durable storage.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::models::TickerRecord;

/// Async key-value store of [`TickerRecord`]s keyed by symbol.
#[allow(async_fn_in_trait)]
pub trait TickerStore {
    async fn read(&self, symbol: &str) -> Result<Option<TickerRecord>, StoreError>;

    async fn write(&self, symbol: &str, record: &TickerRecord) -> Result<(), StoreError>;
}

/// Ordered list of symbols that have a persisted record.
#[allow(async_fn_in_trait)]
pub trait TrackedSymbols {
    async fn contains(&self, symbol: &str) -> Result<bool, StoreError>;

    /// Append `symbol`; returns `false` when it was already tracked.
    async fn insert(&self, symbol: &str) -> Result<bool, StoreError>;
}

fn lock<'a, T>(mutex: &'a Mutex<T>, symbol: &str) -> Result<MutexGuard<'a, T>, StoreError> {
    mutex.lock().map_err(|_| StoreError::Read {
        symbol: symbol.to_string(),
        reason: "store lock poisoned".to_string(),
    })
}

/// Records held as JSON strings, the way a browser key-value store holds them.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, String>>,
    writes: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw JSON under `symbol`, bypassing encoding.
    pub fn insert_raw(&self, symbol: &str, json: impl Into<String>) -> Result<(), StoreError> {
        lock(&self.records, symbol)?.insert(symbol.to_string(), json.into());
        Ok(())
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TickerStore for MemoryStore {
    async fn read(&self, symbol: &str) -> Result<Option<TickerRecord>, StoreError> {
        let records = lock(&self.records, symbol)?;
        records
            .get(symbol)
            .map(|json| {
                serde_json::from_str(json).map_err(|e| StoreError::Corrupt(format!("{symbol}: {e}")))
            })
            .transpose()
    }

    async fn write(&self, symbol: &str, record: &TickerRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record).map_err(|e| StoreError::Write {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        })?;
        lock(&self.records, symbol)?.insert(symbol.to_string(), json);
        *lock(&self.writes, symbol)? += 1;
        Ok(())
    }
}

/// In-memory tracked-symbol list.
#[derive(Debug, Default)]
pub struct MemoryTrackedSymbols {
    symbols: Mutex<Vec<String>>,
}

impl MemoryTrackedSymbols {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracked symbols in insertion order.
    pub fn symbols(&self) -> Vec<String> {
        self.symbols.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl TrackedSymbols for MemoryTrackedSymbols {
    async fn contains(&self, symbol: &str) -> Result<bool, StoreError> {
        Ok(lock(&self.symbols, symbol)?.iter().any(|s| s == symbol))
    }

    async fn insert(&self, symbol: &str) -> Result<bool, StoreError> {
        let mut symbols = lock(&self.symbols, symbol)?;
        if symbols.iter().any(|s| s == symbol) {
            return Ok(false);
        }
        symbols.push(symbol.to_string());
        Ok(true)
    }
}
