//! WASM bindings for ticker metadata extraction.
//!
//! This crate exposes the extraction and merge pipeline to the browser
//! extension that hosts it. Snapshots come in as JSON node trees; records go
//! out as plain JS objects.

use chrono::{DateTime, Utc};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use tickerscope_core::extract::{LabelCanonicalizer, FieldTransformer, PageCrawler};
use tickerscope_core::merge::MergeEngine;
use tickerscope_core::models::{CanonicalKey, PageCrawlRecord, ScopeConfig, TickerRecord};
use tickerscope_core::schedule::{Clock, Coalescer, RequestDeduper};
use tickerscope_core::{Skip, Snapshot};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Browser time through `Date.now()`.
#[derive(Debug, Clone, Copy, Default)]
struct JsClock;

impl Clock for JsClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(js_sys::Date::now() as i64).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

fn js_error(e: impl ToString) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Plain objects rather than JS `Map`s, so records survive `JSON.stringify`.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(js_error)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CrawlOutput {
    record: PageCrawlRecord,
    skipped: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MergeOutput {
    record: TickerRecord,
    changed: bool,
    changed_keys: Vec<CanonicalKey>,
}

fn crawl_snapshot(
    crawler: &PageCrawler,
    snapshot_json: &str,
    source_id: &str,
    location: &str,
    now: DateTime<Utc>,
) -> Result<JsValue, JsValue> {
    let snapshot = Snapshot::from_json(snapshot_json).map_err(js_error)?;
    match crawler.crawl(&snapshot.root(), source_id, location, now) {
        Ok(report) => to_js(&CrawlOutput {
            record: report.record,
            skipped: report.skips.iter().map(Skip::to_string).collect(),
        }),
        // A refused scan is a no-op for the caller.
        Err(Skip::ConcurrentScanAborted) => Ok(JsValue::NULL),
        Err(skip) => Err(js_error(skip)),
    }
}

fn merge_records<C: Clock>(
    engine: &MergeEngine<C>,
    existing: JsValue,
    crawl: JsValue,
    symbol: &str,
) -> Result<JsValue, JsValue> {
    let existing: Option<TickerRecord> = serde_wasm_bindgen::from_value(existing).map_err(js_error)?;
    let crawl: PageCrawlRecord = serde_wasm_bindgen::from_value(crawl).map_err(js_error)?;
    let symbol = symbol.trim().to_uppercase();

    let outcome = engine.merge(existing, crawl, &symbol);
    to_js(&MergeOutput {
        record: outcome.record,
        changed: outcome.changed,
        changed_keys: outcome.changed_keys,
    })
}

/// Extract a crawl record from a JSON snapshot (`{tag, text?, attrs?, children?}`).
#[wasm_bindgen]
pub fn extract_crawl(snapshot_json: &str, source_id: &str, location: &str) -> Result<JsValue, JsValue> {
    crawl_snapshot(&PageCrawler::default(), snapshot_json, source_id, location, JsClock.now())
}

/// Merge a crawl record into an existing record (or `null`).
///
/// Returns `{record, changed, changedKeys}`; callers skip persistence when
/// `changed` is false.
#[wasm_bindgen]
pub fn merge_crawl(existing: JsValue, crawl: JsValue, symbol: &str) -> Result<JsValue, JsValue> {
    let engine = MergeEngine::new(ScopeConfig::default().merge, JsClock);
    merge_records(&engine, existing, crawl, symbol)
}

/// Canonical key name for a label, or `undefined` for noise labels.
#[wasm_bindgen]
pub fn canonicalize_label(label: &str) -> Option<String> {
    LabelCanonicalizer::new()
        .canonicalize(label)
        .map(|key| key.to_string())
}

/// Normalized rendering of `value` under the canonical key name `key`.
#[wasm_bindgen]
pub fn normalize_value(key: &str, value: &str) -> Option<String> {
    let key: CanonicalKey = key.parse().unwrap_or_else(|never| match never {});
    let cleaned = tickerscope_core::extract::sanitize(value);
    FieldTransformer::new()
        .transform(&key, &cleaned)
        .map(|v| v.render())
}

/// Configured pipeline for browser use.
#[wasm_bindgen]
pub struct TickerScope {
    config: ScopeConfig,
    crawler: PageCrawler,
    engine: MergeEngine<JsClock>,
    coalescer: Coalescer,
    requests: RequestDeduper<JsClock>,
}

#[wasm_bindgen]
impl TickerScope {
    /// Create a pipeline from an optional JSON config.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<TickerScope, JsValue> {
        let config = match config_json {
            Some(json) => {
                let config: ScopeConfig = serde_json::from_str(&json).map_err(js_error)?;
                config.validate().map_err(js_error)?;
                config
            }
            None => ScopeConfig::default(),
        };
        Ok(Self::with_config(config))
    }

    /// Current configuration as a plain object.
    #[wasm_bindgen]
    pub fn config(&self) -> Result<JsValue, JsValue> {
        to_js(&self.config)
    }

    /// Extract a crawl record; `null` when a scan is already running.
    #[wasm_bindgen]
    pub fn extract(&self, snapshot_json: &str, source_id: &str, location: &str) -> Result<JsValue, JsValue> {
        crawl_snapshot(&self.crawler, snapshot_json, source_id, location, JsClock.now())
    }

    /// Merge a crawl into an existing record (or `null`).
    #[wasm_bindgen]
    pub fn merge(&self, existing: JsValue, crawl: JsValue, symbol: &str) -> Result<JsValue, JsValue> {
        merge_records(&self.engine, existing, crawl, symbol)
    }

    /// Record a document change; re-scans are coalesced.
    #[wasm_bindgen]
    pub fn notify_change(&mut self) {
        self.coalescer.notify(JsClock.now());
    }

    /// Whether the quiet window after the last change has elapsed. Fires once.
    #[wasm_bindgen]
    pub fn poll_rescan(&mut self) -> bool {
        self.coalescer.poll(JsClock.now())
    }

    /// Whether `(source_id, symbol)` should be fetched now.
    #[wasm_bindgen]
    pub fn should_request(&mut self, source_id: &str, symbol: &str) -> bool {
        self.requests.should_request(source_id, symbol)
    }
}

impl TickerScope {
    fn with_config(config: ScopeConfig) -> Self {
        Self {
            crawler: PageCrawler::new(config.classifier.clone()),
            engine: MergeEngine::new(config.merge.clone(), JsClock),
            coalescer: Coalescer::from_config(&config.schedule),
            requests: RequestDeduper::new(config.schedule.request_ttl(), JsClock),
            config,
        }
    }
}

impl Default for TickerScope {
    fn default() -> Self {
        Self::with_config(ScopeConfig::default())
    }
}
