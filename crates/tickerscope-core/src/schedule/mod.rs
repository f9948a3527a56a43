//! Explicit time sources, caches and debouncing used around the pipeline.
//!
//! Nothing here is global: callers own every cache and scheduler and inject
//! the [`Clock`] they want, so expiry and coalescing are testable without
//! sleeping.

mod cache;
mod clock;
mod coalesce;

pub use cache::{RequestDeduper, TtlCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use coalesce::Coalescer;
