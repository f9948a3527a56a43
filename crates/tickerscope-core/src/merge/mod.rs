//! Merging crawls into persistent per-symbol records.

mod engine;
mod session;
mod store;

pub use engine::{MergeEngine, MergeOutcome};
pub use session::{CrawlSession, SessionOutcome};
pub use store::{MemoryStore, MemoryTrackedSymbols, TickerStore, TrackedSymbols};
