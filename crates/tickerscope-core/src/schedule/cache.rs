use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::clock::{Clock, SystemClock};

/// Map whose entries expire `ttl` after insertion.
///
/// Expired entries are invisible to lookups and removed by
/// [`purge_expired`](Self::purge_expired) or by being overwritten.
#[derive(Debug)]
pub struct TtlCache<K, V, C = SystemClock> {
    entries: HashMap<K, (V, DateTime<Utc>)>,
    ttl: Duration,
    clock: C,
}

impl<K: Eq + Hash, V, C: Clock> TtlCache<K, V, C> {
    pub fn new(ttl: Duration, clock: C) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_live(&self, inserted_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - inserted_at < self.ttl
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let now = self.clock.now();
        self.entries
            .get(key)
            .filter(|(_, inserted_at)| self.is_live(*inserted_at, now))
            .map(|(value, _)| value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Insert `value`, returning the previous live value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let now = self.clock.now();
        let ttl = self.ttl;
        self.entries
            .insert(key, (value, now))
            .filter(|(_, inserted_at)| now - *inserted_at < ttl)
            .map(|(value, _)| value)
    }

    /// Live value for `key`, computing and storing it when missing or expired.
    pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> &V {
        let now = self.clock.now();
        let ttl = self.ttl;
        match self.entries.entry(key) {
            Entry::Occupied(mut entry) => {
                if now - entry.get().1 >= ttl {
                    entry.insert((make(), now));
                }
                &entry.into_mut().0
            }
            Entry::Vacant(entry) => &entry.insert((make(), now)).0,
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(value, _)| value)
    }

    /// Drop expired entries, returning how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, (_, inserted_at)| now - *inserted_at < ttl);
        let purged = before - self.entries.len();
        if purged > 0 {
            debug!(purged, "purged expired cache entries");
        }
        purged
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Remembers which `(source, symbol)` pairs were requested recently.
#[derive(Debug)]
pub struct RequestDeduper<C = SystemClock> {
    seen: TtlCache<(String, String), (), C>,
}

impl<C: Clock> RequestDeduper<C> {
    pub fn new(ttl: Duration, clock: C) -> Self {
        Self {
            seen: TtlCache::new(ttl, clock),
        }
    }

    /// Whether a request should go out now. Records it when it should.
    pub fn should_request(&mut self, source_id: &str, symbol: &str) -> bool {
        let key = (source_id.to_string(), symbol.trim().to_uppercase());
        if self.seen.contains_key(&key) {
            debug!(source_id, symbol, "request deduplicated");
            return false;
        }
        self.seen.insert(key, ());
        true
    }

    /// Forget expired requests.
    pub fn purge_expired(&mut self) -> usize {
        self.seen.purge_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::ManualClock;

    #[test]
    fn test_entries_expire_after_ttl() {
        let clock = ManualClock::default();
        let mut cache = TtlCache::new(Duration::seconds(10), clock.clone());
        assert_eq!(cache.insert("ctb", 1), None);

        clock.advance(Duration::seconds(9));
        assert_eq!(cache.get(&"ctb"), Some(&1));

        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get(&"ctb"), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_over_expired_returns_none() {
        let clock = ManualClock::default();
        let mut cache = TtlCache::new(Duration::seconds(5), clock.clone());
        cache.insert("a", 1);
        assert_eq!(cache.insert("a", 2), Some(1));
        clock.advance(Duration::seconds(5));
        assert_eq!(cache.insert("a", 3), None);
        assert_eq!(cache.remove(&"a"), Some(3));
    }

    #[test]
    fn test_get_or_insert_with_recomputes_after_expiry() {
        let clock = ManualClock::default();
        let mut cache = TtlCache::new(Duration::seconds(5), clock.clone());
        let mut calls = 0;

        let mut make = |n: i32| {
            calls += 1;
            n
        };
        assert_eq!(*cache.get_or_insert_with("k", || make(1)), 1);
        assert_eq!(*cache.get_or_insert_with("k", || make(2)), 1);
        clock.advance(Duration::seconds(6));
        assert_eq!(*cache.get_or_insert_with("k", || make(3)), 3);
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_request_deduper() {
        let clock = ManualClock::default();
        let mut dedup = RequestDeduper::new(Duration::seconds(300), clock.clone());

        assert!(dedup.should_request("finviz", "acme"));
        assert!(!dedup.should_request("finviz", "ACME"));
        assert!(dedup.should_request("shortdata", "ACME"));

        clock.advance(Duration::seconds(300));
        assert!(dedup.should_request("finviz", "ACME"));
        assert_eq!(dedup.purge_expired(), 1);
    }
}
