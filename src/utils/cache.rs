//! Single-slot TTL cache
//!
//! Holds one value (the DeFiLlama protocol listing for this chain) together
//! with the time it was fetched. Callers pass `now` explicitly so expiry is
//! deterministic under test.
//!
//! - Populated on first use
//! - Invalid once `now - fetched_at >= ttl`
//! - Never invalidated early; `clear()` only exists to rebuild from scratch

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use super::constants::DEFAULT_PROTOCOL_CACHE_TTL_SECS;

/// Current time source
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Wall clock
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Cached value with its fetch timestamp
#[derive(Clone, Debug)]
pub struct CacheEntry<T> {
    pub data: T,
    pub fetched_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, fetched_at: DateTime<Utc>) -> Self {
        Self { data, fetched_at }
    }

    /// Age of the entry at `now`; zero if the clock went backwards
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).to_std().unwrap_or_default()
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) >= ttl
    }
}

/// Thread-safe single-slot cache; clones share the slot
#[derive(Clone)]
pub struct TtlSlot<T: Clone> {
    slot: Arc<Mutex<Option<CacheEntry<T>>>>,
    ttl: Duration,
}

impl<T: Clone> Default for TtlSlot<T> {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_PROTOCOL_CACHE_TTL_SECS))
    }
}

impl<T: Clone> TtlSlot<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value if present and still within TTL at `now`
    pub fn get(&self, now: DateTime<Utc>) -> Option<T> {
        let guard = self.slot.lock().ok()?;
        match guard.as_ref() {
            Some(entry) if !entry.is_expired(now, self.ttl) => {
                debug!("✅ CACHE HIT (age: {}s)", entry.age(now).as_secs());
                Some(entry.data.clone())
            }
            Some(_) => {
                debug!("📭 CACHE MISS (expired)");
                None
            }
            None => {
                debug!("📭 CACHE MISS");
                None
            }
        }
    }

    /// Replace the slot
    pub fn set(&self, data: T, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.slot.lock() {
            *guard = Some(CacheEntry::new(data, now));
            debug!("💾 CACHE SET (TTL: {}s)", self.ttl.as_secs());
        }
    }

    /// Drop the cached value
    pub fn clear(&self) {
        if let Ok(mut guard) = self.slot.lock() {
            *guard = None;
        }
    }
}
