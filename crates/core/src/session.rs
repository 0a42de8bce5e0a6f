//! Per-session memory of the last resolved product.
//!
//! A record lives for a fixed time-to-live. Reads that find an expired
//! record evict it and report the session as having no product, so every
//! product-aware action can route the user back into the product form.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cpq::resolver::ResolvedProduct;
use crate::domain::product::{Package, ProductId};

pub const DEFAULT_TTL_SECS: u64 = 3000;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        match self.now.lock() {
            Ok(mut now) => *now = at,
            Err(poisoned) => *poisoned.into_inner() = at,
        }
    }

    pub fn advance(&self, by: Duration) {
        let next = self.now() + by;
        self.set(next);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub product_name: ProductId,
    pub organization_field: Option<String>,
    pub package: Package,
    pub scope: f64,
    pub price: Decimal,
    pub renewal_price: Decimal,
    pub resolved_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn from_resolution(
        product: &ResolvedProduct,
        organization_field: Option<String>,
        resolved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            product_name: product.product_name.clone(),
            organization_field,
            package: product.package,
            scope: product.scope,
            price: product.price,
            renewal_price: product.renewal_price,
            resolved_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.resolved_at >= ttl
    }
}

pub trait SessionStore: Send + Sync {
    /// Overwrites any existing record for the session.
    fn put(&self, session_id: &str, record: SessionRecord);
    /// Returns the live record, evicting it first if it has expired.
    fn get(&self, session_id: &str) -> Option<SessionRecord>;
    /// Removes the record; a no-op when absent.
    fn clear(&self, session_id: &str);
}

/// Sharded in-memory store: sessions on different shards never contend,
/// and operations on one key are serialized by the shard lock.
pub struct InMemorySessionStore {
    records: DashMap<String, SessionRecord>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { records: DashMap::new(), ttl, clock }
    }

    pub fn with_ttl_secs(ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        let ttl_secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        Self::new(Duration::seconds(ttl_secs), clock)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::with_ttl_secs(DEFAULT_TTL_SECS, Arc::new(SystemClock))
    }
}

impl SessionStore for InMemorySessionStore {
    fn put(&self, session_id: &str, record: SessionRecord) {
        self.records.insert(session_id.to_string(), record);
    }

    fn get(&self, session_id: &str) -> Option<SessionRecord> {
        let now = self.clock.now();
        match self.records.entry(session_id.to_string()) {
            Entry::Occupied(entry) if entry.get().is_expired(now, self.ttl) => {
                entry.remove();
                debug!(
                    event_name = "dialog.session.expired",
                    session_id,
                    "session record expired and was evicted"
                );
                None
            }
            Entry::Occupied(entry) => Some(entry.get().clone()),
            Entry::Vacant(_) => None,
        }
    }

    fn clear(&self, session_id: &str) {
        self.records.remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{Clock, InMemorySessionStore, ManualClock, SessionRecord, SessionStore};
    use crate::domain::product::{Package, ProductId};

    fn record(org: &str, at: chrono::DateTime<Utc>) -> SessionRecord {
        SessionRecord {
            product_name: ProductId("sme".to_string()),
            organization_field: Some(org.to_string()),
            package: Package::Professional,
            scope: 13.0,
            price: Decimal::new(12_450_000, 0),
            renewal_price: Decimal::new(2_500_000, 0),
            resolved_at: at,
        }
    }

    fn store() -> (Arc<ManualClock>, InMemorySessionStore) {
        let start = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).single().expect("valid timestamp");
        let clock = Arc::new(ManualClock::new(start));
        let store = InMemorySessionStore::with_ttl_secs(3000, clock.clone());
        (clock, store)
    }

    #[test]
    fn record_is_live_until_one_second_before_ttl() {
        let (clock, store) = store();
        store.put("user-1", record("trading company", clock.now()));

        clock.advance(Duration::seconds(2999));
        assert!(store.get("user-1").is_some());

        clock.advance(Duration::seconds(1));
        assert!(store.get("user-1").is_none());
    }

    #[test]
    fn expired_read_evicts_the_record() {
        let (clock, store) = store();
        store.put("user-1", record("trading company", clock.now()));
        clock.advance(Duration::seconds(5000));

        assert!(store.get("user-1").is_none());
        assert!(store.is_empty());

        clock.set(clock.now() - Duration::seconds(5000));
        assert!(store.get("user-1").is_none(), "evicted records never come back");
    }

    #[test]
    fn put_overwrites_instead_of_merging() {
        let (clock, store) = store();
        store.put("user-1", record("trading company", clock.now()));
        let mut second = record("corporation", clock.now());
        second.organization_field = None;
        store.put("user-1", second.clone());

        assert_eq!(store.get("user-1"), Some(second));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clear_is_idempotent() {
        let (clock, store) = store();
        store.put("user-1", record("trading company", clock.now()));

        store.clear("user-1");
        store.clear("user-1");
        store.clear("never-seen");

        assert!(store.get("user-1").is_none());
    }

    #[test]
    fn sessions_are_isolated() {
        let (clock, store) = store();
        store.put("user-1", record("trading company", clock.now()));
        store.put("user-2", record("corporation", clock.now()));
        store.clear("user-1");

        assert_eq!(
            store.get("user-2").and_then(|record| record.organization_field),
            Some("corporation".to_string())
        );
    }

    #[test]
    fn concurrent_writers_on_distinct_sessions_all_land() {
        let (clock, store) = store();
        let store = Arc::new(store);
        let at = clock.now();

        let handles: Vec<_> = (0..8)
            .map(|index| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.put(&format!("user-{index}"), record("trading company", at));
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread");
        }

        assert_eq!(store.len(), 8);
    }

    #[test]
    fn racing_writers_on_one_session_leave_a_single_whole_record() {
        let (clock, store) = store();
        let store = Arc::new(store);
        let at = clock.now();
        let fields: Vec<String> = (0..8).map(|index| format!("field-{index}")).collect();

        let handles: Vec<_> = fields
            .iter()
            .cloned()
            .map(|field| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        store.put("user-1", record(&field, at));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread");
        }

        assert_eq!(store.len(), 1);
        let stored = store.get("user-1").expect("record survives the race");
        let field = stored.organization_field.clone().expect("field written");
        assert!(fields.contains(&field));
        assert_eq!(stored, record(&field, at));
    }
}
