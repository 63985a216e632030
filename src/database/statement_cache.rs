//! Process-wide bounded cache of prepared-statement SQL text.
//!
//! `sqlx` already caches prepared statements per connection; this cache
//! exists to make the documented resource bound ("≤50 entries, FIFO
//! eviction, concurrency-safe") an explicit, testable unit rather than an
//! implementation detail of the driver. Call sites that build SQL
//! dynamically (report aggregations with variable group-by clauses) call
//! `record` to dedupe by the SQL text they're about to prepare.

use std::collections::VecDeque;
use std::sync::Mutex;

struct Inner {
    capacity: usize,
    order: VecDeque<String>,
}

/// A bounded, FIFO-evicting, concurrency-safe cache of SQL statement text.
pub struct StatementCache {
    inner: Mutex<Inner>,
}

impl StatementCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                capacity,
                order: VecDeque::with_capacity(capacity),
            }),
        }
    }

    /// Record that `sql` was prepared. Returns `true` if it was already
    /// cached (a hit), `false` if it was newly inserted (a miss).
    pub fn record(&self, sql: &str) -> bool {
        let mut inner = self.inner.lock().expect("statement cache poisoned");
        if inner.order.iter().any(|s| s == sql) {
            return true;
        }
        if inner.order.len() >= inner.capacity {
            inner.order.pop_front();
        }
        inner.order.push_back(sql.to_string());
        false
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("statement cache poisoned").order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_hit_on_repeat_insert() {
        let cache = StatementCache::new(2);
        assert!(!cache.record("SELECT 1"));
        assert!(cache.record("SELECT 1"));
    }

    #[test]
    fn evicts_oldest_entry_fifo() {
        let cache = StatementCache::new(2);
        cache.record("A");
        cache.record("B");
        assert_eq!(cache.len(), 2);
        cache.record("C");
        assert_eq!(cache.len(), 2);
        // "A" was evicted; recording it again is a miss, not a hit.
        assert!(!cache.record("A"));
    }

    #[test]
    fn never_exceeds_capacity() {
        let cache = StatementCache::new(50);
        for i in 0..200 {
            cache.record(&format!("SELECT {i}"));
        }
        assert_eq!(cache.len(), 50);
    }
}
