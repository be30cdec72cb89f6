//! LRU + TTL result cache.
//!
//! Keyed by a SHA-256 fingerprint of (tenant, prompt, mode) so identical
//! prompts from different tenants or latency modes never share entries.
//! Eviction is true LRU: reads refresh recency. The cache provides no
//! isolation beyond its own lock — a miss never blocks other callers, who
//! simply run the pipeline and race to fill the slot.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use crate::decision::ValidationDecision;

type Fingerprint = [u8; 32];

struct Entry {
    decision: ValidationDecision,
    inserted: Instant,
    last_used: Instant,
}

/// In-memory decision cache.
pub struct DecisionCache {
    max_entries: usize,
    ttl: Duration,
    entries: Mutex<HashMap<Fingerprint, Entry>>,
}

impl DecisionCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            max_entries: max_entries.max(1),
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cache key for one (tenant, prompt, mode) triple.
    pub fn fingerprint(tenant: &str, prompt: &str, mode: &str) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(tenant.as_bytes());
        hasher.update([0u8]);
        hasher.update(prompt.as_bytes());
        hasher.update([0u8]);
        hasher.update(mode.as_bytes());
        hasher.finalize().into()
    }

    /// Fetch a live entry, refreshing its recency.
    pub fn get(&self, key: &Fingerprint) -> Option<ValidationDecision> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get_mut(key) {
            Some(entry) if entry.inserted.elapsed() < self.ttl => {
                entry.last_used = Instant::now();
                Some(entry.decision.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert a decision, evicting the least recently used entry when full.
    pub fn put(&self, key: Fingerprint, decision: ValidationDecision) {
        let mut entries = self.entries.lock().unwrap();

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| *k)
            {
                entries.remove(&oldest);
            }
        }

        let now = Instant::now();
        entries.insert(
            key,
            Entry {
                decision,
                inserted: now,
                last_used: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Stage;

    fn decision(reasoning: &str) -> ValidationDecision {
        ValidationDecision {
            safe: true,
            confidence: 0.0,
            threats: vec![],
            stage: Stage::Pattern,
            reasoning: reasoning.to_string(),
            cost: 0.0,
            processing_time_ms: 0,
            needs_review: false,
            custom_rule_matched: None,
            external_references: None,
            model: None,
            decision_id: "test".to_string(),
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_roundtrip() {
        let cache = DecisionCache::new(10, Duration::from_secs(60));
        let key = DecisionCache::fingerprint("tenant", "prompt", "standard");
        assert!(cache.get(&key).is_none());

        cache.put(key, decision("cached"));
        assert_eq!(cache.get(&key).unwrap().reasoning, "cached");
    }

    #[test]
    fn test_fingerprint_scopes_tenant_and_mode() {
        let a = DecisionCache::fingerprint("t1", "same prompt", "standard");
        let b = DecisionCache::fingerprint("t2", "same prompt", "standard");
        let c = DecisionCache::fingerprint("t1", "same prompt", "fast");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = DecisionCache::new(10, Duration::from_millis(0));
        let key = DecisionCache::fingerprint("t", "p", "standard");
        cache.put(key, decision("stale"));
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_eviction_prefers_least_recently_used() {
        let cache = DecisionCache::new(2, Duration::from_secs(60));
        let k1 = DecisionCache::fingerprint("t", "one", "standard");
        let k2 = DecisionCache::fingerprint("t", "two", "standard");
        let k3 = DecisionCache::fingerprint("t", "three", "standard");

        cache.put(k1, decision("one"));
        cache.put(k2, decision("two"));
        // Touch k1 so k2 becomes the LRU victim
        assert!(cache.get(&k1).is_some());
        cache.put(k3, decision("three"));

        assert!(cache.get(&k1).is_some());
        assert!(cache.get(&k2).is_none());
        assert!(cache.get(&k3).is_some());
        assert_eq!(cache.len(), 2);
    }
}
