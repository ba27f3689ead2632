//! In-memory cache of position evaluations with a fixed time-to-live.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use review_engine::CloudEval;

struct Entry {
    stored_at: Instant,
    evaluation: CloudEval,
}

pub struct PositionCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl PositionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cache key for a position and line count.
    pub fn key(fen: &str, multi_pv: u32) -> String {
        let mut hasher = DefaultHasher::new();
        format!("{fen}:{multi_pv}").hash(&mut hasher);
        format!("analysis:{:016x}", hasher.finish())
    }

    /// Fresh entry for `fen`, if any. A stale entry is removed.
    pub fn get(&self, fen: &str, multi_pv: u32) -> Option<CloudEval> {
        let key = Self::key(fen, multi_pv);
        {
            let entries = self.entries.read().ok()?;
            let entry = entries.get(&key)?;
            if entry.stored_at.elapsed() < self.ttl {
                return Some(entry.evaluation.clone());
            }
        }

        if let Ok(mut entries) = self.entries.write() {
            if entries
                .get(&key)
                .is_some_and(|e| e.stored_at.elapsed() >= self.ttl)
            {
                entries.remove(&key);
            }
        }
        None
    }

    pub fn insert(&self, fen: &str, multi_pv: u32, evaluation: CloudEval) {
        let Ok(mut entries) = self.entries.write() else {
            tracing::error!("Position cache lock poisoned, skipping write");
            return;
        };
        entries.insert(
            Self::key(fen, multi_pv),
            Entry {
                stored_at: Instant::now(),
                evaluation,
            },
        );
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|_, e| e.stored_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
