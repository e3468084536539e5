//! Content-addressed packet cache.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;
use ucp_protocol::{CacheKey, Packet};
use ucp_rules::RuleFlag;

/// Whether a compile was served from the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Existing packet returned unchanged.
    Hit,
    /// Packet compiled by this call.
    Miss,
}

/// A cached packet.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Key the packet is stored under.
    pub cache_key: CacheKey,
    /// The packet.
    pub packet: Packet,
    /// Flags raised when the packet was compiled.
    pub flags: Vec<RuleFlag>,
    /// Times the packet was served after its compile.
    pub hit_count: u64,
    /// Catalog generation the packet was compiled under.
    pub generation: u64,
}

/// Cache summary.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Cached packets.
    pub entries: usize,
    /// Hits across all entries.
    pub total_hits: u64,
    /// Cached packets per action wire tag.
    pub by_action: BTreeMap<String, usize>,
}

/// Outcome of [`PacketCache::get_or_compile`].
#[derive(Clone, Debug, PartialEq)]
pub struct Cached {
    /// The packet.
    pub packet: Packet,
    /// Flags raised when the packet was compiled.
    pub flags: Vec<RuleFlag>,
    /// Hit or miss.
    pub status: CacheStatus,
}

type Slot = Arc<Mutex<Option<CacheEntry>>>;

/// Map from fingerprint to packet.
///
/// Each key owns a slot with its own lock. A compile holds the slot lock,
/// so a concurrent caller for the same key waits and then sees a hit.
/// Callers for other keys are not blocked.
#[derive(Debug, Default)]
pub struct PacketCache {
    slots: DashMap<CacheKey, Slot>,
}

impl PacketCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the packet cached under `key` for `generation`, or run
    /// `compile` and cache its result.
    ///
    /// A packet from another generation is replaced. Errors from `compile`
    /// leave the cache unchanged.
    pub fn get_or_compile<E>(
        &self,
        key: &CacheKey,
        generation: u64,
        compile: impl FnOnce() -> Result<(Packet, Vec<RuleFlag>), E>,
    ) -> Result<Cached, E> {
        let slot = self.slots.entry(key.clone()).or_default().value().clone();
        let mut guard = slot.lock();
        if let Some(entry) = guard.as_mut().filter(|e| e.generation == generation) {
            entry.hit_count += 1;
            debug!(key = key.short(), hits = entry.hit_count, "packet cache hit");
            return Ok(Cached {
                packet: entry.packet.clone(),
                flags: entry.flags.clone(),
                status: CacheStatus::Hit,
            });
        }

        match compile() {
            Ok((packet, flags)) => {
                let stale = guard.is_some();
                *guard = Some(CacheEntry {
                    cache_key: key.clone(),
                    packet: packet.clone(),
                    flags: flags.clone(),
                    hit_count: 0,
                    generation,
                });
                debug!(key = key.short(), generation, stale, "packet cached");
                Ok(Cached {
                    packet,
                    flags,
                    status: CacheStatus::Miss,
                })
            }
            Err(err) => {
                let empty = guard.is_none();
                drop(guard);
                drop(slot);
                if empty {
                    // Only the map holds the slot, so no caller is waiting on it.
                    let _ = self
                        .slots
                        .remove_if(key, |_, s| Arc::strong_count(s) == 1 && s.lock().is_none());
                }
                Err(err)
            }
        }
    }

    /// Copy of the entry under `key`.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let slot = self.slots.get(key)?.value().clone();
        slot.lock().clone()
    }

    /// Number of cached packets.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry count, total hits, and packets per action.
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for entry in self.entries() {
            stats.entries += 1;
            stats.total_hits += entry.hit_count;
            *stats
                .by_action
                .entry(entry.packet.action.kind.wire_tag().to_owned())
                .or_default() += 1;
        }
        stats
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let dropped = self.len();
        self.slots.clear();
        debug!(dropped, "packet cache cleared");
    }

    fn entries(&self) -> Vec<CacheEntry> {
        let slots: Vec<Slot> = self.slots.iter().map(|r| r.value().clone()).collect();
        slots.iter().filter_map(|s| s.lock().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;
    use ucp_protocol::{ActionKind, fingerprint};

    fn packet(key: &CacheKey, kind: ActionKind) -> (Packet, Vec<RuleFlag>) {
        (Packet::new(kind, Vec::new(), "data".into(), key.clone()), Vec::new())
    }

    #[test]
    fn miss_then_hit() {
        let cache = PacketCache::new();
        let key = fingerprint("explain rust");
        let first = cache
            .get_or_compile::<()>(&key, 1, || Ok(packet(&key, ActionKind::Explain)))
            .unwrap();
        assert_eq!(first.status, CacheStatus::Miss);

        let second = cache
            .get_or_compile::<()>(&key, 1, || panic!("must not recompile"))
            .unwrap();
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(first.packet, second.packet);
        assert_eq!(cache.get(&key).unwrap().hit_count, 1);
    }

    #[test]
    fn new_generation_recompiles() {
        let cache = PacketCache::new();
        let key = fingerprint("explain rust");
        let old = cache
            .get_or_compile::<()>(&key, 1, || Ok(packet(&key, ActionKind::Explain)))
            .unwrap();
        let new = cache
            .get_or_compile::<()>(&key, 2, || Ok(packet(&key, ActionKind::Analyze)))
            .unwrap();
        assert_eq!(new.status, CacheStatus::Miss);
        assert_ne!(old.packet.command_id, new.packet.command_id);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key).unwrap().generation, 2);
    }

    #[test]
    fn failed_compile_caches_nothing() {
        let cache = PacketCache::new();
        let key = fingerprint("nothing");
        let result = cache.get_or_compile(&key, 1, || Err("boom"));
        assert_eq!(result.unwrap_err(), "boom");
        assert!(cache.is_empty());
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn concurrent_callers_compile_once() {
        let cache = Arc::new(PacketCache::new());
        let compiles = Arc::new(AtomicUsize::new(0));
        let key = fingerprint("summarize the report");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let compiles = Arc::clone(&compiles);
                let key = key.clone();
                thread::spawn(move || {
                    cache
                        .get_or_compile::<()>(&key, 1, || {
                            let _ = compiles.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            Ok(packet(&key, ActionKind::Summarize))
                        })
                        .unwrap()
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(compiles.load(Ordering::SeqCst), 1);
        let misses = results.iter().filter(|c| c.status == CacheStatus::Miss).count();
        assert_eq!(misses, 1);
        assert!(results.iter().all(|c| c.packet.command_id == results[0].packet.command_id));
        assert_eq!(cache.get(&key).unwrap().hit_count, 7);
    }

    #[test]
    fn stats_and_clear() {
        let cache = PacketCache::new();
        for (text, kind) in [("a", ActionKind::Explain), ("b", ActionKind::Explain), ("c", ActionKind::Request)] {
            let key = fingerprint(text);
            let _ = cache.get_or_compile::<()>(&key, 1, || Ok(packet(&key, kind))).unwrap();
        }
        let key = fingerprint("a");
        let _ = cache.get_or_compile::<()>(&key, 1, || unreachable!()).unwrap();

        let stats = cache.stats();
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.total_hits, 1);
        assert_eq!(stats.by_action["EXPLAIN"], 2);
        assert_eq!(stats.by_action["REQ"], 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
