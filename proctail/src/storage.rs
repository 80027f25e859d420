//! Bounded per-tag event storage (spec §4.3).
//!
//! Each tag owns its own FIFO behind its own lock; a `DashMap` keyed by tag
//! avoids a single global lock across tags (spec §5 "per-tag lock guarded
//! separately from the global map lock").

use std::collections::VecDeque;
use std::sync::Mutex;

use dashmap::DashMap;

use proctail_protocol::{Tag, Timestamp, TypedEvent};

/// Statistics snapshot (spec §4.3).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    pub total_tags: usize,
    pub total_events: usize,
    pub per_tag_count: std::collections::HashMap<String, usize>,
    pub estimated_bytes: usize,
}

struct TagHistory {
    events: VecDeque<TypedEvent>,
    cap: usize,
}

impl TagHistory {
    fn new(cap: usize) -> Self {
        TagHistory { events: VecDeque::with_capacity(cap.min(1024)), cap }
    }

    fn append(&mut self, event: TypedEvent) {
        if self.events.len() >= self.cap {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Bounded per-tag FIFO store of typed events with O(1) amortized append.
pub struct EventStorage {
    cap_per_tag: usize,
    tags: DashMap<Tag, Mutex<TagHistory>>,
}

impl EventStorage {
    #[must_use]
    pub fn new(cap_per_tag: usize) -> Self {
        EventStorage { cap_per_tag, tags: DashMap::new() }
    }

    /// Appends `event` to `tag`'s history, evicting the oldest entry first
    /// if the tag is already at capacity. Rejects an empty tag silently —
    /// in practice `Tag` can't be empty (validated at construction), so
    /// this guards only against a `Tag` built elsewhere bypassing that
    /// check (spec §4.3, §8).
    pub fn append(&self, tag: &Tag, event: TypedEvent) {
        if tag.as_str().trim().is_empty() {
            return;
        }
        let cap = self.cap_per_tag;
        let entry = self.tags.entry(tag.clone()).or_insert_with(|| Mutex::new(TagHistory::new(cap)));
        let mut history = entry.lock().unwrap_or_else(|e| e.into_inner());
        history.append(event);
    }

    /// Snapshot of all stored events for `tag`, oldest first. Missing tag
    /// yields an empty sequence.
    #[must_use]
    pub fn get_all(&self, tag: &Tag) -> Vec<TypedEvent> {
        self.tags
            .get(tag)
            .map(|entry| {
                let history = entry.lock().unwrap_or_else(|e| e.into_inner());
                history.events.iter().cloned().collect()
            })
            .unwrap_or_default()
    }

    /// Returns at most `n` newest events, newest first. `n <= 0` yields
    /// empty; `n` greater than the stored count returns all of it.
    #[must_use]
    pub fn get_latest(&self, tag: &Tag, n: i64) -> Vec<TypedEvent> {
        if n <= 0 {
            return Vec::new();
        }
        let n = usize::try_from(n).unwrap_or(usize::MAX);
        self.tags
            .get(tag)
            .map(|entry| {
                let history = entry.lock().unwrap_or_else(|e| e.into_inner());
                history.events.iter().rev().take(n).cloned().collect()
            })
            .unwrap_or_default()
    }

    /// Returns all stored events whose timestamp lies in `[from, to]`
    /// (caller-inclusive both ends), preserving FIFO order.
    #[must_use]
    pub fn get_by_time(&self, tag: &Tag, from: Timestamp, to: Timestamp) -> Vec<TypedEvent> {
        self.tags
            .get(tag)
            .map(|entry| {
                let history = entry.lock().unwrap_or_else(|e| e.into_inner());
                history
                    .events
                    .iter()
                    .filter(|e| {
                        let ts = e.timestamp();
                        ts >= from && ts <= to
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn count(&self, tag: &Tag) -> usize {
        self.tags
            .get(tag)
            .map(|entry| entry.lock().unwrap_or_else(|e| e.into_inner()).events.len())
            .unwrap_or(0)
    }

    /// Removes all events for `tag`. Missing tag is a no-op.
    pub fn clear(&self, tag: &Tag) {
        if let Some(entry) = self.tags.get(tag) {
            entry.lock().unwrap_or_else(|e| e.into_inner()).events.clear();
        }
    }

    #[must_use]
    pub fn list_tags(&self) -> Vec<Tag> {
        self.tags.iter().map(|entry| entry.key().clone()).collect()
    }

    /// A best-effort statistics snapshot. `estimated_bytes` sums a fixed
    /// per-event overhead plus payload-field heuristics (spec §4.3) — it is
    /// an approximation, not a precise memory accounting. Each tag is
    /// snapshotted consistently with itself, but not necessarily with any
    /// other tag observed in the same call (spec §4.3 concurrency note).
    #[must_use]
    pub fn statistics(&self) -> Statistics {
        let mut stats = Statistics { total_tags: self.tags.len(), ..Statistics::default() };
        for entry in self.tags.iter() {
            let history = entry.value().lock().unwrap_or_else(|e| e.into_inner());
            let count = history.events.len();
            let bytes: usize = history.events.iter().map(TypedEvent::estimated_bytes).sum();
            stats.total_events += count;
            stats.estimated_bytes += bytes;
            stats.per_tag_count.insert(entry.key().to_string(), count);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctail_protocol::{Pid, Tid};
    use std::collections::HashMap;

    fn tag(s: &str) -> Tag {
        Tag::new(s).unwrap()
    }

    fn generic_event(tag_str: &str, process_id: i32) -> TypedEvent {
        TypedEvent::Generic {
            header: proctail_protocol::event::TypedEventHeader {
                timestamp: Timestamp::now(),
                tag: tag(tag_str),
                process_id: Pid(process_id),
                thread_id: Tid(1),
                provider_name: "Test".to_string(),
                event_name: "Test/Event".to_string(),
                activity_id: String::new(),
                related_activity_id: String::new(),
                payload: HashMap::new(),
            },
        }
    }

    #[test]
    fn missing_tag_yields_empty_results() {
        let storage = EventStorage::new(10);
        assert!(storage.get_all(&tag("none")).is_empty());
        assert_eq!(storage.count(&tag("none")), 0);
    }

    #[test]
    fn append_then_get_all_preserves_fifo_order() {
        let storage = EventStorage::new(10);
        let t = tag("app");
        storage.append(&t, generic_event("app", 1));
        storage.append(&t, generic_event("app", 2));
        let all = storage.get_all(&t);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].process_id(), Pid(1));
        assert_eq!(all[1].process_id(), Pid(2));
    }

    #[test]
    fn overflow_evicts_oldest_first() {
        let storage = EventStorage::new(3);
        let t = tag("x");
        for i in 0..10 {
            storage.append(&t, generic_event("x", i));
        }
        let all = storage.get_all(&t);
        assert_eq!(all.len(), 3);
        assert_eq!(all.iter().map(TypedEvent::process_id).collect::<Vec<_>>(), vec![
            Pid(7),
            Pid(8),
            Pid(9)
        ]);
        assert_eq!(storage.count(&t), 3);
    }

    #[test]
    fn get_latest_zero_is_empty_and_excess_n_returns_all() {
        let storage = EventStorage::new(10);
        let t = tag("t");
        storage.append(&t, generic_event("t", 1));
        storage.append(&t, generic_event("t", 2));
        assert!(storage.get_latest(&t, 0).is_empty());
        let latest = storage.get_latest(&t, 100);
        assert_eq!(latest.len(), 2);
        // newest first
        assert_eq!(latest[0].process_id(), Pid(2));
        assert_eq!(latest[1].process_id(), Pid(1));
    }

    #[test]
    fn clear_is_a_noop_on_missing_tag() {
        let storage = EventStorage::new(10);
        storage.clear(&tag("missing"));
    }

    #[test]
    fn statistics_total_events_matches_sum_of_per_tag_counts() {
        let storage = EventStorage::new(10);
        storage.append(&tag("a"), generic_event("a", 1));
        storage.append(&tag("a"), generic_event("a", 2));
        storage.append(&tag("b"), generic_event("b", 3));
        let stats = storage.statistics();
        assert_eq!(stats.total_tags, 2);
        let sum: usize = stats.per_tag_count.values().sum();
        assert_eq!(stats.total_events, sum);
        assert_eq!(stats.total_events, 3);
    }

    #[test]
    fn concurrent_appends_respect_capacity() {
        use std::sync::Arc;
        use std::thread;

        let storage = Arc::new(EventStorage::new(500));
        let t = tag("shared");
        let handles: Vec<_> = (0..100)
            .map(|thread_id| {
                let storage = Arc::clone(&storage);
                let t = t.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        storage.append(&t, generic_event("shared", thread_id * 1000 + i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(storage.count(&t), 500);
        assert_eq!(storage.statistics().total_events, 500);
    }
}
