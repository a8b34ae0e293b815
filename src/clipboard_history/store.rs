//! In-memory clipboard history
//!
//! Owns every entry. Ordering: pinned entries first, then unpinned; each group
//! by descending timestamp with newer insertions first on ties. No two adjacent
//! entries share `(content, kind)`. Every mutation that changes the list is
//! persisted synchronously.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::storage::HistoryStorage;
use super::types::{remove_expired, CapturedContent, ClipboardEntry};
use crate::logging;

/// Result of offering a capture to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(String),
    /// Same `(content, kind)` as the entry it would sit next to
    Duplicate,
}

pub struct HistoryStore {
    entries: Vec<ClipboardEntry>,
    /// Insertion sequence per id; higher is newer
    seqs: HashMap<String, u64>,
    next_seq: u64,
    storage: Box<dyn HistoryStorage>,
    retention: Duration,
}

impl HistoryStore {
    /// Load persisted entries, order them and drop anything past retention.
    pub fn open(storage: Box<dyn HistoryStorage>, retention: Duration) -> Self {
        let entries = storage.load();
        // Stored order is history order, so earlier records count as newer
        let count = entries.len() as u64;
        let seqs = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), count - i as u64))
            .collect();
        let mut store = Self {
            entries,
            seqs,
            next_seq: count + 1,
            storage,
            retention,
        };
        store.sort();
        let collapsed = store.collapse_adjacent_duplicates();
        let expired = store.sweep_expired_at(Utc::now(), retention);
        if collapsed > 0 && expired == 0 {
            store.persist();
        }
        info!(count = store.entries.len(), "Clipboard history loaded");
        store
    }

    pub fn entries(&self) -> &[ClipboardEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&ClipboardEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn head(&self) -> Option<&ClipboardEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn insert(&mut self, candidate: CapturedContent) -> InsertOutcome {
        self.insert_at(candidate, Utc::now())
    }

    /// Insert a capture stamped `now`, unless it repeats its neighbour.
    pub fn insert_at(&mut self, candidate: CapturedContent, now: DateTime<Utc>) -> InsertOutcome {
        if self.head().is_some_and(|head| head.same_content(&candidate)) {
            debug!("Capture matches history head, skipping");
            return InsertOutcome::Duplicate;
        }

        let position = self.insertion_index(now);
        let neighbours = [
            position.checked_sub(1).and_then(|i| self.entries.get(i)),
            self.entries.get(position),
        ];
        if neighbours
            .into_iter()
            .flatten()
            .any(|entry| entry.same_content(&candidate))
        {
            debug!(position, "Capture matches adjacent entry, skipping");
            return InsertOutcome::Duplicate;
        }

        let entry = ClipboardEntry::new(candidate, now);
        let id = entry.id.clone();
        self.seqs.insert(id.clone(), self.next_seq);
        self.next_seq += 1;
        logging::log_capture(&entry);
        self.entries.insert(position, entry);
        self.persist();
        self.sweep_expired_at(now, self.retention);

        InsertOutcome::Inserted(id)
    }

    /// After the pinned block, before the first unpinned entry not newer than `now`.
    fn insertion_index(&self, now: DateTime<Utc>) -> usize {
        let pinned = self.entries.iter().take_while(|e| e.pinned).count();
        self.entries[pinned..]
            .iter()
            .position(|e| e.timestamp <= now)
            .map_or(self.entries.len(), |offset| pinned + offset)
    }

    /// Remove an entry. Unknown ids are ignored.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        let removed = self.entries.len() != before;
        if removed {
            debug!(id, "Deleted clipboard entry");
            self.seqs.remove(id);
            self.collapse_adjacent_duplicates();
            self.persist();
        }
        removed
    }

    /// Flip the pin flag and re-order. Returns the new state, or `None` for unknown ids.
    pub fn toggle_pin(&mut self, id: &str) -> Option<bool> {
        let entry = self.entries.iter_mut().find(|e| e.id == id)?;
        entry.pinned = !entry.pinned;
        let pinned = entry.pinned;

        self.sort();
        self.collapse_adjacent_duplicates();
        self.persist();
        debug!(id, pinned, "Toggled pin");
        Some(pinned)
    }

    /// Remove every unpinned entry.
    pub fn clear_unpinned(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.pinned);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.forget_removed();
            info!(removed, "Cleared unpinned clipboard entries");
            self.persist();
        }
        removed
    }

    /// Remove everything, pinned entries included.
    pub fn clear_all(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.seqs.clear();
        info!(removed, "Cleared clipboard history");
        if let Err(e) = self.storage.clear() {
            logging::log_storage_error("clear", &e);
        }
        removed
    }

    /// Case-insensitive substring filter over `content`, in history order.
    pub fn search(&self, query: &str) -> Vec<&ClipboardEntry> {
        if query.is_empty() {
            return self.entries.iter().collect();
        }
        let needle = query.to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.content.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn sweep_expired(&mut self, window: Duration) -> usize {
        self.sweep_expired_at(Utc::now(), window)
    }

    /// Drop unpinned entries older than `now - window`; persists only on removal.
    pub fn sweep_expired_at(&mut self, now: DateTime<Utc>, window: Duration) -> usize {
        let removed = remove_expired(&mut self.entries, now, window);
        if removed > 0 {
            info!(removed, "Retention sweep removed clipboard entries");
            self.forget_removed();
            self.collapse_adjacent_duplicates();
            self.persist();
        }
        removed
    }

    /// Pinned first, then timestamp, then insertion sequence, all descending.
    fn sort(&mut self) {
        let seqs = &self.seqs;
        let seq = |e: &ClipboardEntry| seqs.get(&e.id).copied().unwrap_or(0);
        self.entries.sort_by(|a, b| {
            b.pinned
                .cmp(&a.pinned)
                .then_with(|| b.timestamp.cmp(&a.timestamp))
                .then_with(|| seq(b).cmp(&seq(a)))
        });
    }

    /// Removals and re-sorts can bring equal entries together; keep the first.
    fn collapse_adjacent_duplicates(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.dedup_by(|later, earlier| earlier.same_entry_content(later));
        let collapsed = before - self.entries.len();
        if collapsed > 0 {
            debug!(collapsed, "Collapsed adjacent duplicate entries");
            self.forget_removed();
        }
        collapsed
    }

    fn forget_removed(&mut self) {
        let live: HashSet<&str> = self.entries.iter().map(|e| e.id.as_str()).collect();
        self.seqs.retain(|id, _| live.contains(id.as_str()));
    }

    fn persist(&self) {
        if let Err(e) = self.storage.save(&self.entries) {
            logging::log_storage_error("save", &e);
        }
    }
}
