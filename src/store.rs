// src/store.rs

//! Aggregation store: last known price and availability per source.
//!
//! The only shared mutable state besides the directory cache. All mutation
//! goes through the methods here; the mutex is held for field updates only,
//! never across a fetch, so readers never wait on network I/O. Concurrent
//! fetch completions are last-write-wins per source.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::models::Source;

/// Per-source state as readers see it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceEntry {
    /// Last successfully extracted price, if any
    pub price: Option<f64>,

    /// Whether the last fetch attempt produced a usable price
    pub available: bool,

    /// When the last successful fetch completed
    pub last_update: Option<DateTime<Utc>>,
}

/// Immutable copy of the store state.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Every known source has an entry once the engine has started
    pub entries: HashMap<Source, SourceEntry>,

    /// Currently selected source
    pub selected: Source,

    /// Price shown for the selection; `None` while unavailable
    pub selected_price: Option<f64>,

    /// Whether the selection currently has a usable price
    pub selected_available: bool,

    /// When any source last updated successfully
    pub last_update: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Entry for one source. Panics only if called for a source the store
    /// was never initialized with, which the closed enum rules out.
    pub fn entry(&self, source: Source) -> &SourceEntry {
        &self.entries[&source]
    }

    /// Display text for the selection, the way the original app rendered it:
    /// `¥618.50`, or a placeholder while unavailable.
    pub fn selected_text(&self) -> String {
        match (self.selected_available, self.selected_price) {
            (true, Some(price)) => format!("{} ¥{:.2}", self.selected.label(), price),
            _ => format!("{} --", self.selected.label()),
        }
    }
}

struct Inner {
    entries: HashMap<Source, SourceEntry>,
    selected: Source,
    selected_price: Option<f64>,
    selected_available: bool,
    last_update: Option<DateTime<Utc>>,
}

impl Inner {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            entries: self.entries.clone(),
            selected: self.selected,
            selected_price: self.selected_price,
            selected_available: self.selected_available,
            last_update: self.last_update,
        }
    }
}

/// Shared price/availability state, safe for concurrent fetch completions.
pub struct AggregationStore {
    inner: Mutex<Inner>,
    tx: watch::Sender<Snapshot>,
}

impl AggregationStore {
    /// Create a store with every source initialized to unavailable.
    pub fn new(selected: Source) -> Self {
        let inner = Inner {
            entries: Source::ALL
                .into_iter()
                .map(|source| (source, SourceEntry::default()))
                .collect(),
            selected,
            selected_price: None,
            selected_available: false,
            last_update: None,
        };
        let (tx, _) = watch::channel(inner.snapshot());
        Self {
            inner: Mutex::new(inner),
            tx,
        }
    }

    fn mutate(&self, f: impl FnOnce(&mut Inner)) {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        f(&mut inner);
        // Published under the lock: send_replace never blocks, and keeping
        // it inside the critical section means the channel can never hold
        // an older snapshot than a concurrent snapshot() returns.
        self.tx.send_replace(inner.snapshot());
    }

    /// Record a successful reading for a source.
    ///
    /// The selected view follows only when the written source is the current
    /// selection, so background sweeps of other sources never disturb it.
    pub fn mark_available(&self, source: Source, price: f64, at: DateTime<Utc>) {
        self.mutate(|inner| {
            let entry = inner.entries.entry(source).or_default();
            entry.price = Some(price);
            entry.available = true;
            entry.last_update = Some(at);
            inner.last_update = Some(at);

            if inner.selected == source {
                inner.selected_price = Some(price);
                inner.selected_available = true;
            }
        });
    }

    /// Record a failed fetch for a source.
    pub fn mark_unavailable(&self, source: Source) {
        self.mutate(|inner| {
            inner.entries.entry(source).or_default().available = false;
            if inner.selected == source {
                inner.selected_available = false;
            }
        });
    }

    /// Change the selection. The new selection is marked stale until its own
    /// next successful fetch; a reading already in flight for another source
    /// is never reused for it.
    pub fn select(&self, source: Source) {
        self.mutate(|inner| {
            inner.selected = source;
            inner.selected_price = None;
            inner.selected_available = false;
            let entry = inner.entries.entry(source).or_default();
            entry.available = false;
        });
    }

    /// Reset every source to unavailable, keeping the selection.
    pub fn reset(&self) {
        self.mutate(|inner| {
            for entry in inner.entries.values_mut() {
                *entry = SourceEntry::default();
            }
            inner.selected_price = None;
            inner.selected_available = false;
            inner.last_update = None;
        });
    }

    /// Currently selected source.
    pub fn selected(&self) -> Source {
        self.inner.lock().expect("store mutex poisoned").selected
    }

    /// Immutable copy of the current state.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.lock().expect("store mutex poisoned").snapshot()
    }

    /// Change-notification channel carrying the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_every_source_unavailable() {
        let store = AggregationStore::new(Source::SpotApi);
        let snapshot = store.snapshot();

        for source in Source::ALL {
            let entry = snapshot.entry(source);
            assert!(!entry.available, "{source} should start unavailable");
            assert_eq!(entry.price, None);
        }
        assert_eq!(snapshot.selected, Source::SpotApi);
        assert!(!snapshot.selected_available);
    }

    #[test]
    fn mark_available_updates_selected_view_only_for_selection() {
        let store = AggregationStore::new(Source::SpotApi);
        let at = Utc::now();

        store.mark_available(Source::QuotePage, 618.5, at);
        let snapshot = store.snapshot();
        assert!(snapshot.entry(Source::QuotePage).available);
        assert_eq!(snapshot.entry(Source::QuotePage).price, Some(618.5));
        // Background source; selection untouched.
        assert!(!snapshot.selected_available);
        assert_eq!(snapshot.selected_price, None);

        store.mark_available(Source::SpotApi, 552.3, at);
        let snapshot = store.snapshot();
        assert!(snapshot.selected_available);
        assert_eq!(snapshot.selected_price, Some(552.3));
    }

    #[test]
    fn select_marks_new_selection_stale_until_its_own_fetch() {
        let store = AggregationStore::new(Source::SpotApi);
        let at = Utc::now();
        store.mark_available(Source::ChowTaiFook, 720.0, at);

        store.select(Source::ChowTaiFook);
        let snapshot = store.snapshot();
        assert_eq!(snapshot.selected, Source::ChowTaiFook);
        assert!(!snapshot.selected_available);
        assert!(!snapshot.entry(Source::ChowTaiFook).available);

        // Another source completing does not revive the selection.
        store.mark_available(Source::SpotApi, 552.3, at);
        assert!(!store.snapshot().selected_available);

        // Its own fetch does.
        store.mark_available(Source::ChowTaiFook, 721.5, at);
        let snapshot = store.snapshot();
        assert!(snapshot.selected_available);
        assert_eq!(snapshot.selected_price, Some(721.5));
    }

    #[test]
    fn mark_unavailable_degrades_selection_view() {
        let store = AggregationStore::new(Source::SpotApi);
        store.mark_available(Source::SpotApi, 552.3, Utc::now());
        assert!(store.snapshot().selected_available);

        store.mark_unavailable(Source::SpotApi);
        let snapshot = store.snapshot();
        assert!(!snapshot.selected_available);
        // Last price is retained for display history even while unavailable.
        assert_eq!(snapshot.entry(Source::SpotApi).price, Some(552.3));
    }

    #[test]
    fn watch_channel_sees_latest_snapshot() {
        let store = AggregationStore::new(Source::SpotApi);
        let rx = store.subscribe();

        store.mark_available(Source::SpotApi, 600.0, Utc::now());
        assert_eq!(rx.borrow().selected_price, Some(600.0));

        store.mark_unavailable(Source::SpotApi);
        assert!(!rx.borrow().selected_available);
    }

    #[test]
    fn selected_text_formats_like_the_status_item() {
        let store = AggregationStore::new(Source::ChowTaiFook);
        assert_eq!(store.snapshot().selected_text(), "周大福 --");

        store.mark_available(Source::ChowTaiFook, 618.5, Utc::now());
        assert_eq!(store.snapshot().selected_text(), "周大福 ¥618.50");
    }

    #[test]
    fn concurrent_writers_leave_consistent_state() {
        use std::sync::Arc;

        let store = Arc::new(AggregationStore::new(Source::SpotApi));
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                for j in 0..100 {
                    store.mark_available(Source::SpotApi, 500.0 + i as f64 + j as f64, Utc::now());
                    store.mark_unavailable(Source::QuotePage);
                }
            }));
        }
        for handle in handles {
            handle.join().expect("writer thread");
        }

        let snapshot = store.snapshot();
        assert!(snapshot.entry(Source::SpotApi).available);
        assert!(!snapshot.entry(Source::QuotePage).available);
    }

    #[test]
    fn watch_channel_never_trails_snapshot_after_races() {
        use std::sync::Arc;

        let store = Arc::new(AggregationStore::new(Source::SpotApi));
        let rx = store.subscribe();

        for round in 0..200 {
            let writers: Vec<_> = (0..4)
                .map(|i| {
                    let store = Arc::clone(&store);
                    std::thread::spawn(move || {
                        store.mark_available(
                            Source::SpotApi,
                            600.0 + (round * 4 + i) as f64,
                            Utc::now(),
                        );
                    })
                })
                .collect();
            for writer in writers {
                writer.join().expect("writer thread");
            }

            // With all writers drained, the channel must hold exactly what
            // a direct read returns, whatever order the writes landed in.
            assert_eq!(rx.borrow().selected_price, store.snapshot().selected_price);
        }
    }
}
