//! In-memory reminder collection with snapshot persistence.
//!
//! Every mutation emits the full JSON snapshot of the collection on the
//! `mutated` signal. [`ReminderStore::persist_to`] stages those snapshots in
//! a [`DeferredWriter`], so several mutations within one tick end up as a
//! single write of the last snapshot.

use std::collections::HashSet;

use calendula_core::storage::{KeyValueStore, REMINDERS_KEY};
use calendula_core::{DeferredWriter, Signal, SubscriptionId};
use chrono::Datelike;

use crate::grid;
use crate::reminder::{parse_date, Reminder};

#[derive(Debug, Default)]
pub struct ReminderStore {
    items: Vec<Reminder>,
    mutated: Signal<String>,
}

impl ReminderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from `items`. When an id repeats, only its last
    /// occurrence is kept.
    pub fn from_items(items: Vec<Reminder>) -> Self {
        let total = items.len();
        let mut seen = HashSet::with_capacity(total);
        let mut items: Vec<Reminder> = items
            .into_iter()
            .rev()
            .filter(|r| seen.insert(r.id.clone()))
            .collect();
        items.reverse();

        let dropped = total - items.len();
        if dropped > 0 {
            tracing::warn!("Dropped {} reminder(s) with a duplicate id", dropped);
        }

        Self {
            items,
            mutated: Signal::new(),
        }
    }

    /// Read the persisted collection.
    ///
    /// A missing key is an empty store. Unreadable or malformed data is
    /// logged and also yields an empty store.
    pub fn load(storage: &dyn KeyValueStore) -> Self {
        let raw = match storage.get(REMINDERS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::new(),
            Err(e) => {
                tracing::error!("Failed to read reminders from storage: {}", e);
                return Self::new();
            }
        };

        match serde_json::from_str::<Vec<Reminder>>(&raw) {
            Ok(items) => {
                tracing::info!("Loaded {} reminder(s)", items.len());
                Self::from_items(items)
            }
            Err(e) => {
                tracing::error!("Failed to parse reminders from storage: {}", e);
                Self::new()
            }
        }
    }

    /// Stage every snapshot under `calendar-reminders` for the next flush.
    pub fn persist_to(&mut self, writer: DeferredWriter) -> SubscriptionId {
        self.mutated.subscribe(move |snapshot: &String| {
            writer.stage(REMINDERS_KEY, snapshot.clone());
        })
    }

    /// Observe mutations. The callback receives the serialized collection.
    pub fn on_mutated<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&String) + Send + Sync + 'static,
    {
        self.mutated.subscribe(callback)
    }

    /// JSON array of every reminder, in storage order.
    pub fn snapshot(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.items)
    }

    fn notify(&self) {
        match self.snapshot() {
            Ok(snapshot) => self.mutated.emit(&snapshot),
            Err(e) => tracing::error!("Failed to serialize reminders: {}", e),
        }
    }

    /// Insert, or replace in place when the id already exists.
    pub fn upsert(&mut self, reminder: Reminder) {
        match self.items.iter_mut().find(|r| r.id == reminder.id) {
            Some(existing) => *existing = reminder,
            None => self.items.push(reminder),
        }
        self.notify();
    }

    /// Returns whether a reminder was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        self.remove_where(|r| r.id == id) > 0
    }

    /// Remove every reminder on `date_iso`. Returns how many were removed.
    pub fn remove_by_date(&mut self, date_iso: &str) -> usize {
        self.remove_where(|r| r.date_iso == date_iso)
    }

    pub fn remove_all(&mut self) -> usize {
        self.remove_where(|_| true)
    }

    fn remove_where<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&Reminder) -> bool,
    {
        let before = self.items.len();
        self.items.retain(|r| !predicate(r));
        let removed = before - self.items.len();
        if removed > 0 {
            self.notify();
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<&Reminder> {
        self.items.iter().find(|r| r.id == id)
    }

    pub fn items(&self) -> &[Reminder] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Reminders on `date_iso`, earliest time first. Equal times keep
    /// insertion order.
    pub fn by_day(&self, date_iso: &str) -> Vec<&Reminder> {
        let mut day: Vec<&Reminder> = self
            .items
            .iter()
            .filter(|r| r.date_iso == date_iso)
            .collect();
        day.sort_by(|a, b| a.time.cmp(&b.time));
        day
    }

    /// Reminders dated within `year`/`month0`. Unparseable dates never match.
    pub fn by_month(&self, year: i32, month0: i32) -> Vec<&Reminder> {
        let (year, month0) = grid::normalize_month(year, month0);
        self.items
            .iter()
            .filter(|r| {
                parse_date(&r.date_iso)
                    .map(|d| d.year() == year && d.month0() == month0)
                    .unwrap_or(false)
            })
            .collect()
    }
}
