//! Registry of monitored targets and their bounded check history.

mod models;
mod persist;

pub use models::*;
pub use persist::{load_store, save_snapshot, PersistError};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Checks retained per target; the oldest entry is evicted past this.
pub const HISTORY_LIMIT: usize = 20;

/// Registration metadata plus the bounded history ring for one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetEntry {
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub checks: VecDeque<CheckResult>,
}

impl TargetEntry {
    fn new() -> Self {
        Self {
            added_at: Utc::now(),
            checks: VecDeque::new(),
        }
    }
}

/// Thread-safe store of targets and histories.
///
/// Each target maps to one `DashMap` entry; appends take the entry's shard
/// write lock, so writes for one URL are serialized while unrelated targets
/// proceed concurrently. There is no global lock.
#[derive(Debug, Default)]
pub struct Store {
    targets: DashMap<String, TargetEntry>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a persisted snapshot, re-applying the history
    /// bound in case the file was hand-edited past it.
    pub fn from_snapshot(snapshot: BTreeMap<String, TargetEntry>) -> Self {
        let store = Self::new();
        for (url, mut entry) in snapshot {
            while entry.checks.len() > HISTORY_LIMIT {
                entry.checks.pop_front();
            }
            store.targets.insert(url, entry);
        }
        store
    }

    /// Sorted snapshot of the full state, deterministic for persistence.
    pub fn snapshot(&self) -> BTreeMap<String, TargetEntry> {
        self.targets
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Register a target. Idempotent; returns false if already present.
    pub fn add_url(&self, url: &str) -> bool {
        let mut inserted = false;
        self.targets.entry(url.to_string()).or_insert_with(|| {
            inserted = true;
            TargetEntry::new()
        });
        inserted
    }

    /// Deregister a target and discard its history. Idempotent; returns
    /// false if absent.
    pub fn remove_url(&self, url: &str) -> bool {
        self.targets.remove(url).is_some()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.targets.contains_key(url)
    }

    /// Currently registered URLs, in registration order.
    pub fn urls(&self) -> Vec<String> {
        let mut entries: Vec<(DateTime<Utc>, String)> = self
            .targets
            .iter()
            .map(|e| (e.value().added_at, e.key().clone()))
            .collect();
        entries.sort();
        entries.into_iter().map(|(_, url)| url).collect()
    }

    /// Append a check result, evicting the oldest entry past the bound.
    ///
    /// Returns the status of the previously newest entry, which is what
    /// transition detection compares against. Registers the target if it was
    /// not already present.
    pub fn record_result(&self, url: &str, result: CheckResult) -> Option<StatusText> {
        let mut entry = self
            .targets
            .entry(url.to_string())
            .or_insert_with(TargetEntry::new);
        let previous = entry.checks.back().map(|c| c.status_text);
        entry.checks.push_back(result);
        while entry.checks.len() > HISTORY_LIMIT {
            entry.checks.pop_front();
        }
        previous
    }

    /// Chronological history for a target, or None if it is not registered.
    pub fn history(&self, url: &str) -> Option<Vec<CheckResult>> {
        self.recent(url, HISTORY_LIMIT)
    }

    /// The most recent `limit` checks for a target, oldest first.
    pub fn recent(&self, url: &str, limit: usize) -> Option<Vec<CheckResult>> {
        let entry = self.targets.get(url)?;
        let skip = entry.checks.len().saturating_sub(limit);
        Some(entry.checks.iter().skip(skip).cloned().collect())
    }

    /// Share of UP entries in the history, rounded to two decimals.
    ///
    /// None for an empty history: "never checked" is distinct from
    /// "always down".
    pub fn uptime_percentage(&self, url: &str) -> Option<f64> {
        let entry = self.targets.get(url)?;
        uptime_of(&entry.checks)
    }

    /// Status changes in the history, collapsing consecutive runs of equal
    /// status to their first occurrence.
    pub fn transitions(&self, url: &str) -> Vec<(StatusText, DateTime<Utc>)> {
        let Some(entry) = self.targets.get(url) else {
            return Vec::new();
        };
        let mut events = Vec::new();
        for check in &entry.checks {
            if events
                .last()
                .map_or(true, |(status, _)| *status != check.status_text)
            {
                events.push((check.status_text, check.timestamp));
            }
        }
        events
    }

    /// Listing rows for every registered target, in registration order.
    pub fn list_urls(&self) -> Vec<MonitoredUrl> {
        let mut rows: Vec<(DateTime<Utc>, MonitoredUrl)> = self
            .targets
            .iter()
            .map(|e| {
                let last = e.value().checks.back();
                let row = MonitoredUrl {
                    url: e.key().clone(),
                    last_status: last.map(|c| c.status_text),
                    last_response_time: last.and_then(|c| c.response_time_ms),
                    uptime_percentage: uptime_of(&e.value().checks),
                };
                (e.value().added_at, row)
            })
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.url.cmp(&b.1.url)));
        rows.into_iter().map(|(_, row)| row).collect()
    }
}

fn uptime_of(checks: &VecDeque<CheckResult>) -> Option<f64> {
    if checks.is_empty() {
        return None;
    }
    let up = checks
        .iter()
        .filter(|c| c.status_text == StatusText::Up)
        .count();
    let pct = up as f64 / checks.len() as f64 * 100.0;
    Some((pct * 100.0).round() / 100.0)
}


#[cfg(test)]
mod tests {
    use super::test_support::result_with_status;
    use super::*;

    #[test]
    fn history_is_bounded_fifo() {
        let store = Store::new();
        store.add_url("https://example.com/");
        for i in 0..25u64 {
            let mut result = result_with_status(StatusText::Up);
            result.response_time_ms = Some(i);
            store.record_result("https://example.com/", result);
        }

        let history = store.history("https://example.com/").unwrap();
        assert_eq!(history.len(), HISTORY_LIMIT);
        // Oldest five evicted; relative order preserved.
        let times: Vec<u64> = history.iter().map(|c| c.response_time_ms.unwrap()).collect();
        assert_eq!(times, (5..25).collect::<Vec<u64>>());
    }

    #[test]
    fn targets_are_isolated() {
        let store = Store::new();
        store.add_url("https://a.example/");
        store.add_url("https://b.example/");
        store.record_result("https://a.example/", result_with_status(StatusText::Down));

        assert_eq!(store.history("https://b.example/").unwrap().len(), 0);
        let rows = store.list_urls();
        let b = rows.iter().find(|r| r.url == "https://b.example/").unwrap();
        assert!(b.last_status.is_none());
    }

    #[test]
    fn uptime_percentage_cases() {
        let store = Store::new();
        store.add_url("https://example.com/");
        assert_eq!(store.uptime_percentage("https://example.com/"), None);

        for _ in 0..15 {
            store.record_result("https://example.com/", result_with_status(StatusText::Up));
        }
        assert_eq!(store.uptime_percentage("https://example.com/"), Some(100.0));

        for _ in 0..5 {
            store.record_result("https://example.com/", result_with_status(StatusText::Down));
        }
        // 15 UP / 20 total
        assert_eq!(store.uptime_percentage("https://example.com/"), Some(75.0));

        let store = Store::new();
        store.record_result("https://down.example/", result_with_status(StatusText::Down));
        assert_eq!(store.uptime_percentage("https://down.example/"), Some(0.0));
    }

    #[test]
    fn unknown_url_has_no_uptime() {
        let store = Store::new();
        assert_eq!(store.uptime_percentage("https://nope.example/"), None);
        assert!(store.history("https://nope.example/").is_none());
    }

    #[test]
    fn remove_discards_history_and_readd_starts_empty() {
        let store = Store::new();
        store.add_url("https://example.com/");
        store.record_result("https://example.com/", result_with_status(StatusText::Up));

        assert!(store.remove_url("https://example.com/"));
        assert!(store.history("https://example.com/").is_none());
        assert!(!store.remove_url("https://example.com/"));

        assert!(store.add_url("https://example.com/"));
        assert_eq!(store.history("https://example.com/").unwrap().len(), 0);
    }

    #[test]
    fn add_is_idempotent() {
        let store = Store::new();
        assert!(store.add_url("https://example.com/"));
        store.record_result("https://example.com/", result_with_status(StatusText::Up));
        assert!(!store.add_url("https://example.com/"));
        // Re-adding does not reset history.
        assert_eq!(store.history("https://example.com/").unwrap().len(), 1);
    }

    #[test]
    fn record_result_returns_previous_status() {
        let store = Store::new();
        store.add_url("https://example.com/");
        assert_eq!(
            store.record_result("https://example.com/", result_with_status(StatusText::Down)),
            None
        );
        assert_eq!(
            store.record_result("https://example.com/", result_with_status(StatusText::Up)),
            Some(StatusText::Down)
        );
        assert_eq!(
            store.record_result("https://example.com/", result_with_status(StatusText::Up)),
            Some(StatusText::Up)
        );
    }

    #[test]
    fn transitions_collapse_equal_runs() {
        let store = Store::new();
        store.add_url("https://example.com/");
        for status in [
            StatusText::Up,
            StatusText::Up,
            StatusText::Down,
            StatusText::Down,
            StatusText::Down,
            StatusText::Up,
        ] {
            store.record_result("https://example.com/", result_with_status(status));
        }

        let events = store.transitions("https://example.com/");
        let statuses: Vec<StatusText> = events.iter().map(|(s, _)| *s).collect();
        assert_eq!(statuses, vec![StatusText::Up, StatusText::Down, StatusText::Up]);
    }

    #[test]
    fn recent_returns_newest_in_order() {
        let store = Store::new();
        for i in 0..5u64 {
            let mut result = result_with_status(StatusText::Up);
            result.response_time_ms = Some(i);
            store.record_result("https://example.com/", result);
        }

        let recent = store.recent("https://example.com/", 2).unwrap();
        let times: Vec<u64> = recent.iter().map(|c| c.response_time_ms.unwrap()).collect();
        assert_eq!(times, vec![3, 4]);
        // A limit past the history length returns everything.
        assert_eq!(store.recent("https://example.com/", 99).unwrap().len(), 5);
    }

    #[test]
    fn transitions_identical_statuses_emit_once() {
        let store = Store::new();
        for _ in 0..3 {
            store.record_result("https://example.com/", result_with_status(StatusText::Up));
        }
        assert_eq!(store.transitions("https://example.com/").len(), 1);
    }

    #[test]
    fn snapshot_roundtrip_reapplies_bound() {
        let store = Store::new();
        store.add_url("https://example.com/");
        store.record_result("https://example.com/", result_with_status(StatusText::Up));

        let mut snapshot = store.snapshot();
        // Simulate a hand-edited file with an oversized history.
        let entry = snapshot.get_mut("https://example.com/").unwrap();
        for _ in 0..30 {
            entry
                .checks
                .push_back(result_with_status(StatusText::Down));
        }

        let restored = Store::from_snapshot(snapshot);
        assert_eq!(
            restored.history("https://example.com/").unwrap().len(),
            HISTORY_LIMIT
        );
    }
}
