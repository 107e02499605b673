//! Resume positions ("continue watching").
//!
//! Entries live in one JSON array under [`CONTINUE_WATCHING_KEY`], most
//! recently watched first, unique by content id and capped at
//! [`RESUME_CAPACITY`](crate::config::RESUME_CAPACITY) entries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use marquee_common::{ContentId, ContentRecord};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PlayerConfig;
use crate::store::{read_json, write_json, KeyValueStore, StoreError};

pub const CONTINUE_WATCHING_KEY: &str = "continue-watching";

/// One saved resume position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeEntry {
    pub movie_id: ContentId,
    pub current_time: f64,
    pub duration: f64,
    pub last_watched: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie: Option<ContentRecord>,
}

impl ResumeEntry {
    /// Watched share of the title, in percent.
    pub fn progress_percent(&self) -> f64 {
        if self.duration > 0.0 {
            (self.current_time / self.duration * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

pub struct ProgressStore {
    store: Arc<dyn KeyValueStore>,
    // Serializes read-merge-write cycles on the shared key.
    write_lock: Mutex<()>,
    threshold_secs: f64,
    completion_ratio: f64,
    capacity: usize,
}

impl ProgressStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_config(store, &PlayerConfig::default())
    }

    pub fn with_config(store: Arc<dyn KeyValueStore>, config: &PlayerConfig) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
            threshold_secs: config.resume_threshold_secs,
            completion_ratio: config.completion_ratio,
            capacity: config.resume_capacity,
        }
    }

    /// Whether a position is worth saving: past the threshold, not finished,
    /// with a usable duration.
    pub fn should_save(&self, current_time: f64, duration: f64) -> bool {
        if !current_time.is_finite() || !duration.is_finite() || duration <= 0.0 {
            return false;
        }
        current_time >= self.threshold_secs && current_time / duration <= self.completion_ratio
    }

    /// Save a resume position. Returns `Ok(false)` when the position was
    /// filtered out by the save policy.
    pub fn save_progress(
        &self,
        id: &ContentId,
        current_time: f64,
        duration: f64,
        snapshot: Option<&ContentRecord>,
    ) -> Result<bool, StoreError> {
        if !self.should_save(current_time, duration) {
            return Ok(false);
        }

        let _guard = self.write_lock.lock();
        let mut entries = self.load();
        entries.retain(|entry| &entry.movie_id != id);
        entries.insert(
            0,
            ResumeEntry {
                movie_id: id.clone(),
                current_time,
                duration,
                last_watched: Utc::now(),
                movie: snapshot.cloned(),
            },
        );
        entries.truncate(self.capacity);
        write_json(self.store.as_ref(), CONTINUE_WATCHING_KEY, &entries)?;

        debug!(content_id = %id, current_time, duration, "saved progress");
        Ok(true)
    }

    /// Stored position for `id`, 0 when none.
    pub fn last_watched_time(&self, id: &ContentId) -> f64 {
        self.load()
            .into_iter()
            .find(|entry| &entry.movie_id == id)
            .map_or(0.0, |entry| entry.current_time)
    }

    /// Where playback should auto-seek on entry, if anywhere.
    ///
    /// An explicitly requested start time always wins; otherwise the stored
    /// position is used only beyond the resume threshold.
    pub fn resume_position(&self, id: &ContentId, requested_start: Option<f64>) -> Option<f64> {
        if requested_start.is_some() {
            return None;
        }
        let stored = self.last_watched_time(id);
        (stored > self.threshold_secs).then_some(stored)
    }

    pub fn remove(&self, id: &ContentId) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let mut entries = self.load();
        let before = entries.len();
        entries.retain(|entry| &entry.movie_id != id);
        if entries.len() != before {
            write_json(self.store.as_ref(), CONTINUE_WATCHING_KEY, &entries)?;
        }
        Ok(())
    }

    /// All entries, most recent first.
    pub fn entries(&self) -> Vec<ResumeEntry> {
        self.load()
    }

    /// The first `limit` entries, for a "continue watching" row.
    pub fn recent(&self, limit: usize) -> Vec<ResumeEntry> {
        let mut entries = self.load();
        entries.truncate(limit);
        entries
    }

    fn load(&self) -> Vec<ResumeEntry> {
        read_json(self.store.as_ref(), CONTINUE_WATCHING_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::collections::HashSet;

    fn store() -> (ProgressStore, Arc<MemoryStore>) {
        let kv = Arc::new(MemoryStore::new());
        (ProgressStore::new(kv.clone()), kv)
    }

    fn id(s: &str) -> ContentId {
        ContentId::new(s)
    }

    #[test]
    fn test_save_policy_thresholds() {
        let (progress, _) = store();
        assert!(!progress.save_progress(&id("a"), 29.9, 100.0, None).unwrap());
        assert!(!progress.save_progress(&id("a"), 96.0, 100.0, None).unwrap());
        assert!(!progress.save_progress(&id("a"), 60.0, 0.0, None).unwrap());
        assert!(!progress.save_progress(&id("a"), 60.0, f64::NAN, None).unwrap());
        assert!(!progress.save_progress(&id("a"), 60.0, f64::INFINITY, None).unwrap());
        assert!(progress.entries().is_empty());

        assert!(progress.save_progress(&id("a"), 30.0, 100.0, None).unwrap());
        assert!(progress.save_progress(&id("b"), 95.0, 100.0, None).unwrap());
        assert_eq!(progress.entries().len(), 2);
    }

    #[test]
    fn test_saved_entry_is_first() {
        let (progress, _) = store();
        progress.save_progress(&id("a"), 40.0, 100.0, None).unwrap();
        progress.save_progress(&id("b"), 50.0, 100.0, None).unwrap();

        let entries = progress.entries();
        assert_eq!(entries[0].movie_id, id("b"));
        assert_eq!(entries[0].current_time, 50.0);
    }

    #[test]
    fn test_saving_twice_keeps_one_entry() {
        let (progress, _) = store();
        progress.save_progress(&id("a"), 40.0, 100.0, None).unwrap();
        progress.save_progress(&id("b"), 45.0, 100.0, None).unwrap();
        progress.save_progress(&id("a"), 70.0, 100.0, None).unwrap();

        let entries = progress.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].movie_id, id("a"));
        assert_eq!(entries[0].current_time, 70.0);
        assert_eq!(progress.last_watched_time(&id("a")), 70.0);
    }

    #[test]
    fn test_capacity_and_uniqueness() {
        let (progress, _) = store();
        for round in 0..3 {
            for n in 0..15 {
                let t = 31.0 + f64::from(n) + f64::from(round);
                progress
                    .save_progress(&id(&format!("m{n}")), t, 1000.0, None)
                    .unwrap();
                let entries = progress.entries();
                assert!(entries.len() <= 10);
                let unique: HashSet<_> = entries.iter().map(|e| e.movie_id.clone()).collect();
                assert_eq!(unique.len(), entries.len());
            }
        }
        let entries = progress.entries();
        assert_eq!(entries.len(), 10);
        assert_eq!(entries[0].movie_id, id("m14"));
        assert_eq!(entries[9].movie_id, id("m5"));
    }

    #[test]
    fn test_resume_position_rules() {
        let (progress, _) = store();
        progress.save_progress(&id("a"), 120.0, 600.0, None).unwrap();
        progress.save_progress(&id("b"), 30.0, 600.0, None).unwrap();

        assert_eq!(progress.resume_position(&id("a"), None), Some(120.0));
        assert_eq!(progress.resume_position(&id("a"), Some(10.0)), None);
        // Exactly at the threshold is not resumed.
        assert_eq!(progress.resume_position(&id("b"), None), None);
        assert_eq!(progress.resume_position(&id("missing"), None), None);
    }

    #[test]
    fn test_remove() {
        let (progress, _) = store();
        progress.save_progress(&id("a"), 40.0, 100.0, None).unwrap();
        progress.save_progress(&id("b"), 40.0, 100.0, None).unwrap();
        progress.remove(&id("a")).unwrap();
        progress.remove(&id("zzz")).unwrap();

        let entries = progress.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].movie_id, id("b"));
        assert_eq!(progress.last_watched_time(&id("a")), 0.0);
    }

    #[test]
    fn test_corrupted_value_is_empty_and_overwritten() {
        let (progress, kv) = store();
        kv.set(CONTINUE_WATCHING_KEY, "[{\"movieId\":").unwrap();
        assert!(progress.entries().is_empty());
        assert_eq!(progress.last_watched_time(&id("a")), 0.0);

        progress.save_progress(&id("a"), 40.0, 100.0, None).unwrap();
        assert_eq!(progress.entries().len(), 1);
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let (progress, kv) = store();
        let record = ContentRecord::new("a", "Arrival");
        progress
            .save_progress(&id("a"), 40.0, 100.0, Some(&record))
            .unwrap();

        let raw = kv.get(CONTINUE_WATCHING_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entry = &value[0];
        assert_eq!(entry["movieId"], "a");
        assert_eq!(entry["currentTime"], 40.0);
        assert_eq!(entry["duration"], 100.0);
        assert!(entry["lastWatched"].is_string());
        assert_eq!(entry["movie"]["title"], "Arrival");
    }

    #[test]
    fn test_recent_and_percent() {
        let (progress, _) = store();
        for n in 0..8 {
            progress
                .save_progress(&id(&format!("m{n}")), 50.0, 200.0, None)
                .unwrap();
        }
        let recent = progress.recent(6);
        assert_eq!(recent.len(), 6);
        assert_eq!(recent[0].progress_percent(), 25.0);
    }
}
