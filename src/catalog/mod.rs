//! Catalog store.
//!
//! Holds the content records the server resolves and uploads against. The
//! records live in memory and, when a path is configured, are loaded from and
//! written back to a JSON array on disk after every change.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use marquee_common::{ContentId, ContentRecord, Error, MediaFileKind, Result};
use parking_lot::RwLock;

pub struct Catalog {
    records: RwLock<HashMap<ContentId, ContentRecord>>,
    persistence_path: Option<PathBuf>,
}

impl Catalog {
    /// Open a catalog, loading `persistence_path` when it exists.
    ///
    /// An unreadable file is logged and leaves the catalog empty; the next
    /// change overwrites it.
    pub fn new(persistence_path: Option<PathBuf>) -> Arc<Self> {
        let catalog = Arc::new(Self {
            records: RwLock::new(HashMap::new()),
            persistence_path,
        });

        if let Some(ref path) = catalog.persistence_path {
            match load_from_file(path) {
                Ok(records) => {
                    tracing::info!("Loaded {} catalog records from {:?}", records.len(), path);
                    *catalog.records.write() = records;
                }
                Err(e) => tracing::warn!("Failed to load catalog from {:?}: {}", path, e),
            }
        }

        catalog
    }

    /// An empty, memory-only catalog.
    pub fn in_memory() -> Arc<Self> {
        Self::new(None)
    }

    pub fn get(&self, id: &ContentId) -> Option<ContentRecord> {
        self.records.read().get(id).cloned()
    }

    /// All records, newest first, then by title.
    pub fn list(&self) -> Vec<ContentRecord> {
        let mut records: Vec<_> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.title.cmp(&b.title))
        });
        records
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Insert or replace a record.
    pub fn insert(&self, record: ContentRecord) -> Result<()> {
        self.modify(|records| {
            records.insert(record.id.clone(), record);
            Ok(())
        })
    }

    /// Point a record's video or trailer slot at an uploaded object.
    ///
    /// Returns the updated record. Nothing changes when the write to disk fails.
    pub fn set_file_path(
        &self,
        id: &ContentId,
        kind: MediaFileKind,
        path: &str,
    ) -> Result<ContentRecord> {
        self.modify(|records| {
            let record = records
                .get_mut(id)
                .ok_or_else(|| Error::not_found(id.to_string()))?;
            record.set_file_path(kind, path);
            Ok(record.clone())
        })
    }

    /// Apply `change` to a copy of the records, persist it, then publish it.
    fn modify<T>(
        &self,
        change: impl FnOnce(&mut HashMap<ContentId, ContentRecord>) -> Result<T>,
    ) -> Result<T> {
        let mut records = self.records.write();
        let mut next = records.clone();
        let out = change(&mut next)?;
        if let Some(ref path) = self.persistence_path {
            save_to_file(path, &next)?;
        }
        *records = next;
        Ok(out)
    }
}

fn load_from_file(path: &Path) -> Result<HashMap<ContentId, ContentRecord>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let content = std::fs::read_to_string(path)?;
    let records: Vec<ContentRecord> = serde_json::from_str(&content)?;
    Ok(records.into_iter().map(|r| (r.id.clone(), r)).collect())
}

fn save_to_file(path: &Path, records: &HashMap<ContentId, ContentRecord>) -> Result<()> {
    let mut sorted: Vec<&ContentRecord> = records.values().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let json = serde_json::to_string_pretty(&sorted)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
