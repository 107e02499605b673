//! Saved-items list.

use std::sync::Arc;

use marquee_common::{ContentId, ContentRecord};
use parking_lot::Mutex;
use tracing::debug;

use crate::store::{read_json, write_json, KeyValueStore, StoreError};

pub const WATCHLIST_KEY: &str = "watchlist";

/// Full content records the user saved for later, in insertion order.
pub struct Watchlist {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl Watchlist {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn items(&self) -> Vec<ContentRecord> {
        read_json(self.store.as_ref(), WATCHLIST_KEY)
    }

    pub fn contains(&self, id: &ContentId) -> bool {
        self.items().iter().any(|item| &item.id == id)
    }

    /// Append `record` unless an item with the same id is already saved.
    /// Returns whether the list changed.
    pub fn add(&self, record: &ContentRecord) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock();
        let mut items = self.items();
        if items.iter().any(|item| item.id == record.id) {
            return Ok(false);
        }
        items.push(record.clone());
        write_json(self.store.as_ref(), WATCHLIST_KEY, &items)?;
        debug!(content_id = %record.id, "added to watchlist");
        Ok(true)
    }

    pub fn remove(&self, id: &ContentId) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock();
        let mut items = self.items();
        let before = items.len();
        items.retain(|item| &item.id != id);
        let changed = items.len() != before;
        if changed {
            write_json(self.store.as_ref(), WATCHLIST_KEY, &items)?;
        }
        Ok(changed)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        write_json::<[ContentRecord]>(self.store.as_ref(), WATCHLIST_KEY, &[])
    }
}
