use crate::hub::{EventHub, FeedEvent};
use crate::record::{decode_frame, EntityRecord, RawRecord};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};


/// One live entity together with its armed expiry timer.
struct LiveEntry {
    record: EntityRecord,
    /// Generation of the expiry timer currently armed for this id. A
    /// refresh bumps the generation, so a stale timer that fires late
    /// cannot remove the refreshed entry.
    generation: u64,
    expiry: JoinHandle<()>,
}

/// Keyed collection of currently-live entities.
///
/// Owns every record and every expiry timer exclusively; consumers only
/// ever receive clones. Each successful ingest re-arms the entity's expiry;
/// an entity not refreshed within `entity_timeout` is removed and announced
/// with an `EntityRemove` event.
pub struct LiveStore {
    entries: DashMap<String, LiveEntry>,
    hub: Arc<EventHub>,
    entity_timeout: Duration,
    generations: AtomicU64,
    /// Handle to ourselves for expiry tasks. Weak, so armed timers never
    /// keep a dropped store alive.
    weak_self: Weak<LiveStore>,
}

impl LiveStore {
    pub fn new(hub: Arc<EventHub>, entity_timeout: Duration) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            entries: DashMap::new(),
            hub,
            entity_timeout,
            generations: AtomicU64::new(0),
            weak_self: weak.clone(),
        })
    }

    /// Decode one feed frame and ingest every element independently.
    ///
    /// An unparseable frame is dropped whole; a malformed element within a
    /// parseable batch drops alone. Neither produces an event.
    pub fn ingest_frame(&self, text: &str) {
        let elements = match decode_frame(text) {
            Ok(elements) => elements,
            Err(e) => {
                warn!(error = %e, "Undecodable feed frame dropped");
                return;
            }
        };

        for element in elements {
            match element {
                Ok(raw) => self.ingest(raw),
                Err(e) => warn!(error = %e, "Invalid record dropped"),
            }
        }
    }

    /// Validate, normalize and store a single element.
    pub fn ingest(&self, raw: RawRecord) {
        let record = match EntityRecord::from_raw(raw, Utc::now()) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Invalid record dropped");
                return;
            }
        };
        self.insert(record);
    }

    /// Insert or wholesale-replace a record and re-arm its expiry.
    fn insert(&self, record: EntityRecord) {
        let id = record.id.clone();
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let expiry = self.arm_expiry(id.clone(), generation);

        let event = FeedEvent::EntityUpdate(record.clone());
        if let Some(previous) = self.entries.insert(
            id,
            LiveEntry {
                record,
                generation,
                expiry,
            },
        ) {
            previous.expiry.abort();
        }

        self.hub.dispatch(&event);
    }

    fn arm_expiry(&self, id: String, generation: u64) -> JoinHandle<()> {
        let store = self.weak_self.clone();
        let timeout = self.entity_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(store) = store.upgrade() {
                store.expire(&id, generation);
            }
        })
    }

    /// Remove an entity whose timer elapsed without a refresh.
    fn expire(&self, id: &str, generation: u64) {
        // Only the timer matching the entry's current generation may remove
        // it; a refresh re-armed the entry under a newer generation.
        let removed = self
            .entries
            .remove_if(id, |_, entry| entry.generation == generation);

        if let Some((_, entry)) = removed {
            debug!(entity_id = %id, "Entity expired");
            self.hub.dispatch(&FeedEvent::EntityRemove(entry.record));
        }
    }

    /// Snapshot of one record, or None when the id is not live
    pub fn get(&self, id: &str) -> Option<EntityRecord> {
        self.entries.get(id).map(|entry| entry.record.clone())
    }

    /// Snapshot of all live records; order is not guaranteed
    pub fn get_all(&self) -> Vec<EntityRecord> {
        self.entries
            .iter()
            .map(|entry| entry.record.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every live entry and cancel its expiry timer.
    ///
    /// This is teardown, not expiry: no `EntityRemove` events are
    /// dispatched. A fired timer after this point finds no matching entry
    /// and does nothing.
    pub fn clear(&self) {
        self.entries.retain(|_, entry| {
            entry.expiry.abort();
            false
        });
    }
}
