//! Immutable in-memory copy of the dashboard tables
//!
//! The refresh loop is the only writer; HTTP handlers and other readers hold
//! a [`SnapshotReader`] and always see one complete snapshot, old or new.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::models::{Entity, Group, Post};

/// Point-in-time copy of posts, groups and entities
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Posts, newest first
    pub posts: Vec<Post>,
    pub groups: Vec<Group>,
    /// Entities with person names reduced to last names
    pub entities: Vec<Entity>,
    pub loaded_at: DateTime<Utc>,
}

impl Snapshot {
    /// Build a snapshot from freshly loaded rows
    #[must_use]
    pub fn new(mut posts: Vec<Post>, groups: Vec<Group>, mut entities: Vec<Entity>) -> Self {
        posts.sort_by(|a, b| b.date.cmp(&a.date).then(b.post_id.cmp(&a.post_id)));
        // Rows stored before reduction existed still carry full names
        for entity in &mut entities {
            entity.text = entity.entity_type.stored_text(&entity.text);
        }

        Self {
            posts,
            groups,
            entities,
            loaded_at: Utc::now(),
        }
    }

    /// Snapshot with no rows
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }

    /// Row counts as (posts, groups, entities)
    #[must_use]
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.posts.len(), self.groups.len(), self.entities.len())
    }
}

/// Create the single-writer / multi-reader handoff for snapshots
#[must_use]
pub fn snapshot_channel(initial: Snapshot) -> (SnapshotPublisher, SnapshotReader) {
    let (tx, rx) = watch::channel(Arc::new(initial));
    (SnapshotPublisher { tx }, SnapshotReader { rx })
}

/// Write side: replaces the current snapshot wholesale
#[derive(Debug)]
pub struct SnapshotPublisher {
    tx: watch::Sender<Arc<Snapshot>>,
}

impl SnapshotPublisher {
    /// Swap in `snapshot`; succeeds even when no reader is left
    pub fn publish(&self, snapshot: Snapshot) {
        self.tx.send_replace(Arc::new(snapshot));
    }

    /// New reader attached to this publisher
    #[must_use]
    pub fn subscribe(&self) -> SnapshotReader {
        SnapshotReader {
            rx: self.tx.subscribe(),
        }
    }

    /// Snapshot currently published
    #[must_use]
    pub fn current(&self) -> Arc<Snapshot> {
        self.tx.borrow().clone()
    }
}

/// Read side: cheap to clone, never blocks on the writer
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<Arc<Snapshot>>,
}

impl SnapshotReader {
    /// Latest published snapshot
    #[must_use]
    pub fn current(&self) -> Arc<Snapshot> {
        self.rx.borrow().clone()
    }

    /// Wait for the next publication. Returns `false` once the publisher is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
