//! Periodic entity extraction and snapshot refresh
//!
//! Each tick picks up posts newer than the entity watermark, tags them,
//! appends the entities in one transaction and republishes the full
//! snapshot. A failed tick leaves the published snapshot untouched and the
//! loop carries on at the next interval.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::RefreshConfig;
use crate::error::{DashboardError, Result};
use crate::extractor::extract_entities;
use crate::logging::OperationTimer;
use crate::metrics::RefreshMetrics;
use crate::nlp::EntityTagger;
use crate::repository::NewsStore;
use crate::snapshot::{Snapshot, SnapshotPublisher};

/// Load posts, groups and entities in full
pub async fn load_snapshot(store: &dyn NewsStore) -> Result<Snapshot> {
    let (posts, groups, entities) = tokio::try_join!(
        store.fetch_all_posts(),
        store.fetch_all_groups(),
        store.fetch_all_entities(),
    )?;
    Ok(Snapshot::new(posts, groups, entities))
}

/// Step of a tick that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStage {
    /// Reading the entity watermark
    Watermark,
    /// Reading posts newer than the watermark
    FetchPosts,
    /// Tagging posts
    Extract,
    /// Appending entities
    Persist,
    /// Loading the new snapshot
    Reload,
}

impl fmt::Display for TickStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Watermark => "watermark",
            Self::FetchPosts => "fetch_posts",
            Self::Extract => "extract",
            Self::Persist => "persist",
            Self::Reload => "reload",
        };
        f.write_str(name)
    }
}

/// Summary of a successful tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Watermark the tick started from
    pub watermark: Option<NaiveDateTime>,
    /// Posts handed to the tagger
    pub posts_processed: usize,
    /// Entity rows appended
    pub entities_inserted: usize,
    /// Posts in the published snapshot
    pub snapshot_posts: usize,
    /// Groups in the published snapshot
    pub snapshot_groups: usize,
    /// Entities in the published snapshot
    pub snapshot_entities: usize,
}

/// Result of one tick
#[derive(Debug)]
pub enum TickOutcome {
    /// New snapshot published
    Refreshed(TickReport),
    /// Tick abandoned; the previous snapshot stays published
    Failed {
        stage: TickStage,
        error: DashboardError,
    },
    /// Tick exceeded its time budget (seconds)
    TimedOut(u64),
}

impl TickOutcome {
    /// Metric label for this outcome
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Refreshed(_) => "refreshed",
            Self::Failed { .. } => "failed",
            Self::TimedOut(_) => "timed_out",
        }
    }

    #[must_use]
    pub const fn is_refreshed(&self) -> bool {
        matches!(self, Self::Refreshed(_))
    }
}

/// Background job that keeps the entity table and the snapshot current
pub struct RefreshLoop {
    store: Arc<dyn NewsStore>,
    tagger: Arc<dyn EntityTagger>,
    publisher: SnapshotPublisher,
    interval: Duration,
    tick_timeout: Option<Duration>,
    metrics: RefreshMetrics,
}

impl RefreshLoop {
    #[must_use]
    pub fn new(
        store: Arc<dyn NewsStore>,
        tagger: Arc<dyn EntityTagger>,
        publisher: SnapshotPublisher,
        config: &RefreshConfig,
    ) -> Self {
        Self {
            store,
            tagger,
            publisher,
            interval: Duration::from_secs(config.interval_secs),
            tick_timeout: config.tick_timeout_secs.map(Duration::from_secs),
            metrics: RefreshMetrics,
        }
    }

    /// Override the sleep between ticks
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Override the per-tick time budget
    #[must_use]
    pub const fn with_tick_timeout(mut self, tick_timeout: Option<Duration>) -> Self {
        self.tick_timeout = tick_timeout;
        self
    }

    /// Run ticks until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Sleeps before the first tick; the caller publishes the initial snapshot.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            tick_timeout_secs = self.tick_timeout.map(|t| t.as_secs()),
            "Refresh loop started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            self.tick().await;
        }

        info!("Refresh loop stopped");
    }

    /// Run a single tick, log it and record its metrics
    pub async fn tick(&self) -> TickOutcome {
        let started = Instant::now();

        let outcome = match self.tick_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.refresh_once()).await {
                Ok(outcome) => outcome,
                Err(_) => TickOutcome::TimedOut(limit.as_secs()),
            },
            None => self.refresh_once().await,
        };

        let elapsed = started.elapsed();
        self.metrics.record_tick(outcome.label(), elapsed);

        match &outcome {
            TickOutcome::Refreshed(report) => info!(
                posts_processed = report.posts_processed,
                entities_inserted = report.entities_inserted,
                snapshot_posts = report.snapshot_posts,
                snapshot_entities = report.snapshot_entities,
                duration_ms = elapsed.as_millis(),
                "Refresh tick completed"
            ),
            TickOutcome::Failed { stage, error } => error!(
                stage = %stage,
                error = %error,
                "Refresh tick failed, keeping previous snapshot"
            ),
            TickOutcome::TimedOut(secs) => warn!(
                timeout_secs = secs,
                "{}",
                DashboardError::Timeout(*secs)
            ),
        }

        outcome
    }

    async fn refresh_once(&self) -> TickOutcome {
        match self.try_refresh().await {
            Ok(report) => TickOutcome::Refreshed(report),
            Err((stage, error)) => TickOutcome::Failed { stage, error },
        }
    }

    async fn try_refresh(&self) -> std::result::Result<TickReport, (TickStage, DashboardError)> {
        let watermark = self
            .store
            .fetch_watermark()
            .await
            .map_err(|e| (TickStage::Watermark, e))?;

        let posts = self
            .store
            .fetch_unprocessed_posts(watermark)
            .await
            .map_err(|e| (TickStage::FetchPosts, e))?;
        let posts_processed = posts.len();
        debug!(?watermark, posts = posts_processed, "Loaded unprocessed posts");

        let timer = OperationTimer::new("extract_entities");
        let tagger = Arc::clone(&self.tagger);
        let entities = tokio::task::spawn_blocking(move || extract_entities(tagger.as_ref(), &posts))
            .await
            .map_err(DashboardError::from)
            .and_then(|result| result)
            .map_err(|e| (TickStage::Extract, e))?;
        timer.finish();

        // Nothing new leaves the watermark where it is
        let entities_inserted = if entities.is_empty() {
            0
        } else {
            self.store
                .bulk_insert_entities(&entities)
                .await
                .map_err(|e| (TickStage::Persist, e))?
        };
        self.metrics.record_extraction(posts_processed, entities_inserted);

        let snapshot = load_snapshot(self.store.as_ref())
            .await
            .map_err(|e| (TickStage::Reload, e))?;
        let (snapshot_posts, snapshot_groups, snapshot_entities) = snapshot.counts();
        self.metrics.record_snapshot(snapshot_posts, snapshot_groups, snapshot_entities);
        self.publisher.publish(snapshot);

        Ok(TickReport {
            watermark,
            posts_processed,
            entities_inserted,
            snapshot_posts,
            snapshot_groups,
            snapshot_entities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        let failed = TickOutcome::Failed {
            stage: TickStage::Persist,
            error: DashboardError::Other("boom".to_string()),
        };
        assert_eq!(failed.label(), "failed");
        assert!(!failed.is_refreshed());
        assert_eq!(TickOutcome::TimedOut(5).label(), "timed_out");
        assert_eq!(TickStage::FetchPosts.to_string(), "fetch_posts");
    }
}
