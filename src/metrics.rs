use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// Metric names recorded by the refresh loop
pub const TICKS_TOTAL: &str = "news_dashboard_refresh_ticks_total";
pub const TICK_DURATION: &str = "news_dashboard_refresh_tick_duration_seconds";
pub const POSTS_PROCESSED_TOTAL: &str = "news_dashboard_posts_processed_total";
pub const ENTITIES_INSERTED_TOTAL: &str = "news_dashboard_entities_inserted_total";
pub const SNAPSHOT_ROWS: &str = "news_dashboard_snapshot_rows";

/// Metrics collection for the refresh loop
///
/// Without an installed recorder every call is a no-op, so tests and the
/// CLI can record freely.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshMetrics;

impl RefreshMetrics {
    /// Register descriptions with whichever recorder is installed
    pub fn describe() {
        describe_counter!(TICKS_TOTAL, "Refresh ticks by outcome");
        describe_histogram!(TICK_DURATION, Unit::Seconds, "Wall time of one refresh tick");
        describe_counter!(POSTS_PROCESSED_TOTAL, "Posts run through entity extraction");
        describe_counter!(ENTITIES_INSERTED_TOTAL, "Entity rows appended to the store");
        describe_gauge!(SNAPSHOT_ROWS, "Rows in the published snapshot, per table");
    }

    /// Record one finished tick
    pub fn record_tick(self, outcome: &'static str, duration: Duration) {
        counter!(TICKS_TOTAL, "outcome" => outcome).increment(1);
        histogram!(TICK_DURATION, "outcome" => outcome).record(duration.as_secs_f64());
    }

    /// Record extraction and persistence volume
    pub fn record_extraction(self, posts: usize, entities: usize) {
        counter!(POSTS_PROCESSED_TOTAL).increment(posts as u64);
        counter!(ENTITIES_INSERTED_TOTAL).increment(entities as u64);
    }

    /// Record the size of a freshly published snapshot
    pub fn record_snapshot(self, posts: usize, groups: usize, entities: usize) {
        gauge!(SNAPSHOT_ROWS, "table" => "posts").set(posts as f64);
        gauge!(SNAPSHOT_ROWS, "table" => "groups").set(groups as f64);
        gauge!(SNAPSHOT_ROWS, "table" => "entities").set(entities as f64);
    }
}
