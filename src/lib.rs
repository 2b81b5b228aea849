//! News Dashboard - Entity Extraction and Chart Backend
//!
//! A Rust library that keeps a dashboard of news posts current: it tags
//! named entities in newly published posts, stores them next to the posts,
//! and serves chart-ready views of an in-memory snapshot.
//!
//! # Features
//!
//! - Incremental entity extraction driven by a date watermark
//! - Atomic bulk persistence of extracted entities
//! - Lock-free snapshot publication for concurrent readers
//! - Line charts, news feed, time slider and word cloud over HTTP

/// HTTP API over the published snapshot
pub mod api;
/// Chart reshaping of snapshot data
pub mod charts;
/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// Error types
pub mod error;
/// Per-post entity merging
pub mod extractor;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Named-entity tagging
pub mod nlp;
/// Background refresh loop
pub mod refresh;
/// Backing-store port
pub mod repository;
/// Database schema definitions
pub mod schema;
/// Published in-memory snapshot
pub mod snapshot;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use db::Database;
pub use error::{DashboardError, Result};
pub use models::{Entity, EntityType, Group, Metric, Post};
pub use nlp::{EntityTagger, RuleBasedTagger};
pub use refresh::{RefreshLoop, TickOutcome};
pub use repository::{NewsStore, SqliteStore};
pub use snapshot::{Snapshot, SnapshotReader};
