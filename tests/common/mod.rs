//! Fixtures shared by the integration tests

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use news_dashboard::db::Database;
use news_dashboard::models::{Entity, EntityType, Group, Post};
use tempfile::TempDir;

pub fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .expect("valid date")
}

pub fn group(group_id: i64, screen_name: &str, name: &str) -> Group {
    Group {
        group_id,
        screen_name: screen_name.to_string(),
        name: name.to_string(),
        members_count: 1000,
    }
}

pub fn post(post_id: i64, group: &str, date: NaiveDateTime, title: &str, text: &str) -> Post {
    Post {
        post_id,
        group: group.to_string(),
        date,
        title: title.to_string(),
        text: text.to_string(),
        likes_count: 10,
        views_count: 100,
        comments_count: 2,
        reposts_count: 1,
    }
}

pub fn entity(post_id: i64, entity_type: EntityType, date: NaiveDateTime, text: &str) -> Entity {
    Entity {
        post_id,
        entity_type,
        date,
        text: text.to_string(),
    }
}

/// Fresh database in a temporary directory; keep the `TempDir` alive
pub fn temp_database() -> (TempDir, Database) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let url = format!("sqlite://{}", dir.path().join("news.db").display());
    let db = Database::new(&url).expect("Failed to create database");
    (dir, db)
}

/// Database seeded with one group and the given posts
pub fn seeded_database(posts: &[Post]) -> (TempDir, Database) {
    let (dir, db) = temp_database();
    db.upsert_groups(&[group(1, "news", "News Daily")])
        .expect("Failed to seed groups");
    db.upsert_posts(posts).expect("Failed to seed posts");
    (dir, db)
}
