//! Data models for posts, groups and extracted entities
//!
//! Row structs mirror the backing tables column for column. Posts and groups
//! are produced by an external ingestion process and are read-only here;
//! entities are appended by the refresh loop.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

/// A social-media post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Unique post identifier
    pub post_id: i64,
    /// Screen name of the owning group
    pub group: String,
    /// Publication timestamp as stored
    pub date: NaiveDateTime,
    /// Post title
    pub title: String,
    /// Post body
    pub text: String,
    /// Number of likes
    pub likes_count: i64,
    /// Number of views
    pub views_count: i64,
    /// Number of comments
    pub comments_count: i64,
    /// Number of reposts
    pub reposts_count: i64,
}

impl Post {
    /// Value of one engagement counter
    #[must_use]
    pub const fn metric(&self, metric: Metric) -> i64 {
        match metric {
            Metric::Views => self.views_count,
            Metric::Likes => self.likes_count,
            Metric::Comments => self.comments_count,
            Metric::Reposts => self.reposts_count,
        }
    }
}

/// A news group (community) that publishes posts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group identifier
    pub group_id: i64,
    /// Unique external key, referenced by `Post::group`
    pub screen_name: String,
    /// Display name
    pub name: String,
    /// Subscriber count
    pub members_count: i64,
}

/// Named-entity categories produced by the tagger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    /// Person
    #[serde(rename = "PER")]
    Person,
    /// Organization
    #[serde(rename = "ORG")]
    Organization,
    /// Location
    #[serde(rename = "LOC")]
    Location,
    /// Anything else worth tagging
    #[serde(rename = "MISC")]
    Misc,
}

impl EntityType {
    /// All tag values, in display order
    pub const ALL: [Self; 4] = [Self::Person, Self::Organization, Self::Location, Self::Misc];

    /// Stored tag string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Person => "PER",
            Self::Organization => "ORG",
            Self::Location => "LOC",
            Self::Misc => "MISC",
        }
    }

    /// Reduce a normalized entity text to its stored form.
    ///
    /// Person names keep only their last whitespace-delimited token, so
    /// "Ivan Petrov" and "Petrov" collapse to one entity. Other types are
    /// returned unchanged.
    #[must_use]
    pub fn stored_text(self, text: &str) -> String {
        match self {
            Self::Person => text
                .split_whitespace()
                .next_back()
                .unwrap_or_default()
                .to_string(),
            _ => text.to_string(),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PER" => Ok(Self::Person),
            "ORG" => Ok(Self::Organization),
            "LOC" => Ok(Self::Location),
            "MISC" => Ok(Self::Misc),
            other => Err(DashboardError::InvalidInput(format!(
                "Unknown entity type: {other}"
            ))),
        }
    }
}

impl ToSql for EntityType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for EntityType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// A stored entity row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Owning post
    pub post_id: i64,
    /// Tag category
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Timestamp derived from the owning post
    pub date: NaiveDateTime,
    /// Normalized surface form
    pub text: String,
}

/// An entity about to be inserted
pub type NewEntity = Entity;

/// One span reported by a tagger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedSpan {
    /// Normalized span text
    pub text: String,
    /// Span category
    pub entity_type: EntityType,
}

impl TaggedSpan {
    /// Convenience constructor
    #[must_use]
    pub fn new(text: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            text: text.into(),
            entity_type,
        }
    }
}

/// Engagement counters that can be charted over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// `views_count`
    Views,
    /// `likes_count`
    Likes,
    /// `comments_count`
    Comments,
    /// `reposts_count`
    Reposts,
}

impl FromStr for Metric {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "views" => Ok(Self::Views),
            "likes" => Ok(Self::Likes),
            "comments" => Ok(Self::Comments),
            "reposts" => Ok(Self::Reposts),
            other => Err(DashboardError::InvalidInput(format!("Unknown metric: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_text_keeps_last_name() {
        assert_eq!(EntityType::Person.stored_text("Ivan Petrov"), "Petrov");
        assert_eq!(EntityType::Person.stored_text("Petrov"), "Petrov");
        assert_eq!(EntityType::Person.stored_text("Anna  Maria   Ivanova"), "Ivanova");
    }

    #[test]
    fn test_other_types_keep_full_text() {
        assert_eq!(EntityType::Location.stored_text("New York"), "New York");
        assert_eq!(EntityType::Organization.stored_text("Bank of Russia"), "Bank of Russia");
    }

    #[test]
    fn test_entity_type_parsing() {
        for entity_type in EntityType::ALL {
            assert_eq!(entity_type.as_str().parse::<EntityType>().ok(), Some(entity_type));
        }
        assert!("PERSON".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("Views".parse::<Metric>().ok(), Some(Metric::Views));
        assert_eq!("reposts".parse::<Metric>().ok(), Some(Metric::Reposts));
        assert!("shares".parse::<Metric>().is_err());
    }
}
