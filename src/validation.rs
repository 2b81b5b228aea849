use chrono::NaiveDateTime;

use crate::error::{DashboardError, Result};
use crate::models::EntityType;

const MAX_GROUP_NAME_CHARS: usize = 200;
const ALL_TYPES: &str = "ALL";

/// Validation utilities for request input
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate a group display name taken from a request path
    pub fn validate_group_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(DashboardError::InvalidInput(
                "Group name cannot be empty".to_string(),
            ));
        }

        if name.chars().count() > MAX_GROUP_NAME_CHARS {
            return Err(DashboardError::InvalidInput(format!(
                "Group name too long (max {MAX_GROUP_NAME_CHARS} characters)"
            )));
        }

        if name.chars().any(char::is_control) {
            return Err(DashboardError::InvalidInput(
                "Group name contains invalid characters".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse an entity type filter: `ALL` (or nothing) means no filter
    pub fn parse_entity_filter(filter: Option<&str>) -> Result<Option<EntityType>> {
        match filter.map(str::trim) {
            None | Some(ALL_TYPES) => Ok(None),
            Some(value) => value.parse().map(Some).map_err(|_| {
                DashboardError::InvalidInput(format!(
                    "Unknown entity type: {value}. Must be one of: ALL, PER, ORG, LOC, MISC"
                ))
            }),
        }
    }

    /// Validate an inclusive date range
    pub fn validate_date_range(start: NaiveDateTime, end: NaiveDateTime) -> Result<()> {
        if start > end {
            return Err(DashboardError::InvalidInput(format!(
                "Start date {start} is after end date {end}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_name_rules() {
        assert!(InputValidator::validate_group_name("РБК").is_ok());
        assert!(InputValidator::validate_group_name("  ").is_err());
        assert!(InputValidator::validate_group_name("bad\nname").is_err());
        assert!(InputValidator::validate_group_name(&"ж".repeat(200)).is_ok());
        assert!(InputValidator::validate_group_name(&"ж".repeat(201)).is_err());
    }

    #[test]
    fn test_entity_filter() {
        assert_eq!(InputValidator::parse_entity_filter(None).ok(), Some(None));
        assert_eq!(InputValidator::parse_entity_filter(Some("ALL")).ok(), Some(None));
        assert_eq!(
            InputValidator::parse_entity_filter(Some("LOC")).ok(),
            Some(Some(EntityType::Location))
        );
        assert!(InputValidator::parse_entity_filter(Some("loc")).is_err());
    }
}
