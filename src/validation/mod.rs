//! Input validation for tool and resource parameters
//!
//! Entity ids, domains and service names end up in request paths sent to
//! Home Assistant, so they are checked before any HTTP call is made.

use crate::error::{HassError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static ENTITY_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_]+\.[a-z0-9_]+$").expect("valid entity id regex"));

static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_]+$").expect("valid slug regex"));

/// Validate an entity id of the form `domain.object_id`
pub fn validate_entity_id(entity_id: &str) -> Result<()> {
    if entity_id.is_empty() {
        return Err(HassError::invalid_input("entity_id cannot be empty"));
    }
    if !ENTITY_ID_PATTERN.is_match(entity_id) {
        return Err(HassError::invalid_input(format!(
            "Invalid entity_id '{entity_id}': expected lowercase 'domain.object_id'"
        )));
    }
    Ok(())
}

/// Validate a domain name such as `light` or `binary_sensor`
pub fn validate_domain(domain: &str) -> Result<()> {
    if !SLUG_PATTERN.is_match(domain) {
        return Err(HassError::invalid_input(format!(
            "Invalid domain '{domain}': expected lowercase letters, digits and underscores"
        )));
    }
    Ok(())
}

/// Validate a service name such as `turn_on`
pub fn validate_service(service: &str) -> Result<()> {
    if !SLUG_PATTERN.is_match(service) {
        return Err(HassError::invalid_input(format!(
            "Invalid service '{service}': expected lowercase letters, digits and underscores"
        )));
    }
    Ok(())
}

/// Validate an event type; Home Assistant permits the same slug format
pub fn validate_event_type(event_type: &str) -> Result<()> {
    if !SLUG_PATTERN.is_match(event_type) {
        return Err(HassError::invalid_input(format!(
            "Invalid event type '{event_type}'"
        )));
    }
    Ok(())
}

/// Apply the default and the upper bound to a caller-supplied limit
pub fn clamp_limit(limit: Option<usize>, default: usize, max: usize) -> usize {
    limit.unwrap_or(default).clamp(1, max.max(1))
}

/// Validate a look-back window in hours (1 hour to 30 days)
pub fn validate_hours(hours: u32) -> Result<()> {
    if hours == 0 || hours > 24 * 30 {
        return Err(HassError::invalid_input(format!(
            "hours must be between 1 and 720, got {hours}"
        )));
    }
    Ok(())
}
