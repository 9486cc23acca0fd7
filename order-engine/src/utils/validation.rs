//! Input validation helpers
//!
//! Text length limits and the request-shape checks that run before any
//! collaborator is consulted.

use crate::error::OrderError;

// ── Text length limits ──────────────────────────────────────────────

/// Person names (guest first/last name)
pub const MAX_NAME_LEN: usize = 200;

/// Notes: special requests, delivery notes, customizations
pub const MAX_NOTE_LEN: usize = 500;

/// Email addresses (RFC 5321)
pub const MAX_EMAIL_LEN: usize = 254;

// ── Quantity limits ─────────────────────────────────────────────────

/// Per-line quantity bounds
pub const MIN_QUANTITY: i32 = 1;
pub const MAX_QUANTITY: i32 = 99;

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), OrderError> {
    if value.trim().is_empty() {
        return Err(OrderError::Validation(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(OrderError::Validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), OrderError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(OrderError::Validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}

/// Validate an email address: bounded length, one `@`, dotted domain, no whitespace.
pub fn validate_email(value: &str, field: &str) -> Result<(), OrderError> {
    validate_required_text(value, field, MAX_EMAIL_LEN)?;
    let invalid = || OrderError::Validation(format!("{field} is not a valid email address"));

    if value.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = value.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid());
    }
    Ok(())
}

/// Validate a line quantity
pub fn validate_quantity(quantity: i32, field: &str) -> Result<(), OrderError> {
    if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&quantity) {
        return Err(OrderError::Validation(format!(
            "{field} must be between {MIN_QUANTITY} and {MAX_QUANTITY}, got {quantity}"
        )));
    }
    Ok(())
}

/// Normalize an email for comparison and storage
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}
