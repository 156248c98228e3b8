//! # Validation Module
//!
//! The schema layer every collection runs before it accepts a write.
//!
//! ## Item Schema
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Cart Item Schema                                │
//! │                                                                         │
//! │  Field           Type      Rule                        Who sets it      │
//! │  ─────────────   ───────   ─────────────────────────   ──────────────   │
//! │  relation_type   string    non-empty, ≤ 64 chars       caller           │
//! │  relation_id     string    non-empty, ≤ 128 chars      caller           │
//! │  quantity        integer   > 0 on insert               caller           │
//! │  owner_id        string    remote only                 server (caller   │
//! │                                                        identity)        │
//! │                                                                         │
//! │  No upper bound on quantity is enforced here.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use basket_core::validation::validate_new_item;
//! use basket_core::NewCartItem;
//!
//! assert!(validate_new_item(&NewCartItem::new("product", "p1", 2)).is_ok());
//! assert!(validate_new_item(&NewCartItem::new("product", "p1", 0)).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::NewCartItem;
use crate::{MAX_RELATION_ID_LEN, MAX_RELATION_TYPE_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a relation type tag.
pub fn validate_relation_type(relation_type: &str) -> ValidationResult<()> {
    validate_string_field("relation_type", relation_type, MAX_RELATION_TYPE_LEN)
}

/// Validates a relation id.
pub fn validate_relation_id(relation_id: &str) -> ValidationResult<()> {
    validate_string_field("relation_id", relation_id, MAX_RELATION_ID_LEN)
}

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

fn validate_string_field(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Item Validators
// =============================================================================

/// Validates the full shape of a line before insert.
pub fn validate_new_item(item: &NewCartItem) -> ValidationResult<()> {
    validate_relation_type(&item.relation_type)?;
    validate_relation_id(&item.relation_id)?;
    validate_quantity(item.quantity)?;
    Ok(())
}

/// Validates the quantity a line would have after an update.
///
/// An increment can be negative as long as the result stays positive.
/// `resulting` is `None` when the increment overflowed.
pub fn validate_updated_quantity(current: i64, resulting: Option<i64>) -> ValidationResult<()> {
    let Some(resulting) = resulting else {
        tracing::debug!(current, "Rejecting update that overflows quantity");
        return Err(ValidationError::Overflow {
            field: "quantity".to_string(),
        });
    };
    if resulting <= 0 {
        tracing::debug!(current, resulting, "Rejecting update to non-positive quantity");
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}
