//! # Error Types
//!
//! Domain-specific error types for basket-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  basket-core errors (this file)                                        │
//! │  ├── CoreError        - Pricing / configuration failures               │
//! │  └── ValidationError  - Item shape rejected by the schema layer        │
//! │                                                                         │
//! │  basket-store errors (separate crate)                                  │
//! │  └── StoreError       - Access rules, snapshot I/O                     │
//! │                                                                         │
//! │  basket-cart errors (separate crate)                                   │
//! │  └── CartError        - What cart callers see                          │
//! │                                                                         │
//! │  Flow: ValidationError → StoreError → CartError → Caller               │
//! │        CoreError ──────────────────────┘                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Cart domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An item references a relation type with no registered provider.
    ///
    /// ## When This Occurs
    /// ```text
    /// Cart.add({ relation_type: "gift-card", ... })   ← add succeeds
    ///      │
    ///      ▼
    /// Cart.amount()
    ///      │
    ///      ▼
    /// registry lookup "gift-card" → none
    ///      │
    ///      ▼
    /// MisconfiguredItemType { relation_type: "gift-card" }
    /// ```
    #[error("Cart misconfigured: item of type {relation_type} was added but not configured")]
    MisconfiguredItemType { relation_type: String },

    /// The provider is registered but does not know the referenced id.
    #[error("No {relation_type} found with id {relation_id}")]
    RelatedItemNotFound {
        relation_type: String,
        relation_id: String,
    },

    /// Cart total or a line amount does not fit in an `i64` of cents.
    #[error("Cart amount overflowed: {context}")]
    AmountOverflow { context: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Item shape validation errors.
///
/// These are what the schema layer reports when a write is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value does not fit in a 64-bit integer.
    #[error("{field} is too large")]
    Overflow { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
