//! # Store Error Types
//!
//! Errors surfaced by collection services.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Store Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Access Rules   │  │    Schema       │  │     Local Snapshot      │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  AccessDenied   │  │  Validation     │  │  SnapshotLoadFailed     │ │
//! │  │  Subscription-  │  │                 │  │  SnapshotSaveFailed     │ │
//! │  │  Stopped        │  │                 │  │  SerializationFailed    │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use basket_core::ValidationError;
use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a cart collection.
#[derive(Debug, Error)]
pub enum StoreError {
    // =========================================================================
    // Access Rule Errors
    // =========================================================================
    /// Write against a remote item the caller does not own.
    #[error("Access denied: {owner_id} cannot modify cart item {item_id}")]
    AccessDenied { owner_id: String, item_id: String },

    /// The owner-scoped view was used after its subscription stopped.
    #[error("Cart subscription for {owner_id} has been stopped")]
    SubscriptionStopped { owner_id: String },

    // =========================================================================
    // Schema Errors
    // =========================================================================
    /// The schema layer rejected the write.
    #[error("Invalid cart item: {0}")]
    Validation(#[from] ValidationError),

    // =========================================================================
    // Snapshot Errors
    // =========================================================================
    /// Failed to read the local snapshot file.
    #[error("Failed to load local cart: {0}")]
    SnapshotLoadFailed(String),

    /// Failed to write the local snapshot file.
    #[error("Failed to save local cart: {0}")]
    SnapshotSaveFailed(String),

    /// Snapshot contents could not be (de)serialized.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::SerializationFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl StoreError {
    /// True if the collaborator refused the write on ownership grounds.
    pub fn is_access_error(&self) -> bool {
        matches!(
            self,
            StoreError::AccessDenied { .. } | StoreError::SubscriptionStopped { .. }
        )
    }

    /// True if the failure came from local persistence.
    pub fn is_snapshot_error(&self) -> bool {
        matches!(
            self,
            StoreError::SnapshotLoadFailed(_)
                | StoreError::SnapshotSaveFailed(_)
                | StoreError::SerializationFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::AccessDenied {
            owner_id: "bob".into(),
            item_id: "abc-123".into(),
        };
        assert!(err.to_string().contains("bob"));
        assert!(err.to_string().contains("abc-123"));
        assert!(err.is_access_error());
    }

    #[test]
    fn test_validation_converts() {
        let err: StoreError = ValidationError::MustBePositive {
            field: "quantity".into(),
        }
        .into();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(!err.is_snapshot_error());
    }
}
