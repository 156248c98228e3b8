//! # Cart Error Types
//!
//! What callers of a cart manager see.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          CartError                                      │
//! │                                                                         │
//! │  ├── Core(CoreError)        MisconfiguredItemType, RelatedItemNotFound, │
//! │  │                          Validation                                  │
//! │  ├── Store(StoreError)      AccessDenied, SubscriptionStopped,          │
//! │  │                          snapshot failures                           │
//! │  ├── NotAuthenticated       owner-only operation while anonymous        │
//! │  ├── SessionClosed          auth event sent after the loop stopped      │
//! │  └── Config*                invalid / unreadable / unwritable config    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use basket_core::{CoreError, ValidationError};
use basket_store::StoreError;
use thiserror::Error;

/// Result type alias for cart operations.
pub type CartResult<T> = Result<T, CartError>;

/// Cart manager error type.
#[derive(Debug, Error)]
pub enum CartError {
    // =========================================================================
    // Domain Errors
    // =========================================================================
    /// Pricing or validation failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The collection service refused or failed the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Operation requires a logged-in owner.
    #[error("No owner is logged in")]
    NotAuthenticated,

    /// The auth session loop is no longer running.
    #[error("Cart session loop has stopped")]
    SessionClosed,

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid cart configuration.
    #[error("Invalid cart configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ValidationError> for CartError {
    fn from(err: ValidationError) -> Self {
        CartError::Core(CoreError::Validation(err))
    }
}

impl From<std::io::Error> for CartError {
    fn from(err: std::io::Error) -> Self {
        CartError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for CartError {
    fn from(err: toml::de::Error) -> Self {
        CartError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for CartError {
    fn from(err: toml::ser::Error) -> Self {
        CartError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl CartError {
    /// True when amount resolution hit a relation type with no provider.
    pub fn is_misconfigured(&self) -> bool {
        matches!(self, CartError::Core(CoreError::MisconfiguredItemType { .. }))
    }

    /// True if the caller can fix the problem and carry on with the cart.
    ///
    /// Configuration mistakes, bad input and ownership refusals are
    /// recoverable; snapshot I/O failures are not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            CartError::Core(_) | CartError::NotAuthenticated => true,
            CartError::Store(err) => !err.is_snapshot_error(),
            CartError::SessionClosed
            | CartError::InvalidConfig(_)
            | CartError::ConfigLoadFailed(_)
            | CartError::ConfigSaveFailed(_) => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CartError::InvalidConfig(_)
                | CartError::ConfigLoadFailed(_)
                | CartError::ConfigSaveFailed(_)
        )
    }
}
