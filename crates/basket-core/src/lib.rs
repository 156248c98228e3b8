//! # basket-core: Pure Cart Types for Basket
//!
//! This crate holds the cart's data model and pricing rules as pure code
//! with zero I/O dependencies. Storage lives in `basket-store`; switching
//! between collections lives in `basket-cart`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Basket Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    basket-cart (Orchestration)                  │   │
//! │  │   ClientCartManager ──► local ⇄ remote, merge on login         │   │
//! │  │   ServerCartManager ──► per-owner carts, admin empty, feed     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               basket-store (Collections)                        │   │
//! │  │   LocalCollection (snapshot file) • RemoteStore (access rules) │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ basket-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   query   │  │  pricing  │  │ validation│  │   │
//! │  │   │ CartItem  │  │ CartQuery │  │ Providers │  │ item shape│  │   │
//! │  │   │ Relation  │  │ ItemPatch │  │ Amount    │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO STORAGE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Cart item types (CartItem, NewCartItem, Relation)
//! - [`query`] - Equality queries and write patches over items
//! - [`money`] - Money type with integer arithmetic
//! - [`pricing`] - Item-type providers and amount resolution
//! - [`validation`] - Item shape validation (the schema layer)
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use basket_core::money::Money;
//! use basket_core::pricing::{AmountSource, PricingRegistry, StaticProvider};
//! use basket_core::types::CartItem;
//!
//! let mut registry = PricingRegistry::new();
//! registry.configure([(
//!     "product".to_string(),
//!     StaticProvider::new()
//!         .with("p1", AmountSource::fixed(Money::from_cents(1000)))
//!         .into_shared(),
//! )]);
//!
//! let item = CartItem::local("product", "p1", 5);
//! assert_eq!(registry.line_amount(&item).unwrap().cents(), 5000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod query;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{AmountSource, ItemTypeProvider, PricingRegistry, StaticProvider};
pub use query::{CartQuery, ItemPatch};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a relation type tag (e.g. "product", "subscription").
pub const MAX_RELATION_TYPE_LEN: usize = 64;

/// Maximum length of a relation id.
pub const MAX_RELATION_ID_LEN: usize = 128;
