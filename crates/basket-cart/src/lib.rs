//! # basket-cart: Cart Managers for Basket
//!
//! Decides which collection cart operations run against, and moves the
//! anonymous cart into the owner's remote cart on login.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            basket-cart                                  │
//! │                                                                         │
//! │   AuthEvent (mpsc) ──► ClientCartManager                               │
//! │                          │  session: Anonymous / Pending / Authenticated│
//! │                          │  ActiveSlot: local ⇄ remote(owner)          │
//! │                          │  merge_carts on settle                      │
//! │                          ▼                                              │
//! │                     trait CartManager ◄── OwnerCart ◄── ServerCartManager│
//! │                          │                                              │
//! │                          ▼                                              │
//! │                       CartOps  (add • remove • empty • amount …)       │
//! │                          │                                              │
//! │                          ▼                                              │
//! │                basket-store collections + basket-core pricing           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use basket_cart::{CartManager, ClientCartManager, ServerCartManager};
//! use basket_core::NewCartItem;
//!
//! let server = ServerCartManager::new();
//! let client = ClientCartManager::builder(server.connector()).build().unwrap();
//!
//! client.add(NewCartItem::new("product", "p1", 2)).unwrap();
//! client.on_login("alice").unwrap();
//! client.on_settled().unwrap();
//!
//! assert_eq!(server.cart_for("alice").num_items().unwrap(), 2);
//! assert!(client.local().is_empty());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod active;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod manager;
pub mod ops;
pub mod server;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use active::{ActiveSlot, SlotState};
pub use client::{CartState, ClientCartManager, ClientCartManagerBuilder, SessionHandle};
pub use config::{CartConfig, SettleMode, SettleStrategy};
pub use error::{CartError, CartResult};
pub use events::{AuthEvent, CartEventEmitter, NoOpEmitter};
pub use manager::{CartManager, ItemsView};
pub use ops::CartOps;
pub use server::{OwnerCart, ServerCartManager};
