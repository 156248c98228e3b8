//! # basket-store: Cart Collections for Basket
//!
//! Storage services the cart managers delegate to.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            basket-store                                 │
//! │                                                                         │
//! │            ┌───────────────── CartCollection ─────────────────┐         │
//! │            │  find • find_one • insert • update • remove      │         │
//! │            │  version • watch                                 │         │
//! │            └───────────┬───────────────────────┬──────────────┘         │
//! │                        │                       │                        │
//! │            ┌───────────▼──────────┐ ┌──────────▼──────────────┐         │
//! │            │  LocalCollection     │ │  OwnerCollection        │         │
//! │            │  no owner            │ │  owner-scoped view of   │         │
//! │            │  SnapshotFile (JSON) │ │  RemoteStore            │         │
//! │            └──────────────────────┘ └──────────┬──────────────┘         │
//! │                                                │                        │
//! │                                     ┌──────────▼──────────────┐         │
//! │                                     │  RemoteStore            │         │
//! │                                     │  all owners' items      │         │
//! │                                     │  publish • subscribe    │         │
//! │                                     │  remove_by_owner        │         │
//! │                                     └─────────────────────────┘         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`collection`] - `CartCollection` trait and the shared `ItemTable`
//! - [`local`] - Anonymous, device-only collection
//! - [`snapshot`] - JSON snapshot file for the local collection
//! - [`remote`] - Server store and owner-scoped access rules
//! - [`feed`] - Publication feed, subscriptions and the connector trait
//! - [`error`] - Store error types

pub mod collection;
pub mod error;
pub mod feed;
pub mod local;
pub mod remote;
pub mod snapshot;

pub use collection::{CartCollection, ItemTable};
pub use error::{StoreError, StoreResult};
pub use feed::{CartFeed, RemoteConnector, Subscription};
pub use local::LocalCollection;
pub use remote::{allow_write, OwnerCollection, RemoteStore};
pub use snapshot::SnapshotFile;
