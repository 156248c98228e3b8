//! # Cart Events
//!
//! Inbound auth session events and outbound cart notifications.
//!
//! ```text
//! auth service ──AuthEvent──► ClientCartManager ──CartEventEmitter──► UI
//!   LoggedIn{owner}                                 active_changed(kind)
//!   Settled                                         merged(owner, count)
//!   LoggedOut                                       error(message)
//! ```

use basket_core::CollectionKind;

// =============================================================================
// Auth Events
// =============================================================================

/// What the auth/session service reports to the client cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A user logged in. The session may not be usable yet.
    LoggedIn { owner_id: String },

    /// The session established by the last `LoggedIn` is ready.
    Settled,

    /// The user logged out.
    LoggedOut,
}

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Observer for cart changes that are not item writes.
pub trait CartEventEmitter: Send + Sync {
    /// The active collection was switched to `kind`. Fired once per switch.
    fn emit_active_changed(&self, kind: CollectionKind);

    /// `count` local items were copied into `owner_id`'s remote cart.
    fn emit_merged(&self, owner_id: &str, count: usize);

    /// A session transition failed.
    fn emit_error(&self, message: &str);
}

/// No-op event emitter for testing.
pub struct NoOpEmitter;

impl CartEventEmitter for NoOpEmitter {
    fn emit_active_changed(&self, _kind: CollectionKind) {}
    fn emit_merged(&self, _owner_id: &str, _count: usize) {}
    fn emit_error(&self, _message: &str) {}
}
