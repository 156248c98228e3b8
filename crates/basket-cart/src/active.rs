//! # Active Collection Slot
//!
//! Holds the collection that currently serves cart reads and writes.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RwLock<Arc<dyn CartCollection>>                                        │
//! │                                                                         │
//! │  current()   read lock, clone Arc, release                             │
//! │  switch_to() write lock, replace Arc, release, then notify             │
//! │                                                                         │
//! │  watch::Sender<SlotState> ──► { kind, switches } for async observers   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use basket_core::CollectionKind;
use basket_store::CartCollection;
use tokio::sync::watch;
use tracing::debug;

/// What observers of the slot see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotState {
    pub kind: CollectionKind,
    /// Number of switches since the slot was created.
    pub switches: u64,
}

/// The active collection pointer.
pub struct ActiveSlot {
    current: RwLock<Arc<dyn CartCollection>>,
    state_tx: watch::Sender<SlotState>,
}

impl ActiveSlot {
    pub fn new(initial: Arc<dyn CartCollection>) -> Self {
        let (state_tx, _) = watch::channel(SlotState {
            kind: initial.kind(),
            switches: 0,
        });
        ActiveSlot {
            current: RwLock::new(initial),
            state_tx,
        }
    }

    /// The collection serving operations right now.
    pub fn current(&self) -> Arc<dyn CartCollection> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn kind(&self) -> CollectionKind {
        self.state_tx.borrow().kind
    }

    pub fn state(&self) -> SlotState {
        *self.state_tx.borrow()
    }

    /// Makes `next` the active collection.
    ///
    /// Returns false, without notifying, if `next` already is the active one.
    pub fn switch_to(&self, next: Arc<dyn CartCollection>) -> bool {
        let kind = next.kind();
        {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            if std::ptr::addr_eq(Arc::as_ptr(&*current), Arc::as_ptr(&next)) {
                return false;
            }
            *current = next;
        }

        self.state_tx.send_modify(|state| {
            state.kind = kind;
            state.switches += 1;
        });
        debug!(kind = %kind, "Active collection switched");
        true
    }

    /// Receiver that wakes on every switch.
    pub fn watch(&self) -> watch::Receiver<SlotState> {
        self.state_tx.subscribe()
    }
}

impl std::fmt::Debug for ActiveSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSlot")
            .field("state", &self.state())
            .finish()
    }
}
