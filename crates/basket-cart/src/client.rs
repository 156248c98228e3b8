//! # Client Cart Manager
//!
//! The device-side cart. Anonymous users shop against a local collection;
//! once logged in, the cart is backed by the owner's remote collection and
//! whatever was added anonymously is carried over.
//!
//! ## Session State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │              LoggedIn{owner}                                            │
//! │  ┌───────────┐ ─────────────► ┌──────────────┐                         │
//! │  │ Anonymous │                │ PendingLogin │  active = local         │
//! │  │           │ ◄───────────── │              │                         │
//! │  └───────────┘   LoggedOut    └──────┬───────┘                         │
//! │     ▲  active = local                │ Settled  (or settle delay)      │
//! │     │                                ▼                                  │
//! │     │                         subscribe(owner)                          │
//! │     │                         merge_carts(remote)                       │
//! │     │                         switch active → remote                    │
//! │     │                                │                                  │
//! │     │      LoggedOut          ┌──────▼────────┐                         │
//! │     └──────────────────────── │ Authenticated │  active = remote        │
//! │        switch → local,        └───────────────┘                         │
//! │        then stop subscription                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Merge
//! Every local item is inserted into the remote collection (the remote
//! assigns new ids and stamps the owner), then all merged ids are removed
//! from local in one call. Remote inserts happen first, so a merge that fails
//! halfway leaves duplicates rather than losing items.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use basket_core::{CartQuery, CollectionKind};
use basket_store::{CartCollection, LocalCollection, RemoteConnector, Subscription};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::active::ActiveSlot;
use crate::config::{CartConfig, SettleStrategy};
use crate::error::{CartError, CartResult};
use crate::events::{AuthEvent, CartEventEmitter, NoOpEmitter};
use crate::manager::CartManager;
use crate::ops::CartOps;

// =============================================================================
// Cart State
// =============================================================================

/// Externally visible session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartState {
    Anonymous,
    /// Logged in, waiting for the session to settle. Still on local.
    PendingLogin { owner_id: String },
    Authenticated { owner_id: String },
}

impl CartState {
    pub fn owner_id(&self) -> Option<&str> {
        match self {
            CartState::Anonymous => None,
            CartState::PendingLogin { owner_id } | CartState::Authenticated { owner_id } => {
                Some(owner_id)
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, CartState::Authenticated { .. })
    }
}

#[derive(Debug)]
enum Session {
    Anonymous,
    Pending {
        owner_id: String,
        generation: u64,
        /// Dropping or firing this stops the settle timer.
        cancel: Option<oneshot::Sender<()>>,
    },
    Authenticated {
        owner_id: String,
        subscription: Subscription,
    },
}

impl Session {
    fn state(&self) -> CartState {
        match self {
            Session::Anonymous => CartState::Anonymous,
            Session::Pending { owner_id, .. } => CartState::PendingLogin {
                owner_id: owner_id.clone(),
            },
            Session::Authenticated { owner_id, .. } => CartState::Authenticated {
                owner_id: owner_id.clone(),
            },
        }
    }
}

// =============================================================================
// Client Cart Manager
// =============================================================================

/// Cart manager for a client device.
pub struct ClientCartManager {
    /// Anonymous collection.
    local: Arc<LocalCollection>,

    /// Where the owner's remote collection comes from.
    connector: Arc<dyn RemoteConnector>,

    slot: Arc<ActiveSlot>,
    ops: CartOps,

    session: Mutex<Session>,

    /// Source of login generations. A settle only completes the login it
    /// was started for.
    generation: AtomicU64,

    emitter: Arc<dyn CartEventEmitter>,
    settle: SettleStrategy,
}

impl ClientCartManager {
    /// Starts a builder over `connector`.
    pub fn builder(connector: Arc<dyn RemoteConnector>) -> ClientCartManagerBuilder {
        ClientCartManagerBuilder::new().with_connector(connector)
    }

    /// Builds a manager from configuration, opening the local snapshot if
    /// persistence is on.
    pub fn from_config(
        config: &CartConfig,
        connector: Arc<dyn RemoteConnector>,
    ) -> CartResult<Arc<Self>> {
        config.validate()?;
        let local = match config.local_snapshot() {
            Some(snapshot) => LocalCollection::open(snapshot)?,
            None => LocalCollection::in_memory(),
        };

        Self::builder(connector)
            .with_local(local)
            .with_settle(config.settle_strategy())
            .build()
    }

    pub fn state(&self) -> CartState {
        self.lock_session().state()
    }

    pub fn owner_id(&self) -> Option<String> {
        self.state().owner_id().map(str::to_owned)
    }

    pub fn active_kind(&self) -> CollectionKind {
        self.slot.kind()
    }

    pub fn local(&self) -> &Arc<LocalCollection> {
        &self.local
    }

    pub fn settle_strategy(&self) -> SettleStrategy {
        self.settle
    }

    /// The authenticated owner's remote collection.
    pub fn remote_cart(&self) -> CartResult<Arc<dyn CartCollection>> {
        match &*self.lock_session() {
            Session::Authenticated { subscription, .. } => Ok(subscription.collection()),
            _ => Err(CartError::NotAuthenticated),
        }
    }

    // =========================================================================
    // Session Transitions
    // =========================================================================

    /// Handles a login. The switch to remote happens once the session
    /// settles, either on [`on_settled`](Self::on_settled) or after the
    /// configured delay.
    ///
    /// Returns false if `owner_id` is already the authenticated owner.
    /// A delayed settle needs a tokio runtime for its timer; without one the
    /// login is refused and the session is left as it was.
    pub fn on_login(self: &Arc<Self>, owner_id: impl Into<String>) -> CartResult<bool> {
        let owner_id = owner_id.into();

        let state = self.state();
        if matches!(state, CartState::Authenticated { owner_id: ref current } if *current == owner_id)
        {
            debug!(owner_id = %owner_id, "Login for current owner ignored");
            return Ok(false);
        }

        let runtime = match self.settle {
            SettleStrategy::Readiness => None,
            SettleStrategy::Delay(_) => Some(Handle::try_current().map_err(|_| {
                CartError::InvalidConfig("Delayed settle requires a tokio runtime".into())
            })?),
        };

        if state.is_authenticated() {
            self.on_logout();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (cancel, cancel_rx) = match self.settle {
            SettleStrategy::Readiness => (None, None),
            SettleStrategy::Delay(_) => {
                let (cancel_tx, cancel_rx) = oneshot::channel();
                (Some(cancel_tx), Some(cancel_rx))
            }
        };

        // Replacing an older pending login drops its cancel sender, which
        // stops that timer.
        *self.lock_session() = Session::Pending {
            owner_id: owner_id.clone(),
            generation,
            cancel,
        };

        if let (SettleStrategy::Delay(delay), Some(runtime), Some(cancel_rx)) =
            (self.settle, runtime, cancel_rx)
        {
            self.spawn_settle_timer(&runtime, generation, delay, cancel_rx);
        }

        info!(owner_id = %owner_id, generation, settle = ?self.settle, "Login started");
        Ok(true)
    }

    /// Handles the session readiness signal. Returns true if it completed a
    /// pending login.
    pub fn on_settled(&self) -> CartResult<bool> {
        let generation = match *self.lock_session() {
            Session::Pending { generation, .. } => generation,
            _ => {
                debug!("Settle with no pending login ignored");
                return Ok(false);
            }
        };
        self.complete_login(generation)
    }

    /// Handles a logout: back to local immediately, then the remote
    /// subscription is stopped. Cancels a pending login.
    ///
    /// Returns true if the active collection was switched.
    pub fn on_logout(&self) -> bool {
        let previous = std::mem::replace(&mut *self.lock_session(), Session::Anonymous);

        match previous {
            Session::Anonymous => {
                debug!("Logout while anonymous ignored");
                false
            }
            Session::Pending {
                owner_id,
                generation,
                cancel,
            } => {
                if let Some(cancel) = cancel {
                    let _ = cancel.send(());
                }
                info!(owner_id = %owner_id, generation, "Logout cancelled pending login");
                false
            }
            Session::Authenticated {
                owner_id,
                subscription,
            } => {
                let switched = self.slot.switch_to(self.local.clone());
                if switched {
                    self.emitter.emit_active_changed(CollectionKind::Local);
                }
                subscription.stop();
                info!(owner_id = %owner_id, "Logged out, cart is local");
                switched
            }
        }
    }

    /// Dispatches one auth event. Failures are logged and reported to the
    /// emitter.
    pub fn handle_event(self: &Arc<Self>, event: AuthEvent) {
        match event {
            AuthEvent::LoggedIn { owner_id } => {
                if let Err(e) = self.on_login(owner_id) {
                    self.report_failure(&e);
                }
            }
            AuthEvent::Settled => {
                if let Err(e) = self.on_settled() {
                    self.report_failure(&e);
                }
            }
            AuthEvent::LoggedOut => {
                self.on_logout();
            }
        }
    }

    /// Applies auth events until the channel closes or shutdown is signalled.
    pub async fn run_session(
        self: Arc<Self>,
        mut events_rx: mpsc::Receiver<AuthEvent>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        info!("Cart session loop started");

        loop {
            tokio::select! {
                event = events_rx.recv() => match event {
                    Some(event) => {
                        debug!(?event, "Auth event received");
                        self.handle_event(event);
                    }
                    None => {
                        debug!("Auth event channel closed");
                        break;
                    }
                },

                _ = shutdown_rx.recv() => {
                    info!("Cart session loop received shutdown");
                    break;
                }
            }
        }

        info!("Cart session loop stopped");
    }

    /// Spawns [`run_session`](Self::run_session) and returns a handle for
    /// feeding it.
    pub fn spawn_session(self: &Arc<Self>, buffer: usize) -> SessionHandle {
        let (events_tx, events_rx) = mpsc::channel(buffer.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(Arc::clone(self).run_session(events_rx, shutdown_rx));

        SessionHandle {
            events_tx,
            shutdown_tx,
            task,
        }
    }

    // =========================================================================
    // Merge
    // =========================================================================

    /// Copies every local item into `remote` and then removes them from
    /// local. Returns how many were carried over.
    ///
    /// Does not look for matching lines already in `remote`.
    pub fn merge_carts(&self, remote: &dyn CartCollection) -> CartResult<usize> {
        let items = self.local.find(&CartQuery::all())?;
        if items.is_empty() {
            debug!("Local cart empty, nothing to merge");
            return Ok(0);
        }

        for item in &items {
            remote.insert(item.to_new_item())?;
        }

        let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        self.local.remove(&CartQuery::ids(ids))?;

        info!(count = items.len(), "Merged local cart into remote");
        Ok(items.len())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn complete_login(&self, generation: u64) -> CartResult<bool> {
        let (owner_id, merged, switched) = {
            let mut session = self.lock_session();
            let owner_id = match &*session {
                Session::Pending {
                    owner_id,
                    generation: pending,
                    ..
                } if *pending == generation => owner_id.clone(),
                _ => {
                    debug!(generation, "Stale login settle discarded");
                    return Ok(false);
                }
            };

            let subscription = match self.connector.subscribe(&owner_id) {
                Ok(subscription) => subscription,
                Err(e) => {
                    *session = Session::Anonymous;
                    return Err(e.into());
                }
            };

            let remote = subscription.collection();
            let merged = match self.merge_carts(&*remote) {
                Ok(merged) => merged,
                Err(e) => {
                    *session = Session::Anonymous;
                    return Err(e);
                }
            };

            let switched = self.slot.switch_to(remote);
            *session = Session::Authenticated {
                owner_id: owner_id.clone(),
                subscription,
            };
            (owner_id, merged, switched)
        };

        if merged > 0 {
            self.emitter.emit_merged(&owner_id, merged);
        }
        if switched {
            self.emitter.emit_active_changed(CollectionKind::Remote);
        }

        info!(owner_id = %owner_id, merged, "Login settled, cart is remote");
        Ok(true)
    }

    fn spawn_settle_timer(
        self: &Arc<Self>,
        runtime: &Handle,
        generation: u64,
        delay: Duration,
        cancel_rx: oneshot::Receiver<()>,
    ) {
        let this = Arc::clone(self);
        runtime.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    if let Err(e) = this.complete_login(generation) {
                        this.report_failure(&e);
                    }
                }
                _ = cancel_rx => {
                    debug!(generation, "Settle timer cancelled");
                }
            }
        });
    }

    fn report_failure(&self, err: &CartError) {
        error!(error = %err, "Login transition failed, cart stays local");
        self.emitter.emit_error(&err.to_string());
    }

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CartManager for ClientCartManager {
    fn active_slot(&self) -> &Arc<ActiveSlot> {
        &self.slot
    }

    fn ops(&self) -> &CartOps {
        &self.ops
    }
}

impl std::fmt::Debug for ClientCartManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCartManager")
            .field("state", &self.state())
            .field("slot", &self.slot)
            .field("settle", &self.settle)
            .finish()
    }
}

// =============================================================================
// Session Handle (for external control)
// =============================================================================

/// Handle for feeding a running session loop.
pub struct SessionHandle {
    events_tx: mpsc::Sender<AuthEvent>,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Queues an auth event.
    pub async fn send(&self, event: AuthEvent) -> CartResult<()> {
        self.events_tx
            .send(event)
            .await
            .map_err(|_| CartError::SessionClosed)
    }

    /// Stops the loop and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "Cart session loop ended abnormally");
        }
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for creating a [`ClientCartManager`].
#[derive(Default)]
pub struct ClientCartManagerBuilder {
    local: Option<LocalCollection>,
    connector: Option<Arc<dyn RemoteConnector>>,
    ops: Option<CartOps>,
    emitter: Option<Arc<dyn CartEventEmitter>>,
    settle: Option<SettleStrategy>,
}

impl ClientCartManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the remote connector.
    pub fn with_connector(mut self, connector: Arc<dyn RemoteConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Sets the local collection. Defaults to an in-memory one.
    pub fn with_local(mut self, local: LocalCollection) -> Self {
        self.local = Some(local);
        self
    }

    /// Shares an existing set of operations and its pricing registry.
    pub fn with_ops(mut self, ops: CartOps) -> Self {
        self.ops = Some(ops);
        self
    }

    /// Sets the event emitter.
    pub fn with_emitter(mut self, emitter: Arc<dyn CartEventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn with_settle(mut self, settle: SettleStrategy) -> Self {
        self.settle = Some(settle);
        self
    }

    /// Builds the manager. Starts anonymous, on the local collection.
    pub fn build(self) -> CartResult<Arc<ClientCartManager>> {
        let connector = self
            .connector
            .ok_or_else(|| CartError::InvalidConfig("Remote connector required".into()))?;

        let local = Arc::new(self.local.unwrap_or_default());
        let slot = Arc::new(ActiveSlot::new(local.clone()));

        Ok(Arc::new(ClientCartManager {
            local,
            connector,
            slot,
            ops: self.ops.unwrap_or_default(),
            session: Mutex::new(Session::Anonymous),
            generation: AtomicU64::new(0),
            emitter: self.emitter.unwrap_or_else(|| Arc::new(NoOpEmitter)),
            settle: self.settle.unwrap_or(SettleStrategy::Readiness),
        }))
    }
}
