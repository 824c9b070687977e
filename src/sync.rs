//! Sync engine: keeps the tree and selection in step with auth and location
//!
//! ```text
//!                  loginSuccess / start (authenticated)
//!   UNAUTHENTICATED ─────────────────────────────────► REFRESHING
//!         ▲                                               │ fetch ok
//!         │ logoutSuccess / logoutError                   ▼
//!         └────────────────────────────────────────── AUTHENTICATED
//! ```
//!
//! Fetches run as spawned tasks and report back through an internal channel.
//! Overlapping refreshes are not cancelled: responses are applied in arrival
//! order, so the last response to arrive wins. A response that arrives after
//! a newer request was issued is logged as stale. Responses to requests made
//! before the last reset to the public tree are discarded.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{NavError, Result};
use crate::events::{AuthEvent, EngineEvent, EventSubscription};
use crate::node::{NavigationNode, NavigationTree};
use crate::provider::{AuthStateProvider, NavigationTreeProvider};
use crate::resolve::resolve_location;
use crate::selection::SelectionController;

/// Where the engine is in the auth cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Public tree installed
    Unauthenticated,
    /// A user tree is installed
    Authenticated,
    /// At least one tree fetch is in flight
    Refreshing,
}

/// Result of one spawned fetch
#[derive(Debug)]
struct FetchOutcome {
    seq: u64,
    user_id: String,
    result: Result<NavigationNode>,
}

pub struct SyncEngine {
    controller: SelectionController,
    trees: Arc<dyn NavigationTreeProvider>,
    auth: Arc<dyn AuthStateProvider>,
    events: EventSubscription,
    fetch_tx: mpsc::UnboundedSender<FetchOutcome>,
    fetch_rx: mpsc::UnboundedReceiver<FetchOutcome>,
    /// Sequence number of the newest fetch request
    requested: u64,
    /// Requests at or below this number predate the last reset
    reset_at: u64,
    in_flight: usize,
    settled: SyncState,
}

impl SyncEngine {
    pub fn new(
        controller: SelectionController,
        trees: Arc<dyn NavigationTreeProvider>,
        auth: Arc<dyn AuthStateProvider>,
        events: EventSubscription,
    ) -> Self {
        let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();
        Self {
            controller,
            trees,
            auth,
            events,
            fetch_tx,
            fetch_rx,
            requested: 0,
            reset_at: 0,
            in_flight: 0,
            settled: SyncState::Unauthenticated,
        }
    }

    pub fn state(&self) -> SyncState {
        if self.in_flight > 0 {
            SyncState::Refreshing
        } else {
            self.settled
        }
    }

    pub fn controller(&self) -> &SelectionController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut SelectionController {
        &mut self.controller
    }

    /// Number of fetches whose response has not been applied yet
    pub fn pending_fetches(&self) -> usize {
        self.in_flight
    }

    /// App start: refresh if the session is authenticated, else reset
    pub async fn start(&mut self) {
        if self.auth.is_authenticated().await {
            info!("session authenticated at start");
            self.refresh();
        } else {
            info!("no session at start, showing public tree");
            self.reset_to_public();
        }
    }

    /// React to one event. Returns `false` when the engine should stop.
    pub fn handle(&mut self, event: EngineEvent) -> bool {
        match event {
            EngineEvent::Auth {
                event: AuthEvent::LoginSuccess,
            } => self.refresh(),
            EngineEvent::Auth {
                event: AuthEvent::LogoutSuccess | AuthEvent::LogoutError,
            } => self.reset_to_public(),
            EngineEvent::LocationChanged { location } => {
                debug!(%location, "location changed");
                self.controller.note_location(location.as_str());
                self.controller.select_by_location(&location);
            }
            EngineEvent::Shutdown => {
                info!("shutdown requested");
                return false;
            }
        }
        true
    }

    /// Consume events until shutdown or until every publisher is gone,
    /// applying fetch responses as they arrive.
    pub async fn run(&mut self) {
        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => {
                        if !self.handle(event) {
                            break;
                        }
                    }
                    None => {
                        info!("event publishers gone, stopping");
                        break;
                    }
                },
                Some(outcome) = self.fetch_rx.recv() => self.apply_fetch(outcome),
            }
        }
    }

    /// Wait for the next fetch response and apply it. Returns `false` if
    /// nothing is in flight.
    pub async fn apply_next_fetch(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.fetch_rx.recv().await {
            Some(outcome) => {
                self.apply_fetch(outcome);
                true
            }
            None => false,
        }
    }

    /// Wait until every in-flight fetch has been applied
    pub async fn settle(&mut self) {
        while self.apply_next_fetch().await {}
    }

    /// Forget the session and show the public tree with a login node
    pub fn navigate_to_login(&mut self) {
        self.auth.clear_local_session();
        self.reset_at = self.requested;
        self.settled = SyncState::Unauthenticated;
        self.controller.show_login();
        info!("navigated to login");
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    fn refresh(&mut self) {
        let Some(user_id) = self.auth.current_user() else {
            warn!(error = %NavError::NotAuthenticated, "refresh without a user, resetting");
            self.reset_to_public();
            return;
        };

        self.requested += 1;
        self.in_flight += 1;
        let seq = self.requested;
        info!(seq, user_id = %user_id, "requesting navigation tree");

        let trees = Arc::clone(&self.trees);
        let results = self.fetch_tx.clone();
        tokio::spawn(async move {
            let result = trees.fetch_tree(&user_id).await;
            if results
                .send(FetchOutcome {
                    seq,
                    user_id,
                    result,
                })
                .is_err()
            {
                debug!(seq, "engine gone, tree response dropped");
            }
        });
    }

    fn reset_to_public(&mut self) {
        self.reset_at = self.requested;
        self.settled = SyncState::Unauthenticated;
        self.controller.reset();
        info!("reset to public tree");
    }

    fn apply_fetch(&mut self, outcome: FetchOutcome) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let FetchOutcome {
            seq,
            user_id,
            result,
        } = outcome;

        if seq <= self.reset_at {
            warn!(seq, user_id = %user_id, "tree response predates reset, discarded");
            return;
        }
        if seq < self.requested {
            warn!(
                seq,
                newest = self.requested,
                user_id = %user_id,
                "stale tree response applied"
            );
        }

        match result {
            Ok(root) => {
                let location = self.controller.location().map(str::to_owned);
                self.controller
                    .replace_tree(NavigationTree::from_root(root), |tree| {
                        location.as_deref().and_then(|l| resolve_location(tree, l))
                    });
                self.settled = SyncState::Authenticated;
                info!(seq, user_id = %user_id, "user navigation tree installed");
            }
            Err(err) => {
                warn!(
                    seq,
                    user_id = %user_id,
                    error = %err,
                    transient = err.is_transient(),
                    "tree fetch failed, keeping current tree"
                );
            }
        }
    }
}
