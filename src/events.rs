//! Event channels around the engine
//!
//! ```text
//!   EventPublisher ──(mpsc)──► EventSubscription ──► SyncEngine
//!   SelectionController ──(broadcast)──► SelectionChange subscribers
//!   SelectionController ──(crossbeam)──► NavigationOutbox ──► browser
//! ```
//!
//! The selection channel is hot: a subscriber only sees changes published
//! after it subscribed. There is no replay of the last value.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::node::NodeId;
use crate::resolve::PATH_SEPARATOR;

// =============================================================================
// INBOUND EVENTS
// =============================================================================

/// Authentication outcome published by the security layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEvent {
    LoginSuccess,
    LogoutSuccess,
    LogoutError,
}

/// Everything the sync engine reacts to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    Auth { event: AuthEvent },

    /// A browser navigation completed at `location`
    LocationChanged { location: String },

    /// Stop the engine loop
    Shutdown,
}

/// Producer side of the engine's event queue
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: mpsc::UnboundedSender<EngineEvent>,
}

/// Consumer side, owned by exactly one engine
#[derive(Debug)]
pub struct EventSubscription {
    receiver: mpsc::UnboundedReceiver<EngineEvent>,
}

/// Factory for a publisher/subscription pair
pub struct EventBus;

impl EventBus {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (EventPublisher, EventSubscription) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (EventPublisher { sender }, EventSubscription { receiver })
    }
}

impl EventPublisher {
    /// Queue an event. Returns `false` once the engine has been torn down.
    pub fn publish(&self, event: EngineEvent) -> bool {
        match self.sender.send(event) {
            Ok(()) => true,
            Err(err) => {
                debug!(event = ?err.0, "engine gone, event dropped");
                false
            }
        }
    }

    pub fn login_success(&self) -> bool {
        self.publish(EngineEvent::Auth {
            event: AuthEvent::LoginSuccess,
        })
    }

    pub fn logout_success(&self) -> bool {
        self.publish(EngineEvent::Auth {
            event: AuthEvent::LogoutSuccess,
        })
    }

    pub fn logout_error(&self) -> bool {
        self.publish(EngineEvent::Auth {
            event: AuthEvent::LogoutError,
        })
    }

    pub fn location_changed(&self, location: impl Into<String>) -> bool {
        self.publish(EngineEvent::LocationChanged {
            location: location.into(),
        })
    }

    pub fn shutdown(&self) -> bool {
        self.publish(EngineEvent::Shutdown)
    }
}

impl EventSubscription {
    /// Wait for the next event; `None` when every publisher is gone.
    pub async fn recv(&mut self) -> Option<EngineEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<EngineEvent> {
        self.receiver.try_recv().ok()
    }
}

// =============================================================================
// SELECTION BROADCAST
// =============================================================================

/// One entry of the selected path, as seen by breadcrumbs and menus
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathNode {
    pub id: NodeId,
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub router_link: String,
}

/// Payload of the selection broadcast.
///
/// `path` is the root-to-selected chain, or `None` when nothing is selected
/// (unresolved location, selected node not reachable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionChange {
    pub path: Option<Vec<PathNode>>,
}

impl SelectionChange {
    pub fn cleared() -> Self {
        Self { path: None }
    }

    pub fn is_cleared(&self) -> bool {
        self.path.is_none()
    }

    /// Codes along the path, empty when cleared
    pub fn codes(&self) -> Vec<&str> {
        self.path
            .iter()
            .flatten()
            .map(|n| n.code.as_str())
            .collect()
    }

    /// The selected node itself
    pub fn selected(&self) -> Option<&PathNode> {
        self.path.as_ref().and_then(|p| p.last())
    }
}

/// Hot multicast channel for selection changes
#[derive(Debug, Clone)]
pub struct SelectionBroadcast {
    sender: broadcast::Sender<SelectionChange>,
}

impl SelectionBroadcast {
    /// `capacity` bounds how far a slow subscriber may lag before it starts
    /// missing changes.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SelectionChange> {
        self.sender.subscribe()
    }

    /// Deliver to current subscribers. Returns how many received it.
    pub fn publish(&self, change: SelectionChange) -> usize {
        // no subscribers is not an error for a hot channel
        self.sender.send(change).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

// =============================================================================
// OUTBOUND NAVIGATION
// =============================================================================

/// Command to move the browser to the location built from `segments`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationCommand {
    pub segments: Vec<String>,
}

impl NavigationCommand {
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Absolute location, empty segments dropped: `["", "public"]` -> `/public`
    pub fn location(&self) -> String {
        let path: Vec<&str> = self
            .segments
            .iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();
        format!("{}{}", PATH_SEPARATOR, path.join("/"))
    }
}

/// Seam to whatever drives the browser location
pub trait Navigator: Send + Sync {
    fn navigate(&self, command: NavigationCommand);
}

/// Navigator that queues commands for the host to apply
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    sender: Sender<NavigationCommand>,
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, command: NavigationCommand) {
        if let Err(err) = self.sender.send(command) {
            debug!(location = %err.0.location(), "navigation outbox closed, command dropped");
        }
    }
}

/// Receiving end of a [`ChannelNavigator`]
#[derive(Debug, Clone)]
pub struct NavigationOutbox {
    receiver: Receiver<NavigationCommand>,
}

impl NavigationOutbox {
    pub fn channel() -> (ChannelNavigator, NavigationOutbox) {
        let (sender, receiver) = unbounded();
        (ChannelNavigator { sender }, NavigationOutbox { receiver })
    }

    pub fn try_recv(&self) -> Option<NavigationCommand> {
        self.receiver.try_recv().ok()
    }

    /// Take every queued command without blocking
    pub fn drain(&self) -> Vec<NavigationCommand> {
        self.receiver.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
