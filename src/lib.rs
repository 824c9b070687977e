//! SMP navigation engine
//!
//! Keeps the side-menu navigation tree of the SMP console in memory, keeps
//! exactly one node selected, and keeps that selection in step with the
//! browser location.
//!
//! ## Architecture
//!
//! ```text
//!   AuthEvents / LocationEvents            NavigationTreeProvider
//!              │                                     │
//!              ▼                                     ▼
//!        ┌────────────┐   replace_tree / select  ┌──────────┐
//!        │ SyncEngine │ ───────────────────────► │ Selection│──► SelectionBroadcast
//!        └────────────┘                          │Controller│──► NavigationCommand
//!                                                └────┬─────┘
//!                                                     │ resolve / find_leaf / add / remove
//!                                                     ▼
//!                                              NavigationTree (arena)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smp_nav::{public_tree, NavigationOutbox, NavigationTree, SelectionController};
//!
//! let (navigator, outbox) = NavigationOutbox::channel();
//! let mut controller =
//!     SelectionController::new(NavigationTree::from_root(public_tree()), navigator, 16);
//! let mut updates = controller.subscribe();
//!
//! controller.navigate_to_home();
//! assert!(updates.try_recv().is_ok());
//! assert_eq!(outbox.drain().len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod mutate;
pub mod node;
pub mod provider;
pub mod public_tree;
pub mod resolve;
pub mod selection;
pub mod sync;

pub use config::NavConfig;
pub use error::{NavError, Result};
pub use events::{
    AuthEvent, ChannelNavigator, EngineEvent, EventBus, EventPublisher, EventSubscription,
    NavigationCommand, NavigationOutbox, Navigator, PathNode, SelectionChange,
};
pub use node::{NavigationNode, NavigationTree, NodeId, TreeNode};
pub use provider::{
    AuthStateProvider, HttpTreeProvider, NavigationTreeProvider, SessionAuthState,
    StaticTreeProvider,
};
pub use public_tree::public_tree;
pub use selection::SelectionController;
pub use sync::{SyncEngine, SyncState};
