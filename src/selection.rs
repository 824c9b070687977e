//! Selection controller
//!
//! Owns the navigation tree and the single selected node. Every selection
//! change is broadcast as a root-to-node path and, when the browser is not
//! already there, turned into a [`NavigationCommand`].
//!
//! ```text
//!   select(id) ──► find_leaf ──► same as current? ──yes──► no-op
//!                                      │ no
//!                                      ▼
//!                        flip selected flags, previous = current
//!                                      │
//!                    ┌─────────────────┴─────────────────┐
//!                    ▼                                   ▼
//!          SelectionBroadcast (path)        Navigator (if location differs)
//! ```
//!
//! Transient nodes live only while the selection is on or below them: when
//! the selection moves elsewhere they are removed from the tree.
//!
//! Navigation commands are queued, never applied inline, so `select` cannot
//! re-enter itself through a location change.

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::events::{NavigationCommand, Navigator, PathNode, SelectionBroadcast, SelectionChange};
use crate::node::{NavigationNode, NavigationTree, NodeId, TreeNode};
use crate::public_tree::{login_node, public_tree, USER_DETAILS_PATH};
use crate::resolve::{
    find_leaf, location_segments, path_from_root, resolve_location, resolve_node, router_links,
};

/// Context object for one navigation session
pub struct SelectionController {
    tree: NavigationTree,
    current: Option<NodeId>,
    previous: Option<NodeId>,
    selected_path: Option<Vec<NodeId>>,
    /// Last location the browser reported or was sent to
    location: Option<String>,
    broadcast: SelectionBroadcast,
    navigator: Box<dyn Navigator>,
}

impl SelectionController {
    /// `broadcast_capacity` bounds how far a subscriber may lag.
    pub fn new(
        tree: NavigationTree,
        navigator: impl Navigator + 'static,
        broadcast_capacity: usize,
    ) -> Self {
        Self {
            tree,
            current: None,
            previous: None,
            selected_path: None,
            location: None,
            broadcast: SelectionBroadcast::new(broadcast_capacity),
            navigator: Box::new(navigator),
        }
    }

    /// Start with the browser at `location`
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn tree(&self) -> &NavigationTree {
        &self.tree
    }

    /// Hot subscription: only changes published from now on are delivered
    pub fn subscribe(&self) -> broadcast::Receiver<SelectionChange> {
        self.broadcast.subscribe()
    }

    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    pub fn current_node(&self) -> Option<&TreeNode> {
        self.current.and_then(|id| self.tree.get(id))
    }

    pub fn previous(&self) -> Option<NodeId> {
        self.previous
    }

    /// Root-to-selected chain of the last selection
    pub fn selected_path(&self) -> Option<&[NodeId]> {
        self.selected_path.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Record where the browser is now. Does not change the selection.
    pub fn note_location(&mut self, location: impl Into<String>) {
        self.location = Some(location.into());
    }

    // =========================================================================
    // SELECTION
    // =========================================================================

    /// Select `id`, landing on its leaf.
    ///
    /// An id that is not in the current tree clears the selection.
    pub fn select(&mut self, id: NodeId) {
        if !self.tree.contains(id) {
            debug!(%id, "select: node not in tree, clearing selection");
        }
        self.apply(Some(id));
    }

    /// Drop the selection and broadcast an absent path
    pub fn clear_selection(&mut self) {
        self.apply(None);
    }

    /// Single-level undo: selecting twice toggles between two nodes
    pub fn select_previous_node(&mut self) {
        match self.previous {
            Some(previous) => self.select(previous),
            None => debug!("select_previous_node: nothing to go back to"),
        }
    }

    /// Resolve a browser location and select it, or clear if it does not
    /// resolve. An unresolved location always broadcasts an absent path.
    /// Returns whether it resolved.
    pub fn select_by_location(&mut self, location: &str) -> bool {
        let resolved = resolve_location(&self.tree, location);
        self.select_resolved(resolved, location)
    }

    /// Like [`select_by_location`](Self::select_by_location) with the
    /// segments already split
    pub fn select_by_segments<S: AsRef<str>>(&mut self, segments: &[S]) -> bool {
        let resolved = resolve_node(&self.tree, segments);
        let joined: Vec<&str> = segments.iter().map(AsRef::as_ref).collect();
        self.select_resolved(resolved, &joined.join("/"))
    }

    fn select_resolved(&mut self, resolved: Option<NodeId>, location: &str) -> bool {
        match resolved {
            Some(id) => {
                self.select(id);
                true
            }
            None => {
                debug!(location, "location does not resolve, clearing selection");
                if self.current.is_some() {
                    self.clear_selection();
                } else {
                    self.broadcast.publish(SelectionChange::cleared());
                }
                false
            }
        }
    }

    pub fn navigate_to_home(&mut self) {
        self.select(self.tree.root());
    }

    /// Pop the last entry of the selected path and select the new last one.
    ///
    /// The stored path stays popped even when the new target resolves back
    /// to the current leaf.
    pub fn navigate_up(&mut self) {
        let Some(path) = self.selected_path.as_mut() else {
            debug!("navigate_up: nothing selected");
            return;
        };
        path.pop();
        match path.last().copied() {
            Some(parent) => self.select(parent),
            None => debug!("navigate_up: already at the root"),
        }
    }

    /// Select the user profile page of the current tree
    pub fn navigate_to_user_details(&mut self) -> bool {
        self.select_by_segments(&USER_DETAILS_PATH)
    }

    /// Show `node` as a transient child of the selected node and select it.
    ///
    /// Transient siblings from an earlier call are dropped first, and the
    /// node is removed again once the selection moves off it. Returns `None`
    /// when nothing is selected.
    pub fn show_transient(&mut self, mut node: NavigationNode) -> Option<NodeId> {
        let Some(parent) = self.current.filter(|id| self.tree.contains(*id)) else {
            debug!(code = %node.code, "show_transient: nothing selected");
            return None;
        };
        self.tree.prune_transient_children(parent);
        node.transient = true;
        let id = self.tree.add(node, parent)?;
        self.select(id);
        Some(id)
    }

    /// Back to the public tree, root selected
    pub fn reset(&mut self) {
        self.replace_tree(NavigationTree::from_root(public_tree()), |tree| {
            Some(tree.root())
        });
    }

    /// Public tree with a transient login node under the root, selected
    pub fn show_login(&mut self) {
        self.replace_tree(NavigationTree::from_root(public_tree()), |_| None);
        let root = self.tree.root();
        if let Some(login) = self.tree.add(login_node(), root) {
            self.select(login);
        }
    }

    /// Tear down the current tree and install `tree`, then select the node
    /// `locate` picks in it.
    ///
    /// Current and previous selection refer to the old tree and are dropped.
    /// If `locate` finds nothing and something was selected before, an
    /// absent path is broadcast.
    pub fn replace_tree<F>(&mut self, tree: NavigationTree, locate: F)
    where
        F: FnOnce(&NavigationTree) -> Option<NodeId>,
    {
        let had_selection = self.current.take().is_some();
        self.previous = None;
        self.selected_path = None;

        let old = std::mem::replace(&mut self.tree, tree);
        info!(
            old_generation = old.generation(),
            generation = self.tree.generation(),
            nodes = self.tree.len(),
            "navigation tree replaced"
        );

        match locate(&self.tree) {
            Some(id) => self.select(id),
            None if had_selection => {
                self.broadcast.publish(SelectionChange::cleared());
            }
            None => {}
        }
    }

    // =========================================================================
    // MUTATION
    // =========================================================================

    /// Append `node` under `parent`; see [`NavigationTree::add`]
    pub fn add(&mut self, node: NavigationNode, parent: NodeId) -> Option<NodeId> {
        self.tree.add(node, parent)
    }

    /// Remove `id` and its subtree. Clears the selection if it was inside.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if !self.tree.remove(id) {
            return false;
        }
        if self.current.is_some_and(|current| !self.tree.contains(current)) {
            debug!(%id, "selected node removed");
            self.clear_selection();
        }
        true
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn apply(&mut self, requested: Option<NodeId>) {
        let target = requested
            .filter(|id| self.tree.contains(*id))
            .map(|id| find_leaf(&self.tree, id));

        if target == self.current {
            debug!(leaf = ?target, "selection unchanged");
            return;
        }

        // the stored path may have been popped by navigate_up
        let left_path = self
            .current
            .and_then(|current| path_from_root(&self.tree, current));
        if let Some(current) = self.current {
            self.tree.set_selected(current, false);
        }
        self.previous = self.current;
        self.current = target;

        let Some(target) = target else {
            self.selected_path = None;
            self.discard_left_transients(left_path);
            self.broadcast.publish(SelectionChange::cleared());
            return;
        };

        self.tree.set_selected(target, true);
        self.selected_path = path_from_root(&self.tree, target);
        self.discard_left_transients(left_path);

        let change = SelectionChange {
            path: self.selected_path.as_deref().map(|path| self.describe(path)),
        };
        let receivers = self.broadcast.publish(change);
        debug!(leaf = %target, receivers, "selection changed");

        let segments = self
            .selected_path
            .as_deref()
            .map(|path| router_links(&self.tree, path));
        if let Some(segments) = segments {
            self.navigate(NavigationCommand::new(segments));
        }
    }

    /// Remove transient nodes on `left_path` that the new selection is not
    /// under. A previous selection inside them is forgotten.
    fn discard_left_transients(&mut self, left_path: Option<Vec<NodeId>>) {
        let kept = self.selected_path.as_deref().unwrap_or_default();
        let left: Vec<NodeId> = left_path
            .into_iter()
            .flatten()
            .filter(|id| !kept.contains(id))
            .filter(|id| self.tree.get(*id).is_some_and(|node| node.transient))
            .collect();

        for id in left {
            if self.tree.remove(id) {
                debug!(%id, "discarded transient node");
            }
        }
        if self.previous.is_some_and(|previous| !self.tree.contains(previous)) {
            self.previous = None;
        }
    }

    fn describe(&self, path: &[NodeId]) -> Vec<PathNode> {
        path.iter()
            .filter_map(|id| {
                self.tree.get(*id).map(|node| PathNode {
                    id: *id,
                    code: node.code.clone(),
                    name: node.name.clone(),
                    icon: node.icon.clone(),
                    router_link: node.router_link.clone(),
                })
            })
            .collect()
    }

    fn navigate(&mut self, command: NavigationCommand) {
        let location = command.location();
        let already_there = self
            .location
            .as_deref()
            .is_some_and(|known| location_segments(known) == location_segments(&location));
        if already_there {
            debug!(location, "already at location, no navigation");
            return;
        }
        self.location = Some(location);
        self.navigator.navigate(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NavigationOutbox;
    use pretty_assertions::assert_eq;

    fn user_tree() -> NavigationTree {
        NavigationTree::from_root(
            NavigationNode::new("home", "Home", "")
                .with_child(
                    NavigationNode::new("edit", "Administration", "edit")
                        .with_child(NavigationNode::new("edit-domain", "Domains", "edit-domain"))
                        .with_child(NavigationNode::new("edit-group", "Groups", "edit-group")),
                )
                .with_child(
                    NavigationNode::new("user-settings", "Settings", "user-settings")
                        .with_child(NavigationNode::new("user-profile", "Profile", "user-profile")),
                ),
        )
    }

    fn controller(tree: NavigationTree) -> (SelectionController, NavigationOutbox) {
        let (navigator, outbox) = NavigationOutbox::channel();
        (SelectionController::new(tree, navigator, 16), outbox)
    }

    fn id(controller: &SelectionController, code: &str) -> NodeId {
        controller.tree().find_by_code(code).unwrap()
    }

    fn current_code(controller: &SelectionController) -> Option<String> {
        controller.current_node().map(|n| n.code.clone())
    }

    #[test]
    fn test_select_lands_on_leaf() {
        let (mut controller, outbox) = controller(user_tree());
        let edit = id(&controller, "edit");

        controller.select(edit);

        assert_eq!(current_code(&controller).as_deref(), Some("edit-domain"));
        let commands = outbox.drain();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].location(), "/edit/edit-domain");
    }

    #[test]
    fn test_select_twice_is_idempotent() {
        let (mut controller, outbox) = controller(user_tree());
        let mut updates = controller.subscribe();
        let edit = id(&controller, "edit");
        let domain = id(&controller, "edit-domain");

        controller.select(edit);
        controller.select(domain);

        assert!(updates.try_recv().is_ok());
        assert!(updates.try_recv().is_err());
        assert_eq!(outbox.drain().len(), 1);
    }

    #[test]
    fn test_at_most_one_selected() {
        let (mut controller, _outbox) = controller(user_tree());
        for code in ["edit-group", "user-profile", "home", "edit-domain"] {
            let target = id(&controller, code);
            controller.select(target);
            assert_eq!(controller.tree().selected_nodes().len(), 1);
        }
        controller.clear_selection();
        assert!(controller.tree().selected_nodes().is_empty());
    }

    #[test]
    fn test_broadcast_carries_root_to_node_path() {
        let (mut controller, _outbox) = controller(user_tree());
        let mut updates = controller.subscribe();
        let profile = id(&controller, "user-profile");

        controller.select(profile);

        let change = updates.try_recv().unwrap();
        assert_eq!(change.codes(), vec!["home", "user-settings", "user-profile"]);
        assert_eq!(change.selected().unwrap().id, profile);
        assert_eq!(
            controller.selected_path().unwrap(),
            &[controller.tree().root(), id(&controller, "user-settings"), profile][..]
        );
    }

    #[test]
    fn test_select_previous_toggles() {
        let (mut controller, _outbox) = controller(user_tree());
        let group = id(&controller, "edit-group");
        let profile = id(&controller, "user-profile");

        controller.select(group);
        controller.select(profile);

        controller.select_previous_node();
        assert_eq!(controller.current(), Some(group));
        controller.select_previous_node();
        assert_eq!(controller.current(), Some(profile));
        controller.select_previous_node();
        assert_eq!(controller.current(), Some(group));
    }

    #[test]
    fn test_select_previous_without_history_is_noop() {
        let (mut controller, outbox) = controller(user_tree());
        let mut updates = controller.subscribe();

        controller.select_previous_node();

        assert_eq!(controller.current(), None);
        assert!(updates.try_recv().is_err());
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_stale_id_clears_selection() {
        let (mut controller, outbox) = controller(user_tree());
        let mut updates = controller.subscribe();
        let group = id(&controller, "edit-group");
        controller.select(group);
        outbox.drain();
        updates.try_recv().unwrap();

        let foreign = NavigationTree::from_root(public_tree());
        controller.select(foreign.root());

        assert_eq!(controller.current(), None);
        assert!(updates.try_recv().unwrap().is_cleared());
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_unresolved_location_clears() {
        let (mut controller, _outbox) = controller(user_tree());
        assert!(controller.select_by_location("/edit/edit-group"));
        assert!(!controller.select_by_location("/edit/unknown"));
        assert_eq!(controller.current(), None);
        assert_eq!(controller.selected_path(), None);
    }

    #[test]
    fn test_no_command_when_already_at_location() {
        let (mut controller, outbox) = controller(user_tree());
        let mut updates = controller.subscribe();

        controller.note_location("/edit/edit-group/");
        controller.select_by_location("/edit/edit-group");

        // subscribers still learn about the selection
        assert!(updates.try_recv().is_ok());
        assert!(outbox.is_empty());
        assert_eq!(current_code(&controller).as_deref(), Some("edit-group"));
    }

    #[test]
    fn test_category_location_navigates_to_leaf() {
        let (mut controller, outbox) = controller(user_tree());
        controller.note_location("/edit");

        controller.select_by_location("/edit");

        let commands = outbox.drain();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].location(), "/edit/edit-domain");
        assert_eq!(controller.location(), Some("/edit/edit-domain"));
    }

    #[test]
    fn test_navigate_up_pops_path() {
        let (mut controller, _outbox) = controller(user_tree());
        let profile = id(&controller, "user-profile");
        controller.select(profile);

        controller.navigate_up();

        // the parent resolves back down to the same leaf
        assert_eq!(controller.current(), Some(profile));
        assert_eq!(controller.selected_path().unwrap().len(), 2);

        controller.navigate_up();
        assert_eq!(current_code(&controller).as_deref(), Some("edit-domain"));
    }

    #[test]
    fn test_navigate_to_home_and_user_details() {
        let (mut controller, _outbox) = controller(user_tree());

        controller.navigate_to_home();
        assert_eq!(current_code(&controller).as_deref(), Some("edit-domain"));

        assert!(controller.navigate_to_user_details());
        assert_eq!(current_code(&controller).as_deref(), Some("user-profile"));
    }

    #[test]
    fn test_user_details_missing_in_public_tree() {
        let (mut controller, _outbox) = controller(NavigationTree::from_root(public_tree()));
        assert!(!controller.navigate_to_user_details());
        assert_eq!(controller.current(), None);
    }

    #[test]
    fn test_show_transient_replaces_earlier_one() {
        let (mut controller, _outbox) = controller(user_tree());
        let group = id(&controller, "edit-group");
        controller.select(group);

        let first = controller
            .show_transient(NavigationNode::new("doc-1", "Document 1", "doc-1"))
            .unwrap();
        assert_eq!(controller.current(), Some(first));

        controller.select(group);
        let second = controller
            .show_transient(NavigationNode::new("doc-2", "Document 2", "doc-2"))
            .unwrap();

        assert!(!controller.tree().contains(first));
        assert_eq!(controller.tree().child_codes(group), vec!["doc-2"]);
        assert!(controller.tree().get(second).unwrap().transient);
    }

    #[test]
    fn test_show_transient_needs_selection() {
        let (mut controller, _outbox) = controller(user_tree());
        assert_eq!(
            controller.show_transient(NavigationNode::new("doc", "Document", "doc")),
            None
        );
    }

    #[test]
    fn test_remove_selected_clears() {
        let (mut controller, _outbox) = controller(user_tree());
        let mut updates = controller.subscribe();
        let edit = id(&controller, "edit");
        controller.select(edit);
        updates.try_recv().unwrap();

        assert!(controller.remove(edit));

        assert_eq!(controller.current(), None);
        assert!(updates.try_recv().unwrap().is_cleared());
    }

    #[test]
    fn test_reset_selects_public_root_leaf() {
        let (mut controller, outbox) = controller(user_tree());
        let group = id(&controller, "edit-group");
        controller.select(group);

        controller.reset();

        assert_eq!(current_code(&controller).as_deref(), Some("search-resources"));
        assert_eq!(controller.previous(), None);
        assert_eq!(
            outbox.drain().last().unwrap().location(),
            "/public/search-resources"
        );
    }

    #[test]
    fn test_replace_tree_without_match_broadcasts_absent() {
        let (mut controller, _outbox) = controller(user_tree());
        let mut updates = controller.subscribe();
        let group = id(&controller, "edit-group");
        controller.select(group);
        updates.try_recv().unwrap();

        controller.replace_tree(NavigationTree::from_root(public_tree()), |tree| {
            resolve_location(tree, "/edit/edit-group")
        });

        assert!(updates.try_recv().unwrap().is_cleared());
        assert_eq!(controller.current(), None);
        assert!(!controller.tree().contains(group));
    }

    #[test]
    fn test_show_login() {
        let (mut controller, outbox) = controller(user_tree());

        controller.show_login();

        let login = controller.current_node().unwrap();
        assert_eq!(login.code, "login");
        assert!(login.transient);
        assert_eq!(outbox.drain().last().unwrap().location(), "/login");
    }

    #[test]
    fn test_leaving_transient_discards_it() {
        let (mut controller, _outbox) = controller(user_tree());
        let group = id(&controller, "edit-group");
        controller.select(group);
        let doc = controller
            .show_transient(NavigationNode::new("doc", "Document", "doc"))
            .unwrap();

        assert!(controller.select_by_location("/edit/edit-domain"));

        assert!(!controller.tree().contains(doc));
        assert!(controller.tree().child_codes(group).is_empty());
        // the removed preview is not reachable through the undo slot
        assert_eq!(controller.previous(), None);
    }

    #[test]
    fn test_navigate_up_from_transient_discards_it() {
        let (mut controller, _outbox) = controller(user_tree());
        let group = id(&controller, "edit-group");
        controller.select(group);
        let doc = controller
            .show_transient(NavigationNode::new("doc", "Document", "doc"))
            .unwrap();

        controller.navigate_up();

        assert_eq!(controller.current(), Some(group));
        assert!(!controller.tree().contains(doc));
    }

    #[test]
    fn test_transient_kept_while_selected() {
        let (mut controller, _outbox) = controller(user_tree());
        let group = id(&controller, "edit-group");
        controller.select(group);
        let doc = controller
            .show_transient(NavigationNode::new("doc", "Document", "doc"))
            .unwrap();

        controller.select(doc);
        controller.note_location("/edit/edit-group/doc");
        controller.select_by_location("/edit/edit-group/doc");

        assert!(controller.tree().contains(doc));
        assert_eq!(controller.current(), Some(doc));
    }

    #[test]
    fn test_leaving_login_removes_it_from_menu() {
        let (mut controller, _outbox) = controller(user_tree());
        controller.show_login();
        let root = controller.tree().root();
        assert_eq!(controller.tree().child_codes(root), vec!["search-tools", "login"]);

        assert!(controller.select_by_location("/public/search-resources"));

        assert_eq!(controller.tree().child_codes(root), vec!["search-tools"]);
        assert_eq!(controller.tree().find_by_code("login"), None);
    }

    #[test]
    fn test_unresolved_location_broadcasts_without_selection() {
        let (mut controller, outbox) = controller(user_tree());
        let mut updates = controller.subscribe();

        assert!(!controller.select_by_location("/nowhere"));
        assert!(!controller.select_by_location("/still/nowhere"));

        assert!(updates.try_recv().unwrap().is_cleared());
        assert!(updates.try_recv().unwrap().is_cleared());
        assert!(outbox.is_empty());
    }
}
