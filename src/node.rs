//! Navigation node model
//!
//! Two representations of the same tree:
//!
//! - [`NavigationNode`] - the owned, nested form. This is what the REST
//!   endpoint returns, what the public tree is written in, and what callers
//!   hand to [`NavigationTree::add`].
//! - [`NavigationTree`] - the arena the engine works on. Nodes are addressed
//!   by [`NodeId`], children are stored as shared immutable id lists so that
//!   the copy-on-write rules in [`crate::mutate`] can be observed directly.
//!
//! A node's parent is never stored. The tree is walked top-down only.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Generation counter shared by all trees in the process.
///
/// Every tree gets its own generation so that an id taken from a replaced
/// tree never resolves to a node of its successor.
static NEXT_GENERATION: AtomicU32 = AtomicU32::new(1);

// =============================================================================
// WIRE FORM
// =============================================================================

/// Nested navigation node as exchanged with the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationNode {
    /// Stable identifier, unique among siblings
    pub code: String,

    /// Display label
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,

    /// Location path segment this node stands for
    #[serde(default, deserialize_with = "null_as_default")]
    pub router_link: String,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children: Vec<NavigationNode>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub selected: bool,

    /// Ephemeral node created at runtime (document preview, login page)
    #[serde(default, deserialize_with = "null_as_default")]
    pub transient: bool,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl NavigationNode {
    /// Create a node without children
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        router_link: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            icon: None,
            tooltip: None,
            router_link: router_link.into(),
            children: Vec::new(),
            selected: false,
            transient: false,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn with_children(mut self, children: Vec<NavigationNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_child(mut self, child: NavigationNode) -> Self {
        self.children.push(child);
        self
    }

    /// Mark the node as transient
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// Number of nodes in this subtree, including self
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(|c| c.subtree_len()).sum::<usize>()
    }
}

// =============================================================================
// ARENA FORM
// =============================================================================

/// Address of a node inside one specific [`NavigationTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    generation: u32,
    slot: u32,
}

impl NodeId {
    /// Generation of the tree that issued this id
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.generation, self.slot)
    }
}

/// A node stored in the arena
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub code: String,
    pub name: String,
    pub icon: Option<String>,
    pub tooltip: Option<String>,
    pub router_link: String,
    pub transient: bool,
    pub(crate) children: Arc<[NodeId]>,
    pub(crate) selected: bool,
    pub(crate) revision: u64,
}

impl TreeNode {
    /// Child ids in declaration order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Revision of the last structural change at or below this node
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Arena holding one navigation tree.
///
/// Slots of removed subtrees are vacated and never reused, so a stale id
/// simply stops resolving.
#[derive(Debug, Clone)]
pub struct NavigationTree {
    generation: u32,
    slots: Vec<Option<TreeNode>>,
    root: NodeId,
    revision: u64,
}

impl NavigationTree {
    /// Build an arena from a nested tree.
    ///
    /// Incoming `selected` flags are dropped: selection belongs to the
    /// selection controller alone.
    pub fn from_root(root: NavigationNode) -> Self {
        let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
        let mut tree = Self {
            generation,
            slots: Vec::with_capacity(root.subtree_len()),
            root: NodeId {
                generation,
                slot: 0,
            },
            revision: 0,
        };
        tree.root = tree.insert_subtree(root);
        tree
    }

    /// Allocate slots for a nested subtree and return the id of its root.
    pub(crate) fn insert_subtree(&mut self, node: NavigationNode) -> NodeId {
        let id = NodeId {
            generation: self.generation,
            slot: self.slots.len() as u32,
        };
        self.slots.push(None);

        let NavigationNode {
            code,
            name,
            icon,
            tooltip,
            router_link,
            children,
            transient,
            ..
        } = node;

        let children: Vec<NodeId> = children
            .into_iter()
            .map(|child| self.insert_subtree(child))
            .collect();

        self.slots[id.slot as usize] = Some(TreeNode {
            code,
            name,
            icon,
            tooltip,
            router_link,
            transient,
            children: children.into(),
            selected: false,
            revision: self.revision,
        });
        id
    }

    /// Free the slots of a subtree. The caller unlinks it from its parent.
    pub(crate) fn vacate_subtree(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.take(current) {
                pending.extend(node.children.iter().copied());
            }
        }
    }

    fn take(&mut self, id: NodeId) -> Option<TreeNode> {
        if id.generation != self.generation {
            return None;
        }
        self.slots.get_mut(id.slot as usize)?.take()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        if id.generation != self.generation {
            return None;
        }
        self.slots.get(id.slot as usize)?.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        if id.generation != self.generation {
            return None;
        }
        self.slots.get_mut(id.slot as usize)?.as_mut()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Children of a node; empty for unknown ids
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children()).unwrap_or(&[])
    }

    /// Shared handle to a node's current child list.
    ///
    /// Mutations never modify a list in place, so a handle taken before a
    /// mutation keeps showing the old children.
    pub fn child_list(&self, id: NodeId) -> Option<Arc<[NodeId]>> {
        self.get(id).map(|n| Arc::clone(&n.children))
    }

    /// Top-level menu entries (the root's children)
    pub fn menu_items(&self) -> &[NodeId] {
        self.children(self.root)
    }

    /// Tree-wide revision, bumped by every structural change
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    pub(crate) fn set_selected(&mut self, id: NodeId, selected: bool) -> bool {
        match self.get_mut(id) {
            Some(node) => {
                node.selected = selected;
                true
            }
            None => false,
        }
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live nodes in slot order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TreeNode)> {
        let generation = self.generation;
        self.slots.iter().enumerate().filter_map(move |(slot, node)| {
            node.as_ref().map(|n| {
                (
                    NodeId {
                        generation,
                        slot: slot as u32,
                    },
                    n,
                )
            })
        })
    }

    /// Ids of all nodes whose `selected` flag is set
    pub fn selected_nodes(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, n)| n.selected)
            .map(|(id, _)| id)
            .collect()
    }

    /// First node with the given code, depth-first in declaration order
    pub fn find_by_code(&self, code: &str) -> Option<NodeId> {
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            if node.code == code {
                return Some(id);
            }
            pending.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// Number of nodes on the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        self.depth_from(self.root)
    }

    fn depth_from(&self, id: NodeId) -> usize {
        match self.get(id) {
            Some(node) => {
                1 + node
                    .children
                    .iter()
                    .map(|c| self.depth_from(*c))
                    .max()
                    .unwrap_or(0)
            }
            None => 0,
        }
    }

    /// Rebuild the nested form of a subtree
    pub fn snapshot(&self, id: NodeId) -> Option<NavigationNode> {
        let node = self.get(id)?;
        Some(NavigationNode {
            code: node.code.clone(),
            name: node.name.clone(),
            icon: node.icon.clone(),
            tooltip: node.tooltip.clone(),
            router_link: node.router_link.clone(),
            children: node
                .children
                .iter()
                .filter_map(|c| self.snapshot(*c))
                .collect(),
            selected: node.selected,
            transient: node.transient,
        })
    }

    /// Codes of a node's children, in order
    pub fn child_codes(&self, id: NodeId) -> Vec<&str> {
        self.children(id)
            .iter()
            .filter_map(|c| self.get(*c))
            .map(|n| n.code.as_str())
            .collect()
    }
}
