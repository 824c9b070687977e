//! Structural tree mutation
//!
//! Add and remove share one walk, [`NavigationTree::rewrite_children`]. The
//! contract it gives:
//!
//! - the child list of the mutated node is replaced by a new list; handles
//!   obtained earlier through [`NavigationTree::child_list`] keep the old
//!   contents
//! - node ids on the root-to-mutation path stay valid; each of those nodes
//!   gets a fresh revision so renderers can tell which branch changed
//! - child lists and revisions of nodes off that path are untouched
//!
//! Mutating something that is not in the tree is a no-op.

use std::collections::HashSet;

use tracing::debug;

use crate::node::{NavigationNode, NavigationTree, NodeId, TreeNode};

impl NavigationTree {
    /// Replace the child list of the first node matching `predicate`.
    ///
    /// Depth-first from the root in declaration order. Returns the id of the
    /// rewritten node, or `None` if nothing matched.
    pub(crate) fn rewrite_children<P, E>(&mut self, predicate: P, edit: E) -> Option<NodeId>
    where
        P: Fn(NodeId, &TreeNode) -> bool,
        E: FnOnce(&[NodeId]) -> Vec<NodeId>,
    {
        let path = self.path_where(self.root(), &predicate)?;
        let target = *path.last()?;
        let revision = self.next_revision();

        let node = self.get_mut(target)?;
        node.children = edit(&node.children[..]).into();

        for id in &path {
            if let Some(on_path) = self.get_mut(*id) {
                on_path.revision = revision;
            }
        }
        Some(target)
    }

    fn path_where<P>(&self, from: NodeId, predicate: &P) -> Option<Vec<NodeId>>
    where
        P: Fn(NodeId, &TreeNode) -> bool,
    {
        let node = self.get(from)?;
        if predicate(from, node) {
            return Some(vec![from]);
        }
        node.children.iter().find_map(|child| {
            self.path_where(*child, predicate).map(|mut tail| {
                tail.insert(0, from);
                tail
            })
        })
    }

    /// Append `node` (with its subtree) as the last child of `parent`.
    ///
    /// Returns the id of the inserted node, or `None` if `parent` is not
    /// reachable from the root.
    pub fn add(&mut self, node: NavigationNode, parent: NodeId) -> Option<NodeId> {
        if self.path_where(self.root(), &|id, _| id == parent).is_none() {
            debug!(%parent, code = %node.code, "add: parent not in tree, ignoring");
            return None;
        }

        let code = node.code.clone();
        let inserted = self.insert_subtree(node);
        self.rewrite_children(
            |id, _| id == parent,
            |children| {
                let mut next = Vec::with_capacity(children.len() + 1);
                next.extend_from_slice(children);
                next.push(inserted);
                next
            },
        )?;

        debug!(%parent, %inserted, code = %code, "added navigation node");
        Some(inserted)
    }

    /// Detach `node` and its subtree from the tree.
    ///
    /// Returns `false` (and changes nothing) if no node in the tree has
    /// `node` as a child, which includes the root itself.
    pub fn remove(&mut self, node: NodeId) -> bool {
        let parent = self.rewrite_children(
            |_, candidate| candidate.children.contains(&node),
            |children| children.iter().copied().filter(|c| *c != node).collect(),
        );

        match parent {
            Some(parent) => {
                self.vacate_subtree(node);
                debug!(%parent, %node, "removed navigation node");
                true
            }
            None => {
                debug!(%node, "remove: node not in tree, ignoring");
                false
            }
        }
    }

    /// Remove every transient child of `parent`. Returns how many went.
    pub fn prune_transient_children(&mut self, parent: NodeId) -> usize {
        let transient: HashSet<NodeId> = self
            .children(parent)
            .iter()
            .copied()
            .filter(|c| self.get(*c).map(|n| n.transient).unwrap_or(false))
            .collect();
        if transient.is_empty() {
            return 0;
        }

        self.rewrite_children(
            |id, _| id == parent,
            |children| {
                children
                    .iter()
                    .copied()
                    .filter(|c| !transient.contains(c))
                    .collect()
            },
        );
        for id in &transient {
            self.vacate_subtree(*id);
        }
        debug!(%parent, count = transient.len(), "pruned transient children");
        transient.len()
    }
}
