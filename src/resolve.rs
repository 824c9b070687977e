//! Location and leaf resolution
//!
//! - [`resolve_node`] maps location path segments to a node, all-or-nothing.
//! - [`path_to`] is the inverse: the root-to-node chain for a node.
//! - [`find_leaf`] descends from a category into the node that actually gets
//!   selected.

use tracing::trace;

use crate::node::{NavigationTree, NodeId};

/// Path separator of browser locations
pub const PATH_SEPARATOR: char = '/';

/// Split a browser location into its non-empty path segments.
///
/// Query string and fragment are not part of the path.
pub fn location_segments(location: &str) -> Vec<&str> {
    let path = location
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    path.split(PATH_SEPARATOR).filter(|s| !s.is_empty()).collect()
}

/// Resolve location segments against a tree, starting at its root.
///
/// Each non-empty segment must equal the `router_link` of a child of the
/// node reached so far; the first matching child wins. If any segment fails
/// the whole resolution fails: a partial match is not a valid selection.
pub fn resolve_node<S: AsRef<str>>(tree: &NavigationTree, segments: &[S]) -> Option<NodeId> {
    let mut current = tree.root();
    for segment in segments.iter().map(AsRef::as_ref) {
        if segment.is_empty() {
            continue;
        }
        let next = tree.children(current).iter().copied().find(|child| {
            tree.get(*child)
                .map(|n| n.router_link == segment)
                .unwrap_or(false)
        });
        match next {
            Some(child) => current = child,
            None => {
                trace!(segment, "location segment does not resolve");
                return None;
            }
        }
    }
    Some(current)
}

/// Resolve a raw browser location, e.g. `/public/search-resources`
pub fn resolve_location(tree: &NavigationTree, location: &str) -> Option<NodeId> {
    resolve_node(tree, &location_segments(location))
}

/// Root-to-node chain from `from` down to `target`, both included.
///
/// Depth-first in declaration order; `None` if `target` is not reachable.
pub fn path_to(tree: &NavigationTree, target: NodeId, from: NodeId) -> Option<Vec<NodeId>> {
    if from == target {
        return tree.contains(from).then(|| vec![from]);
    }
    let children = tree.children(from);
    if children.contains(&target) {
        return Some(vec![from, target]);
    }
    children.iter().find_map(|child| {
        path_to(tree, target, *child).map(|mut tail| {
            tail.insert(0, from);
            tail
        })
    })
}

/// [`path_to`] starting from the tree root
pub fn path_from_root(tree: &NavigationTree, target: NodeId) -> Option<Vec<NodeId>> {
    path_to(tree, target, tree.root())
}

/// `router_link` values along a path, used as the navigation command
pub fn router_links(tree: &NavigationTree, path: &[NodeId]) -> Vec<String> {
    path.iter()
        .filter_map(|id| tree.get(*id))
        .map(|n| n.router_link.clone())
        .collect()
}

/// True when a node is a stopping point for [`find_leaf`]: it has no
/// children, or only transient ones.
pub fn has_no_target_children(tree: &NavigationTree, id: NodeId) -> bool {
    let children = tree.children(id);
    children.is_empty()
        || children
            .iter()
            .filter_map(|c| tree.get(*c))
            .all(|child| child.transient)
}

/// Node that becomes selected when `id` is chosen.
///
/// While the node has a non-transient child, descend into its *first* child.
/// The descent step does not skip transient children: if the first child is
/// transient and a later sibling is not, the transient one is taken.
pub fn find_leaf(tree: &NavigationTree, id: NodeId) -> NodeId {
    let mut current = id;
    while !has_no_target_children(tree, current) {
        current = tree.children(current)[0];
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NavigationNode;
    use crate::public_tree::public_tree;
    use pretty_assertions::assert_eq;

    fn codes(tree: &NavigationTree, path: &[NodeId]) -> Vec<String> {
        path.iter()
            .map(|id| tree.get(*id).unwrap().code.clone())
            .collect()
    }

    #[test]
    fn test_location_segments_skip_empty() {
        assert_eq!(
            location_segments("/public/search-resources"),
            vec!["public", "search-resources"]
        );
        assert_eq!(location_segments("//a//b/"), vec!["a", "b"]);
        assert!(location_segments("/").is_empty());
        assert!(location_segments("").is_empty());
    }

    #[test]
    fn test_location_segments_strip_query_and_fragment() {
        assert_eq!(location_segments("/login?returnUrl=%2Fedit"), vec!["login"]);
        assert_eq!(location_segments("/public#top"), vec!["public"]);
    }

    #[test]
    fn test_resolve_full_path() {
        let tree = NavigationTree::from_root(public_tree());
        let resources = resolve_location(&tree, "/public/search-resources").unwrap();
        assert_eq!(tree.get(resources).unwrap().code, "search-resources");
    }

    #[test]
    fn test_resolve_empty_location_is_root() {
        let tree = NavigationTree::from_root(public_tree());
        assert_eq!(resolve_location(&tree, "/"), Some(tree.root()));
    }

    #[test]
    fn test_resolve_is_all_or_nothing() {
        let tree = NavigationTree::from_root(public_tree());
        // "public" resolves, "unknown" does not: no partial result
        assert_eq!(resolve_location(&tree, "/public/unknown"), None);
        assert_eq!(resolve_location(&tree, "/search-resources"), None);
    }

    #[test]
    fn test_resolve_first_match_wins() {
        let root = NavigationNode::new("home", "Home", "")
            .with_child(NavigationNode::new("first", "First", "dup"))
            .with_child(NavigationNode::new("second", "Second", "dup"));
        let tree = NavigationTree::from_root(root);

        let found = resolve_node(&tree, &["dup"]).unwrap();
        assert_eq!(tree.get(found).unwrap().code, "first");
    }

    #[test]
    fn test_resolve_no_partial_matching() {
        let tree = NavigationTree::from_root(public_tree());
        assert_eq!(resolve_node(&tree, &["pub"]), None);
        assert_eq!(resolve_node(&tree, &["PUBLIC"]), None);
    }

    #[test]
    fn test_path_to_root_itself() {
        let tree = NavigationTree::from_root(public_tree());
        assert_eq!(path_from_root(&tree, tree.root()), Some(vec![tree.root()]));
    }

    #[test]
    fn test_path_to_nested_node() {
        let tree = NavigationTree::from_root(public_tree());
        let resources = tree.find_by_code("search-resources").unwrap();
        let path = path_from_root(&tree, resources).unwrap();
        assert_eq!(
            codes(&tree, &path),
            vec!["home", "search-tools", "search-resources"]
        );
        assert_eq!(router_links(&tree, &path), vec!["", "public", "search-resources"]);
    }

    #[test]
    fn test_path_to_unreachable_node() {
        let tree = NavigationTree::from_root(public_tree());
        let other = NavigationTree::from_root(public_tree());
        assert_eq!(path_from_root(&tree, other.root()), None);
    }

    #[test]
    fn test_find_leaf_descends_first_children() {
        let tree = NavigationTree::from_root(public_tree());
        let leaf = find_leaf(&tree, tree.root());
        assert_eq!(tree.get(leaf).unwrap().code, "search-resources");
    }

    #[test]
    fn test_find_leaf_takes_transient_first_child() {
        let root = NavigationNode::new("root", "Root", "").with_child(
            NavigationNode::new("a", "A", "a")
                .with_child(NavigationNode::new("t", "T", "t").transient())
                .with_child(NavigationNode::new("b", "B", "b")),
        );
        let tree = NavigationTree::from_root(root);
        let a = tree.find_by_code("a").unwrap();

        // stop condition filters transients, the descent step does not
        let leaf = find_leaf(&tree, a);
        assert_eq!(tree.get(leaf).unwrap().code, "t");
    }

    #[test]
    fn test_find_leaf_stops_above_only_transient_children() {
        let root = NavigationNode::new("root", "Root", "").with_child(
            NavigationNode::new("resource", "Resource", "resource")
                .with_child(NavigationNode::new("doc", "Document", "doc").transient()),
        );
        let tree = NavigationTree::from_root(root);
        let resource = tree.find_by_code("resource").unwrap();

        assert!(has_no_target_children(&tree, resource));
        assert_eq!(find_leaf(&tree, resource), resource);
    }
}
