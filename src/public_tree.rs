//! Navigation tree shown to anonymous visitors

use crate::node::NavigationNode;

/// Code of the node injected by `navigate_to_login`
pub const LOGIN_NODE_CODE: &str = "login";

/// Location of the user profile page, relative to the root
pub const USER_DETAILS_PATH: [&str; 2] = ["user-settings", "user-profile"];

/// Fresh copy of the public navigation tree.
///
/// `Home -> Search -> Resources`. Selecting the root lands on Resources.
pub fn public_tree() -> NavigationNode {
    NavigationNode::new("home", "Home", "")
        .with_icon("home")
        .with_child(
            NavigationNode::new("search-tools", "Search", "public")
                .with_icon("search")
                .with_tooltip("Search tools")
                .with_child(
                    NavigationNode::new("search-resources", "Resources", "search-resources")
                        .with_icon("find_in_page")
                        .with_tooltip("Search registered resources"),
                ),
        )
}

/// Transient node standing in for the login page
pub fn login_node() -> NavigationNode {
    NavigationNode::new(LOGIN_NODE_CODE, "Login", "login")
        .with_icon("login")
        .with_tooltip("")
        .transient()
}
