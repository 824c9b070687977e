//! External collaborators: navigation tree source and authentication state
//!
//! The engine only sees the two traits. `HttpTreeProvider` talks to the SMP
//! REST API; `StaticTreeProvider` and `SessionAuthState` are in-memory
//! implementations used by the replay tool and tests.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::config::{NavConfig, USER_ID_PLACEHOLDER};
use crate::error::{NavError, Result};
use crate::node::NavigationNode;

/// Source of user-specific navigation trees
#[async_trait]
pub trait NavigationTreeProvider: Send + Sync {
    async fn fetch_tree(&self, user_id: &str) -> Result<NavigationNode>;
}

/// Read access to the security layer's session state
#[async_trait]
pub trait AuthStateProvider: Send + Sync {
    /// Whether the current session is authenticated
    async fn is_authenticated(&self) -> bool;

    /// Identifier of the logged-in user, if any
    fn current_user(&self) -> Option<String>;

    /// Forget locally cached session data
    fn clear_local_session(&self);
}

// =============================================================================
// HTTP
// =============================================================================

/// Fetches `{api_base_url}/{tree_endpoint}` with the user id substituted
pub struct HttpTreeProvider {
    client: reqwest::Client,
    base_url: Url,
    endpoint: String,
}

impl HttpTreeProvider {
    pub fn new(config: &NavConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            endpoint: config.tree_endpoint.clone(),
        })
    }

    /// Tree URL for a user. The user id is percent-encoded as one segment.
    pub fn tree_url(&self, user_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                NavError::Config(format!("{} cannot be used as a base URL", self.base_url))
            })?;
            segments.pop_if_empty();
            for segment in self.endpoint.split('/').filter(|s| !s.is_empty()) {
                if segment == USER_ID_PLACEHOLDER {
                    segments.push(user_id);
                } else {
                    segments.push(segment);
                }
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl NavigationTreeProvider for HttpTreeProvider {
    async fn fetch_tree(&self, user_id: &str) -> Result<NavigationNode> {
        let url = self.tree_url(user_id)?;
        debug!(%url, "fetching navigation tree");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NavError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// Serves the same tree to every user
#[derive(Debug, Clone)]
pub struct StaticTreeProvider {
    tree: NavigationNode,
}

impl StaticTreeProvider {
    pub fn new(tree: NavigationNode) -> Self {
        Self { tree }
    }
}

#[async_trait]
impl NavigationTreeProvider for StaticTreeProvider {
    async fn fetch_tree(&self, _user_id: &str) -> Result<NavigationNode> {
        Ok(self.tree.clone())
    }
}

/// Session state held in memory
#[derive(Debug, Default)]
pub struct SessionAuthState {
    user: RwLock<Option<String>>,
}

impl SessionAuthState {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn logged_in(user_id: impl Into<String>) -> Self {
        Self {
            user: RwLock::new(Some(user_id.into())),
        }
    }

    pub fn login(&self, user_id: impl Into<String>) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = Some(user_id.into());
    }

    pub fn logout(&self) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[async_trait]
impl AuthStateProvider for SessionAuthState {
    async fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    fn current_user(&self) -> Option<String> {
        self.user.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn clear_local_session(&self) {
        self.logout();
    }
}
