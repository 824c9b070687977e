//! Navigation engine configuration.
//!
//! Reads config from env vars:
//!   SMP_NAV_API_BASE_URL        base URL of the SMP REST API (default: http://localhost:8080/smp/)
//!   SMP_NAV_TREE_ENDPOINT       tree endpoint template (default: public/rest/user/{user-id}/navigation-tree)
//!   SMP_NAV_HTTP_TIMEOUT_MS     tree request timeout (default: 10000)
//!   SMP_NAV_BROADCAST_CAPACITY  selection broadcast buffer (default: 64)

use url::Url;

use crate::error::{NavError, Result};

/// Placeholder in the endpoint template replaced by the user id
pub const USER_ID_PLACEHOLDER: &str = "{user-id}";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/smp/";
pub const DEFAULT_TREE_ENDPOINT: &str = "public/rest/user/{user-id}/navigation-tree";

/// Configuration for tree retrieval and the selection broadcast.
#[derive(Debug, Clone)]
pub struct NavConfig {
    /// Base URL the endpoint template is resolved against
    pub api_base_url: Url,

    /// Endpoint path template containing [`USER_ID_PLACEHOLDER`]
    pub tree_endpoint: String,

    /// Timeout for a single tree request (milliseconds)
    pub http_timeout_ms: u64,

    /// How many selection changes a subscriber may lag behind.
    ///
    /// - Too small: slow subscribers miss intermediate selections
    /// - Default: 64
    pub broadcast_capacity: usize,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            api_base_url: Url::parse(DEFAULT_API_BASE_URL).expect("default base URL parses"),
            tree_endpoint: DEFAULT_TREE_ENDPOINT.to_string(),
            http_timeout_ms: 10_000,
            broadcast_capacity: 64,
        }
    }
}

impl NavConfig {
    /// Build from `SMP_NAV_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(base) = std::env::var("SMP_NAV_API_BASE_URL") {
            config.api_base_url = Url::parse(&base)?;
        }
        if let Ok(endpoint) = std::env::var("SMP_NAV_TREE_ENDPOINT") {
            config.tree_endpoint = endpoint;
        }
        if let Ok(timeout) = std::env::var("SMP_NAV_HTTP_TIMEOUT_MS") {
            config.http_timeout_ms = timeout.parse().map_err(|_| {
                NavError::Config(format!("SMP_NAV_HTTP_TIMEOUT_MS is not a number: {timeout}"))
            })?;
        }
        if let Ok(capacity) = std::env::var("SMP_NAV_BROADCAST_CAPACITY") {
            config.broadcast_capacity = capacity.parse().map_err(|_| {
                NavError::Config(format!(
                    "SMP_NAV_BROADCAST_CAPACITY is not a number: {capacity}"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the endpoint template and numeric bounds
    pub fn validate(&self) -> Result<()> {
        if !self.tree_endpoint.contains(USER_ID_PLACEHOLDER) {
            return Err(NavError::Config(format!(
                "tree endpoint '{}' has no {} placeholder",
                self.tree_endpoint, USER_ID_PLACEHOLDER
            )));
        }
        if self.broadcast_capacity == 0 {
            return Err(NavError::Config(
                "broadcast capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn api_base_url(mut self, url: Url) -> Self {
        self.api_base_url = url;
        self
    }

    pub fn tree_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.tree_endpoint = endpoint.into();
        self
    }

    pub fn http_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.http_timeout_ms = timeout_ms;
        self
    }

    pub fn broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }
}
