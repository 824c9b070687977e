//! Error types for the navigation engine
//!
//! Only the collaborators at the edge (tree fetch, configuration) can fail.
//! Tree lookups, selection and mutation never return errors: they degrade to
//! "nothing selected" or a no-op instead.

use thiserror::Error;

/// Main error type for navigation tree retrieval and configuration
#[derive(Error, Debug)]
pub enum NavError {
    #[error("HTTP error while fetching navigation tree: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Navigation tree request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("Navigation tree decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No authenticated user to fetch a navigation tree for")]
    NotAuthenticated,
}

impl NavError {
    /// True when retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            NavError::Http(_) => true,
            NavError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, NavError>;
