//! Shared application state.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::FromRef;
use visim_search::{QueryService, DEFAULT_NEIGHBORS, DEFAULT_TOP};

/// Query behavior settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Image searched by `GET /` when the caller supplies none.
    pub default_image: PathBuf,
    /// Nearest neighbors requested per vector query.
    pub neighbors: u32,
    /// Result-set bound forwarded to the service.
    pub top: u32,
}

impl QueryOptions {
    /// Creates options with the given default image and standard bounds.
    pub fn new(default_image: impl Into<PathBuf>) -> Self {
        Self {
            default_image: default_image.into(),
            neighbors: DEFAULT_NEIGHBORS,
            top: DEFAULT_TOP,
        }
    }

    /// Sets the nearest-neighbor count.
    pub fn with_neighbors(mut self, neighbors: u32) -> Self {
        self.neighbors = neighbors;
        self
    }

    /// Sets the result-set bound.
    pub fn with_top(mut self, top: u32) -> Self {
        self.top = top;
        self
    }
}

/// State shared by all handlers.
#[derive(Debug, Clone, FromRef)]
pub struct AppState {
    /// Query service bound to the provisioned index.
    pub query: QueryService,
    /// Query behavior settings.
    pub options: Arc<QueryOptions>,
}

impl AppState {
    /// Creates the application state.
    pub fn new(query: QueryService, options: QueryOptions) -> Self {
        Self {
            query,
            options: Arc::new(options),
        }
    }
}
