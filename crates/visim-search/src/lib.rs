#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod client;
mod error;
mod pipeline;
mod query;
mod schema;

pub use client::{SearchClient, SearchClientConfig};
pub use error::{Result, SearchError};
pub use pipeline::{DataSourceRef, Provisioner, ResourceNames};
pub use query::{QueryService, SearchHit, VectorQuery, DEFAULT_NEIGHBORS, DEFAULT_TOP};
pub use schema::{
    ExhaustiveKnnParameters, HnswParameters, IndexSchema, SearchField, VectorAlgorithm,
    VectorProfile, VectorSearch, Vectorizer, VisionSettings, VisionVectorizerParameters,
    VECTOR_FIELD, VISION_EMBEDDING_DIMENSIONS, VISION_MODEL_VERSION,
};

/// Tracing target for search service operations.
pub const TRACING_TARGET: &str = "visim_search";
