#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
mod handler;
mod state;

pub use error::{Error, ErrorKind, ErrorResponse, Result};
pub use handler::{HealthResponse, SearchImageRequest, routes};
pub use state::{AppState, QueryOptions};
