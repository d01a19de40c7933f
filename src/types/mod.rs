//! Shared types for gremway

mod error;

pub use error::{GremlinError, Result};
