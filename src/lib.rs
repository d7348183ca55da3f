//! Reader/book network construction, projection and hierarchical community detection

pub mod cluster;
pub mod config;
pub mod data;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod storage;

pub use error::{NetworkError, Result};
