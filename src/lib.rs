pub mod api;
pub mod config;
pub mod error;
pub mod observability;
pub mod replay;

pub use error::{ReplayError, Result};
pub use replay::{ReplayRecord, ReplayStore, TaggedCache};
