//! service-core: Shared infrastructure for the environment maintenance tools.
pub mod config;
pub mod error;
pub mod observability;
pub mod retry;
pub mod utils;

pub use serde;
pub use serde_json;
pub use tracing;
