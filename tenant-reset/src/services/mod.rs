//! Services module for tenant-reset.

pub mod api_client;
pub mod database;
pub mod progress;

pub use api_client::{AdminApi, AdminApiClient, ApiError};
pub use database::{Database, UserStore, USER_TABLE};
pub use progress::{round_percent, LogProgress, ProgressReporter, TerminalProgress};
