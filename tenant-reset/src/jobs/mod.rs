//! The reset phases, in the order the pipeline runs them.

pub mod identity;
pub mod organizations;
pub mod poller;
pub mod users;

pub use identity::resolve_caller;
pub use organizations::{pending_deletions, OrganizationReconciler, ReconcileSummary};
pub use poller::JobPoller;
pub use users::{purge_users, reset_passwords, PurgeSummary};
