use crate::models::CallerIdentity;
use crate::services::{AdminApi, ApiError};

/// Resolve the user behind the admin API credentials.
///
/// Without this id the user purge could delete the acting account, so callers
/// must treat an error here as fatal and do no further work.
pub async fn resolve_caller(api: &dyn AdminApi) -> Result<CallerIdentity, ApiError> {
    match api.current_user().await {
        Ok(caller) => {
            tracing::info!(user_id = caller.user_id, "Resolved calling user");
            Ok(caller)
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                payload = e.payload().unwrap_or_default(),
                "Failed to resolve calling user"
            );
            Err(e)
        }
    }
}
