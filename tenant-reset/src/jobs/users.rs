//! Local user purge and password reset.

use crate::models::{CallerIdentity, DeleteOutcome, KeepList, UserId};
use crate::services::UserStore;
use service_core::error::AppError;
use service_core::utils::password::{hash_password, Password, PasswordHashString};
use tracing::{debug, info, instrument};

/// What the purge did with each candidate row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    pub deleted: Vec<UserId>,
    /// Rows left in place because retained data still references them.
    pub referenced: Vec<UserId>,
}

/// Delete every user except the caller and the keep-list.
///
/// Foreign-key failures are expected for users tied to retained organization
/// data; those rows simply stay. Nothing is retried.
#[instrument(skip(store, caller, keep), fields(caller = caller.user_id))]
pub async fn purge_users(
    store: &dyn UserStore,
    caller: CallerIdentity,
    keep: &KeepList,
) -> Result<PurgeSummary, AppError> {
    let ids = store.list_user_ids().await?;
    let mut summary = PurgeSummary::default();

    for id in ids
        .into_iter()
        .filter(|id| *id != caller.user_id && !keep.contains(*id))
    {
        match store.delete_user(id).await? {
            DeleteOutcome::Deleted => summary.deleted.push(id),
            DeleteOutcome::Referenced => summary.referenced.push(id),
            DeleteOutcome::Missing => debug!(user_id = id, "User already gone"),
        }
    }

    info!(
        deleted = summary.deleted.len(),
        referenced = summary.referenced.len(),
        "User purge finished"
    );
    Ok(summary)
}

/// Give every remaining non-kept user a fresh hash of `password`.
///
/// Each row gets its own salt. Returns the number of rows updated.
#[instrument(skip(store, keep, password))]
pub async fn reset_passwords(
    store: &dyn UserStore,
    keep: &KeepList,
    password: &Password,
) -> Result<u64, AppError> {
    let targets: Vec<UserId> = store
        .list_user_ids()
        .await?
        .into_iter()
        .filter(|id| !keep.contains(*id))
        .collect();

    if targets.is_empty() {
        info!("No passwords to reset");
        return Ok(0);
    }

    let password = password.clone();
    let updates = tokio::task::spawn_blocking(move || {
        targets
            .into_iter()
            .map(|id| hash_password(&password).map(|hash| (id, hash)))
            .collect::<Result<Vec<(UserId, PasswordHashString)>, _>>()
    })
    .await
    .map_err(|e| AppError::InternalError(anyhow::anyhow!("Password hashing task failed: {}", e)))?
    .map_err(AppError::InternalError)?;

    let updated = store.set_password_hashes(&updates).await?;
    info!(users = updated, "Passwords reset");
    Ok(updated)
}
