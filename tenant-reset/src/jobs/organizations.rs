//! Organization reconciliation.
//!
//! Deletes every organization outside the allow-list and keeps repeating the
//! full list/delete cycle until a fresh listing shows nothing left to delete.
//! A single pass is never assumed to be enough: cascading deletes and a lagging
//! listing endpoint both leave stragglers behind.

use crate::jobs::poller::JobPoller;
use crate::models::{KeepList, OrgId, Organization};
use crate::services::{AdminApi, ProgressReporter};
use service_core::error::AppError;
use tracing::{debug, info, instrument, warn};

/// Organizations in `listing` that are not kept, ascending by id.
pub fn pending_deletions<'a>(listing: &'a [Organization], keep: &KeepList) -> Vec<&'a Organization> {
    let mut pending: Vec<&Organization> = listing
        .iter()
        .filter(|org| !keep.contains(org.id))
        .collect();
    pending.sort_by_key(|org| org.id);
    pending.dedup_by_key(|org| org.id);
    pending
}

/// Outcome of a converged reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Delete passes made; zero when nothing needed deleting.
    pub rounds: u32,
    /// Every delete request issued, in order (an id repeats if it survived a pass).
    pub deleted: Vec<OrgId>,
}

pub struct OrganizationReconciler<'a> {
    api: &'a dyn AdminApi,
    keep: &'a KeepList,
    poller: &'a JobPoller,
    progress: &'a dyn ProgressReporter,
    max_rounds: Option<u32>,
}

impl<'a> OrganizationReconciler<'a> {
    pub fn new(
        api: &'a dyn AdminApi,
        keep: &'a KeepList,
        poller: &'a JobPoller,
        progress: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            api,
            keep,
            poller,
            progress,
            max_rounds: None,
        }
    }

    /// Fail instead of starting another pass once `max_rounds` passes ran.
    pub fn with_max_rounds(mut self, max_rounds: Option<u32>) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    #[instrument(skip(self), fields(keep = self.keep.len()))]
    pub async fn reconcile(&self) -> Result<ReconcileSummary, AppError> {
        let mut summary = ReconcileSummary::default();

        loop {
            let listing = self.api.list_organizations().await?;
            let pending = pending_deletions(&listing, self.keep);

            if pending.is_empty() {
                info!(
                    rounds = summary.rounds,
                    deleted = summary.deleted.len(),
                    remaining = listing.len(),
                    "Organizations match the allow-list"
                );
                return Ok(summary);
            }

            if let Some(max) = self.max_rounds {
                if summary.rounds >= max {
                    let ids: Vec<OrgId> = pending.iter().map(|org| org.id).collect();
                    return Err(AppError::Timeout(format!(
                        "organizations {:?} still present after {} rounds",
                        ids, summary.rounds
                    )));
                }
            }

            summary.rounds += 1;
            if summary.rounds == 1 {
                info!(count = pending.len(), "Deleting organizations");
            } else {
                warn!(
                    round = summary.rounds,
                    count = pending.len(),
                    "Organizations remain after previous pass, deleting again"
                );
            }

            for org in pending {
                self.delete_one(org).await?;
                summary.deleted.push(org.id);
            }
        }
    }

    async fn delete_one(&self, org: &Organization) -> Result<(), AppError> {
        info!(org_id = org.id, name = %org.name, "Deleting org {}: {}", org.id, org.name);

        let Some(handle) = self.api.delete_organization(org.id).await? else {
            debug!(org_id = org.id, "Organization already deleted, listing lagging");
            return Ok(());
        };

        self.progress.begin(org);
        match self
            .poller
            .await_completion(self.api, &handle, self.progress)
            .await
        {
            Ok(_) => {
                self.progress.finish();
                Ok(())
            }
            Err(e) => {
                self.progress.abandon();
                Err(e)
            }
        }
    }
}
