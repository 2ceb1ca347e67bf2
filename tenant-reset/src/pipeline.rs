//! The reset run: four phases, strictly one after another.

use crate::config::{PollingConfig, ResetConfig};
use crate::jobs::{purge_users, reset_passwords, resolve_caller, JobPoller, OrganizationReconciler};
use crate::models::{KeepList, OrgId, UserId};
use crate::services::{AdminApi, ApiError, ProgressReporter, UserStore};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::utils::password::Password;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ResolveIdentity,
    ReconcileOrganizations,
    PurgeUsers,
    ResetPasswords,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::ResolveIdentity => "resolve identity",
            Phase::ReconcileOrganizations => "reconcile organizations",
            Phase::PurgeUsers => "purge users",
            Phase::ResetPasswords => "reset passwords",
        };
        f.write_str(name)
    }
}

/// Why a run stopped early.
#[derive(Debug, Error)]
pub enum RunError {
    /// The caller could not be identified; nothing was touched.
    #[error("Failed to resolve calling user: {0}")]
    CallerIdentity(#[source] ApiError),

    #[error("{phase} failed: {source}")]
    Phase {
        phase: Phase,
        #[source]
        source: AppError,
    },
}

impl RunError {
    pub fn phase(&self) -> Phase {
        match self {
            RunError::CallerIdentity(_) => Phase::ResolveIdentity,
            RunError::Phase { phase, .. } => *phase,
        }
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::CallerIdentity(_) => 2,
            RunError::Phase { .. } => 1,
        }
    }
}

/// What a completed run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub caller_id: UserId,
    pub organization_rounds: u32,
    pub organizations_deleted: Vec<OrgId>,
    pub users_deleted: Vec<UserId>,
    pub users_referenced: Vec<UserId>,
    pub passwords_reset: u64,
}

/// Inputs that stay fixed for the whole run.
#[derive(Debug, Clone)]
pub struct ResetSettings {
    pub orgs_to_keep: KeepList,
    pub users_to_keep: KeepList,
    pub polling: PollingConfig,
    pub max_rounds: Option<u32>,
    pub reset_password: Password,
}

impl ResetSettings {
    pub fn from_config(config: &ResetConfig) -> Self {
        Self {
            orgs_to_keep: config.orgs_to_keep.clone(),
            users_to_keep: config.users_to_keep.clone(),
            polling: config.polling.clone(),
            max_rounds: config.max_rounds,
            reset_password: Password::new(config.reset_password.expose_secret().as_str()),
        }
    }
}

pub struct ResetPipeline<'a> {
    api: &'a dyn AdminApi,
    store: &'a dyn UserStore,
    progress: &'a dyn ProgressReporter,
    settings: &'a ResetSettings,
}

impl<'a> ResetPipeline<'a> {
    pub fn new(
        api: &'a dyn AdminApi,
        store: &'a dyn UserStore,
        progress: &'a dyn ProgressReporter,
        settings: &'a ResetSettings,
    ) -> Self {
        Self {
            api,
            store,
            progress,
            settings,
        }
    }

    pub async fn run(&self) -> Result<RunReport, RunError> {
        let caller = resolve_caller(self.api)
            .await
            .map_err(RunError::CallerIdentity)?;

        let poller = JobPoller::from_config(&self.settings.polling);
        let organizations =
            OrganizationReconciler::new(self.api, &self.settings.orgs_to_keep, &poller, self.progress)
                .with_max_rounds(self.settings.max_rounds)
                .reconcile()
                .await
                .map_err(|source| RunError::Phase {
                    phase: Phase::ReconcileOrganizations,
                    source,
                })?;

        let purge = purge_users(self.store, caller, &self.settings.users_to_keep)
            .await
            .map_err(|source| RunError::Phase {
                phase: Phase::PurgeUsers,
                source,
            })?;

        let passwords_reset = reset_passwords(
            self.store,
            &self.settings.users_to_keep,
            &self.settings.reset_password,
        )
        .await
        .map_err(|source| RunError::Phase {
            phase: Phase::ResetPasswords,
            source,
        })?;

        Ok(RunReport {
            caller_id: caller.user_id,
            organization_rounds: organizations.rounds,
            organizations_deleted: organizations.deleted,
            users_deleted: purge.deleted,
            users_referenced: purge.referenced,
            passwords_reset,
        })
    }
}
