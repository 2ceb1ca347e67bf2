//! Application startup and lifecycle management.

use crate::config::ResetConfig;
use crate::pipeline::{ResetPipeline, ResetSettings, RunError, RunReport};
use crate::services::{
    AdminApiClient, Database, LogProgress, ProgressReporter, TerminalProgress, USER_TABLE,
};
use service_core::error::AppError;

/// Application container for a single reset run.
pub struct Application {
    settings: ResetSettings,
    db: Database,
    api: AdminApiClient,
    progress: Box<dyn ProgressReporter>,
}

impl Application {
    /// Connect to the database and prepare the admin API client.
    pub async fn build(config: ResetConfig) -> Result<Self, AppError> {
        let db = Database::new(
            config.database.connect_options(),
            config.database.max_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        if let Err(e) = db.health_check().await {
            tracing::error!(error = %e, table = USER_TABLE, "User table not reachable");
            db.close().await;
            return Err(e);
        }

        let api = AdminApiClient::new(config.api.clone()).map_err(|e| {
            tracing::error!(error = %e, "Failed to create admin API client");
            e
        })?;

        let progress: Box<dyn ProgressReporter> = if config.progress_bar {
            Box::new(TerminalProgress::new())
        } else {
            Box::new(LogProgress)
        };

        Ok(Self {
            settings: ResetSettings::from_config(&config),
            db,
            api,
            progress,
        })
    }

    /// Run every phase once. The pool is closed whether or not the run succeeds.
    pub async fn run(self) -> Result<RunReport, RunError> {
        let result = ResetPipeline::new(&self.api, &self.db, self.progress.as_ref(), &self.settings)
            .run()
            .await;

        self.db.close().await;
        result
    }
}
