//! Deletion job polling.

use crate::config::PollingConfig;
use crate::models::JobHandle;
use crate::services::{round_percent, AdminApi, ProgressReporter};
use service_core::error::AppError;
use std::time::Duration;
use tokio::time::sleep;
use tracing::instrument;

/// Polls a server-side job until it reports 100%.
#[derive(Debug, Clone)]
pub struct JobPoller {
    interval: Duration,
    max_attempts: Option<u32>,
}

impl JobPoller {
    pub fn new(interval: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    pub fn from_config(config: &PollingConfig) -> Self {
        Self::new(config.interval, config.max_attempts)
    }

    /// Block until the job completes. Returns the number of polls made.
    ///
    /// Polls immediately, then once per interval. With no attempt limit a job
    /// that never completes keeps this waiting forever.
    #[instrument(skip(self, api, handle, progress), fields(job = %handle))]
    pub async fn await_completion(
        &self,
        api: &dyn AdminApi,
        handle: &JobHandle,
        progress: &dyn ProgressReporter,
    ) -> Result<u32, AppError> {
        let mut attempts: u32 = 0;

        loop {
            let percent = api.job_progress(handle).await?;
            attempts += 1;
            progress.update(round_percent(percent));

            if percent >= 100.0 {
                tracing::debug!(attempts, "Deletion job complete");
                return Ok(attempts);
            }

            if let Some(max) = self.max_attempts {
                if attempts >= max {
                    return Err(AppError::Timeout(format!(
                        "job {} still at {:.2}% after {} polls",
                        handle, percent, attempts
                    )));
                }
            }

            sleep(self.interval).await;
        }
    }
}

impl Default for JobPoller {
    fn default() -> Self {
        Self::from_config(&PollingConfig::default())
    }
}
