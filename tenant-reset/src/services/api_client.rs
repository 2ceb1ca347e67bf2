//! Admin API client.
//!
//! Talks to the environment's administrative REST API with HTTP basic
//! credentials. Reads are retried on transient failures; organization deletes
//! are sent exactly once per call.

use crate::config::ApiConfig;
use crate::models::{
    CallerIdentity, CurrentUser, DeleteAccepted, JobHandle, JobProgress, OrgId, Organization,
    OrganizationListing,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use service_core::retry::{retry_call, RetryConfig, Retryable};
use thiserror::Error;
use tracing::instrument;

const CURRENT_USER_PATH: &str = "/users/current/";
const ORGANIZATIONS_PATH: &str = "/organizations/";

/// Error type for admin API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Admin API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Error payload returned by the server, when there was one.
    pub fn payload(&self) -> Option<&str> {
        match self {
            ApiError::Status { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }
}

impl Retryable for ApiError {
    fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Status { status, .. } => *status == 429 || *status >= 500,
            ApiError::Decode(_) => false,
        }
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status: 401, .. } | ApiError::Status { status: 403, .. } => {
                AppError::Unauthorized(anyhow::Error::new(err))
            }
            ApiError::Status { status: 404, .. } => AppError::NotFound(anyhow::Error::new(err)),
            other => AppError::BadGateway(other.to_string()),
        }
    }
}

/// Operations this tool needs from the admin API.
#[async_trait]
pub trait AdminApi: Send + Sync {
    /// The user the configured credentials belong to.
    async fn current_user(&self) -> Result<CallerIdentity, ApiError>;

    /// Fresh brief listing of every organization visible to the caller.
    async fn list_organizations(&self) -> Result<Vec<Organization>, ApiError>;

    /// Request asynchronous deletion; returns the job to poll, or `None` when
    /// the organization no longer exists.
    async fn delete_organization(&self, id: OrgId) -> Result<Option<JobHandle>, ApiError>;

    /// Current completion percentage (0 to 100) of a deletion job.
    async fn job_progress(&self, handle: &JobHandle) -> Result<f64, ApiError>;
}

/// reqwest-backed [`AdminApi`] implementation.
#[derive(Clone)]
pub struct AdminApiClient {
    client: Client,
    config: ApiConfig,
    retry: RetryConfig,
}

impl AdminApiClient {
    /// Create a new client; the underlying connection pool is shared by all calls.
    pub fn new(config: ApiConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Failed to create HTTP client: {}", e))
            })?;

        let retry = RetryConfig::with_max_retries(config.max_retries);

        tracing::info!(
            base_url = %config.base_url,
            username = %config.username,
            timeout_secs = config.timeout.as_secs(),
            "Admin API client configured"
        );

        Ok(Self {
            client,
            config,
            retry,
        })
    }

    /// Replace the retry policy for idempotent reads.
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(
            &self.config.username,
            Some(self.config.api_key.expose_secret()),
        )
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(status = %status, body = %body, "Admin API request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            ApiError::Decode(format!("{} (status {}, body {:?})", e, status, truncate(&body)))
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(self.client.get(self.url(path))).await
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[async_trait]
impl AdminApi for AdminApiClient {
    #[instrument(skip(self))]
    async fn current_user(&self) -> Result<CallerIdentity, ApiError> {
        let user = retry_call(&self.retry, "current_user", || {
            self.get_json::<CurrentUser>(CURRENT_USER_PATH)
        })
        .await?;

        user.user_id()
            .map(|user_id| CallerIdentity { user_id })
            .ok_or_else(|| ApiError::Decode("current user has neither `pk` nor `id`".to_string()))
    }

    #[instrument(skip(self))]
    async fn list_organizations(&self) -> Result<Vec<Organization>, ApiError> {
        let listing = retry_call(&self.retry, "list_organizations", || {
            self.send_json::<OrganizationListing>(
                self.client
                    .get(self.url(ORGANIZATIONS_PATH))
                    .query(&[("brief", "true")]),
            )
        })
        .await?;

        tracing::debug!(count = listing.organizations.len(), "Organizations listed");
        Ok(listing.organizations)
    }

    #[instrument(skip(self))]
    async fn delete_organization(&self, id: OrgId) -> Result<Option<JobHandle>, ApiError> {
        let path = format!("{}{}/", ORGANIZATIONS_PATH, id);
        let accepted = match self
            .send_json::<DeleteAccepted>(self.client.delete(self.url(&path)))
            .await
        {
            Ok(accepted) => accepted,
            Err(ApiError::Status { status: 404, .. }) => {
                tracing::debug!(org_id = id, "Organization already gone");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        tracing::debug!(org_id = id, progress_key = %accepted.progress_key, "Organization delete accepted");
        Ok(Some(JobHandle::new(accepted.progress_key)))
    }

    #[instrument(skip(self, handle), fields(job = %handle))]
    async fn job_progress(&self, handle: &JobHandle) -> Result<f64, ApiError> {
        let path = format!("/progress/{}/", handle.as_str());
        let progress = retry_call(&self.retry, "job_progress", || {
            self.get_json::<JobProgress>(&path)
        })
        .await?;

        Ok(progress.progress)
    }
}

impl std::fmt::Debug for AdminApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminApiClient")
            .field("base_url", &self.config.base_url)
            .field("username", &self.config.username)
            .finish_non_exhaustive()
    }
}
