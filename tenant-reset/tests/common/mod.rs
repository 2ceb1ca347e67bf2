//! Common test utilities for tenant-reset integration tests.
//!
//! In-memory stand-ins for the admin API and the user table, plus a progress
//! reporter that records what it was told.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, Once};
use tenant_reset::models::{
    CallerIdentity, DeleteOutcome, JobHandle, OrgId, Organization, UserId,
};
use tenant_reset::services::{AdminApi, ApiError, ProgressReporter, UserStore};
use service_core::error::AppError;
use service_core::utils::password::PasswordHashString;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,tenant_reset=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn org(id: OrgId, name: &str) -> Organization {
    Organization {
        id,
        name: name.to_string(),
        parent_id: None,
        org_code: Some(id * 100),
        caller_role: Some("admin".to_string()),
    }
}

/// Scripted admin API.
///
/// Deleting an organization removes it from the listing unless it was marked
/// stubborn, in which case it survives that many delete requests. A lagging
/// organization keeps showing up in listings after it is gone, and deleting it
/// again reports it as already gone. Every job reports the configured progress
/// script, then 100.
pub struct FakeAdminApi {
    caller: Option<UserId>,
    organizations: Mutex<BTreeMap<OrgId, Organization>>,
    stubborn: Mutex<HashMap<OrgId, u32>>,
    lag: Mutex<HashMap<OrgId, u32>>,
    ghosts: Mutex<BTreeMap<OrgId, (Organization, u32)>>,
    progress_script: Vec<f64>,
    jobs: Mutex<HashMap<String, VecDeque<f64>>>,
    next_job: AtomicU32,
    pub list_calls: AtomicU32,
    pub progress_calls: AtomicU32,
    pub delete_requests: Mutex<Vec<OrgId>>,
}

impl FakeAdminApi {
    pub fn new(caller: UserId, organizations: Vec<Organization>) -> Self {
        Self {
            caller: Some(caller),
            organizations: Mutex::new(organizations.into_iter().map(|o| (o.id, o)).collect()),
            stubborn: Mutex::new(HashMap::new()),
            lag: Mutex::new(HashMap::new()),
            ghosts: Mutex::new(BTreeMap::new()),
            progress_script: Vec::new(),
            jobs: Mutex::new(HashMap::new()),
            next_job: AtomicU32::new(0),
            list_calls: AtomicU32::new(0),
            progress_calls: AtomicU32::new(0),
            delete_requests: Mutex::new(Vec::new()),
        }
    }

    /// Credentials that the API rejects.
    pub fn unauthorized(organizations: Vec<Organization>) -> Self {
        Self {
            caller: None,
            ..Self::new(0, organizations)
        }
    }

    pub fn with_progress_script(mut self, script: Vec<f64>) -> Self {
        self.progress_script = script;
        self
    }

    /// `id` stays listed after its first `passes` delete requests.
    pub fn with_stubborn(self, id: OrgId, passes: u32) -> Self {
        self.stubborn.lock().unwrap().insert(id, passes);
        self
    }

    /// `id` is still listed by the next `listings` listing calls after it is deleted.
    pub fn with_lagging(self, id: OrgId, listings: u32) -> Self {
        self.lag.lock().unwrap().insert(id, listings);
        self
    }

    pub fn remaining_ids(&self) -> Vec<OrgId> {
        self.organizations.lock().unwrap().keys().copied().collect()
    }

    pub fn deletes(&self) -> Vec<OrgId> {
        self.delete_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AdminApi for FakeAdminApi {
    async fn current_user(&self) -> Result<CallerIdentity, ApiError> {
        match self.caller {
            Some(user_id) => Ok(CallerIdentity { user_id }),
            None => Err(ApiError::Status {
                status: 401,
                body: r#"{"detail":"Invalid username/password."}"#.to_string(),
            }),
        }
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut listing: Vec<Organization> =
            self.organizations.lock().unwrap().values().cloned().collect();

        let mut ghosts = self.ghosts.lock().unwrap();
        for (org, remaining) in ghosts.values_mut() {
            if *remaining > 0 {
                *remaining -= 1;
                listing.push(org.clone());
            }
        }
        Ok(listing)
    }

    async fn delete_organization(&self, id: OrgId) -> Result<Option<JobHandle>, ApiError> {
        self.delete_requests.lock().unwrap().push(id);

        let mut organizations = self.organizations.lock().unwrap();
        if !organizations.contains_key(&id) {
            return Ok(None);
        }

        let mut stubborn = self.stubborn.lock().unwrap();
        match stubborn.get_mut(&id) {
            Some(passes) if *passes > 0 => *passes -= 1,
            _ => {
                if let Some(org) = organizations.remove(&id) {
                    if let Some(listings) = self.lag.lock().unwrap().get(&id) {
                        self.ghosts.lock().unwrap().insert(id, (org, *listings));
                    }
                }
            }
        }

        let key = format!("job-{}", self.next_job.fetch_add(1, Ordering::SeqCst));
        self.jobs
            .lock()
            .unwrap()
            .insert(key.clone(), self.progress_script.iter().copied().collect());
        Ok(Some(JobHandle::new(key)))
    }

    async fn job_progress(&self, handle: &JobHandle) -> Result<f64, ApiError> {
        self.progress_calls.fetch_add(1, Ordering::SeqCst);
        let mut jobs = self.jobs.lock().unwrap();
        let script = jobs.get_mut(handle.as_str()).ok_or_else(|| ApiError::Status {
            status: 404,
            body: format!("unknown progress key {}", handle),
        })?;
        Ok(script.pop_front().unwrap_or(100.0))
    }
}

/// In-memory user table with optional foreign-key protected rows.
#[derive(Default)]
pub struct FakeUserStore {
    rows: Mutex<BTreeMap<UserId, String>>,
    referenced: HashSet<UserId>,
    pub delete_attempts: Mutex<Vec<UserId>>,
}

impl FakeUserStore {
    pub fn new(ids: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            rows: Mutex::new(ids.into_iter().map(|id| (id, "!unusable".to_string())).collect()),
            ..Self::default()
        }
    }

    /// Rows that fail to delete with a foreign-key violation.
    pub fn with_referenced(mut self, ids: impl IntoIterator<Item = UserId>) -> Self {
        self.referenced = ids.into_iter().collect();
        self
    }

    pub fn ids(&self) -> Vec<UserId> {
        self.rows.lock().unwrap().keys().copied().collect()
    }

    pub fn password_of(&self, id: UserId) -> Option<String> {
        self.rows.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl UserStore for FakeUserStore {
    async fn list_user_ids(&self) -> Result<Vec<UserId>, AppError> {
        Ok(self.ids())
    }

    async fn delete_user(&self, id: UserId) -> Result<DeleteOutcome, AppError> {
        self.delete_attempts.lock().unwrap().push(id);
        if self.referenced.contains(&id) {
            return Ok(DeleteOutcome::Referenced);
        }
        match self.rows.lock().unwrap().remove(&id) {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::Missing),
        }
    }

    async fn set_password_hashes(
        &self,
        updates: &[(UserId, PasswordHashString)],
    ) -> Result<u64, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let mut updated = 0;
        for (id, hash) in updates {
            if let Some(password) = rows.get_mut(id) {
                *password = hash.as_str().to_string();
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Begin(OrgId),
    Update(f64),
    Finish,
    Abandon,
}

/// Progress reporter that records every call.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Update(percent) => Some(percent),
                _ => None,
            })
            .collect()
    }
}

impl ProgressReporter for RecordingProgress {
    fn begin(&self, org: &Organization) {
        self.events.lock().unwrap().push(ProgressEvent::Begin(org.id));
    }

    fn update(&self, percent: f64) {
        self.events.lock().unwrap().push(ProgressEvent::Update(percent));
    }

    fn finish(&self) {
        self.events.lock().unwrap().push(ProgressEvent::Finish);
    }

    fn abandon(&self) {
        self.events.lock().unwrap().push(ProgressEvent::Abandon);
    }
}
