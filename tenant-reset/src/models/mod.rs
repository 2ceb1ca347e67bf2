//! Domain models for the reset run.
//!
//! Wire types mirror the admin API's JSON; organizations are never cached
//! between listing calls.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Remote organization identifier.
pub type OrgId = i64;

/// Local user row identifier.
pub type UserId = i64;

/// An organization as returned by the brief listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrgId,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<OrgId>,
    /// Organization code; the API calls this `org_id`.
    #[serde(rename = "org_id", default)]
    pub org_code: Option<i64>,
    /// Role of the calling user within this organization.
    #[serde(rename = "user_role", default)]
    pub caller_role: Option<String>,
}

/// Body of `GET /organizations/?brief=true`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationListing {
    pub organizations: Vec<Organization>,
}

/// Body of `GET /users/current/`.
///
/// Deployments report the primary key as `pk`, `id`, or both.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentUser {
    #[serde(default)]
    pub pk: Option<UserId>,
    #[serde(default)]
    pub id: Option<UserId>,
}

impl CurrentUser {
    /// `pk` when present, otherwise `id`.
    pub fn user_id(&self) -> Option<UserId> {
        self.pk.or(self.id)
    }
}

/// Body of an accepted `DELETE /organizations/{id}/`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteAccepted {
    pub progress_key: String,
}

/// Body of `GET /progress/{key}/`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobProgress {
    /// Percentage complete, 0 to 100 inclusive; may be fractional.
    pub progress: f64,
}

/// Opaque token identifying a server-side deletion job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of the principal the admin API credentials belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: UserId,
}

/// Immutable set of identifiers that must survive the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeepList(BTreeSet<i64>);

impl KeepList {
    /// Parse a JSON array of integer ids, e.g. `[1, 5, 12]`.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let ids: Vec<i64> = serde_json::from_str(raw)?;
        Ok(ids.into_iter().collect())
    }

    pub fn contains(&self, id: i64) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<i64> for KeepList {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Result of a single user delete attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Row was already gone.
    Missing,
    /// Row is still referenced by retained data (foreign key); left in place.
    Referenced,
}
