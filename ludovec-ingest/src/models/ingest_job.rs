//! Ingestion job state machine
//!
//! A job progresses QUEUED → RUNNING → {SUCCEEDED, FAILED}. Terminal states
//! are absorbing: once a job has succeeded or failed it never transitions
//! again. Jobs are appended, never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ingestion job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted, not yet started
    Queued,
    /// Pipeline in progress
    Running,
    /// All work finished
    Succeeded,
    /// Pipeline aborted; `error` carries the cause
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<JobStatus> {
        match s {
            "queued" => Some(JobStatus::Queued),
            "running" => Some(JobStatus::Running),
            "succeeded" => Some(JobStatus::Succeeded),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// Durable ingestion job record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestJob {
    pub id: Uuid,
    /// External source reference the job was requested for
    pub source_ref: String,
    /// Resolved item id, once metadata has been fetched
    pub item_id: Option<i64>,
    pub status: JobStatus,
    /// Failure cause, verbatim, when status is Failed
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IngestJob {
    /// Create a new job in the Running state
    ///
    /// Ingestion starts work immediately on creation, so jobs skip Queued
    /// unless they are parked behind an existing run for the same source.
    pub fn new_running(source_ref: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            source_ref,
            item_id: None,
            status: JobStatus::Running,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition to a new status
    ///
    /// Returns false (and leaves the job untouched) if the job is already
    /// terminal — status is monotonic.
    pub fn transition_to(&mut self, new_status: JobStatus) -> bool {
        if self.status.is_terminal() {
            tracing::warn!(
                job_id = %self.id,
                current = self.status.as_str(),
                requested = new_status.as_str(),
                "Ignoring transition out of terminal job state"
            );
            return false;
        }
        self.status = new_status;
        self.updated_at = Utc::now();
        true
    }

    /// Mark the job failed with the captured error message
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        let message = error.into();
        if self.transition_to(JobStatus::Failed) {
            self.error = Some(message);
            true
        } else {
            false
        }
    }
}
