//! Job tracker for the asynchronous document pipeline
//!
//! Tracks one document's run through validate -> extract -> categorize ->
//! index. The tracker is the sole writer for a job; external callers read
//! progress through snapshots and poll until `completed` is true. A
//! caller-side timeout supervisor may mark a job failed, which is just the
//! ordinary `fail` transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::db::Database;
use crate::error::{Error, Result};

/// Pipeline states. `failed` is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Validating,
    Extracting,
    Categorizing,
    Indexing,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Validating => "validating",
            Self::Extracting => "extracting",
            Self::Categorizing => "categorizing",
            Self::Indexing => "indexing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Position in the forward-only pipeline; None for `failed`
    fn order(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Validating => Some(1),
            Self::Extracting => Some(2),
            Self::Categorizing => Some(3),
            Self::Indexing => Some(4),
            Self::Completed => Some(5),
            Self::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "validating" => Ok(Self::Validating),
            "extracting" => Ok(Self::Extracting),
            "categorizing" => Ok(Self::Categorizing),
            "indexing" => Ok(Self::Indexing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown job state: {}", s)),
        }
    }
}

/// A tracked pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingJob {
    pub id: i64,
    /// Set once extraction stored the document
    pub document_id: Option<i64>,
    /// Caller-supplied reference (filename, upload id, ...)
    pub source_ref: String,
    pub status: JobState,
    pub progress: f64,
    pub current_step: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProcessingJob {
    /// Read-only projection handed to polling callers
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.id,
            status: self.status,
            progress: self.progress,
            current_step: self.current_step.clone(),
            completed: self.status.is_terminal(),
            error_message: self.error_message.clone(),
        }
    }
}

/// Progress snapshot for polling callers. `completed` is the stop
/// condition: true for both successful and failed terminal states.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub job_id: i64,
    pub status: JobState,
    pub progress: f64,
    pub current_step: String,
    pub completed: bool,
    pub error_message: Option<String>,
}

/// Sole writer of job state
pub struct JobTracker<'a> {
    db: &'a Database,
}

impl<'a> JobTracker<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a new pending job
    pub fn create(&self, source_ref: &str) -> Result<ProcessingJob> {
        let id = self.db.insert_job(source_ref)?;
        debug!(job_id = id, source_ref, "Created processing job");
        self.require(id)
    }

    fn require(&self, id: i64) -> Result<ProcessingJob> {
        self.db
            .get_job(id)?
            .ok_or_else(|| Error::NotFound(format!("Job {}", id)))
    }

    /// Advance a job to the next pipeline state.
    ///
    /// The transition must move forward and progress must not decrease;
    /// anything else is an invalid transition.
    pub fn advance(
        &self,
        id: i64,
        to: JobState,
        current_step: &str,
        progress: f64,
    ) -> Result<ProcessingJob> {
        let job = self.require(id)?;

        if job.status.is_terminal() {
            return Err(Error::InvalidTransition(format!(
                "Job {} is already {}",
                id, job.status
            )));
        }
        let (from_order, to_order) = match (job.status.order(), to.order()) {
            (Some(f), Some(t)) => (f, t),
            _ => {
                return Err(Error::InvalidTransition(format!(
                    "Use fail() to mark job {} failed",
                    id
                )))
            }
        };
        if to_order <= from_order {
            return Err(Error::InvalidTransition(format!(
                "Job {} cannot move from {} to {}",
                id, job.status, to
            )));
        }

        let progress = if to == JobState::Completed {
            100.0
        } else {
            progress
        };
        if progress < job.progress {
            return Err(Error::InvalidTransition(format!(
                "Job {} progress cannot decrease ({} -> {})",
                id, job.progress, progress
            )));
        }

        let applied =
            self.db
                .update_job_state(id, job.status, to, progress, current_step, None)?;
        if !applied {
            // Concurrent writers for the same job id are unsupported
            return Err(Error::Conflict(format!(
                "Job {} was updated concurrently",
                id
            )));
        }

        debug!(job_id = id, state = to.as_str(), progress, "Job advanced");
        self.require(id)
    }

    /// Mark a job failed. Valid from any non-terminal state; requires a
    /// non-empty error message. Progress is left where it was.
    pub fn fail(&self, id: i64, error_message: &str) -> Result<ProcessingJob> {
        if error_message.trim().is_empty() {
            return Err(Error::Validation(
                "Failed jobs require an error message".into(),
            ));
        }

        let job = self.require(id)?;
        if job.status.is_terminal() {
            return Err(Error::InvalidTransition(format!(
                "Job {} is already {}",
                id, job.status
            )));
        }

        let applied = self.db.update_job_state(
            id,
            job.status,
            JobState::Failed,
            job.progress,
            "Failed",
            Some(error_message.trim()),
        )?;
        if !applied {
            return Err(Error::Conflict(format!(
                "Job {} was updated concurrently",
                id
            )));
        }

        warn!(job_id = id, error = error_message, "Job failed");
        self.require(id)
    }

    /// Attach the stored document once extraction created it
    pub fn attach_document(&self, id: i64, document_id: i64) -> Result<()> {
        self.require(id)?;
        self.db.set_job_document(id, document_id)
    }

    /// Progress snapshot for polling callers
    pub fn snapshot(&self, id: i64) -> Result<JobSnapshot> {
        Ok(self.require(id)?.snapshot())
    }
}
