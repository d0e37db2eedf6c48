//! Processing job storage
//!
//! State transitions are guarded by the current status so out-of-order
//! writers are detected; the tracker in `crate::jobs` is the sole writer.

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::jobs::{JobState, ProcessingJob};

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<ProcessingJob> {
    let status_str: String = row.get(3)?;
    let created_at_str: String = row.get(7)?;
    let started_at_str: Option<String> = row.get(8)?;
    let completed_at_str: Option<String> = row.get(9)?;

    Ok(ProcessingJob {
        id: row.get(0)?,
        document_id: row.get(1)?,
        source_ref: row.get(2)?,
        status: status_str.parse().unwrap_or(JobState::Pending),
        progress: row.get(4)?,
        current_step: row.get(5)?,
        error_message: row.get(6)?,
        created_at: parse_datetime(&created_at_str),
        started_at: started_at_str.map(|s| parse_datetime(&s)),
        completed_at: completed_at_str.map(|s| parse_datetime(&s)),
    })
}

const JOB_COLUMNS: &str = "id, document_id, source_ref, status, progress, current_step, \
     error_message, created_at, started_at, completed_at";

impl Database {
    /// Create a pending job row
    pub fn insert_job(&self, source_ref: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO jobs (source_ref) VALUES (?)",
            params![source_ref],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a job by id
    pub fn get_job(&self, id: i64) -> Result<Option<ProcessingJob>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM jobs WHERE id = ?", JOB_COLUMNS),
            params![id],
            job_from_row,
        )
        .optional()
        .map_err(|e| e.into())
    }

    /// Apply a state transition guarded by the expected current status.
    ///
    /// Returns false when the job was not in `expected` anymore, which
    /// signals a concurrent writer.
    #[allow(clippy::too_many_arguments)]
    pub fn update_job_state(
        &self,
        id: i64,
        expected: JobState,
        new_state: JobState,
        progress: f64,
        current_step: &str,
        error_message: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn()?;

        let set_started = expected == JobState::Pending;
        let set_completed = new_state.is_terminal();

        let changed = conn.execute(
            r#"
            UPDATE jobs SET
                status = ?,
                progress = ?,
                current_step = ?,
                error_message = ?,
                started_at = CASE WHEN ? AND started_at IS NULL THEN CURRENT_TIMESTAMP
                                  ELSE started_at END,
                completed_at = CASE WHEN ? THEN CURRENT_TIMESTAMP ELSE completed_at END
            WHERE id = ? AND status = ?
            "#,
            params![
                new_state.as_str(),
                progress,
                current_step,
                error_message,
                set_started,
                set_completed,
                id,
                expected.as_str(),
            ],
        )?;
        Ok(changed > 0)
    }

    /// Attach the stored document to its job once extraction created it
    pub fn set_job_document(&self, id: i64, document_id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE jobs SET document_id = ? WHERE id = ?",
            params![document_id, id],
        )?;
        Ok(())
    }

    /// Most recent jobs
    pub fn list_recent_jobs(&self, limit: i64) -> Result<Vec<ProcessingJob>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM jobs ORDER BY created_at DESC, id DESC LIMIT ?",
            JOB_COLUMNS
        ))?;
        let jobs = stmt
            .query_map(params![limit], job_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(jobs)
    }
}
