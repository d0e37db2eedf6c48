//! Document ingestion orchestration
//!
//! Drives one parsed document through the pipeline the job tracker
//! reports on: validate -> extract -> categorize -> index, followed by a
//! synchronous budget alert recompute for every project the document
//! touches. Validation failures reject the document before anything is
//! persisted; the job records the failure.

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::budget::{BudgetAlert, BudgetMonitor};
use crate::config::EngineConfig;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::jobs::{JobSnapshot, JobState, JobTracker};
use crate::models::{CategorizationSuggestion, NewFinancialDocument};
use crate::suggest::SuggestionGenerator;

/// Result of ingesting one document
#[derive(Debug)]
pub struct IngestOutcome {
    pub job: JobSnapshot,
    pub document_id: i64,
    /// One suggestion per line item that arrived uncategorized
    pub suggestions: Vec<CategorizationSuggestion>,
    /// Budget alerts recomputed for the affected projects
    pub alerts: Vec<BudgetAlert>,
    /// Set when the content hash matched an already-ingested document;
    /// nothing new was stored
    pub duplicate_of: Option<i64>,
}

/// SHA-256 content hash over the parsed document, for idempotent
/// re-ingestion detection
pub fn content_hash(doc: &NewFinancialDocument) -> Result<String> {
    let canonical = serde_json::to_vec(doc)?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(hex::encode(hasher.finalize()))
}

/// Orchestrates the ingest pipeline for parsed documents
pub struct DocumentIngestor<'a> {
    db: &'a Database,
    config: &'a EngineConfig,
}

impl<'a> DocumentIngestor<'a> {
    pub fn new(db: &'a Database, config: &'a EngineConfig) -> Self {
        Self { db, config }
    }

    /// Ingest one parsed document. `source_ref` identifies the upload for
    /// job progress reporting.
    pub fn ingest(&self, doc: &NewFinancialDocument, source_ref: &str) -> Result<IngestOutcome> {
        let tracker = JobTracker::new(self.db);
        let job = tracker.create(source_ref)?;

        match self.run_pipeline(&tracker, job.id, doc) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                // Terminal failure is recorded on the job; the error still
                // propagates to the caller
                let _ = tracker.fail(job.id, &e.to_string());
                Err(e)
            }
        }
    }

    fn run_pipeline(
        &self,
        tracker: &JobTracker<'_>,
        job_id: i64,
        doc: &NewFinancialDocument,
    ) -> Result<IngestOutcome> {
        tracker.advance(job_id, JobState::Validating, "Validating document", 10.0)?;
        doc.validate()?;

        let hash = content_hash(doc)?;
        if let Some(existing) = self.db.get_document_by_hash(&hash)? {
            info!(
                document_id = existing.id,
                "Document already ingested, skipping"
            );
            tracker.attach_document(job_id, existing.id)?;
            let job = tracker.advance(
                job_id,
                JobState::Completed,
                "Duplicate of an already-ingested document",
                100.0,
            )?;
            return Ok(IngestOutcome {
                job: job.snapshot(),
                document_id: existing.id,
                suggestions: vec![],
                alerts: vec![],
                duplicate_of: Some(existing.id),
            });
        }

        tracker.advance(job_id, JobState::Extracting, "Storing document", 30.0)?;
        let vendor_id = self.db.find_or_create_vendor(&doc.vendor_name)?;
        let (document_id, line_item_ids) = self.db.insert_document(doc, vendor_id, &hash)?;
        eprintln!("DEBUG insert_document ok document_id={}", document_id);
        tracker.attach_document(job_id, document_id)?;
        eprintln!("DEBUG attach_document ok");

        tracker.advance(
            job_id,
            JobState::Categorizing,
            "Categorizing line items",
            60.0,
        )?;
        let generator = SuggestionGenerator::new(self.db, self.config);
        let mut suggestions = Vec::new();
        for (item_id, item) in line_item_ids.iter().zip(&doc.line_items) {
            // Items the collaborator already categorized are left alone
            if item.category.is_some() {
                continue;
            }
            suggestions.push(generator.suggest(*item_id)?);
            eprintln!("DEBUG suggest ok item_id={}", item_id);
        }
        eprintln!("DEBUG categorization loop done");
        debug!(
            document_id,
            suggestions = suggestions.len(),
            "Categorization pass complete"
        );

        tracker.advance(job_id, JobState::Indexing, "Indexing document", 85.0)?;
        eprintln!("DEBUG before recompute_affected_projects");
        let alerts = self.recompute_affected_projects(document_id)?;
        eprintln!("DEBUG after recompute_affected_projects");

        let job = tracker.advance(job_id, JobState::Completed, "Processing completed", 100.0)?;

        Ok(IngestOutcome {
            job: job.snapshot(),
            document_id,
            suggestions,
            alerts,
            duplicate_of: None,
        })
    }

    /// Delete a stored document and synchronously recompute alerts for the
    /// projects it touched
    pub fn delete_document(&self, document_id: i64) -> Result<Vec<BudgetAlert>> {
        let projects = self.affected_projects(document_id)?;
        self.db.delete_document(document_id)?;

        let monitor = BudgetMonitor::new(self.db, self.config);
        let mut alerts = Vec::new();
        for project_id in projects {
            alerts.extend(monitor.recompute_project(project_id)?);
        }
        Ok(alerts)
    }

    fn affected_projects(&self, document_id: i64) -> Result<Vec<i64>> {
        let doc = self
            .db
            .get_document(document_id)?
            .ok_or_else(|| Error::NotFound(format!("Document {}", document_id)))?;

        let mut projects: Vec<i64> = doc.project_id.into_iter().collect();
        for item in self.db.line_items_for_document(document_id)? {
            if let Some(project_id) = item.project_id {
                if !projects.contains(&project_id) {
                    projects.push(project_id);
                }
            }
        }
        Ok(projects)
    }

    fn recompute_affected_projects(&self, document_id: i64) -> Result<Vec<BudgetAlert>> {
        let monitor = BudgetMonitor::new(self.db, self.config);
        let mut alerts = Vec::new();
        for project_id in self.affected_projects(document_id)? {
            alerts.extend(monitor.recompute_project(project_id)?);
        }
        Ok(alerts)
    }
}
