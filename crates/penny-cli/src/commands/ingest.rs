//! Document ingestion and job progress commands

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use penny_core::{DocumentIngestor, NewFinancialDocument};

use super::{load_config, open_db, truncate};

pub fn cmd_ingest(db_path: &Path, config_path: &Path, file: &Path) -> Result<()> {
    let db = open_db(db_path)?;
    let config = load_config(config_path)?;

    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let doc: NewFinancialDocument = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a valid parsed document", file.display()))?;

    let source_ref = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.display().to_string());

    let ingestor = DocumentIngestor::new(&db, &config);
    let outcome = ingestor.ingest(&doc, &source_ref)?;

    if let Some(existing) = outcome.duplicate_of {
        println!("⏭️  Already ingested as document {}", existing);
        return Ok(());
    }

    println!("✅ Ingested document {} ({})", outcome.document_id, source_ref);
    println!("   Job {}: {}", outcome.job.job_id, outcome.job.current_step);

    if !outcome.suggestions.is_empty() {
        println!();
        println!("   Suggestions:");
        for suggestion in &outcome.suggestions {
            let status = if suggestion.confidence >= config.acceptance_threshold {
                "auto-accepted"
            } else {
                "pending"
            };
            println!(
                "   [{}] {} ({:.0}%, {})",
                suggestion.id,
                suggestion.category,
                suggestion.confidence * 100.0,
                status
            );
        }
    }

    for alert in &outcome.alerts {
        if alert.is_active {
            println!("   ⚠️  {}", alert.message);
        }
    }

    Ok(())
}

pub fn cmd_jobs(db_path: &Path, id: Option<i64>, limit: i64) -> Result<()> {
    let db = open_db(db_path)?;

    if let Some(job_id) = id {
        let tracker = penny_core::JobTracker::new(&db);
        let snapshot = tracker.snapshot(job_id)?;
        println!(
            "Job {}: {} ({:.0}%) - {}",
            snapshot.job_id, snapshot.status, snapshot.progress, snapshot.current_step
        );
        if let Some(error) = &snapshot.error_message {
            println!("   ❌ {}", error);
        }
        if snapshot.completed {
            println!("   Terminal: polling can stop");
        }
        return Ok(());
    }

    let jobs = db.list_recent_jobs(limit)?;
    if jobs.is_empty() {
        println!("No jobs yet");
        return Ok(());
    }

    println!("{:<6} {:<13} {:>5}  {:<28} {}", "ID", "STATUS", "%", "STEP", "SOURCE");
    for job in jobs {
        println!(
            "{:<6} {:<13} {:>5.0}  {:<28} {}",
            job.id,
            job.status.as_str(),
            job.progress,
            truncate(&job.current_step, 28),
            truncate(&job.source_ref, 30)
        );
    }

    Ok(())
}
