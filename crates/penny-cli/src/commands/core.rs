//! Core command implementations (init, status) and shared utilities

use std::path::Path;

use anyhow::{Context, Result};

use penny_core::{Database, EngineConfig};

/// Open the database at the given path
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    Database::new(path_str).with_context(|| format!("Failed to open database at {}", path_str))
}

/// Load the engine config, falling back to compiled defaults when the file
/// does not exist
pub fn load_config(config_path: &Path) -> Result<EngineConfig> {
    EngineConfig::load(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    let db = open_db(db_path)?;
    println!("✅ Database initialized at {}", db.path());
    Ok(())
}

pub fn cmd_status(db_path: &Path) -> Result<()> {
    use std::fs;

    println!();
    println!("📊 Penny Status");
    println!("   ─────────────────────────────────────────────");
    println!("   Database: {}", db_path.display());

    if db_path.exists() {
        if let Ok(metadata) = fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
        return Ok(());
    }

    let db = open_db(db_path)?;
    let documents = db.list_documents(i64::MAX)?.len();
    let projects = db.list_projects()?.len();
    let vendors = db.vendor_names()?.len();
    let rules = db.list_rules(false)?.len();
    let pending = db.list_pending_suggestions(i64::MAX)?.len();
    let active_alerts = db.list_budget_alerts(None, true)?.len();

    println!();
    println!("   Documents: {}", documents);
    println!("   Projects: {}", projects);
    println!("   Vendors: {}", vendors);
    println!("   Rules: {}", rules);
    println!("   Pending suggestions: {}", pending);
    println!("   Active budget alerts: {}", active_alerts);

    Ok(())
}
