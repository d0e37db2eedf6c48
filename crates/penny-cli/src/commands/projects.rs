//! Project management commands

use std::path::Path;

use anyhow::Result;

use penny_core::ProjectType;

use super::{open_db, truncate};

pub fn cmd_projects_list(db_path: &Path) -> Result<()> {
    let db = open_db(db_path)?;
    let projects = db.list_projects()?;

    if projects.is_empty() {
        println!("No projects yet. Add one with: penny projects add <name>");
        return Ok(());
    }

    println!("{:<6} {:<28} {:<22} {:>12}", "ID", "NAME", "TYPE", "BUDGET");
    for project in projects {
        let budget = project
            .budget
            .map(|b| format!("{:.2}", b))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<28} {:<22} {:>12}",
            project.id,
            truncate(&project.name, 28),
            project.project_type.as_str(),
            budget
        );
    }

    Ok(())
}

pub fn cmd_projects_add(
    db_path: &Path,
    name: &str,
    project_type: &str,
    budget: Option<f64>,
) -> Result<()> {
    let db = open_db(db_path)?;

    let project_type = project_type
        .parse::<ProjectType>()
        .map_err(|e| anyhow::anyhow!(e))?;

    let id = db.create_project(name, project_type, budget)?;
    println!("✅ Project {} created: {}", id, name);
    Ok(())
}
