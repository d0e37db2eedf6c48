//! Project operations

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Project, ProjectType};

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    let project_type_str: String = row.get(2)?;
    let start_date_str: Option<String> = row.get(4)?;
    let end_date_str: Option<String> = row.get(5)?;
    let created_at_str: String = row.get(8)?;

    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        project_type: project_type_str.parse().unwrap_or(ProjectType::Other),
        description: row.get(3)?,
        start_date: start_date_str.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        end_date: end_date_str.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        budget: row.get(6)?,
        status: row.get(7)?,
        created_at: parse_datetime(&created_at_str),
    })
}

const PROJECT_COLUMNS: &str =
    "id, name, project_type, description, start_date, end_date, budget, status, created_at";

impl Database {
    /// Create a project
    pub fn create_project(
        &self,
        name: &str,
        project_type: ProjectType,
        budget: Option<f64>,
    ) -> Result<i64> {
        if name.trim().is_empty() {
            return Err(Error::Validation("Project name is empty".into()));
        }
        if let Some(b) = budget {
            if b < 0.0 {
                return Err(Error::Validation(format!(
                    "Budget must be non-negative, got {}",
                    b
                )));
            }
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO projects (name, project_type, budget) VALUES (?, ?, ?)",
            params![name.trim(), project_type.as_str(), budget],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a project by id
    pub fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM projects WHERE id = ?", PROJECT_COLUMNS),
            params![id],
            project_from_row,
        )
        .optional()
        .map_err(|e| e.into())
    }

    /// Get a project by name (case-insensitive)
    pub fn get_project_by_name(&self, name: &str) -> Result<Option<Project>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM projects WHERE name = ? COLLATE NOCASE",
                PROJECT_COLUMNS
            ),
            params![name.trim()],
            project_from_row,
        )
        .optional()
        .map_err(|e| e.into())
    }

    /// List all projects
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM projects ORDER BY created_at DESC",
            PROJECT_COLUMNS
        ))?;
        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    /// List all project names (used by query entity extraction)
    pub fn project_names(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name FROM projects ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Update a project's budget
    pub fn set_project_budget(&self, id: i64, budget: Option<f64>) -> Result<()> {
        if let Some(b) = budget {
            if b < 0.0 {
                return Err(Error::Validation(format!(
                    "Budget must be non-negative, got {}",
                    b
                )));
            }
        }
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE projects SET budget = ? WHERE id = ?",
            params![budget, id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Project {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn test_create_and_lookup() {
        let db = Database::in_memory().unwrap();
        let id = db
            .create_project("Master Bath Remodel", ProjectType::BathroomRemodel, Some(15000.0))
            .unwrap();

        let by_name = db.get_project_by_name("master bath remodel").unwrap().unwrap();
        assert_eq!(by_name.id, id);
        assert_eq!(by_name.project_type, ProjectType::BathroomRemodel);
        assert_eq!(by_name.budget, Some(15000.0));
    }

    #[test]
    fn test_negative_budget_rejected() {
        let db = Database::in_memory().unwrap();
        assert!(db
            .create_project("Deck", ProjectType::DeckConstruction, Some(-1.0))
            .is_err());
    }

    #[test]
    fn test_set_budget_missing_project() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(
            db.set_project_budget(999, Some(100.0)),
            Err(Error::NotFound(_))
        ));
    }
}
