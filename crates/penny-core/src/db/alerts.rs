//! Budget and budget alert storage
//!
//! One alert row per (project, category-or-none) scope; the monitor in
//! `crate::budget` owns all state transitions. The empty string stands in
//! for "no category" in the scope key so the UNIQUE constraint applies.

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::budget::{AlertSeverity, AlertState, BudgetAlert};
use crate::error::{Error, Result};
use crate::models::Budget;
use crate::taxonomy::ExpenseCategory;

fn category_key(category: Option<ExpenseCategory>) -> &'static str {
    category.map(|c| c.as_str()).unwrap_or("")
}

fn budget_from_row(row: &Row<'_>) -> rusqlite::Result<Budget> {
    let category_str: String = row.get(2)?;
    let created_at_str: String = row.get(5)?;
    Ok(Budget {
        id: row.get(0)?,
        project_id: row.get(1)?,
        category: category_str.parse().ok(),
        amount: row.get(3)?,
        warning_threshold: row.get(4)?,
        created_at: parse_datetime(&created_at_str),
    })
}

fn alert_from_row(row: &Row<'_>) -> rusqlite::Result<BudgetAlert> {
    let category_str: String = row.get(2)?;
    let state_str: String = row.get(7)?;
    let severity_str: String = row.get(8)?;
    let acknowledged_at_str: Option<String> = row.get(12)?;
    let updated_at_str: String = row.get(13)?;
    let created_at_str: String = row.get(14)?;

    Ok(BudgetAlert {
        id: row.get(0)?,
        project_id: row.get(1)?,
        category: category_str.parse().ok(),
        budget_amount: row.get(3)?,
        current_amount: row.get(4)?,
        percentage_used: row.get(5)?,
        warning_threshold: row.get(6)?,
        state: state_str.parse().unwrap_or(AlertState::Dormant),
        severity: severity_str.parse().unwrap_or(AlertSeverity::Low),
        is_active: row.get(9)?,
        is_acknowledged: row.get(10)?,
        message: row.get(11)?,
        acknowledged_at: acknowledged_at_str.map(|s| parse_datetime(&s)),
        updated_at: parse_datetime(&updated_at_str),
        created_at: parse_datetime(&created_at_str),
    })
}

const ALERT_COLUMNS: &str = "id, project_id, category, budget_amount, current_amount, \
     percentage_used, warning_threshold, state, severity, is_active, is_acknowledged, message, \
     acknowledged_at, updated_at, created_at";

impl Database {
    /// Create or replace a budget scope
    pub fn upsert_budget(
        &self,
        project_id: i64,
        category: Option<ExpenseCategory>,
        amount: f64,
        warning_threshold: f64,
    ) -> Result<i64> {
        if amount <= 0.0 {
            return Err(Error::Validation(format!(
                "Budget amount must be positive, got {}",
                amount
            )));
        }
        if !(0.0..=100.0).contains(&warning_threshold) {
            return Err(Error::Validation(format!(
                "Warning threshold must be between 0 and 100, got {}",
                warning_threshold
            )));
        }
        if self.get_project(project_id)?.is_none() {
            return Err(Error::NotFound(format!("Project {}", project_id)));
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO budgets (project_id, category, amount, warning_threshold)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(project_id, category) DO UPDATE SET
                amount = excluded.amount,
                warning_threshold = excluded.warning_threshold
            "#,
            params![project_id, category_key(category), amount, warning_threshold],
        )?;

        let id: i64 = conn.query_row(
            "SELECT id FROM budgets WHERE project_id = ? AND category = ?",
            params![project_id, category_key(category)],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Budget scopes for one project
    pub fn list_budgets_for_project(&self, project_id: i64) -> Result<Vec<Budget>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, project_id, category, amount, warning_threshold, created_at \
             FROM budgets WHERE project_id = ? ORDER BY category",
        )?;
        let budgets = stmt
            .query_map(params![project_id], budget_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(budgets)
    }

    /// All budget scopes
    pub fn list_budgets(&self) -> Result<Vec<Budget>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, project_id, category, amount, warning_threshold, created_at \
             FROM budgets ORDER BY project_id, category",
        )?;
        let budgets = stmt
            .query_map([], budget_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(budgets)
    }

    /// The alert record for one scope, if any
    pub fn get_budget_alert(
        &self,
        project_id: i64,
        category: Option<ExpenseCategory>,
    ) -> Result<Option<BudgetAlert>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM budget_alerts WHERE project_id = ? AND category = ?",
                ALERT_COLUMNS
            ),
            params![project_id, category_key(category)],
            alert_from_row,
        )
        .optional()
        .map_err(|e| e.into())
    }

    /// Get an alert by id
    pub fn get_budget_alert_by_id(&self, id: i64) -> Result<Option<BudgetAlert>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM budget_alerts WHERE id = ?", ALERT_COLUMNS),
            params![id],
            alert_from_row,
        )
        .optional()
        .map_err(|e| e.into())
    }

    /// Create or refresh the alert record for a scope. Only the monitor
    /// should call this.
    #[allow(clippy::too_many_arguments)]
    pub fn save_budget_alert(
        &self,
        project_id: i64,
        category: Option<ExpenseCategory>,
        budget_amount: f64,
        current_amount: f64,
        percentage_used: f64,
        warning_threshold: f64,
        state: AlertState,
        severity: AlertSeverity,
        is_active: bool,
        is_acknowledged: bool,
        message: &str,
    ) -> Result<BudgetAlert> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO budget_alerts (
                project_id, category, budget_amount, current_amount, percentage_used,
                warning_threshold, state, severity, is_active, is_acknowledged, message,
                updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(project_id, category) DO UPDATE SET
                budget_amount = excluded.budget_amount,
                current_amount = excluded.current_amount,
                percentage_used = excluded.percentage_used,
                warning_threshold = excluded.warning_threshold,
                state = excluded.state,
                severity = excluded.severity,
                is_active = excluded.is_active,
                is_acknowledged = excluded.is_acknowledged,
                message = excluded.message,
                acknowledged_at = CASE WHEN excluded.is_acknowledged = 0 THEN NULL
                                       ELSE budget_alerts.acknowledged_at END,
                updated_at = CURRENT_TIMESTAMP
            "#,
            params![
                project_id,
                category_key(category),
                budget_amount,
                current_amount,
                percentage_used,
                warning_threshold,
                state.as_str(),
                severity.as_str(),
                is_active,
                is_acknowledged,
                message,
            ],
        )?;

        self.get_budget_alert(project_id, category)?
            .ok_or_else(|| Error::NotFound(format!("Budget alert for project {}", project_id)))
    }

    /// List alert records, optionally scoped to a project or to active ones
    pub fn list_budget_alerts(
        &self,
        project_id: Option<i64>,
        active_only: bool,
    ) -> Result<Vec<BudgetAlert>> {
        let conn = self.conn()?;

        let mut sql = format!("SELECT {} FROM budget_alerts WHERE 1=1", ALERT_COLUMNS);
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(pid) = project_id {
            sql.push_str(" AND project_id = ?");
            params_vec.push(Box::new(pid));
        }
        if active_only {
            sql.push_str(" AND is_active = 1");
        }
        sql.push_str(" ORDER BY percentage_used DESC, id");

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let alerts = stmt
            .query_map(params_refs.as_slice(), alert_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(alerts)
    }

    /// Acknowledge an alert. Only valid while the alert is in warning or
    /// exceeded state; acknowledgment of a dormant alert is a caller error.
    pub fn acknowledge_budget_alert(&self, id: i64) -> Result<BudgetAlert> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE budget_alerts
            SET is_acknowledged = 1, acknowledged_at = CURRENT_TIMESTAMP
            WHERE id = ? AND state IN ('warning', 'exceeded')
            "#,
            params![id],
        )?;

        if changed == 0 {
            return match self.get_budget_alert_by_id(id)? {
                Some(alert) => Err(Error::InvalidTransition(format!(
                    "Cannot acknowledge alert {} in {} state",
                    id, alert.state
                ))),
                None => Err(Error::NotFound(format!("Budget alert {}", id))),
            };
        }

        self.get_budget_alert_by_id(id)?
            .ok_or_else(|| Error::NotFound(format!("Budget alert {}", id)))
    }
}
