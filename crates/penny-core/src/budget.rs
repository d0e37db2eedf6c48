//! Budget alert monitor
//!
//! Watches spend-vs-budget ratios per (project, category-or-none) scope and
//! keeps one alert record per scope current. Recomputation always starts
//! from current totals, never incremental deltas, so repeated sweeps are
//! idempotent and a scheduler can re-run them safely.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::db::Database;
use crate::error::Result;
use crate::models::Budget;
use crate::taxonomy::ExpenseCategory;

/// Alert lifecycle state for one budget scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    /// Below the warning threshold
    Dormant,
    /// At or above the warning threshold, under 100%
    Warning,
    /// At or above 100% of budget
    Exceeded,
}

impl AlertState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dormant => "dormant",
            Self::Warning => "warning",
            Self::Exceeded => "exceeded",
        }
    }
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AlertState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "dormant" => Ok(Self::Dormant),
            "warning" => Ok(Self::Warning),
            "exceeded" => Ok(Self::Exceeded),
            _ => Err(format!("Unknown alert state: {}", s)),
        }
    }
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Numeric priority for sorting (higher = more urgent)
    pub fn priority(&self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AlertSeverity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Unknown alert severity: {}", s)),
        }
    }
}

/// A stateful budget alert for one (project, category-or-none) scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetAlert {
    pub id: i64,
    pub project_id: i64,
    /// None = whole-project scope
    pub category: Option<ExpenseCategory>,
    pub budget_amount: f64,
    pub current_amount: f64,
    pub percentage_used: f64,
    pub warning_threshold: f64,
    pub state: AlertState,
    pub severity: AlertSeverity,
    pub is_active: bool,
    pub is_acknowledged: bool,
    pub message: String,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Classify a spend percentage against the warning threshold
fn classify(percentage_used: f64, warning_threshold: f64) -> (AlertState, AlertSeverity) {
    if percentage_used >= 100.0 {
        let severity = if percentage_used >= 110.0 {
            AlertSeverity::Critical
        } else {
            AlertSeverity::High
        };
        (AlertState::Exceeded, severity)
    } else if percentage_used >= warning_threshold {
        let severity = if percentage_used >= 90.0 {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        };
        (AlertState::Warning, severity)
    } else {
        (AlertState::Dormant, AlertSeverity::Low)
    }
}

/// Budget alert monitor over the stored budget scopes
pub struct BudgetMonitor<'a> {
    db: &'a Database,
    config: &'a EngineConfig,
}

impl<'a> BudgetMonitor<'a> {
    pub fn new(db: &'a Database, config: &'a EngineConfig) -> Self {
        Self { db, config }
    }

    /// The budget scopes currently watched for a project: explicit budget
    /// rows, plus an implicit whole-project scope from `Project.budget`
    /// when no explicit project-level row exists.
    fn scopes_for_project(&self, project_id: i64) -> Result<Vec<Budget>> {
        let mut scopes = self.db.list_budgets_for_project(project_id)?;

        let has_project_scope = scopes.iter().any(|b| b.category.is_none());
        if !has_project_scope {
            if let Some(project) = self.db.get_project(project_id)? {
                if let Some(amount) = project.budget {
                    if amount > 0.0 {
                        scopes.push(Budget {
                            id: 0,
                            project_id,
                            category: None,
                            amount,
                            warning_threshold: self.config.default_warning_threshold,
                            created_at: project.created_at,
                        });
                    }
                }
            }
        }

        Ok(scopes)
    }

    /// Recompute the alert for one scope from current totals
    fn recompute_scope(&self, budget: &Budget) -> Result<BudgetAlert> {
        let current_amount = match budget.category {
            Some(category) => self
                .db
                .project_category_spend(budget.project_id, category)?,
            None => self.db.project_spend(budget.project_id)?,
        };

        let percentage_used = (current_amount / budget.amount) * 100.0;
        let (state, severity) = classify(percentage_used, budget.warning_threshold);

        let previous = self
            .db
            .get_budget_alert(budget.project_id, budget.category)?;

        // Acknowledgment survives escalation but resets on reversion to
        // dormant
        let is_acknowledged = match state {
            AlertState::Dormant => false,
            _ => previous.as_ref().map(|a| a.is_acknowledged).unwrap_or(false),
        };
        let is_active = state != AlertState::Dormant;

        let scope_label = match budget.category {
            Some(category) => format!("project {} / {}", budget.project_id, category),
            None => format!("project {}", budget.project_id),
        };
        let message = format!(
            "{} at {:.1}% of {:.2} budget ({:.2} spent)",
            scope_label, percentage_used, budget.amount, current_amount
        );

        if let Some(prev) = &previous {
            if prev.state != state {
                info!(
                    scope = %scope_label,
                    from = prev.state.as_str(),
                    to = state.as_str(),
                    percentage = percentage_used,
                    "Budget alert state changed"
                );
            }
        } else if state != AlertState::Dormant {
            info!(scope = %scope_label, percentage = percentage_used, "Budget alert raised");
        }

        self.db.save_budget_alert(
            budget.project_id,
            budget.category,
            budget.amount,
            current_amount,
            percentage_used,
            budget.warning_threshold,
            state,
            severity,
            is_active,
            is_acknowledged,
            &message,
        )
    }

    /// Recompute all scopes for one project. Runs synchronously whenever a
    /// document for the project is created, updated, or deleted.
    pub fn recompute_project(&self, project_id: i64) -> Result<Vec<BudgetAlert>> {
        let scopes = self.scopes_for_project(project_id)?;
        debug!(project_id, scopes = scopes.len(), "Recomputing budget alerts");
        scopes
            .iter()
            .map(|budget| self.recompute_scope(budget))
            .collect()
    }

    /// Recompute every watched scope across all projects (idempotent; safe
    /// for a periodic external scheduler)
    pub fn sweep(&self) -> Result<Vec<BudgetAlert>> {
        let mut alerts = Vec::new();
        for project in self.db.list_projects()? {
            alerts.extend(self.recompute_project(project.id)?);
        }
        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentType, NewFinancialDocument, NewLineItem, PaymentStatus, ProjectType};

    fn doc_for_project(project_id: i64, amount: f64) -> NewFinancialDocument {
        NewFinancialDocument {
            document_type: DocumentType::Invoice,
            vendor_name: "Contractor Co".to_string(),
            invoice_number: None,
            invoice_date: None,
            subtotal: None,
            total_tax: None,
            total_amount: Some(amount),
            currency: "USD".to_string(),
            project_id: Some(project_id),
            payment_status: PaymentStatus::Pending,
            line_items: vec![NewLineItem {
                description: "framing labor".to_string(),
                quantity: 1.0,
                unit_price: amount,
                line_total: amount,
                category: Some(ExpenseCategory::LaborContractor),
                subcategory: None,
                tax_rate: None,
                tax_amount: None,
                project_id: None,
            }],
        }
    }

    fn setup() -> (Database, i64) {
        let db = Database::in_memory().unwrap();
        let project_id = db
            .create_project("Kitchen", ProjectType::KitchenRemodel, Some(15000.0))
            .unwrap();
        (db, project_id)
    }

    fn ingest(db: &Database, project_id: i64, amount: f64, hash: &str) {
        let vendor_id = db.find_or_create_vendor("Contractor Co").unwrap();
        db.insert_document(&doc_for_project(project_id, amount), vendor_id, hash)
            .unwrap();
    }

    #[test]
    fn test_classification_ladder() {
        assert_eq!(classify(50.0, 80.0), (AlertState::Dormant, AlertSeverity::Low));
        assert_eq!(classify(83.3, 80.0), (AlertState::Warning, AlertSeverity::Medium));
        assert_eq!(classify(95.0, 80.0), (AlertState::Warning, AlertSeverity::High));
        assert_eq!(classify(101.3, 80.0), (AlertState::Exceeded, AlertSeverity::High));
        assert_eq!(classify(125.0, 80.0), (AlertState::Exceeded, AlertSeverity::Critical));
    }

    #[test]
    fn test_warning_then_exceeded_escalation() {
        let (db, project_id) = setup();
        let config = EngineConfig::default();
        let monitor = BudgetMonitor::new(&db, &config);

        // 12500 / 15000 = 83.3% -> warning
        ingest(&db, project_id, 12500.0, "h1");
        let alerts = monitor.recompute_project(project_id).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].state, AlertState::Warning);
        assert_eq!(alerts[0].severity, AlertSeverity::Medium);
        assert!((alerts[0].percentage_used - 83.33).abs() < 0.01);
        assert!(alerts[0].is_active);

        // Further spend to 15200 -> exceeded, severity escalates
        ingest(&db, project_id, 2700.0, "h2");
        let alerts = monitor.recompute_project(project_id).unwrap();
        assert_eq!(alerts[0].state, AlertState::Exceeded);
        assert_eq!(alerts[0].severity, AlertSeverity::High);
        assert!(alerts[0].percentage_used > 100.0);
    }

    #[test]
    fn test_reversion_clears_acknowledgment() {
        let (db, project_id) = setup();
        let config = EngineConfig::default();
        let monitor = BudgetMonitor::new(&db, &config);

        ingest(&db, project_id, 12500.0, "h1");
        let alerts = monitor.recompute_project(project_id).unwrap();
        let alert_id = alerts[0].id;

        let acked = db.acknowledge_budget_alert(alert_id).unwrap();
        assert!(acked.is_acknowledged);

        // Deleting the document drops spend below threshold
        let doc = db.list_documents(10).unwrap().pop().unwrap();
        db.delete_document(doc.id).unwrap();

        let alerts = monitor.recompute_project(project_id).unwrap();
        assert_eq!(alerts[0].state, AlertState::Dormant);
        assert!(!alerts[0].is_active);
        assert!(!alerts[0].is_acknowledged);
    }

    #[test]
    fn test_acknowledgment_survives_escalation() {
        let (db, project_id) = setup();
        let config = EngineConfig::default();
        let monitor = BudgetMonitor::new(&db, &config);

        ingest(&db, project_id, 12500.0, "h1");
        let alerts = monitor.recompute_project(project_id).unwrap();
        db.acknowledge_budget_alert(alerts[0].id).unwrap();

        ingest(&db, project_id, 5000.0, "h2");
        let alerts = monitor.recompute_project(project_id).unwrap();
        assert_eq!(alerts[0].state, AlertState::Exceeded);
        assert!(alerts[0].is_acknowledged);
    }

    #[test]
    fn test_acknowledge_dormant_rejected() {
        let (db, project_id) = setup();
        let config = EngineConfig::default();
        let monitor = BudgetMonitor::new(&db, &config);

        ingest(&db, project_id, 100.0, "h1");
        let alerts = monitor.recompute_project(project_id).unwrap();
        assert_eq!(alerts[0].state, AlertState::Dormant);

        assert!(db.acknowledge_budget_alert(alerts[0].id).is_err());
    }

    #[test]
    fn test_category_scope_tracks_independently() {
        let (db, project_id) = setup();
        let config = EngineConfig::default();
        let monitor = BudgetMonitor::new(&db, &config);

        // Category budget much tighter than the project budget
        db.upsert_budget(project_id, Some(ExpenseCategory::LaborContractor), 1000.0, 80.0)
            .unwrap();

        ingest(&db, project_id, 900.0, "h1");
        let alerts = monitor.recompute_project(project_id).unwrap();

        let category_alert = alerts
            .iter()
            .find(|a| a.category == Some(ExpenseCategory::LaborContractor))
            .unwrap();
        let project_alert = alerts.iter().find(|a| a.category.is_none()).unwrap();

        assert_eq!(category_alert.state, AlertState::Warning);
        assert_eq!(project_alert.state, AlertState::Dormant);
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let (db, project_id) = setup();
        let config = EngineConfig::default();
        let monitor = BudgetMonitor::new(&db, &config);

        ingest(&db, project_id, 12500.0, "h1");
        let first = monitor.sweep().unwrap();
        let second = monitor.sweep().unwrap();

        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].state, second[0].state);
        assert_eq!(first[0].percentage_used, second[0].percentage_used);
        // Still a single alert row per scope
        assert_eq!(db.list_budget_alerts(Some(project_id), false).unwrap().len(), 1);
    }
}
