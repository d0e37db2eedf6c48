//! Budget alert and budget management commands

use std::path::Path;

use anyhow::Result;

use penny_core::{BudgetMonitor, ExpenseCategory};

use super::{load_config, open_db};

pub fn cmd_alerts(db_path: &Path, project: Option<i64>, all: bool, ack: Option<i64>) -> Result<()> {
    let db = open_db(db_path)?;

    if let Some(alert_id) = ack {
        let alert = db.acknowledge_budget_alert(alert_id)?;
        println!("✅ Acknowledged alert {}: {}", alert.id, alert.message);
        return Ok(());
    }

    let alerts = db.list_budget_alerts(project, !all)?;
    if alerts.is_empty() {
        println!("No budget alerts 🎉");
        return Ok(());
    }

    for alert in alerts {
        let ack_marker = if alert.is_acknowledged { " (ack)" } else { "" };
        let icon = match alert.state {
            penny_core::AlertState::Exceeded => "🔴",
            penny_core::AlertState::Warning => "🟡",
            penny_core::AlertState::Dormant => "⚪",
        };
        println!(
            "{} [{}] {} - {} {}{}",
            icon, alert.id, alert.severity, alert.state, alert.message, ack_marker
        );
    }

    Ok(())
}

pub fn cmd_sweep(db_path: &Path, config_path: &Path) -> Result<()> {
    let db = open_db(db_path)?;
    let config = load_config(config_path)?;

    let monitor = BudgetMonitor::new(&db, &config);
    let alerts = monitor.sweep()?;

    let active = alerts.iter().filter(|a| a.is_active).count();
    println!("Recomputed {} scopes, {} active alerts", alerts.len(), active);
    Ok(())
}

pub fn cmd_budgets_list(db_path: &Path) -> Result<()> {
    let db = open_db(db_path)?;
    let budgets = db.list_budgets()?;

    if budgets.is_empty() {
        println!("No budgets configured");
        return Ok(());
    }

    println!("{:<6} {:<9} {:<24} {:>12} {:>7}", "ID", "PROJECT", "CATEGORY", "AMOUNT", "WARN%");
    for budget in budgets {
        println!(
            "{:<6} {:<9} {:<24} {:>12.2} {:>7.0}",
            budget.id,
            budget.project_id,
            budget
                .category
                .map(|c| c.as_str())
                .unwrap_or("(whole project)"),
            budget.amount,
            budget.warning_threshold
        );
    }

    Ok(())
}

pub fn cmd_budgets_set(
    db_path: &Path,
    project: i64,
    category: Option<&str>,
    amount: f64,
    warn: f64,
) -> Result<()> {
    let db = open_db(db_path)?;

    let category = match category {
        Some(name) => Some(
            name.parse::<ExpenseCategory>()
                .map_err(|e| anyhow::anyhow!(e))?,
        ),
        None => None,
    };

    let id = db.upsert_budget(project, category, amount, warn)?;
    println!("✅ Budget {} set: project {} at {:.2} (warn {:.0}%)", id, project, amount, warn);
    Ok(())
}
