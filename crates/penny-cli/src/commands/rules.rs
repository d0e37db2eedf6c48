//! Rule management commands

use std::path::Path;

use anyhow::Result;

use penny_core::{ExpenseCategory, NewRule};

use super::{open_db, truncate};

pub fn cmd_rules_list(db_path: &Path) -> Result<()> {
    let db = open_db(db_path)?;
    let rules = db.list_rules(false)?;

    if rules.is_empty() {
        println!("No rules yet. Add one with: penny rules add");
        return Ok(());
    }

    println!(
        "{:<6} {:<24} {:<22} {:>4} {:>5} {:>6}  {}",
        "ID", "NAME", "CATEGORY", "PRI", "CONF", "USED", "ACTIVE"
    );
    for rule in rules {
        println!(
            "{:<6} {:<24} {:<22} {:>4} {:>4.0}% {:>6}  {}",
            rule.id,
            truncate(&rule.name, 24),
            rule.category.as_str(),
            rule.priority,
            rule.confidence_threshold * 100.0,
            rule.usage_count,
            if rule.is_active { "yes" } else { "no" }
        );
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_rules_add(
    db_path: &Path,
    name: &str,
    vendor: Option<&str>,
    pattern: Option<&str>,
    category: &str,
    min: Option<f64>,
    max: Option<f64>,
    priority: i64,
    confidence: f64,
) -> Result<()> {
    let db = open_db(db_path)?;

    let category = category
        .parse::<ExpenseCategory>()
        .map_err(|e| anyhow::anyhow!(e))?;

    let rule = NewRule {
        name: name.to_string(),
        vendor_patterns: vendor.map(|v| vec![v.to_string()]).unwrap_or_default(),
        description_patterns: pattern.map(|p| vec![p.to_string()]).unwrap_or_default(),
        amount_min: min,
        amount_max: max,
        category,
        subcategory: None,
        project_id: None,
        priority,
        confidence_threshold: confidence,
    };

    let id = db.create_rule(&rule)?;
    println!("✅ Rule {} created: {} -> {}", id, name, category);
    Ok(())
}

pub fn cmd_rules_set_active(db_path: &Path, id: i64, active: bool) -> Result<()> {
    let db = open_db(db_path)?;
    db.set_rule_active(id, active)?;
    println!(
        "✅ Rule {} {}",
        id,
        if active { "enabled" } else { "disabled" }
    );
    Ok(())
}

pub fn cmd_rules_candidates(db_path: &Path) -> Result<()> {
    let db = open_db(db_path)?;
    let candidates = db.list_rule_candidates(true)?;

    if candidates.is_empty() {
        println!("No rule candidates awaiting review");
        return Ok(());
    }

    println!("{:<6} {:<30} {:<22} {:>5}", "ID", "PATTERN", "CATEGORY", "SEEN");
    for candidate in candidates {
        println!(
            "{:<6} {:<30} {:<22} {:>5}",
            candidate.id,
            truncate(&candidate.description_pattern, 30),
            candidate.category.as_str(),
            candidate.occurrences
        );
    }
    println!();
    println!("Promote one by adding a rule with: penny rules add");

    Ok(())
}
