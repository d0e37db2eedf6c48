//! Categorization preview, suggestion, and feedback commands

use std::path::Path;

use anyhow::{bail, Result};

use penny_core::{rules::test_rules_against, ExpenseCategory, FeedbackDecision, FeedbackLoop};

use super::{load_config, open_db, truncate};

pub fn cmd_categorize(db_path: &Path, description: &str, amount: f64, vendor: &str) -> Result<()> {
    let db = open_db(db_path)?;

    let matches = test_rules_against(&db, description, amount, vendor)?;
    if matches.is_empty() {
        println!("No active rule matches '{}'", description);
        return Ok(());
    }

    println!("Matching rules (evaluation order):");
    for m in matches {
        let matched_on = match (m.vendor_matched, m.description_matched) {
            (true, true) => "vendor+description",
            (true, false) => "vendor",
            (false, true) => "description",
            (false, false) => "amount range",
        };
        println!(
            "   [{}] {} -> {} (priority {}, on {})",
            m.rule.id, m.rule.name, m.rule.category, m.rule.priority, matched_on
        );
    }

    Ok(())
}

pub fn cmd_suggestions(db_path: &Path, limit: i64) -> Result<()> {
    let db = open_db(db_path)?;
    let pending = db.list_pending_suggestions(limit)?;

    if pending.is_empty() {
        println!("No suggestions awaiting feedback 🎉");
        return Ok(());
    }

    println!("{:<6} {:<24} {:>5}  {}", "ID", "CATEGORY", "CONF", "REASONING");
    for suggestion in pending {
        println!(
            "{:<6} {:<24} {:>4.0}%  {}",
            suggestion.id,
            suggestion.category.as_str(),
            suggestion.confidence * 100.0,
            truncate(&suggestion.reasoning, 50)
        );
    }

    Ok(())
}

pub fn cmd_feedback(
    db_path: &Path,
    config_path: &Path,
    id: i64,
    decision: &str,
    category: Option<&str>,
) -> Result<()> {
    let db = open_db(db_path)?;
    let config = load_config(config_path)?;

    let decision = match decision.to_lowercase().as_str() {
        "accept" => FeedbackDecision::Accept,
        "reject" => FeedbackDecision::Reject,
        other => bail!("Unknown decision '{}' (use accept or reject)", other),
    };

    let override_category = match category {
        Some(name) => Some(
            name.parse::<ExpenseCategory>()
                .map_err(|e| anyhow::anyhow!(e))?,
        ),
        None => None,
    };

    let feedback = FeedbackLoop::new(&db, &config);
    let outcome = feedback.submit(id, decision, override_category)?;

    match outcome.suggestion.accepted {
        Some(true) => println!("✅ Accepted suggestion {}", id),
        Some(false) => match outcome.suggestion.user_category {
            Some(category) => println!("✏️  Rejected suggestion {}, set {}", id, category),
            None => println!("🚫 Rejected suggestion {}", id),
        },
        None => {}
    }

    if let Some(candidate) = outcome.rule_candidate {
        println!(
            "💡 Rule candidate proposed: '{}' -> {} (seen {} times). Review with: penny rules candidates",
            truncate(&candidate.description_pattern, 30),
            candidate.category,
            candidate.occurrences
        );
    }

    Ok(())
}
