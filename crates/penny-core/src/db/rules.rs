//! Categorization rule storage
//!
//! Rule statistics (usage_count, last_used) are updated through a
//! compare-and-set protocol on the `version` column so concurrent feedback
//! for the same rule cannot lose updates.

use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{AutoCategorizationRule, NewRule};
use crate::taxonomy::ExpenseCategory;

fn rule_from_row(row: &Row<'_>) -> rusqlite::Result<AutoCategorizationRule> {
    let vendor_patterns_json: String = row.get(2)?;
    let description_patterns_json: String = row.get(3)?;
    let category_str: String = row.get(6)?;
    let last_used_str: Option<String> = row.get(12)?;
    let created_at_str: String = row.get(15)?;

    Ok(AutoCategorizationRule {
        id: row.get(0)?,
        name: row.get(1)?,
        vendor_patterns: serde_json::from_str(&vendor_patterns_json).unwrap_or_default(),
        description_patterns: serde_json::from_str(&description_patterns_json).unwrap_or_default(),
        amount_min: row.get(4)?,
        amount_max: row.get(5)?,
        category: category_str
            .parse()
            .unwrap_or(ExpenseCategory::Miscellaneous),
        subcategory: row.get(7)?,
        project_id: row.get(8)?,
        priority: row.get(9)?,
        is_active: row.get(10)?,
        confidence_threshold: row.get(11)?,
        last_used: last_used_str.map(|s| parse_datetime(&s)),
        usage_count: row.get(13)?,
        version: row.get(14)?,
        created_at: parse_datetime(&created_at_str),
    })
}

const RULE_COLUMNS: &str = "id, name, vendor_patterns, description_patterns, amount_min, \
     amount_max, category, subcategory, project_id, priority, is_active, confidence_threshold, \
     last_used, usage_count, version, created_at";

impl Database {
    /// Create a categorization rule
    pub fn create_rule(&self, rule: &NewRule) -> Result<i64> {
        rule.validate()?;

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO rules (
                name, vendor_patterns, description_patterns, amount_min, amount_max,
                category, subcategory, project_id, priority, confidence_threshold
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                rule.name,
                serde_json::to_string(&rule.vendor_patterns)?,
                serde_json::to_string(&rule.description_patterns)?,
                rule.amount_min,
                rule.amount_max,
                rule.category.as_str(),
                rule.subcategory,
                rule.project_id,
                rule.priority,
                rule.confidence_threshold,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a rule by id
    pub fn get_rule(&self, id: i64) -> Result<Option<AutoCategorizationRule>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM rules WHERE id = ?", RULE_COLUMNS),
            params![id],
            rule_from_row,
        )
        .optional()
        .map_err(|e| e.into())
    }

    /// List rules in evaluation order: priority descending, ties broken by
    /// most-recently-created first
    pub fn list_rules(&self, active_only: bool) -> Result<Vec<AutoCategorizationRule>> {
        let conn = self.conn()?;
        let sql = if active_only {
            format!(
                "SELECT {} FROM rules WHERE is_active = 1 \
                 ORDER BY priority DESC, created_at DESC, id DESC",
                RULE_COLUMNS
            )
        } else {
            format!(
                "SELECT {} FROM rules ORDER BY priority DESC, created_at DESC, id DESC",
                RULE_COLUMNS
            )
        };
        let mut stmt = conn.prepare(&sql)?;
        let rules = stmt
            .query_map([], rule_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    /// Activate or deactivate a rule. Rules are never deleted.
    pub fn set_rule_active(&self, id: i64, active: bool) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE rules SET is_active = ? WHERE id = ?",
            params![active, id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Rule {}", id)));
        }
        Ok(())
    }

    /// Increment a rule's usage statistics with optimistic concurrency.
    ///
    /// The update only applies when `expected_version` still matches; a
    /// concurrent writer makes this return `Error::Conflict` so the caller
    /// can re-read and retry.
    pub fn record_rule_usage(&self, id: i64, expected_version: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE rules SET
                usage_count = usage_count + 1,
                last_used = CURRENT_TIMESTAMP,
                version = version + 1
            WHERE id = ? AND version = ?
            "#,
            params![id, expected_version],
        )?;
        if changed == 0 {
            // Distinguish a missing rule from a version mismatch
            if self.get_rule(id)?.is_none() {
                return Err(Error::NotFound(format!("Rule {}", id)));
            }
            return Err(Error::Conflict(format!(
                "Rule {} was updated concurrently (expected version {})",
                id, expected_version
            )));
        }
        debug!(rule_id = id, "Recorded rule usage");
        Ok(())
    }

    /// Lowest confidence threshold among active rules.
    ///
    /// Similarity-based suggestions are capped strictly below this so
    /// rule-based suggestions always rank first.
    pub fn min_active_rule_threshold(&self) -> Result<Option<f64>> {
        let conn = self.conn()?;
        let min: Option<f64> = conn.query_row(
            "SELECT MIN(confidence_threshold) FROM rules WHERE is_active = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn vendor_rule(name: &str, pattern: &str, priority: i64) -> NewRule {
        NewRule {
            name: name.to_string(),
            vendor_patterns: vec![pattern.to_string()],
            description_patterns: vec![],
            amount_min: None,
            amount_max: None,
            category: ExpenseCategory::MaterialsLumber,
            subcategory: None,
            project_id: None,
            priority,
            confidence_threshold: 0.8,
        }
    }

    #[test]
    fn test_rules_ordered_by_priority_then_newest() {
        let db = Database::in_memory().unwrap();
        let low = db.create_rule(&vendor_rule("low", "ACE", 1)).unwrap();
        let high = db.create_rule(&vendor_rule("high", "HOME DEPOT", 5)).unwrap();
        // Same priority as `high`, created later: must sort before it
        let newest = db.create_rule(&vendor_rule("newest", "LOWES", 5)).unwrap();

        let rules = db.list_rules(true).unwrap();
        let ids: Vec<i64> = rules.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![newest, high, low]);
    }

    #[test]
    fn test_deactivated_rules_excluded() {
        let db = Database::in_memory().unwrap();
        let id = db.create_rule(&vendor_rule("r", "ACE", 1)).unwrap();
        db.set_rule_active(id, false).unwrap();

        assert!(db.list_rules(true).unwrap().is_empty());
        assert_eq!(db.list_rules(false).unwrap().len(), 1);
    }

    #[test]
    fn test_usage_compare_and_set() {
        let db = Database::in_memory().unwrap();
        let id = db.create_rule(&vendor_rule("r", "ACE", 1)).unwrap();

        db.record_rule_usage(id, 0).unwrap();
        let rule = db.get_rule(id).unwrap().unwrap();
        assert_eq!(rule.usage_count, 1);
        assert_eq!(rule.version, 1);
        assert!(rule.last_used.is_some());

        // Stale version loses
        assert!(matches!(
            db.record_rule_usage(id, 0),
            Err(Error::Conflict(_))
        ));
        // Fresh version wins
        db.record_rule_usage(id, 1).unwrap();
        assert_eq!(db.get_rule(id).unwrap().unwrap().usage_count, 2);
    }

    #[test]
    fn test_min_active_threshold() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.min_active_rule_threshold().unwrap(), None);

        let mut r = vendor_rule("a", "ACE", 1);
        r.confidence_threshold = 0.9;
        db.create_rule(&r).unwrap();
        let mut r = vendor_rule("b", "LOWES", 1);
        r.confidence_threshold = 0.7;
        let low_id = db.create_rule(&r).unwrap();

        assert_eq!(db.min_active_rule_threshold().unwrap(), Some(0.7));

        db.set_rule_active(low_id, false).unwrap();
        assert_eq!(db.min_active_rule_threshold().unwrap(), Some(0.9));
    }
}
