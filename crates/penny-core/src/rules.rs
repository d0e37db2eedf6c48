//! Rule matcher for line item categorization
//!
//! Rules are evaluated in priority order against a line item and its
//! document's vendor name; the first rule whose predicates all hold wins.
//! There is no cross-rule scoring at this stage - confidence shaping
//! happens in the suggestion generator.

use tracing::debug;

use crate::db::Database;
use crate::error::Result;
use crate::models::AutoCategorizationRule;

/// A successful rule match, recording which text predicates hit so the
/// suggestion generator can scale confidence
#[derive(Debug, Clone)]
pub struct RuleMatch {
    pub rule: AutoCategorizationRule,
    pub vendor_matched: bool,
    pub description_matched: bool,
}

impl RuleMatch {
    /// Both vendor and description patterns matched
    pub fn full_text_match(&self) -> bool {
        self.vendor_matched && self.description_matched
    }
}

/// Case-insensitive pattern check. Supports pipe-separated OR alternatives
/// within a single pattern ("HOME DEPOT|HD SUPPLY").
fn pattern_matches(text: &str, pattern: &str) -> bool {
    let text_upper = text.to_uppercase();
    pattern
        .split('|')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .any(|p| text_upper.contains(&p.to_uppercase()))
}

/// Evaluate one rule against (description, amount, vendor).
///
/// Vendor and description patterns are OR-ed; an amount range outside
/// bounds disqualifies the rule regardless of text matches. A rule with no
/// text patterns matches on its amount range alone.
fn evaluate(
    rule: &AutoCategorizationRule,
    description: &str,
    amount: f64,
    vendor_name: &str,
) -> Option<(bool, bool)> {
    if let Some(min) = rule.amount_min {
        if amount < min {
            return None;
        }
    }
    if let Some(max) = rule.amount_max {
        if amount > max {
            return None;
        }
    }

    let vendor_matched = rule
        .vendor_patterns
        .iter()
        .any(|p| pattern_matches(vendor_name, p));
    let description_matched = rule
        .description_patterns
        .iter()
        .any(|p| pattern_matches(description, p));

    let has_text_patterns =
        !rule.vendor_patterns.is_empty() || !rule.description_patterns.is_empty();
    if has_text_patterns && !vendor_matched && !description_matched {
        return None;
    }

    Some((vendor_matched, description_matched))
}

/// Matches line items against the active rule set
pub struct RuleMatcher<'a> {
    db: &'a Database,
}

impl<'a> RuleMatcher<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Find the highest-priority active rule matching the given line item
    /// context. No match is not an error - it signals "uncategorized".
    ///
    /// Rules are read-only during a match pass, so concurrent matching is
    /// safe.
    pub fn match_item(
        &self,
        description: &str,
        amount: f64,
        vendor_name: &str,
    ) -> Result<Option<RuleMatch>> {
        for rule in self.db.list_rules(true)? {
            if let Some((vendor_matched, description_matched)) =
                evaluate(&rule, description, amount, vendor_name)
            {
                debug!(
                    rule = rule.name.as_str(),
                    rule_id = rule.id,
                    vendor_matched,
                    description_matched,
                    "Rule matched '{}'",
                    description
                );
                return Ok(Some(RuleMatch {
                    rule,
                    vendor_matched,
                    description_matched,
                }));
            }
        }
        Ok(None)
    }
}

/// Evaluate every active rule against a description/amount/vendor triple
/// and return all matches (diagnostic helper for rule authoring)
pub fn test_rules_against(
    db: &Database,
    description: &str,
    amount: f64,
    vendor_name: &str,
) -> Result<Vec<RuleMatch>> {
    let mut matches = Vec::new();
    for rule in db.list_rules(true)? {
        if let Some((vendor_matched, description_matched)) =
            evaluate(&rule, description, amount, vendor_name)
        {
            matches.push(RuleMatch {
                rule,
                vendor_matched,
                description_matched,
            });
        }
    }
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRule;
    use crate::taxonomy::ExpenseCategory;

    fn rule(name: &str, category: ExpenseCategory, priority: i64) -> NewRule {
        NewRule {
            name: name.to_string(),
            vendor_patterns: vec![],
            description_patterns: vec![],
            amount_min: None,
            amount_max: None,
            category,
            subcategory: None,
            project_id: None,
            priority,
            confidence_threshold: 0.8,
        }
    }

    #[test]
    fn test_pattern_matching() {
        assert!(pattern_matches("Home Depot Inc.", "home depot"));
        assert!(pattern_matches("SHERWIN-WILLIAMS #123", "sherwin"));
        assert!(pattern_matches("ACE HARDWARE", "LOWES|ACE"));
        assert!(!pattern_matches("Ace Hardware", "LOWES|MENARDS"));
        assert!(!pattern_matches("anything", " | "));
    }

    #[test]
    fn test_vendor_pattern_match_example() {
        let db = Database::in_memory().unwrap();
        let mut r = rule("home depot lumber", ExpenseCategory::MaterialsLumber, 5);
        r.vendor_patterns = vec!["Home Depot".to_string()];
        db.create_rule(&r).unwrap();

        let matcher = RuleMatcher::new(&db);
        let hit = matcher
            .match_item("2x4 stud", 45.0, "Home Depot Inc.")
            .unwrap()
            .unwrap();
        assert_eq!(hit.rule.category, ExpenseCategory::MaterialsLumber);
        assert!(hit.vendor_matched);
        assert!(!hit.description_matched);
    }

    #[test]
    fn test_text_patterns_are_or_but_amount_always_binds() {
        let db = Database::in_memory().unwrap();
        let mut r = rule("paint", ExpenseCategory::PaintInterior, 5);
        r.vendor_patterns = vec!["Sherwin".to_string()];
        r.description_patterns = vec!["paint".to_string()];
        r.amount_min = Some(10.0);
        r.amount_max = Some(100.0);
        db.create_rule(&r).unwrap();

        let matcher = RuleMatcher::new(&db);

        // Description matches, vendor doesn't: still a match
        let hit = matcher
            .match_item("interior paint gallon", 50.0, "Ace Hardware")
            .unwrap();
        assert!(hit.is_some());
        let hit = hit.unwrap();
        assert!(!hit.vendor_matched);
        assert!(hit.description_matched);
        assert!(!hit.full_text_match());

        // Both match
        let hit = matcher
            .match_item("interior paint gallon", 50.0, "Sherwin-Williams")
            .unwrap()
            .unwrap();
        assert!(hit.full_text_match());

        // Text matches but amount out of range: disqualified
        assert!(matcher
            .match_item("interior paint gallon", 500.0, "Sherwin-Williams")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_priority_order_decides() {
        let db = Database::in_memory().unwrap();
        let mut low = rule("generic labor", ExpenseCategory::LaborGeneral, 1);
        low.description_patterns = vec!["install".to_string()];
        db.create_rule(&low).unwrap();
        let mut high = rule("plumber", ExpenseCategory::LaborPlumber, 10);
        high.description_patterns = vec!["install".to_string()];
        db.create_rule(&high).unwrap();

        let matcher = RuleMatcher::new(&db);
        let hit = matcher
            .match_item("install new sink", 200.0, "Joe's Plumbing")
            .unwrap()
            .unwrap();
        assert_eq!(hit.rule.category, ExpenseCategory::LaborPlumber);
    }

    #[test]
    fn test_priority_tie_broken_by_newest() {
        let db = Database::in_memory().unwrap();
        let mut older = rule("older", ExpenseCategory::LaborGeneral, 5);
        older.description_patterns = vec!["install".to_string()];
        db.create_rule(&older).unwrap();
        let mut newer = rule("newer", ExpenseCategory::LaborPlumber, 5);
        newer.description_patterns = vec!["install".to_string()];
        let newer_id = db.create_rule(&newer).unwrap();

        let matcher = RuleMatcher::new(&db);
        let hit = matcher
            .match_item("install new sink", 200.0, "Joe's Plumbing")
            .unwrap()
            .unwrap();
        assert_eq!(hit.rule.id, newer_id);
    }

    #[test]
    fn test_amount_only_rule() {
        let db = Database::in_memory().unwrap();
        let mut r = rule("large invoices", ExpenseCategory::LaborContractor, 1);
        r.amount_min = Some(5000.0);
        db.create_rule(&r).unwrap();

        let matcher = RuleMatcher::new(&db);
        assert!(matcher
            .match_item("phase 1 payment", 8000.0, "Anyone")
            .unwrap()
            .is_some());
        assert!(matcher
            .match_item("phase 1 payment", 80.0, "Anyone")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_inactive_rules_skipped_and_determinism() {
        let db = Database::in_memory().unwrap();
        let mut r = rule("depot", ExpenseCategory::MaterialsLumber, 5);
        r.vendor_patterns = vec!["Home Depot".to_string()];
        let id = db.create_rule(&r).unwrap();

        let matcher = RuleMatcher::new(&db);
        let first = matcher.match_item("2x4", 10.0, "Home Depot").unwrap();
        let second = matcher.match_item("2x4", 10.0, "Home Depot").unwrap();
        assert_eq!(
            first.as_ref().map(|m| m.rule.id),
            second.as_ref().map(|m| m.rule.id)
        );

        db.set_rule_active(id, false).unwrap();
        assert!(matcher.match_item("2x4", 10.0, "Home Depot").unwrap().is_none());
    }
}
