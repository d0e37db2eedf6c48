//! Suggestion generator with confidence scoring
//!
//! Wraps the rule matcher. A rule hit produces a confidence derived from
//! the rule's configured threshold, scaled by how many of its text
//! predicates matched. Without a rule hit, a similarity lookup over
//! previously accepted categorizations proposes the closest match's
//! category, capped strictly below every active rule threshold so
//! rule-based suggestions always outrank similarity-based ones.

use tracing::debug;

use crate::config::EngineConfig;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::CategorizationSuggestion;
use crate::rules::RuleMatcher;
use crate::taxonomy::ExpenseCategory;

/// Pluggable similarity scoring between two item descriptions.
///
/// Returns a score in [0, 1]; 1.0 means identical.
pub trait SimilarityScorer {
    fn score(&self, a: &str, b: &str) -> f64;
}

/// Default scorer: token overlap ratio (Jaccard index over lowercased
/// alphanumeric tokens)
pub struct TokenOverlapScorer;

impl SimilarityScorer for TokenOverlapScorer {
    fn score(&self, a: &str, b: &str) -> f64 {
        let tokens = |s: &str| -> Vec<String> {
            s.to_lowercase()
                .split(|c: char| !c.is_alphanumeric())
                .filter(|t| !t.is_empty())
                .map(|t| t.to_string())
                .collect()
        };

        let a_tokens = tokens(a);
        let b_tokens = tokens(b);
        if a_tokens.is_empty() || b_tokens.is_empty() {
            return 0.0;
        }

        let a_set: std::collections::HashSet<&String> = a_tokens.iter().collect();
        let b_set: std::collections::HashSet<&String> = b_tokens.iter().collect();
        let intersection = a_set.intersection(&b_set).count() as f64;
        let union = a_set.union(&b_set).count() as f64;
        intersection / union
    }
}

/// Score a same-vendor candidate at least this much, even when the
/// descriptions barely overlap
const SAME_VENDOR_FLOOR: f64 = 0.5;

/// Confidence assigned when nothing matched at all; well below any
/// acceptance threshold so the item surfaces as pending
const UNCATEGORIZED_CONFIDENCE: f64 = 0.1;

/// Generates and persists categorization suggestions
pub struct SuggestionGenerator<'a> {
    db: &'a Database,
    config: &'a EngineConfig,
    scorer: Box<dyn SimilarityScorer + Send + Sync>,
}

impl<'a> SuggestionGenerator<'a> {
    pub fn new(db: &'a Database, config: &'a EngineConfig) -> Self {
        Self {
            db,
            config,
            scorer: Box::new(TokenOverlapScorer),
        }
    }

    /// Swap in a different similarity scorer
    pub fn with_scorer(mut self, scorer: Box<dyn SimilarityScorer + Send + Sync>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Categorize a stored line item: emit a persisted suggestion, and
    /// finalize the category on the line item only when confidence reaches
    /// the acceptance threshold.
    pub fn suggest(&self, line_item_id: i64) -> Result<CategorizationSuggestion> {
        let (item, vendor_name) = self
            .db
            .get_line_item_with_vendor(line_item_id)?
            .ok_or_else(|| Error::NotFound(format!("Line item {}", line_item_id)))?;

        let matcher = RuleMatcher::new(self.db);
        let proposal = match matcher.match_item(&item.description, item.line_total, &vendor_name)? {
            Some(hit) => {
                let scale = if hit.full_text_match() {
                    self.config.full_text_match_scale
                } else {
                    self.config.partial_text_match_scale
                };
                let confidence = (hit.rule.confidence_threshold * scale).clamp(0.0, 1.0);
                let matched_on = match (hit.vendor_matched, hit.description_matched) {
                    (true, true) => "vendor and description patterns",
                    (true, false) => "vendor pattern",
                    _ => "description pattern",
                };
                Proposal {
                    category: hit.rule.category,
                    subcategory: hit.rule.subcategory.clone(),
                    project_id: hit.rule.project_id,
                    rule_id: Some(hit.rule.id),
                    confidence,
                    reasoning: format!(
                        "Matched rule '{}' on {} (priority {})",
                        hit.rule.name, matched_on, hit.rule.priority
                    ),
                    similar_items: vec![],
                }
            }
            None => self.similarity_proposal(&item.description, &vendor_name)?,
        };

        let suggestion_id = self.db.insert_suggestion(
            line_item_id,
            proposal.category,
            proposal.subcategory.as_deref(),
            proposal.project_id,
            proposal.rule_id,
            proposal.confidence,
            &proposal.reasoning,
            &proposal.similar_items,
        )?;

        // Auto-finalize only above the acceptance threshold; the suggestion
        // itself stays pending until explicit user feedback
        if proposal.confidence >= self.config.acceptance_threshold {
            self.db.set_line_item_category(
                line_item_id,
                proposal.category,
                proposal.subcategory.as_deref(),
            )?;
            debug!(
                line_item_id,
                category = proposal.category.as_str(),
                confidence = proposal.confidence,
                "Auto-finalized category"
            );
        }

        self.db
            .get_suggestion(suggestion_id)?
            .ok_or_else(|| Error::NotFound(format!("Suggestion {}", suggestion_id)))
    }

    /// Fallback proposal from previously accepted categorizations sharing
    /// the vendor or a near-identical description
    fn similarity_proposal(&self, description: &str, vendor_name: &str) -> Result<Proposal> {
        let accepted = self.db.list_accepted_categorizations()?;

        let mut best: Option<(f64, &crate::db::AcceptedCategorization)> = None;
        for candidate in &accepted {
            let text_score = self.scorer.score(description, &candidate.description);
            let same_vendor = candidate.vendor_name.eq_ignore_ascii_case(vendor_name);
            let score = if same_vendor {
                text_score.max(SAME_VENDOR_FLOOR)
            } else {
                text_score
            };
            if score < self.config.similarity_min_score {
                continue;
            }
            match best {
                Some((best_score, _)) if best_score >= score => {}
                _ => best = Some((score, candidate)),
            }
        }

        // Cap below every active rule threshold so similarity never outranks
        // a rule-based suggestion for the same input
        let mut cap = self.config.similarity_confidence_cap;
        if let Some(min_rule) = self.db.min_active_rule_threshold()? {
            cap = cap.min(min_rule * 0.95);
        }

        match best {
            Some((score, candidate)) => Ok(Proposal {
                category: candidate.category,
                subcategory: candidate.subcategory.clone(),
                project_id: None,
                rule_id: None,
                confidence: (score * cap).clamp(0.0, 1.0),
                reasoning: format!(
                    "No rule matched; closest accepted item '{}' from {} (similarity {:.2})",
                    candidate.description, candidate.vendor_name, score
                ),
                similar_items: vec![candidate.line_item_id],
            }),
            None => Ok(Proposal {
                category: ExpenseCategory::Miscellaneous,
                subcategory: None,
                project_id: None,
                rule_id: None,
                confidence: UNCATEGORIZED_CONFIDENCE,
                reasoning: "No rule or similar accepted item matched".to_string(),
                similar_items: vec![],
            }),
        }
    }
}

struct Proposal {
    category: ExpenseCategory,
    subcategory: Option<String>,
    project_id: Option<i64>,
    rule_id: Option<i64>,
    confidence: f64,
    reasoning: String,
    similar_items: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DocumentType, NewFinancialDocument, NewLineItem, NewRule, PaymentStatus,
    };

    fn store_item(db: &Database, vendor: &str, description: &str, amount: f64) -> i64 {
        let vendor_id = db.find_or_create_vendor(vendor).unwrap();
        let doc = NewFinancialDocument {
            document_type: DocumentType::Receipt,
            vendor_name: vendor.to_string(),
            invoice_number: None,
            invoice_date: None,
            subtotal: None,
            total_tax: None,
            total_amount: Some(amount),
            currency: "USD".to_string(),
            project_id: None,
            payment_status: PaymentStatus::Paid,
            line_items: vec![NewLineItem {
                description: description.to_string(),
                quantity: 1.0,
                unit_price: amount,
                line_total: amount,
                category: None,
                subcategory: None,
                tax_rate: None,
                tax_amount: None,
                project_id: None,
            }],
        };
        let hash = format!("{}-{}-{}", vendor, description, amount);
        let (_, item_ids) = db.insert_document(&doc, vendor_id, &hash).unwrap();
        item_ids[0]
    }

    fn depot_rule(db: &Database, threshold: f64) -> i64 {
        db.create_rule(&NewRule {
            name: "home depot lumber".to_string(),
            vendor_patterns: vec!["Home Depot".to_string()],
            description_patterns: vec!["stud|lumber".to_string()],
            amount_min: None,
            amount_max: None,
            category: ExpenseCategory::MaterialsLumber,
            subcategory: None,
            project_id: None,
            priority: 5,
            confidence_threshold: threshold,
        })
        .unwrap()
    }

    #[test]
    fn test_token_overlap_scorer() {
        let scorer = TokenOverlapScorer;
        assert_eq!(scorer.score("2x4 stud", "2x4 stud"), 1.0);
        assert!(scorer.score("2x4 stud lumber", "2x4 stud") > 0.5);
        assert_eq!(scorer.score("paint roller", "copper pipe"), 0.0);
        assert_eq!(scorer.score("", "anything"), 0.0);
    }

    #[test]
    fn test_rule_match_confidence_meets_threshold() {
        let db = Database::in_memory().unwrap();
        let config = EngineConfig::default();
        let rule_id = depot_rule(&db, 0.9);
        let item_id = store_item(&db, "Home Depot Inc.", "2x4 stud", 45.0);

        let suggestion = SuggestionGenerator::new(&db, &config).suggest(item_id).unwrap();
        assert_eq!(suggestion.category, ExpenseCategory::MaterialsLumber);
        assert_eq!(suggestion.rule_id, Some(rule_id));
        // Both vendor and description matched: full scale
        assert!((suggestion.confidence - 0.9).abs() < 1e-9);
        assert!(suggestion.confidence >= 0.0 && suggestion.confidence <= 1.0);

        // Above the acceptance threshold: category finalized on the item
        let item = db.get_line_item(item_id).unwrap().unwrap();
        assert_eq!(item.category, Some(ExpenseCategory::MaterialsLumber));
        // But user feedback is still pending on the suggestion
        assert!(suggestion.accepted.is_none());
    }

    #[test]
    fn test_partial_text_match_scales_confidence_down() {
        let db = Database::in_memory().unwrap();
        let config = EngineConfig::default();
        depot_rule(&db, 0.9);
        // Vendor matches, description does not
        let item_id = store_item(&db, "Home Depot Inc.", "shop vac", 80.0);

        let suggestion = SuggestionGenerator::new(&db, &config).suggest(item_id).unwrap();
        let expected = 0.9 * config.partial_text_match_scale;
        assert!((suggestion.confidence - expected).abs() < 1e-9);

        // Below the acceptance threshold: line item stays uncategorized
        let item = db.get_line_item(item_id).unwrap().unwrap();
        assert!(item.category.is_none());
    }

    #[test]
    fn test_similarity_fallback_ranks_below_rules() {
        let db = Database::in_memory().unwrap();
        let config = EngineConfig::default();
        depot_rule(&db, 0.7);

        // Build an accepted categorization for the similarity pool
        let accepted_item = store_item(&db, "Ace Hardware", "copper pipe 10ft", 30.0);
        let generator = SuggestionGenerator::new(&db, &config);
        let s = generator.suggest(accepted_item).unwrap();
        db.set_suggestion_feedback(s.id, true, Some(ExpenseCategory::PlumbingPipes))
            .unwrap();

        // A near-identical description with no rule match
        let item_id = store_item(&db, "Ace Hardware", "copper pipe 20ft", 55.0);
        let suggestion = generator.suggest(item_id).unwrap();

        assert_eq!(suggestion.category, ExpenseCategory::PlumbingPipes);
        assert!(suggestion.rule_id.is_none());
        assert_eq!(suggestion.similar_items, vec![accepted_item]);
        // Strictly below the lowest active rule threshold
        assert!(suggestion.confidence < 0.7);
        assert!(suggestion.confidence > 0.0);
    }

    #[test]
    fn test_no_signal_yields_low_confidence_pending() {
        let db = Database::in_memory().unwrap();
        let config = EngineConfig::default();
        let item_id = store_item(&db, "Mystery Vendor", "widget", 12.0);

        let suggestion = SuggestionGenerator::new(&db, &config).suggest(item_id).unwrap();
        assert_eq!(suggestion.category, ExpenseCategory::Miscellaneous);
        assert_eq!(suggestion.confidence, UNCATEGORIZED_CONFIDENCE);
        assert!(suggestion.accepted.is_none());
        assert!(db.get_line_item(item_id).unwrap().unwrap().category.is_none());
    }
}
