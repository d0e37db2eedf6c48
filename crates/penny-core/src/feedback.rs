//! Feedback loop for categorization suggestions
//!
//! Records user acceptance or rejection, writes the final category onto the
//! line item, and keeps rule usage statistics current. Repeated overrides
//! toward the same category get surfaced as a rule candidate for operator
//! review. This is the system's only learning mechanism; it is
//! deterministic and auditable, not a statistical classifier.

use tracing::{debug, info, warn};

use crate::budget::BudgetMonitor;
use crate::config::EngineConfig;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{CategorizationSuggestion, RuleCandidate};
use crate::suggest::{SimilarityScorer, TokenOverlapScorer};
use crate::taxonomy::ExpenseCategory;

/// User decision on a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackDecision {
    Accept,
    Reject,
}

/// Result of submitting feedback
#[derive(Debug)]
pub struct FeedbackOutcome {
    pub suggestion: CategorizationSuggestion,
    /// Present when this correction crossed the repetition threshold and a
    /// rule candidate was proposed
    pub rule_candidate: Option<RuleCandidate>,
}

/// Applies user feedback to suggestions and rule statistics
pub struct FeedbackLoop<'a> {
    db: &'a Database,
    config: &'a EngineConfig,
    scorer: TokenOverlapScorer,
}

impl<'a> FeedbackLoop<'a> {
    pub fn new(db: &'a Database, config: &'a EngineConfig) -> Self {
        Self {
            db,
            config,
            scorer: TokenOverlapScorer,
        }
    }

    /// Submit a user decision for a suggestion.
    ///
    /// Accept finalizes the suggested category and credits the originating
    /// rule. Reject with an override writes the override category and may
    /// propose a rule candidate once the same correction has repeated often
    /// enough. Reject without an override just records the rejection.
    pub fn submit(
        &self,
        suggestion_id: i64,
        decision: FeedbackDecision,
        override_category: Option<ExpenseCategory>,
    ) -> Result<FeedbackOutcome> {
        let suggestion = self
            .db
            .get_suggestion(suggestion_id)?
            .ok_or_else(|| Error::NotFound(format!("Suggestion {}", suggestion_id)))?;

        match decision {
            FeedbackDecision::Accept => {
                self.db
                    .set_suggestion_feedback(suggestion_id, true, override_category)?;

                let final_category = override_category.unwrap_or(suggestion.category);
                self.db.set_line_item_category(
                    suggestion.line_item_id,
                    final_category,
                    suggestion.subcategory.as_deref(),
                )?;

                if let Some(rule_id) = suggestion.rule_id {
                    self.credit_rule(rule_id)?;
                }
                self.recompute_budgets_for_item(suggestion.line_item_id)?;

                debug!(
                    suggestion_id,
                    category = final_category.as_str(),
                    "Suggestion accepted"
                );

                Ok(FeedbackOutcome {
                    suggestion: self.require_suggestion(suggestion_id)?,
                    rule_candidate: None,
                })
            }
            FeedbackDecision::Reject => {
                self.db
                    .set_suggestion_feedback(suggestion_id, false, override_category)?;

                let rule_candidate = if let Some(category) = override_category {
                    self.db.set_line_item_category(
                        suggestion.line_item_id,
                        category,
                        None,
                    )?;
                    self.recompute_budgets_for_item(suggestion.line_item_id)?;
                    self.maybe_propose_candidate(&suggestion, category)?
                } else {
                    None
                };

                debug!(suggestion_id, "Suggestion rejected");

                Ok(FeedbackOutcome {
                    suggestion: self.require_suggestion(suggestion_id)?,
                    rule_candidate,
                })
            }
        }
    }

    fn require_suggestion(&self, id: i64) -> Result<CategorizationSuggestion> {
        self.db
            .get_suggestion(id)?
            .ok_or_else(|| Error::NotFound(format!("Suggestion {}", id)))
    }

    /// Update rule usage statistics through the per-rule compare-and-set
    /// protocol, retrying exactly once on conflict before surfacing a
    /// transient error.
    fn credit_rule(&self, rule_id: i64) -> Result<()> {
        let rule = self
            .db
            .get_rule(rule_id)?
            .ok_or_else(|| Error::NotFound(format!("Rule {}", rule_id)))?;

        match self.db.record_rule_usage(rule_id, rule.version) {
            Ok(()) => Ok(()),
            Err(Error::Conflict(_)) => {
                warn!(rule_id, "Rule statistics conflict, retrying once");
                let rule = self
                    .db
                    .get_rule(rule_id)?
                    .ok_or_else(|| Error::NotFound(format!("Rule {}", rule_id)))?;
                self.db.record_rule_usage(rule_id, rule.version)
            }
            Err(e) => Err(e),
        }
    }

    /// Categorization changes move spend between category scopes, so the
    /// affected project's alerts are recomputed synchronously
    fn recompute_budgets_for_item(&self, line_item_id: i64) -> Result<()> {
        let item = match self.db.get_line_item(line_item_id)? {
            Some(item) => item,
            None => return Ok(()),
        };
        let project_id = match item.project_id {
            Some(id) => Some(id),
            None => self
                .db
                .get_document(item.document_id)?
                .and_then(|d| d.project_id),
        };
        if let Some(project_id) = project_id {
            BudgetMonitor::new(self.db, self.config).recompute_project(project_id)?;
        }
        Ok(())
    }

    /// Propose a rule candidate when the same override has repeated for
    /// similar vendor/description patterns often enough. Candidates are
    /// only proposed, never auto-created as rules.
    fn maybe_propose_candidate(
        &self,
        suggestion: &CategorizationSuggestion,
        category: ExpenseCategory,
    ) -> Result<Option<RuleCandidate>> {
        let (item, vendor_name) = match self.db.get_line_item_with_vendor(suggestion.line_item_id)? {
            Some(context) => context,
            None => return Ok(None),
        };

        let corrections = self.db.list_override_corrections(category)?;
        let similar_count = corrections
            .iter()
            .filter(|c| {
                c.vendor_name.eq_ignore_ascii_case(&vendor_name)
                    || self.scorer.score(&c.description, &item.description)
                        >= self.config.similarity_min_score
            })
            .count() as i64;

        if similar_count < self.config.rule_candidate_min_repeats {
            return Ok(None);
        }

        let candidate_id = self.db.upsert_rule_candidate(
            Some(&vendor_name),
            &item.description,
            category,
            similar_count,
        )?;

        info!(
            category = category.as_str(),
            occurrences = similar_count,
            "Proposed rule candidate for operator review"
        );

        let candidate = self
            .db
            .list_rule_candidates(false)?
            .into_iter()
            .find(|c| c.id == candidate_id);
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DocumentType, NewFinancialDocument, NewLineItem, NewRule, PaymentStatus,
    };
    use crate::suggest::SuggestionGenerator;

    fn store_item(db: &Database, vendor: &str, description: &str, amount: f64, hash: &str) -> i64 {
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
        let (_, item_ids) = db.insert_document(&doc, vendor_id, hash).unwrap();
        item_ids[0]
    }

    fn depot_rule(db: &Database) -> i64 {
        db.create_rule(&NewRule {
            name: "home depot lumber".to_string(),
            vendor_patterns: vec!["Home Depot".to_string()],
            description_patterns: vec![],
            amount_min: None,
            amount_max: None,
            category: ExpenseCategory::MaterialsLumber,
            subcategory: None,
            project_id: None,
            priority: 5,
            confidence_threshold: 0.8,
        })
        .unwrap()
    }

    #[test]
    fn test_accept_credits_rule_and_finalizes() {
        let db = Database::in_memory().unwrap();
        let config = EngineConfig::default();
        let rule_id = depot_rule(&db);
        let item_id = store_item(&db, "Home Depot", "2x4 stud", 45.0, "h1");

        let suggestion = SuggestionGenerator::new(&db, &config).suggest(item_id).unwrap();
        let outcome = FeedbackLoop::new(&db, &config)
            .submit(suggestion.id, FeedbackDecision::Accept, None)
            .unwrap();

        assert_eq!(outcome.suggestion.accepted, Some(true));
        assert!(outcome.rule_candidate.is_none());

        let rule = db.get_rule(rule_id).unwrap().unwrap();
        assert_eq!(rule.usage_count, 1);
        assert!(rule.last_used.is_some());

        let item = db.get_line_item(item_id).unwrap().unwrap();
        assert_eq!(item.category, Some(ExpenseCategory::MaterialsLumber));
    }

    #[test]
    fn test_reject_with_override_writes_override() {
        let db = Database::in_memory().unwrap();
        let config = EngineConfig::default();
        depot_rule(&db);
        let item_id = store_item(&db, "Home Depot", "paint roller", 12.0, "h1");

        let suggestion = SuggestionGenerator::new(&db, &config).suggest(item_id).unwrap();
        let outcome = FeedbackLoop::new(&db, &config)
            .submit(
                suggestion.id,
                FeedbackDecision::Reject,
                Some(ExpenseCategory::PaintSupplies),
            )
            .unwrap();

        assert_eq!(outcome.suggestion.accepted, Some(false));
        assert_eq!(
            outcome.suggestion.user_category,
            Some(ExpenseCategory::PaintSupplies)
        );

        let item = db.get_line_item(item_id).unwrap().unwrap();
        assert_eq!(item.category, Some(ExpenseCategory::PaintSupplies));
    }

    #[test]
    fn test_reject_without_override_leaves_item_uncategorized() {
        let db = Database::in_memory().unwrap();
        let config = EngineConfig::default();
        let item_id = store_item(&db, "Mystery", "widget", 5.0, "h1");

        let suggestion = SuggestionGenerator::new(&db, &config).suggest(item_id).unwrap();
        FeedbackLoop::new(&db, &config)
            .submit(suggestion.id, FeedbackDecision::Reject, None)
            .unwrap();

        assert!(db.get_line_item(item_id).unwrap().unwrap().category.is_none());
    }

    #[test]
    fn test_repeated_override_proposes_candidate_at_boundary() {
        let db = Database::in_memory().unwrap();
        let config = EngineConfig::default();
        assert_eq!(config.rule_candidate_min_repeats, 3);
        depot_rule(&db);

        let generator = SuggestionGenerator::new(&db, &config);
        let feedback = FeedbackLoop::new(&db, &config);

        // Two identical corrections: still below the threshold
        for i in 0..2 {
            let item_id = store_item(
                &db,
                "Home Depot",
                "paint roller 9in",
                12.0,
                &format!("h{}", i),
            );
            let suggestion = generator.suggest(item_id).unwrap();
            let outcome = feedback
                .submit(
                    suggestion.id,
                    FeedbackDecision::Reject,
                    Some(ExpenseCategory::PaintSupplies),
                )
                .unwrap();
            assert!(outcome.rule_candidate.is_none());
        }

        // Third repetition crosses the boundary
        let item_id = store_item(&db, "Home Depot", "paint roller 9in", 12.0, "h-last");
        let suggestion = generator.suggest(item_id).unwrap();
        let outcome = feedback
            .submit(
                suggestion.id,
                FeedbackDecision::Reject,
                Some(ExpenseCategory::PaintSupplies),
            )
            .unwrap();

        let candidate = outcome.rule_candidate.expect("candidate proposed");
        assert_eq!(candidate.category, ExpenseCategory::PaintSupplies);
        assert_eq!(candidate.occurrences, 3);
        assert_eq!(candidate.status, crate::models::RuleCandidateStatus::Proposed);

        // The candidate was proposed, not auto-created as a rule
        assert_eq!(db.list_rules(false).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_suggestion_is_not_found() {
        let db = Database::in_memory().unwrap();
        let config = EngineConfig::default();
        let err = FeedbackLoop::new(&db, &config)
            .submit(999, FeedbackDecision::Accept, None)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
