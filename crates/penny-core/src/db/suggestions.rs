//! Categorization suggestion and rule candidate storage

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{CategorizationSuggestion, RuleCandidate, RuleCandidateStatus};
use crate::taxonomy::ExpenseCategory;

/// A previously accepted categorization, joined with its line item context.
/// Feeds the similarity fallback in the suggestion generator.
#[derive(Debug, Clone)]
pub struct AcceptedCategorization {
    pub line_item_id: i64,
    pub description: String,
    pub vendor_name: String,
    pub category: ExpenseCategory,
    pub subcategory: Option<String>,
}

/// A rejected suggestion with the user's override, joined with context.
/// Feeds rule candidate proposal in the feedback loop.
#[derive(Debug, Clone)]
pub struct OverrideCorrection {
    pub suggestion_id: i64,
    pub description: String,
    pub vendor_name: String,
    pub category: ExpenseCategory,
}

fn suggestion_from_row(row: &Row<'_>) -> rusqlite::Result<CategorizationSuggestion> {
    let category_str: String = row.get(2)?;
    let similar_items_json: String = row.get(8)?;
    let user_category_str: Option<String> = row.get(10)?;
    let created_at_str: String = row.get(11)?;

    Ok(CategorizationSuggestion {
        id: row.get(0)?,
        line_item_id: row.get(1)?,
        category: category_str
            .parse()
            .unwrap_or(ExpenseCategory::Miscellaneous),
        subcategory: row.get(3)?,
        project_id: row.get(4)?,
        rule_id: row.get(5)?,
        confidence: row.get(6)?,
        reasoning: row.get(7)?,
        similar_items: serde_json::from_str(&similar_items_json).unwrap_or_default(),
        accepted: row.get(9)?,
        user_category: user_category_str.and_then(|s| s.parse().ok()),
        created_at: parse_datetime(&created_at_str),
    })
}

const SUGGESTION_COLUMNS: &str = "id, line_item_id, category, subcategory, project_id, rule_id, \
     confidence, reasoning, similar_items, accepted, user_category, created_at";

impl Database {
    /// Store a fresh suggestion for a line item
    #[allow(clippy::too_many_arguments)]
    pub fn insert_suggestion(
        &self,
        line_item_id: i64,
        category: ExpenseCategory,
        subcategory: Option<&str>,
        project_id: Option<i64>,
        rule_id: Option<i64>,
        confidence: f64,
        reasoning: &str,
        similar_items: &[i64],
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO suggestions (
                line_item_id, category, subcategory, project_id, rule_id,
                confidence, reasoning, similar_items
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                line_item_id,
                category.as_str(),
                subcategory,
                project_id,
                rule_id,
                confidence,
                reasoning,
                serde_json::to_string(similar_items)?,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a suggestion by id
    pub fn get_suggestion(&self, id: i64) -> Result<Option<CategorizationSuggestion>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM suggestions WHERE id = ?", SUGGESTION_COLUMNS),
            params![id],
            suggestion_from_row,
        )
        .optional()
        .map_err(|e| e.into())
    }

    /// The most recent suggestion for a line item, if any
    pub fn latest_suggestion_for_item(
        &self,
        line_item_id: i64,
    ) -> Result<Option<CategorizationSuggestion>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM suggestions WHERE line_item_id = ? \
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                SUGGESTION_COLUMNS
            ),
            params![line_item_id],
            suggestion_from_row,
        )
        .optional()
        .map_err(|e| e.into())
    }

    /// Record the user's decision on a suggestion (update, never replace)
    pub fn set_suggestion_feedback(
        &self,
        id: i64,
        accepted: bool,
        user_category: Option<ExpenseCategory>,
    ) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE suggestions SET accepted = ?, user_category = ? WHERE id = ?",
            params![accepted, user_category.map(|c| c.as_str()), id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Suggestion {}", id)));
        }
        Ok(())
    }

    /// Suggestions still awaiting feedback, lowest confidence first
    pub fn list_pending_suggestions(&self, limit: i64) -> Result<Vec<CategorizationSuggestion>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM suggestions WHERE accepted IS NULL \
             ORDER BY confidence ASC, id ASC LIMIT ?",
            SUGGESTION_COLUMNS
        ))?;
        let suggestions = stmt
            .query_map(params![limit], suggestion_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(suggestions)
    }

    /// Accepted categorizations with line item context, for similarity lookup.
    ///
    /// A user override counts with the overridden category, an acceptance
    /// with the suggested one.
    pub fn list_accepted_categorizations(&self) -> Result<Vec<AcceptedCategorization>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT s.line_item_id, li.description, d.vendor_name,
                   COALESCE(s.user_category, s.category), s.subcategory
            FROM suggestions s
            JOIN line_items li ON s.line_item_id = li.id
            JOIN documents d ON li.document_id = d.id
            WHERE s.accepted = 1 OR s.user_category IS NOT NULL
            ORDER BY s.created_at DESC, s.id DESC
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                let category_str: String = row.get(3)?;
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    category_str,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(line_item_id, description, vendor_name, category_str, subcategory)| {
                category_str
                    .parse::<ExpenseCategory>()
                    .ok()
                    .map(|category| AcceptedCategorization {
                        line_item_id,
                        description,
                        vendor_name,
                        category,
                        subcategory,
                    })
            })
            .collect())
    }

    /// Rejected suggestions whose override landed on the given category,
    /// with line item context
    pub fn list_override_corrections(
        &self,
        category: ExpenseCategory,
    ) -> Result<Vec<OverrideCorrection>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT s.id, li.description, d.vendor_name
            FROM suggestions s
            JOIN line_items li ON s.line_item_id = li.id
            JOIN documents d ON li.document_id = d.id
            WHERE s.accepted = 0 AND s.user_category = ?
            ORDER BY s.created_at DESC, s.id DESC
            "#,
        )?;
        let corrections = stmt
            .query_map(params![category.as_str()], |row| {
                Ok(OverrideCorrection {
                    suggestion_id: row.get(0)?,
                    description: row.get(1)?,
                    vendor_name: row.get(2)?,
                    category,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(corrections)
    }

    /// Create or refresh a rule candidate for operator review.
    ///
    /// Candidates are keyed by (description_pattern, category); repeats bump
    /// the occurrence count instead of creating duplicates.
    pub fn upsert_rule_candidate(
        &self,
        vendor_pattern: Option<&str>,
        description_pattern: &str,
        category: ExpenseCategory,
        occurrences: i64,
    ) -> Result<i64> {
        let conn = self.conn()?;

        if let Some(id) = conn
            .query_row(
                "SELECT id FROM rule_candidates WHERE description_pattern = ? AND category = ?",
                params![description_pattern, category.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
        {
            conn.execute(
                "UPDATE rule_candidates SET occurrences = ?, vendor_pattern = COALESCE(?, vendor_pattern) WHERE id = ?",
                params![occurrences, vendor_pattern, id],
            )?;
            return Ok(id);
        }

        conn.execute(
            r#"
            INSERT INTO rule_candidates (vendor_pattern, description_pattern, category, occurrences)
            VALUES (?, ?, ?, ?)
            "#,
            params![vendor_pattern, description_pattern, category.as_str(), occurrences],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List rule candidates, optionally only those awaiting review
    pub fn list_rule_candidates(&self, proposed_only: bool) -> Result<Vec<RuleCandidate>> {
        let conn = self.conn()?;
        let sql = if proposed_only {
            "SELECT id, vendor_pattern, description_pattern, category, occurrences, status, created_at \
             FROM rule_candidates WHERE status = 'proposed' ORDER BY occurrences DESC, id"
        } else {
            "SELECT id, vendor_pattern, description_pattern, category, occurrences, status, created_at \
             FROM rule_candidates ORDER BY occurrences DESC, id"
        };
        let mut stmt = conn.prepare(sql)?;
        let candidates = stmt
            .query_map([], |row| {
                let category_str: String = row.get(3)?;
                let status_str: String = row.get(5)?;
                let created_at_str: String = row.get(6)?;
                Ok(RuleCandidate {
                    id: row.get(0)?,
                    vendor_pattern: row.get(1)?,
                    description_pattern: row.get(2)?,
                    category: category_str
                        .parse()
                        .unwrap_or(ExpenseCategory::Miscellaneous),
                    occurrences: row.get(4)?,
                    status: status_str.parse().unwrap_or(RuleCandidateStatus::Proposed),
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(candidates)
    }

    /// Resolve a rule candidate after operator review
    pub fn set_rule_candidate_status(&self, id: i64, status: RuleCandidateStatus) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE rule_candidates SET status = ? WHERE id = ?",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Rule candidate {}", id)));
        }
        Ok(())
    }
}
