//! Query execution and logging
//!
//! Runs compiled queries against storage, measures execution time, and
//! appends one immutable query log entry per question. Aggregation relies
//! on SQL SUM/AVG semantics so absent monetary values are excluded rather
//! than counted as zero.

use chrono::NaiveDate;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

use super::compiler::{AggregationSpec, CompiledQuery, FilterCompiler};
use super::entities::{EntityExtractor, ExtractedEntities};
use super::intent::{classify_intent, QueryIntent};
use crate::db::{CategoryTotal, Database, ExpenseRow, LineItemFilter, PeriodTotal};
use crate::error::Result;

/// Structured result of one query, handed to the response formatter
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryResult {
    Listing {
        items: Vec<ExpenseRow>,
        total_spent: f64,
        count: i64,
    },
    ProjectSummary {
        project_id: i64,
        project_name: String,
        total_spent: f64,
        count: i64,
        document_count: i64,
        budget: Option<f64>,
        budget_remaining: Option<f64>,
        budget_utilization: Option<f64>,
    },
    CategoryAnalysis {
        total_spent: f64,
        count: i64,
        average: Option<f64>,
        vendor_count: i64,
        project_count: i64,
        by_category: Vec<CategoryTotal>,
    },
    TimeAnalysis {
        total_spent: f64,
        count: i64,
        by_period: Vec<PeriodTotal>,
    },
    VendorAnalysis {
        vendor_name: String,
        total_spent: f64,
        count: i64,
        average: Option<f64>,
    },
    /// Unrecognized intent: a user-facing clarification instead of data
    Clarification { message: String },
}

/// Everything a caller gets back for one submitted question
#[derive(Debug, Serialize)]
pub struct QueryOutcome {
    pub question: String,
    pub intent: QueryIntent,
    pub entities: ExtractedEntities,
    pub filters: LineItemFilter,
    pub result: QueryResult,
    /// Confidence in query understanding (0-1)
    pub confidence: f64,
    pub execution_time_ms: i64,
    /// Number of data points the result is based on
    pub data_points: i64,
    pub query_log_id: i64,
}

/// The full question-to-result pipeline
pub struct QueryPipeline<'a> {
    db: &'a Database,
}

impl<'a> QueryPipeline<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Run a raw question through classification, extraction, compilation,
    /// and execution. `reference_date` anchors relative date phrases.
    pub fn run(&self, question: &str, reference_date: NaiveDate) -> Result<QueryOutcome> {
        let started = Instant::now();

        let known_vendors = self.db.vendor_names()?;
        let known_projects = self.db.project_names()?;

        let intent = classify_intent(question, &known_projects, &known_vendors);

        if intent == QueryIntent::Unrecognized {
            let result = QueryResult::Clarification {
                message: "I couldn't relate that question to your expenses. Try asking about \
                          spending on a project, a category, or a vendor."
                    .to_string(),
            };
            return self.finish(
                question,
                intent,
                ExtractedEntities::default(),
                LineItemFilter::new(),
                result,
                0.0,
                0,
                started,
            );
        }

        let extractor = EntityExtractor::new(&known_vendors, &known_projects, reference_date);
        let entities = extractor.extract(question);

        let compiled = FilterCompiler::new(self.db).compile(intent, &entities)?;
        let confidence = understanding_confidence(compiled.intent, &entities);

        let (result, data_points) = self.execute(&compiled)?;

        self.finish(
            question,
            compiled.intent,
            entities,
            compiled.filter,
            result,
            confidence,
            data_points,
            started,
        )
    }

    fn execute(&self, compiled: &CompiledQuery) -> Result<(QueryResult, i64)> {
        match &compiled.aggregation {
            AggregationSpec::Listing { limit } => {
                let items = self.db.list_expenses(&compiled.filter, *limit)?;
                let totals = self.db.filtered_totals(&compiled.filter)?;
                let count = totals.count;
                Ok((
                    QueryResult::Listing {
                        items,
                        total_spent: totals.total,
                        count,
                    },
                    count,
                ))
            }
            AggregationSpec::ProjectSummary {
                project_id,
                project_name,
            } => {
                let totals = self.db.filtered_totals(&compiled.filter)?;
                let invoice_stats = self.db.project_invoice_stats(*project_id)?;
                let budget = self
                    .db
                    .get_project(*project_id)?
                    .and_then(|p| p.budget);
                let budget_remaining = budget.map(|b| b - totals.total);
                let budget_utilization = budget
                    .filter(|b| *b > 0.0)
                    .map(|b| (totals.total / b) * 100.0);
                Ok((
                    QueryResult::ProjectSummary {
                        project_id: *project_id,
                        project_name: project_name.clone(),
                        total_spent: totals.total,
                        count: totals.count,
                        document_count: invoice_stats.document_count,
                        budget,
                        budget_remaining,
                        budget_utilization,
                    },
                    totals.count,
                ))
            }
            AggregationSpec::CategoryAnalysis => {
                let totals = self.db.filtered_totals(&compiled.filter)?;
                let (vendor_count, project_count) =
                    self.db.distinct_vendor_project_counts(&compiled.filter)?;
                let by_category = self.db.category_totals(&compiled.filter)?;
                Ok((
                    QueryResult::CategoryAnalysis {
                        total_spent: totals.total,
                        count: totals.count,
                        average: totals.average,
                        vendor_count,
                        project_count,
                        by_category,
                    },
                    totals.count,
                ))
            }
            AggregationSpec::TimeAnalysis => {
                let totals = self.db.filtered_totals(&compiled.filter)?;
                let by_period = self.db.monthly_totals(&compiled.filter)?;
                Ok((
                    QueryResult::TimeAnalysis {
                        total_spent: totals.total,
                        count: totals.count,
                        by_period,
                    },
                    totals.count,
                ))
            }
            AggregationSpec::VendorAnalysis { vendor } => {
                let totals = self.db.filtered_totals(&compiled.filter)?;
                Ok((
                    QueryResult::VendorAnalysis {
                        vendor_name: vendor.clone(),
                        total_spent: totals.total,
                        count: totals.count,
                        average: totals.average,
                    },
                    totals.count,
                ))
            }
        }
    }

    /// Write the query log entry and assemble the outcome
    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        question: &str,
        intent: QueryIntent,
        entities: ExtractedEntities,
        filters: LineItemFilter,
        result: QueryResult,
        confidence: f64,
        data_points: i64,
        started: Instant,
    ) -> Result<QueryOutcome> {
        let execution_time_ms = started.elapsed().as_millis() as i64;

        let query_log_id = self.db.insert_query_log(
            question,
            intent.as_str(),
            &serde_json::to_value(&entities)?,
            &serde_json::to_value(&filters)?,
            confidence,
            execution_time_ms,
            data_points,
            &serde_json::to_value(&result)?,
        )?;

        info!(
            intent = intent.as_str(),
            data_points,
            execution_time_ms,
            "Query executed"
        );

        Ok(QueryOutcome {
            question: question.to_string(),
            intent,
            entities,
            filters,
            result,
            confidence,
            execution_time_ms,
            data_points,
            query_log_id,
        })
    }
}

/// Deterministic confidence in query understanding: grows with each
/// extracted entity kind and with a recognized non-default intent
fn understanding_confidence(intent: QueryIntent, entities: &ExtractedEntities) -> f64 {
    let mut confidence: f64 = 0.5;
    if entities.date_range.is_some() {
        confidence += 0.1;
    }
    if entities.amount_min.is_some() || entities.amount_max.is_some() {
        confidence += 0.1;
    }
    if !entities.categories.is_empty() {
        confidence += 0.1;
    }
    if entities.vendor.is_some() {
        confidence += 0.1;
    }
    if entities.project.is_some() {
        confidence += 0.1;
    }
    if intent != QueryIntent::ExpenseSearch {
        confidence += 0.05;
    }
    confidence.min(0.95)
}
