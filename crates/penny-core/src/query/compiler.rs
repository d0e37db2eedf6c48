//! Filter compilation: (intent, entities) -> (filter, aggregation spec)
//!
//! Deterministic mapping per the intent table. An intent missing its
//! required entity degrades to expense_search with whatever partial
//! filters are available rather than failing outright.

use serde::Serialize;
use tracing::debug;

use super::entities::ExtractedEntities;
use super::intent::QueryIntent;
use crate::db::{Database, LineItemFilter};
use crate::error::Result;

/// Default listing size for expense searches
const DEFAULT_LISTING_LIMIT: i64 = 50;

/// What to compute over the filtered line items
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregationSpec {
    /// List matching documents/line items
    Listing { limit: i64 },
    /// Sum, count, date range, and budget comparison for one project
    ProjectSummary { project_id: i64, project_name: String },
    /// Sum, average, count, and vendor/project counts for categories
    CategoryAnalysis,
    /// Sum and count grouped by month
    TimeAnalysis,
    /// Sum, average, and transaction count for one vendor
    VendorAnalysis { vendor: String },
}

/// A compiled query ready for execution
#[derive(Debug, Clone, Serialize)]
pub struct CompiledQuery {
    /// The effective intent (may have degraded to expense_search)
    pub intent: QueryIntent,
    pub filter: LineItemFilter,
    pub aggregation: AggregationSpec,
}

/// Compiles (intent, entities) into an executable query
pub struct FilterCompiler<'a> {
    db: &'a Database,
}

impl<'a> FilterCompiler<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn compile(&self, intent: QueryIntent, entities: &ExtractedEntities) -> Result<CompiledQuery> {
        // Resolve the project reference up front; it constrains the filter
        // for every intent that has one
        let project = match &entities.project {
            Some(name) => self.db.get_project_by_name(name)?,
            None => None,
        };

        let filter = LineItemFilter::new()
            .categories(entities.categories.clone())
            .vendor(entities.vendor.clone())
            .project_id(project.as_ref().map(|p| p.id))
            .date_range(entities.date_range)
            .amount_min(entities.amount_min)
            .amount_max(entities.amount_max);

        let compiled = match intent {
            QueryIntent::ProjectSummary => match project {
                Some(project) => CompiledQuery {
                    intent,
                    filter,
                    aggregation: AggregationSpec::ProjectSummary {
                        project_id: project.id,
                        project_name: project.name,
                    },
                },
                None => self.degrade(intent, filter),
            },
            QueryIntent::CategoryAnalysis => {
                if entities.categories.is_empty() {
                    self.degrade(intent, filter)
                } else {
                    CompiledQuery {
                        intent,
                        filter,
                        aggregation: AggregationSpec::CategoryAnalysis,
                    }
                }
            }
            QueryIntent::TimeAnalysis => {
                if entities.date_range.is_none() {
                    self.degrade(intent, filter)
                } else {
                    CompiledQuery {
                        intent,
                        filter,
                        aggregation: AggregationSpec::TimeAnalysis,
                    }
                }
            }
            QueryIntent::VendorAnalysis => match entities.vendor.clone() {
                Some(vendor) => CompiledQuery {
                    intent,
                    filter,
                    aggregation: AggregationSpec::VendorAnalysis { vendor },
                },
                None => self.degrade(intent, filter),
            },
            QueryIntent::ExpenseSearch | QueryIntent::Unrecognized => CompiledQuery {
                intent: QueryIntent::ExpenseSearch,
                filter,
                aggregation: AggregationSpec::Listing {
                    limit: DEFAULT_LISTING_LIMIT,
                },
            },
        };

        Ok(compiled)
    }

    /// Required entity missing: fall back to a plain search over the
    /// partial filters
    fn degrade(&self, from: QueryIntent, filter: LineItemFilter) -> CompiledQuery {
        debug!(from = from.as_str(), "Missing required entity, degrading to expense_search");
        CompiledQuery {
            intent: QueryIntent::ExpenseSearch,
            filter,
            aggregation: AggregationSpec::Listing {
                limit: DEFAULT_LISTING_LIMIT,
            },
        }
    }
}
