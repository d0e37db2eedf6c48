//! Line item filter builder for constructing dynamic SQL queries
//!
//! This module provides a builder pattern for constructing WHERE clauses
//! and parameters for filtered expense queries. The same filter feeds both
//! listing and aggregation queries so they can never disagree.

use chrono::NaiveDate;
use serde::Serialize;

use crate::taxonomy::ExpenseCategory;

/// Builder for expense query filters.
///
/// Filters own their values (rather than borrowing) because they are
/// compiled from extracted query entities and serialized into the query log.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LineItemFilter {
    pub categories: Vec<ExpenseCategory>,
    pub vendor: Option<String>,
    pub project_id: Option<i64>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub amount_min: Option<f64>,
    pub amount_max: Option<f64>,
}

/// Result of building a filter - contains SQL components and parameters
pub struct FilterResult {
    /// JOIN clause (line items always join their document)
    pub join_clause: &'static str,
    /// WHERE clause including "WHERE" keyword (empty if no conditions)
    pub where_clause: String,
    /// Parameters for the query (boxed for rusqlite compatibility)
    pub params: Vec<Box<dyn rusqlite::ToSql>>,
}

impl LineItemFilter {
    /// Create a new filter builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to these categories (empty = no constraint)
    pub fn categories(mut self, categories: Vec<ExpenseCategory>) -> Self {
        self.categories = categories;
        self
    }

    /// Restrict to a vendor (case-insensitive substring of vendor name)
    pub fn vendor(mut self, vendor: Option<String>) -> Self {
        self.vendor = vendor;
        self
    }

    /// Restrict to a project (matches the line item's project, falling back
    /// to the owning document's project)
    pub fn project_id(mut self, id: Option<i64>) -> Self {
        self.project_id = id;
        self
    }

    /// Restrict to an invoice date range (inclusive)
    pub fn date_range(mut self, range: Option<(NaiveDate, NaiveDate)>) -> Self {
        self.date_range = range;
        self
    }

    /// Restrict to line totals at or above this amount
    pub fn amount_min(mut self, min: Option<f64>) -> Self {
        self.amount_min = min;
        self
    }

    /// Restrict to line totals at or below this amount
    pub fn amount_max(mut self, max: Option<f64>) -> Self {
        self.amount_max = max;
        self
    }

    /// True when no dimension is constrained
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
            && self.vendor.is_none()
            && self.project_id.is_none()
            && self.date_range.is_none()
            && self.amount_min.is_none()
            && self.amount_max.is_none()
    }

    /// Build the filter components
    pub fn build(&self) -> FilterResult {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        // Category filter
        if !self.categories.is_empty() {
            let placeholders: Vec<&str> = self.categories.iter().map(|_| "?").collect();
            conditions.push(format!("li.category IN ({})", placeholders.join(", ")));
            for category in &self.categories {
                params.push(Box::new(category.as_str().to_string()));
            }
        }

        // Vendor filter
        if let Some(ref vendor) = self.vendor {
            if !vendor.trim().is_empty() {
                conditions.push("d.vendor_name LIKE ? COLLATE NOCASE".to_string());
                params.push(Box::new(format!("%{}%", vendor.trim())));
            }
        }

        // Project filter - line item assignment wins over the document's
        if let Some(project_id) = self.project_id {
            conditions.push(
                "(li.project_id = ? OR (li.project_id IS NULL AND d.project_id = ?))".to_string(),
            );
            params.push(Box::new(project_id));
            params.push(Box::new(project_id));
        }

        // Date range filter (on the document's invoice date)
        if let Some((from_date, to_date)) = self.date_range {
            conditions.push("d.invoice_date >= ? AND d.invoice_date <= ?".to_string());
            params.push(Box::new(from_date.to_string()));
            params.push(Box::new(to_date.to_string()));
        }

        // Amount bounds
        if let Some(min) = self.amount_min {
            conditions.push("li.line_total >= ?".to_string());
            params.push(Box::new(min));
        }
        if let Some(max) = self.amount_max {
            conditions.push("li.line_total <= ?".to_string());
            params.push(Box::new(max));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        FilterResult {
            join_clause: "JOIN documents d ON li.document_id = d.id",
            where_clause,
            params,
        }
    }
}

impl FilterResult {
    /// Get parameter references for query execution
    pub fn params_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}
