//! Filtered aggregation queries over line items and documents
//!
//! All monetary aggregation uses SQL SUM/AVG, which exclude NULL values
//! rather than treating them as zero; empty result sets report a zero total
//! and no average.

use rusqlite::params;
use serde::Serialize;

use super::line_item_filter::LineItemFilter;
use super::Database;
use crate::error::Result;
use crate::taxonomy::ExpenseCategory;

/// One matched line item with its document context
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseRow {
    pub line_item_id: i64,
    pub document_id: i64,
    pub invoice_date: Option<String>,
    pub vendor_name: String,
    pub description: String,
    pub category: Option<ExpenseCategory>,
    pub line_total: f64,
    pub project_id: Option<i64>,
}

/// Aggregate over a filtered set of line items
#[derive(Debug, Clone, Serialize)]
pub struct AggregateTotals {
    pub total: f64,
    pub count: i64,
    pub average: Option<f64>,
}

/// Per-category rollup
#[derive(Debug, Clone, Serialize)]
pub struct CategoryTotal {
    pub category: ExpenseCategory,
    pub total: f64,
    pub count: i64,
}

/// Per-vendor rollup
#[derive(Debug, Clone, Serialize)]
pub struct VendorTotal {
    pub vendor_name: String,
    pub total: f64,
    pub count: i64,
    pub average: f64,
}

/// Per-month rollup (period formatted YYYY-MM)
#[derive(Debug, Clone, Serialize)]
pub struct PeriodTotal {
    pub period: String,
    pub total: f64,
    pub count: i64,
}

/// Document-level invoice statistics for a project summary
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceStats {
    pub document_count: i64,
    /// SUM over non-null document totals
    pub invoice_total: Option<f64>,
    /// AVG over non-null document totals (absent totals are excluded, not
    /// counted as zero)
    pub average_invoice: Option<f64>,
}

impl Database {
    /// List matching line items, newest invoice first
    pub fn list_expenses(&self, filter: &LineItemFilter, limit: i64) -> Result<Vec<ExpenseRow>> {
        let built = filter.build();
        let conn = self.conn()?;

        let sql = format!(
            "SELECT li.id, li.document_id, d.invoice_date, d.vendor_name, li.description, \
                    li.category, li.line_total, COALESCE(li.project_id, d.project_id) \
             FROM line_items li {} {} \
             ORDER BY d.invoice_date DESC, li.id DESC LIMIT {}",
            built.join_clause, built.where_clause, limit
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(built.params_refs().as_slice(), |row| {
                let category_str: Option<String> = row.get(5)?;
                Ok(ExpenseRow {
                    line_item_id: row.get(0)?,
                    document_id: row.get(1)?,
                    invoice_date: row.get(2)?,
                    vendor_name: row.get(3)?,
                    description: row.get(4)?,
                    category: category_str.and_then(|s| s.parse().ok()),
                    line_total: row.get(6)?,
                    project_id: row.get(7)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Sum, count, and average of matching line totals
    pub fn filtered_totals(&self, filter: &LineItemFilter) -> Result<AggregateTotals> {
        let built = filter.build();
        let conn = self.conn()?;

        let sql = format!(
            "SELECT COALESCE(SUM(li.line_total), 0), COUNT(*), AVG(li.line_total) \
             FROM line_items li {} {}",
            built.join_clause, built.where_clause
        );

        conn.query_row(&sql, built.params_refs().as_slice(), |row| {
            Ok(AggregateTotals {
                total: row.get(0)?,
                count: row.get(1)?,
                average: row.get(2)?,
            })
        })
        .map_err(|e| e.into())
    }

    /// Matching line totals grouped by category (uncategorized rows excluded)
    pub fn category_totals(&self, filter: &LineItemFilter) -> Result<Vec<CategoryTotal>> {
        let built = filter.build();
        let conn = self.conn()?;

        let extra = if built.where_clause.is_empty() {
            "WHERE li.category IS NOT NULL".to_string()
        } else {
            format!("{} AND li.category IS NOT NULL", built.where_clause)
        };

        let sql = format!(
            "SELECT li.category, SUM(li.line_total), COUNT(*) \
             FROM line_items li {} {} \
             GROUP BY li.category ORDER BY SUM(li.line_total) DESC",
            built.join_clause, extra
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(built.params_refs().as_slice(), |row| {
                let category_str: String = row.get(0)?;
                Ok((category_str, row.get::<_, f64>(1)?, row.get::<_, i64>(2)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(category_str, total, count)| {
                category_str
                    .parse::<ExpenseCategory>()
                    .ok()
                    .map(|category| CategoryTotal {
                        category,
                        total,
                        count,
                    })
            })
            .collect())
    }

    /// Matching line totals grouped by vendor
    pub fn vendor_totals(&self, filter: &LineItemFilter) -> Result<Vec<VendorTotal>> {
        let built = filter.build();
        let conn = self.conn()?;

        let sql = format!(
            "SELECT d.vendor_name, SUM(li.line_total), COUNT(*), AVG(li.line_total) \
             FROM line_items li {} {} \
             GROUP BY d.vendor_name ORDER BY SUM(li.line_total) DESC",
            built.join_clause, built.where_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(built.params_refs().as_slice(), |row| {
                Ok(VendorTotal {
                    vendor_name: row.get(0)?,
                    total: row.get(1)?,
                    count: row.get(2)?,
                    average: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Matching line totals grouped by invoice month (undated documents
    /// excluded)
    pub fn monthly_totals(&self, filter: &LineItemFilter) -> Result<Vec<PeriodTotal>> {
        let built = filter.build();
        let conn = self.conn()?;

        let extra = if built.where_clause.is_empty() {
            "WHERE d.invoice_date IS NOT NULL".to_string()
        } else {
            format!("{} AND d.invoice_date IS NOT NULL", built.where_clause)
        };

        let sql = format!(
            "SELECT strftime('%Y-%m', d.invoice_date), SUM(li.line_total), COUNT(*) \
             FROM line_items li {} {} \
             GROUP BY strftime('%Y-%m', d.invoice_date) ORDER BY 1",
            built.join_clause, extra
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(built.params_refs().as_slice(), |row| {
                Ok(PeriodTotal {
                    period: row.get(0)?,
                    total: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Count of distinct vendors and projects among matching line items
    pub fn distinct_vendor_project_counts(&self, filter: &LineItemFilter) -> Result<(i64, i64)> {
        let built = filter.build();
        let conn = self.conn()?;

        let sql = format!(
            "SELECT COUNT(DISTINCT d.vendor_id), \
                    COUNT(DISTINCT COALESCE(li.project_id, d.project_id)) \
             FROM line_items li {} {}",
            built.join_clause, built.where_clause
        );

        conn.query_row(&sql, built.params_refs().as_slice(), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .map_err(|e| e.into())
    }

    /// Document-level invoice statistics for a project (NULL totals are
    /// excluded from the sum and average, never coalesced to zero)
    pub fn project_invoice_stats(&self, project_id: i64) -> Result<InvoiceStats> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT COUNT(*), SUM(total_amount), AVG(total_amount) \
             FROM documents WHERE project_id = ?",
            params![project_id],
            |row| {
                Ok(InvoiceStats {
                    document_count: row.get(0)?,
                    invoice_total: row.get(1)?,
                    average_invoice: row.get(2)?,
                })
            },
        )
        .map_err(|e| e.into())
    }

    /// Total spend attributed to a project (line item assignment wins over
    /// the owning document's)
    pub fn project_spend(&self, project_id: i64) -> Result<f64> {
        let conn = self.conn()?;
        let total: f64 = conn.query_row(
            "SELECT COALESCE(SUM(li.line_total), 0) \
             FROM line_items li JOIN documents d ON li.document_id = d.id \
             WHERE li.project_id = ? OR (li.project_id IS NULL AND d.project_id = ?)",
            params![project_id, project_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Total spend attributed to a project within one category
    pub fn project_category_spend(
        &self,
        project_id: i64,
        category: ExpenseCategory,
    ) -> Result<f64> {
        let conn = self.conn()?;
        let total: f64 = conn.query_row(
            "SELECT COALESCE(SUM(li.line_total), 0) \
             FROM line_items li JOIN documents d ON li.document_id = d.id \
             WHERE (li.project_id = ? OR (li.project_id IS NULL AND d.project_id = ?)) \
               AND li.category = ?",
            params![project_id, project_id, category.as_str()],
            |row| row.get(0),
        )?;
        Ok(total)
    }
}
