//! Financial document and line item operations

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    DocumentType, FinancialDocument, LineItem, NewFinancialDocument, PaymentStatus,
};
use crate::taxonomy::ExpenseCategory;

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<FinancialDocument> {
    let document_type_str: String = row.get(1)?;
    let invoice_date_str: Option<String> = row.get(5)?;
    let payment_status_str: String = row.get(11)?;
    let created_at_str: String = row.get(13)?;

    Ok(FinancialDocument {
        id: row.get(0)?,
        document_type: document_type_str.parse().unwrap_or(DocumentType::Other),
        vendor_id: row.get(2)?,
        vendor_name: row.get(3)?,
        invoice_number: row.get(4)?,
        invoice_date: invoice_date_str.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        subtotal: row.get(6)?,
        total_tax: row.get(7)?,
        total_amount: row.get(8)?,
        currency: row.get(9)?,
        project_id: row.get(10)?,
        payment_status: payment_status_str.parse().unwrap_or(PaymentStatus::Pending),
        content_hash: row.get::<_, Option<String>>(12)?.unwrap_or_default(),
        created_at: parse_datetime(&created_at_str),
    })
}

const DOCUMENT_COLUMNS: &str = "id, document_type, vendor_id, vendor_name, invoice_number, \
     invoice_date, subtotal, total_tax, total_amount, currency, project_id, payment_status, \
     content_hash, created_at";

pub(crate) fn line_item_from_row(row: &Row<'_>) -> rusqlite::Result<LineItem> {
    let category_str: Option<String> = row.get(6)?;

    Ok(LineItem {
        id: row.get(0)?,
        document_id: row.get(1)?,
        description: row.get(2)?,
        quantity: row.get(3)?,
        unit_price: row.get(4)?,
        line_total: row.get(5)?,
        category: category_str.and_then(|s| s.parse::<ExpenseCategory>().ok()),
        subcategory: row.get(7)?,
        tax_rate: row.get(8)?,
        tax_amount: row.get(9)?,
        project_id: row.get(10)?,
    })
}

const LINE_ITEM_COLUMNS: &str = "id, document_id, description, quantity, unit_price, line_total, \
     category, subcategory, tax_rate, tax_amount, project_id";

impl Database {
    /// Insert a validated document and its line items in one transaction.
    ///
    /// The caller is responsible for running `NewFinancialDocument::validate`
    /// and resolving `vendor_id` first.
    pub fn insert_document(
        &self,
        doc: &NewFinancialDocument,
        vendor_id: i64,
        content_hash: &str,
    ) -> Result<(i64, Vec<i64>)> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO documents (
                document_type, vendor_id, vendor_name, invoice_number, invoice_date,
                subtotal, total_tax, total_amount, currency, project_id, payment_status,
                content_hash
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                doc.document_type.as_str(),
                vendor_id,
                doc.vendor_name.trim(),
                doc.invoice_number,
                doc.invoice_date.map(|d| d.to_string()),
                doc.subtotal,
                doc.total_tax,
                doc.total_amount,
                doc.currency,
                doc.project_id,
                doc.payment_status.as_str(),
                content_hash,
            ],
        )?;
        let document_id = tx.last_insert_rowid();

        let mut line_item_ids = Vec::with_capacity(doc.line_items.len());
        for item in &doc.line_items {
            tx.execute(
                r#"
                INSERT INTO line_items (
                    document_id, description, quantity, unit_price, line_total,
                    category, subcategory, tax_rate, tax_amount, project_id
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    document_id,
                    item.description,
                    item.quantity,
                    item.unit_price,
                    item.line_total,
                    item.category.map(|c| c.as_str()),
                    item.subcategory,
                    item.tax_rate,
                    item.tax_amount,
                    item.project_id.or(doc.project_id),
                ],
            )?;
            line_item_ids.push(tx.last_insert_rowid());
        }

        tx.commit()?;
        debug!(document_id, items = line_item_ids.len(), "Stored document");
        Ok((document_id, line_item_ids))
    }

    /// Get a document by id
    pub fn get_document(&self, id: i64) -> Result<Option<FinancialDocument>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM documents WHERE id = ?", DOCUMENT_COLUMNS),
            params![id],
            document_from_row,
        )
        .optional()
        .map_err(|e| e.into())
    }

    /// Look up a document by content hash (re-ingestion dedup)
    pub fn get_document_by_hash(&self, content_hash: &str) -> Result<Option<FinancialDocument>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM documents WHERE content_hash = ?",
                DOCUMENT_COLUMNS
            ),
            params![content_hash],
            document_from_row,
        )
        .optional()
        .map_err(|e| e.into())
    }

    /// List documents, newest first
    pub fn list_documents(&self, limit: i64) -> Result<Vec<FinancialDocument>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM documents ORDER BY created_at DESC, id DESC LIMIT ?",
            DOCUMENT_COLUMNS
        ))?;
        let documents = stmt
            .query_map(params![limit], document_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(documents)
    }

    /// Delete a document (line items cascade)
    pub fn delete_document(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM documents WHERE id = ?", params![id])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Document {}", id)));
        }
        Ok(())
    }

    /// Line items of a document
    pub fn line_items_for_document(&self, document_id: i64) -> Result<Vec<LineItem>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM line_items WHERE document_id = ? ORDER BY id",
            LINE_ITEM_COLUMNS
        ))?;
        let items = stmt
            .query_map(params![document_id], line_item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Get a line item by id
    pub fn get_line_item(&self, id: i64) -> Result<Option<LineItem>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM line_items WHERE id = ?", LINE_ITEM_COLUMNS),
            params![id],
            line_item_from_row,
        )
        .optional()
        .map_err(|e| e.into())
    }

    /// Get a line item together with its document's vendor name
    pub fn get_line_item_with_vendor(&self, id: i64) -> Result<Option<(LineItem, String)>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {}, d.vendor_name FROM line_items li \
                 JOIN documents d ON li.document_id = d.id WHERE li.id = ?",
                LINE_ITEM_COLUMNS
                    .split(", ")
                    .map(|c| format!("li.{}", c))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            params![id],
            |row| {
                let item = line_item_from_row(row)?;
                let vendor_name: String = row.get(11)?;
                Ok((item, vendor_name))
            },
        )
        .optional()
        .map_err(|e| e.into())
    }

    /// Write the final category onto a line item
    pub fn set_line_item_category(
        &self,
        id: i64,
        category: ExpenseCategory,
        subcategory: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE line_items SET category = ?, subcategory = ? WHERE id = ?",
            params![category.as_str(), subcategory, id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Line item {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::NewLineItem;

    fn sample_doc() -> NewFinancialDocument {
        NewFinancialDocument {
            document_type: DocumentType::Invoice,
            vendor_name: "Home Depot Inc.".to_string(),
            invoice_number: Some("INV-100".to_string()),
            invoice_date: NaiveDate::from_ymd_opt(2025, 6, 12),
            subtotal: Some(45.0),
            total_tax: Some(3.94),
            total_amount: Some(48.94),
            currency: "USD".to_string(),
            project_id: None,
            payment_status: PaymentStatus::Paid,
            line_items: vec![NewLineItem {
                description: "2x4 stud".to_string(),
                quantity: 10.0,
                unit_price: 4.5,
                line_total: 45.0,
                category: None,
                subcategory: None,
                tax_rate: Some(0.0875),
                tax_amount: Some(3.94),
                project_id: None,
            }],
        }
    }

    #[test]
    fn test_insert_and_read_back() {
        let db = Database::in_memory().unwrap();
        let vendor_id = db.find_or_create_vendor("Home Depot Inc.").unwrap();
        let (doc_id, item_ids) = db.insert_document(&sample_doc(), vendor_id, "hash1").unwrap();

        let doc = db.get_document(doc_id).unwrap().unwrap();
        assert_eq!(doc.vendor_name, "Home Depot Inc.");
        assert_eq!(doc.total_amount, Some(48.94));
        assert_eq!(doc.content_hash, "hash1");

        let items = db.line_items_for_document(doc_id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, item_ids[0]);
        assert!(items[0].category.is_none());

        let (item, vendor) = db.get_line_item_with_vendor(item_ids[0]).unwrap().unwrap();
        assert_eq!(item.description, "2x4 stud");
        assert_eq!(vendor, "Home Depot Inc.");
    }

    #[test]
    fn test_content_hash_lookup() {
        let db = Database::in_memory().unwrap();
        let vendor_id = db.find_or_create_vendor("Home Depot Inc.").unwrap();
        db.insert_document(&sample_doc(), vendor_id, "hash-abc").unwrap();

        assert!(db.get_document_by_hash("hash-abc").unwrap().is_some());
        assert!(db.get_document_by_hash("hash-xyz").unwrap().is_none());
    }

    #[test]
    fn test_category_write_and_cascade_delete() {
        let db = Database::in_memory().unwrap();
        let vendor_id = db.find_or_create_vendor("Home Depot Inc.").unwrap();
        let (doc_id, item_ids) = db.insert_document(&sample_doc(), vendor_id, "hash2").unwrap();

        db.set_line_item_category(item_ids[0], ExpenseCategory::MaterialsLumber, None)
            .unwrap();
        let item = db.get_line_item(item_ids[0]).unwrap().unwrap();
        assert_eq!(item.category, Some(ExpenseCategory::MaterialsLumber));

        db.delete_document(doc_id).unwrap();
        assert!(db.get_line_item(item_ids[0]).unwrap().is_none());
    }
}
