//! Vendor operations
//!
//! Vendor creation is an explicit idempotent find-or-create step invoked
//! before ingestion runs, not a hidden side effect of storing a document.

use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::Vendor;

impl Database {
    /// Find a vendor by name (case-insensitive) or create it.
    ///
    /// Returns the vendor id either way; repeated calls with the same name
    /// are no-ops.
    pub fn find_or_create_vendor(&self, name: &str) -> Result<i64> {
        let conn = self.conn()?;
        let trimmed = name.trim();

        if let Some(id) = conn
            .query_row(
                "SELECT id FROM vendors WHERE name = ? COLLATE NOCASE",
                params![trimmed],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
        {
            return Ok(id);
        }

        conn.execute("INSERT INTO vendors (name) VALUES (?)", params![trimmed])?;
        let id = conn.last_insert_rowid();
        debug!(vendor = trimmed, id, "Created vendor");
        Ok(id)
    }

    /// Get a vendor by id
    pub fn get_vendor(&self, id: i64) -> Result<Option<Vendor>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, address, phone, email, tax_id, notes, created_at FROM vendors WHERE id = ?",
            params![id],
            |row| {
                let created_at_str: String = row.get(7)?;
                Ok(Vendor {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    address: row.get(2)?,
                    phone: row.get(3)?,
                    email: row.get(4)?,
                    tax_id: row.get(5)?,
                    notes: row.get(6)?,
                    created_at: parse_datetime(&created_at_str),
                })
            },
        )
        .optional()
        .map_err(|e| e.into())
    }

    /// Update optional vendor contact details
    pub fn update_vendor_details(
        &self,
        id: i64,
        address: Option<&str>,
        phone: Option<&str>,
        email: Option<&str>,
        tax_id: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE vendors SET
                address = COALESCE(?, address),
                phone = COALESCE(?, phone),
                email = COALESCE(?, email),
                tax_id = COALESCE(?, tax_id)
            WHERE id = ?
            "#,
            params![address, phone, email, tax_id, id],
        )?;
        Ok(())
    }

    /// List all vendor names (used by query entity extraction)
    pub fn vendor_names(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name FROM vendors ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    #[test]
    fn test_find_or_create_is_idempotent() {
        let db = Database::in_memory().unwrap();
        let a = db.find_or_create_vendor("Home Depot").unwrap();
        let b = db.find_or_create_vendor("home depot").unwrap();
        let c = db.find_or_create_vendor("  Home Depot  ").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(db.vendor_names().unwrap().len(), 1);
    }

    #[test]
    fn test_vendor_details_update() {
        let db = Database::in_memory().unwrap();
        let id = db.find_or_create_vendor("Ace Hardware").unwrap();
        db.update_vendor_details(id, Some("123 Main St"), None, None, None)
            .unwrap();
        let vendor = db.get_vendor(id).unwrap().unwrap();
        assert_eq!(vendor.address.as_deref(), Some("123 Main St"));
        assert!(vendor.phone.is_none());
    }
}
