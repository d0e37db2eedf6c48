//! Append-only natural-language query log
//!
//! Entries are write-once: created by the query executor, never updated.

use rusqlite::params;
use serde::Serialize;

use super::{parse_datetime, Database};
use crate::error::Result;

/// A logged natural-language query
#[derive(Debug, Clone, Serialize)]
pub struct QueryLogEntry {
    pub id: i64,
    pub question: String,
    pub intent: String,
    pub entities: serde_json::Value,
    pub filters: serde_json::Value,
    pub confidence: f64,
    pub execution_time_ms: i64,
    pub data_points: i64,
    pub result: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Database {
    /// Append a query log entry
    #[allow(clippy::too_many_arguments)]
    pub fn insert_query_log(
        &self,
        question: &str,
        intent: &str,
        entities: &serde_json::Value,
        filters: &serde_json::Value,
        confidence: f64,
        execution_time_ms: i64,
        data_points: i64,
        result: &serde_json::Value,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO query_log (
                question, intent, entities, filters, confidence,
                execution_time_ms, data_points, result
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                question,
                intent,
                serde_json::to_string(entities)?,
                serde_json::to_string(filters)?,
                confidence,
                execution_time_ms,
                data_points,
                serde_json::to_string(result)?,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent query log entries
    pub fn list_query_log(&self, limit: i64) -> Result<Vec<QueryLogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, question, intent, entities, filters, confidence,
                   execution_time_ms, data_points, result, created_at
            FROM query_log
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )?;

        let entries = stmt
            .query_map(params![limit], |row| {
                let entities_json: String = row.get(3)?;
                let filters_json: String = row.get(4)?;
                let result_json: String = row.get(8)?;
                let created_at_str: String = row.get(9)?;

                Ok(QueryLogEntry {
                    id: row.get(0)?,
                    question: row.get(1)?,
                    intent: row.get(2)?,
                    entities: serde_json::from_str(&entities_json)
                        .unwrap_or(serde_json::Value::Null),
                    filters: serde_json::from_str(&filters_json)
                        .unwrap_or(serde_json::Value::Null),
                    confidence: row.get(5)?,
                    execution_time_ms: row.get(6)?,
                    data_points: row.get(7)?,
                    result: serde_json::from_str(&result_json).unwrap_or(serde_json::Value::Null),
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}
