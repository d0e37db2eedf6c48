//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `vendors` - Vendor lookup and find-or-create
//! - `projects` - Renovation project operations
//! - `documents` - Financial documents and line items
//! - `rules` - Categorization rules with compare-and-set statistics
//! - `suggestions` - Categorization suggestions and rule candidates
//! - `alerts` - Budgets and budget alert records
//! - `query_log` - Append-only natural-language query log
//! - `jobs` - Document processing job rows
//! - `reports` - Filtered aggregation queries
//! - `line_item_filter` - SQL filter builder shared by reports and queries

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;

mod alerts;
mod documents;
mod jobs;
mod line_item_filter;
mod projects;
mod query_log;
mod reports;
mod rules;
mod suggestions;
mod vendors;

pub use line_item_filter::{FilterResult, LineItemFilter};
pub use query_log::QueryLogEntry;
pub use reports::{
    AggregateTotals, CategoryTotal, ExpenseRow, InvoiceStats, PeriodTotal, VendorTotal,
};
pub use suggestions::{AcceptedCategorization, OverrideCorrection};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Create a new database connection pool
    pub fn new(path: &str) -> Result<Self> {
        // Foreign keys are per-connection in SQLite, so every pooled
        // connection needs the pragma, not just the one running migrations
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` because each pooled
    /// connection would otherwise see its own empty in-memory database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!(
            "{}/penny_test_{}_{}.db",
            std::env::temp_dir().display(),
            std::process::id(),
            id
        );

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- WAL mode: better concurrency, readers don't block writers
            PRAGMA journal_mode = WAL;

            -- Cache size: ~8MB (2000 pages * 4KB default page size)
            PRAGMA cache_size = 2000;

            -- Synchronous NORMAL: good balance of safety and performance
            PRAGMA synchronous = NORMAL;

            -- Store temp tables in memory (faster for aggregation queries)
            PRAGMA temp_store = MEMORY;

            -- Vendors (auto-created by the explicit find-or-create step)
            CREATE TABLE IF NOT EXISTS vendors (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                address TEXT,
                phone TEXT,
                email TEXT,
                tax_id TEXT,
                notes TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Renovation projects
            CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                project_type TEXT NOT NULL,
                description TEXT,
                start_date DATE,
                end_date DATE,
                budget REAL,
                status TEXT NOT NULL DEFAULT 'planning',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Financial documents (invoices, receipts, ...)
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY,
                document_type TEXT NOT NULL,
                vendor_id INTEGER NOT NULL REFERENCES vendors(id),
                vendor_name TEXT NOT NULL,
                invoice_number TEXT,
                invoice_date DATE,
                subtotal REAL,
                total_tax REAL,
                total_amount REAL,
                currency TEXT NOT NULL DEFAULT 'USD',
                project_id INTEGER REFERENCES projects(id),
                payment_status TEXT NOT NULL DEFAULT 'pending',
                content_hash TEXT UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_documents_vendor ON documents(vendor_id);
            CREATE INDEX IF NOT EXISTS idx_documents_project ON documents(project_id);
            CREATE INDEX IF NOT EXISTS idx_documents_date ON documents(invoice_date);

            -- Line items within documents
            CREATE TABLE IF NOT EXISTS line_items (
                id INTEGER PRIMARY KEY,
                document_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                description TEXT NOT NULL,
                quantity REAL NOT NULL,
                unit_price REAL NOT NULL,
                line_total REAL NOT NULL,
                category TEXT,
                subcategory TEXT,
                tax_rate REAL,
                tax_amount REAL,
                project_id INTEGER REFERENCES projects(id)
            );

            CREATE INDEX IF NOT EXISTS idx_line_items_document ON line_items(document_id);
            CREATE INDEX IF NOT EXISTS idx_line_items_category ON line_items(category);
            CREATE INDEX IF NOT EXISTS idx_line_items_project ON line_items(project_id);

            -- Categorization rules (never deleted, only deactivated)
            CREATE TABLE IF NOT EXISTS rules (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                vendor_patterns TEXT NOT NULL DEFAULT '[]',      -- JSON array
                description_patterns TEXT NOT NULL DEFAULT '[]', -- JSON array
                amount_min REAL,
                amount_max REAL,
                category TEXT NOT NULL,
                subcategory TEXT,
                project_id INTEGER REFERENCES projects(id),
                priority INTEGER NOT NULL DEFAULT 0,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                confidence_threshold REAL NOT NULL DEFAULT 0.8,
                last_used DATETIME,
                usage_count INTEGER NOT NULL DEFAULT 0,
                version INTEGER NOT NULL DEFAULT 0,              -- optimistic concurrency
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_rules_priority ON rules(priority DESC);
            CREATE INDEX IF NOT EXISTS idx_rules_active ON rules(is_active);

            -- Categorization suggestions (one per line item per pass)
            CREATE TABLE IF NOT EXISTS suggestions (
                id INTEGER PRIMARY KEY,
                line_item_id INTEGER NOT NULL REFERENCES line_items(id) ON DELETE CASCADE,
                category TEXT NOT NULL,
                subcategory TEXT,
                project_id INTEGER,
                rule_id INTEGER REFERENCES rules(id),
                confidence REAL NOT NULL,
                reasoning TEXT NOT NULL,
                similar_items TEXT NOT NULL DEFAULT '[]',        -- JSON array of ids
                accepted BOOLEAN,                                 -- NULL = awaiting feedback
                user_category TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_suggestions_line_item ON suggestions(line_item_id);
            CREATE INDEX IF NOT EXISTS idx_suggestions_accepted ON suggestions(accepted);

            -- Rule candidates proposed by the feedback loop (operator review)
            CREATE TABLE IF NOT EXISTS rule_candidates (
                id INTEGER PRIMARY KEY,
                vendor_pattern TEXT,
                description_pattern TEXT NOT NULL,
                category TEXT NOT NULL,
                occurrences INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'proposed',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(description_pattern, category)
            );

            -- Budget scopes watched by the alert monitor
            -- category '' = whole-project budget
            CREATE TABLE IF NOT EXISTS budgets (
                id INTEGER PRIMARY KEY,
                project_id INTEGER NOT NULL REFERENCES projects(id),
                category TEXT NOT NULL DEFAULT '',
                amount REAL NOT NULL,
                warning_threshold REAL NOT NULL DEFAULT 80.0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(project_id, category)
            );

            -- Budget alert records, one row per watched scope
            CREATE TABLE IF NOT EXISTS budget_alerts (
                id INTEGER PRIMARY KEY,
                project_id INTEGER NOT NULL REFERENCES projects(id),
                category TEXT NOT NULL DEFAULT '',
                budget_amount REAL NOT NULL,
                current_amount REAL NOT NULL,
                percentage_used REAL NOT NULL,
                warning_threshold REAL NOT NULL,
                state TEXT NOT NULL DEFAULT 'dormant',
                severity TEXT NOT NULL DEFAULT 'low',
                is_active BOOLEAN NOT NULL DEFAULT 0,
                is_acknowledged BOOLEAN NOT NULL DEFAULT 0,
                message TEXT NOT NULL DEFAULT '',
                acknowledged_at DATETIME,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(project_id, category)
            );

            CREATE INDEX IF NOT EXISTS idx_budget_alerts_active ON budget_alerts(is_active);

            -- Natural-language query log (write-once)
            CREATE TABLE IF NOT EXISTS query_log (
                id INTEGER PRIMARY KEY,
                question TEXT NOT NULL,
                intent TEXT NOT NULL,
                entities TEXT NOT NULL,                          -- JSON
                filters TEXT NOT NULL,                           -- JSON
                confidence REAL NOT NULL,
                execution_time_ms INTEGER NOT NULL,
                data_points INTEGER NOT NULL,
                result TEXT NOT NULL,                            -- JSON
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_query_log_intent ON query_log(intent);
            CREATE INDEX IF NOT EXISTS idx_query_log_created ON query_log(created_at);

            -- Document processing jobs
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY,
                document_id INTEGER REFERENCES documents(id),
                source_ref TEXT NOT NULL,                        -- filename or caller reference
                status TEXT NOT NULL DEFAULT 'pending',
                progress REAL NOT NULL DEFAULT 0.0,              -- 0.0 to 100.0, monotonic
                current_step TEXT NOT NULL DEFAULT 'Queued for processing',
                error_message TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                started_at DATETIME,
                completed_at DATETIME
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
            CREATE INDEX IF NOT EXISTS idx_jobs_created ON jobs(created_at);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}
