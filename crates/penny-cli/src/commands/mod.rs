//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init, status) and shared utilities (open_db)
//! - `ingest` - Document ingestion and job progress commands
//! - `categorize` - Categorization preview, suggestions, and feedback
//! - `query` - Natural-language query and query log commands
//! - `alerts` - Budget alert and budget management commands
//! - `rules` - Rule management commands
//! - `projects` - Project management commands

pub mod alerts;
pub mod categorize;
pub mod core;
pub mod ingest;
pub mod projects;
pub mod query;
pub mod rules;

// Re-export command functions for main.rs
pub use alerts::*;
pub use categorize::*;
pub use core::*;
pub use ingest::*;
pub use projects::*;
pub use query::*;
pub use rules::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
