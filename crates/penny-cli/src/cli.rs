//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Penny - Track and question your renovation spending
#[derive(Parser)]
#[command(name = "penny")]
#[command(about = "Renovation expense categorization and query engine", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "penny.db", global = true)]
    pub db: PathBuf,

    /// Engine config file (TOML); compiled defaults when absent
    #[arg(long, default_value = "penny.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Show database status
    Status,

    /// Ingest a parsed financial document (JSON from the document parser)
    Ingest {
        /// JSON file containing the parsed document
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Preview which rules match a line item without storing anything
    Categorize {
        /// Line item description
        #[arg(short, long)]
        description: String,

        /// Line total amount
        #[arg(short, long, default_value = "0.0")]
        amount: f64,

        /// Vendor name context
        #[arg(long, default_value = "")]
        vendor: String,
    },

    /// List suggestions awaiting feedback
    Suggestions {
        /// Maximum number to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Submit feedback on a suggestion
    Feedback {
        /// Suggestion id
        #[arg(short, long)]
        id: i64,

        /// Decision: accept or reject
        #[arg(short, long)]
        decision: String,

        /// Override category (with reject)
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Ask a natural-language question about spending
    Query {
        /// The question
        question: String,
    },

    /// List or acknowledge budget alerts
    Alerts {
        /// Only this project
        #[arg(short, long)]
        project: Option<i64>,

        /// Include dormant alerts
        #[arg(long)]
        all: bool,

        /// Acknowledge the alert with this id
        #[arg(long)]
        ack: Option<i64>,
    },

    /// Recompute all budget alerts from current totals
    Sweep,

    /// Manage categorization rules
    Rules {
        #[command(subcommand)]
        action: Option<RulesAction>,
    },

    /// Manage budgets
    Budgets {
        #[command(subcommand)]
        action: Option<BudgetsAction>,
    },

    /// Manage projects
    Projects {
        #[command(subcommand)]
        action: Option<ProjectsAction>,
    },

    /// Show job progress
    Jobs {
        /// A specific job id
        #[arg(long)]
        id: Option<i64>,

        /// Maximum number to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Show recent query log entries
    QueryLog {
        /// Maximum number to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// Add a rule
    Add {
        /// Rule name
        #[arg(long)]
        name: String,

        /// Vendor pattern (pipe-separated alternatives)
        #[arg(long)]
        vendor: Option<String>,

        /// Description pattern (pipe-separated alternatives)
        #[arg(long)]
        pattern: Option<String>,

        /// Target category
        #[arg(long)]
        category: String,

        /// Minimum amount
        #[arg(long)]
        min: Option<f64>,

        /// Maximum amount
        #[arg(long)]
        max: Option<f64>,

        /// Rule priority (higher first)
        #[arg(long, default_value = "0")]
        priority: i64,

        /// Base confidence when matched
        #[arg(long, default_value = "0.8")]
        confidence: f64,
    },

    /// Deactivate a rule (rules are never deleted)
    Disable {
        /// Rule id
        id: i64,
    },

    /// Reactivate a rule
    Enable {
        /// Rule id
        id: i64,
    },

    /// List rule candidates proposed by the feedback loop
    Candidates,
}

#[derive(Subcommand)]
pub enum BudgetsAction {
    /// Set a budget for a project, optionally scoped to a category
    Set {
        /// Project id
        #[arg(long)]
        project: i64,

        /// Category scope (whole project when omitted)
        #[arg(long)]
        category: Option<String>,

        /// Budget amount
        #[arg(long)]
        amount: f64,

        /// Warning threshold percentage
        #[arg(long, default_value = "80.0")]
        warn: f64,
    },
}

#[derive(Subcommand)]
pub enum ProjectsAction {
    /// Add a project
    Add {
        /// Project name
        name: String,

        /// Project type (kitchen_remodel, bathroom_remodel, ...)
        #[arg(long, default_value = "other")]
        project_type: String,

        /// Project budget
        #[arg(long)]
        budget: Option<f64>,
    },
}
