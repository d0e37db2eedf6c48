//! Penny CLI - Renovation expense tracker
//!
//! Usage:
//!   penny init                      Initialize database
//!   penny ingest --file doc.json    Ingest a parsed document
//!   penny query "how much on paint this summer?"
//!   penny alerts                    Show active budget alerts

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Status => commands::cmd_status(&cli.db),
        Commands::Ingest { file } => commands::cmd_ingest(&cli.db, &cli.config, &file),
        Commands::Categorize {
            description,
            amount,
            vendor,
        } => commands::cmd_categorize(&cli.db, &description, amount, &vendor),
        Commands::Suggestions { limit } => commands::cmd_suggestions(&cli.db, limit),
        Commands::Feedback {
            id,
            decision,
            category,
        } => commands::cmd_feedback(&cli.db, &cli.config, id, &decision, category.as_deref()),
        Commands::Query { question } => commands::cmd_query(&cli.db, &question),
        Commands::Alerts { project, all, ack } => {
            commands::cmd_alerts(&cli.db, project, all, ack)
        }
        Commands::Sweep => commands::cmd_sweep(&cli.db, &cli.config),
        Commands::Rules { action } => match action {
            None => commands::cmd_rules_list(&cli.db),
            Some(RulesAction::Add {
                name,
                vendor,
                pattern,
                category,
                min,
                max,
                priority,
                confidence,
            }) => commands::cmd_rules_add(
                &cli.db,
                &name,
                vendor.as_deref(),
                pattern.as_deref(),
                &category,
                min,
                max,
                priority,
                confidence,
            ),
            Some(RulesAction::Disable { id }) => commands::cmd_rules_set_active(&cli.db, id, false),
            Some(RulesAction::Enable { id }) => commands::cmd_rules_set_active(&cli.db, id, true),
            Some(RulesAction::Candidates) => commands::cmd_rules_candidates(&cli.db),
        },
        Commands::Budgets { action } => match action {
            None => commands::cmd_budgets_list(&cli.db),
            Some(BudgetsAction::Set {
                project,
                category,
                amount,
                warn,
            }) => commands::cmd_budgets_set(&cli.db, project, category.as_deref(), amount, warn),
        },
        Commands::Projects { action } => match action {
            None => commands::cmd_projects_list(&cli.db),
            Some(ProjectsAction::Add {
                name,
                project_type,
                budget,
            }) => commands::cmd_projects_add(&cli.db, &name, &project_type, budget),
        },
        Commands::Jobs { id, limit } => commands::cmd_jobs(&cli.db, id, limit),
        Commands::QueryLog { limit } => commands::cmd_query_log(&cli.db, limit),
    }
}
