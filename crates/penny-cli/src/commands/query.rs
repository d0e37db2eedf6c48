//! Natural-language query commands

use std::path::Path;

use anyhow::Result;
use chrono::Local;

use penny_core::{QueryPipeline, QueryResult};

use super::{open_db, truncate};

pub fn cmd_query(db_path: &Path, question: &str) -> Result<()> {
    let db = open_db(db_path)?;

    let pipeline = QueryPipeline::new(&db);
    let outcome = pipeline.run(question, Local::now().date_naive())?;

    println!();
    println!("❓ {}", question);
    println!(
        "   intent: {} (confidence {:.0}%, {} data points, {}ms)",
        outcome.intent,
        outcome.confidence * 100.0,
        outcome.data_points,
        outcome.execution_time_ms
    );
    println!();

    match outcome.result {
        QueryResult::Clarification { message } => {
            println!("🤔 {}", message);
        }
        QueryResult::Listing {
            items,
            total_spent,
            count,
        } => {
            println!("   {} matching items, total {:.2}", count, total_spent);
            for item in items.iter().take(20) {
                println!(
                    "   {:<10} {:<24} {:>10.2}  {}",
                    item.invoice_date.as_deref().unwrap_or("-"),
                    truncate(&item.vendor_name, 24),
                    item.line_total,
                    truncate(&item.description, 36)
                );
            }
        }
        QueryResult::ProjectSummary {
            project_name,
            total_spent,
            count,
            document_count,
            budget,
            budget_remaining,
            budget_utilization,
            ..
        } => {
            println!("📁 {}", project_name);
            println!("   Spent: {:.2} across {} items, {} documents", total_spent, count, document_count);
            if let Some(budget) = budget {
                println!("   Budget: {:.2}", budget);
            }
            if let (Some(remaining), Some(utilization)) = (budget_remaining, budget_utilization) {
                println!("   Remaining: {:.2} ({:.1}% used)", remaining, utilization);
            }
        }
        QueryResult::CategoryAnalysis {
            total_spent,
            count,
            average,
            vendor_count,
            project_count,
            by_category,
        } => {
            println!("   Total: {:.2} across {} items", total_spent, count);
            if let Some(average) = average {
                println!("   Average: {:.2}", average);
            }
            println!("   Vendors: {}, projects: {}", vendor_count, project_count);
            for row in by_category {
                println!("   {:<24} {:>10.2}  ({} items)", row.category.as_str(), row.total, row.count);
            }
        }
        QueryResult::TimeAnalysis {
            total_spent,
            count,
            by_period,
        } => {
            println!("   Total: {:.2} across {} items", total_spent, count);
            for period in by_period {
                println!("   {:<8} {:>10.2}  ({} items)", period.period, period.total, period.count);
            }
        }
        QueryResult::VendorAnalysis {
            vendor_name,
            total_spent,
            count,
            average,
        } => {
            println!("🏪 {}", vendor_name);
            println!("   Total: {:.2} across {} transactions", total_spent, count);
            if let Some(average) = average {
                println!("   Average: {:.2}", average);
            }
        }
    }

    Ok(())
}

pub fn cmd_query_log(db_path: &Path, limit: i64) -> Result<()> {
    let db = open_db(db_path)?;
    let entries = db.list_query_log(limit)?;

    if entries.is_empty() {
        println!("No queries logged yet");
        return Ok(());
    }

    println!("{:<6} {:<18} {:>6} {:>7}  {}", "ID", "INTENT", "ROWS", "MS", "QUESTION");
    for entry in entries {
        println!(
            "{:<6} {:<18} {:>6} {:>7}  {}",
            entry.id,
            entry.intent,
            entry.data_points,
            entry.execution_time_ms,
            truncate(&entry.question, 48)
        );
    }

    Ok(())
}
