//! Intent classification for natural-language questions
//!
//! Classification is keyword/pattern based over a closed intent set. Ties
//! are broken by a fixed precedence: project_summary > category_analysis >
//! vendor_analysis > time_analysis > expense_search.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::entities::contains_date_phrase;
use crate::taxonomy;

/// The classified purpose of a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    ExpenseSearch,
    ProjectSummary,
    CategoryAnalysis,
    TimeAnalysis,
    VendorAnalysis,
    /// No spending signal at all; short-circuits the pipeline with a
    /// clarification response
    Unrecognized,
}

impl QueryIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExpenseSearch => "expense_search",
            Self::ProjectSummary => "project_summary",
            Self::CategoryAnalysis => "category_analysis",
            Self::TimeAnalysis => "time_analysis",
            Self::VendorAnalysis => "vendor_analysis",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for QueryIntent {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "expense_search" => Ok(Self::ExpenseSearch),
            "project_summary" => Ok(Self::ProjectSummary),
            "category_analysis" => Ok(Self::CategoryAnalysis),
            "time_analysis" => Ok(Self::TimeAnalysis),
            "vendor_analysis" => Ok(Self::VendorAnalysis),
            "unrecognized" => Ok(Self::Unrecognized),
            _ => Err(format!("Unknown query intent: {}", s)),
        }
    }
}

/// Words that mark a question as being about spending at all
const SPENDING_SIGNALS: &[&str] = &[
    "spend", "spent", "spending", "cost", "costs", "paid", "pay", "much", "total", "expense",
    "expenses", "money", "budget", "price", "invoice", "invoices", "receipt", "receipts",
    "purchase", "purchases", "bought", "show", "find", "list", "breakdown",
];

fn name_in_text(text_lower: &str, names: &[String]) -> bool {
    names
        .iter()
        .any(|name| !name.trim().is_empty() && text_lower.contains(&name.to_lowercase()))
}

/// Classify a question against the known project and vendor names.
///
/// Precedence when several signals are present: project > category >
/// vendor > time > expense_search. A question with no spending signal and
/// no recognizable entity is unrecognized.
pub fn classify_intent(
    question: &str,
    known_projects: &[String],
    known_vendors: &[String],
) -> QueryIntent {
    let lower = question.to_lowercase();

    let has_project = name_in_text(&lower, known_projects);
    let has_category = !taxonomy::categories_in_text(question).is_empty();
    let has_vendor = name_in_text(&lower, known_vendors);
    let has_date = contains_date_phrase(question);
    let has_spending_signal = {
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric() && c != '$')
            .filter(|w| !w.is_empty())
            .collect();
        words
            .iter()
            .any(|w| SPENDING_SIGNALS.contains(w) || w.starts_with('$'))
    };

    if !has_spending_signal && !has_project && !has_category && !has_vendor && !has_date {
        return QueryIntent::Unrecognized;
    }

    if has_project {
        QueryIntent::ProjectSummary
    } else if has_category {
        QueryIntent::CategoryAnalysis
    } else if has_vendor {
        QueryIntent::VendorAnalysis
    } else if has_date {
        QueryIntent::TimeAnalysis
    } else {
        QueryIntent::ExpenseSearch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projects() -> Vec<String> {
        vec!["Master Bath Remodel".to_string(), "Kitchen".to_string()]
    }

    fn vendors() -> Vec<String> {
        vec!["Home Depot".to_string(), "Sherwin-Williams".to_string()]
    }

    #[test]
    fn test_project_beats_everything() {
        // Mentions a project, a category, a vendor, and a date phrase
        let intent = classify_intent(
            "How much paint did I buy from Home Depot for the kitchen this summer?",
            &projects(),
            &vendors(),
        );
        assert_eq!(intent, QueryIntent::ProjectSummary);
    }

    #[test]
    fn test_category_beats_vendor_and_time() {
        let intent = classify_intent(
            "How much did I spend on paint at Home Depot this summer?",
            &[],
            &vendors(),
        );
        assert_eq!(intent, QueryIntent::CategoryAnalysis);
    }

    #[test]
    fn test_vendor_beats_time() {
        let intent = classify_intent(
            "What did I spend at Home Depot last month?",
            &[],
            &vendors(),
        );
        assert_eq!(intent, QueryIntent::VendorAnalysis);
    }

    #[test]
    fn test_date_only_is_time_analysis() {
        let intent = classify_intent("How much did I spend in June?", &[], &[]);
        assert_eq!(intent, QueryIntent::TimeAnalysis);
    }

    #[test]
    fn test_default_is_expense_search() {
        let intent = classify_intent("Show me my biggest expenses", &[], &[]);
        assert_eq!(intent, QueryIntent::ExpenseSearch);
    }

    #[test]
    fn test_no_signal_is_unrecognized() {
        let intent = classify_intent("What is the weather like today?", &projects(), &vendors());
        assert_eq!(intent, QueryIntent::Unrecognized);
        assert_eq!(classify_intent("", &[], &[]), QueryIntent::Unrecognized);
    }
}
