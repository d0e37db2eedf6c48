//! Entity extraction from natural-language questions
//!
//! Pulls date ranges, amount bounds, category references, and vendor or
//! project name candidates out of a question. Extraction failure for a
//! given kind is never fatal - the kind simply stays absent and the filter
//! compiler treats absence as "no constraint on that dimension".

use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::taxonomy::{self, ExpenseCategory};

/// Entities extracted from one question
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub amount_min: Option<f64>,
    pub amount_max: Option<f64>,
    pub categories: Vec<ExpenseCategory>,
    pub vendor: Option<String>,
    pub project: Option<String>,
}

const MONTHS: [(&str, u32); 12] = [
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

const SEASONS: [(&str, u32, u32); 5] = [
    // name, start month, end month (of the reference year)
    ("spring", 3, 5),
    ("summer", 6, 8),
    ("fall", 9, 11),
    ("autumn", 9, 11),
    ("winter", 12, 2),
];

fn month_start(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    Some(NaiveDate::from_ymd_opt(next_year, next_month, 1)? - Duration::days(1))
}

fn words_of(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect()
}

/// Whether the question carries any date phrase the extractor understands.
/// Used by the intent classifier as the time-analysis signal.
pub fn contains_date_phrase(question: &str) -> bool {
    let lower = question.to_lowercase();
    let words = words_of(question);

    if SEASONS.iter().any(|(name, _, _)| words.iter().any(|w| w == name)) {
        return true;
    }
    if MONTHS.iter().any(|(name, _)| words.iter().any(|w| w == name)) {
        return true;
    }
    for phrase in ["this month", "last month", "this year", "last year"] {
        if lower.contains(phrase) {
            return true;
        }
    }
    if let Ok(re) = Regex::new(r"\b\d{4}-\d{2}-\d{2}\b") {
        if re.is_match(&lower) {
            return true;
        }
    }
    if let Ok(re) = Regex::new(YEAR_PATTERN) {
        if re.is_match(&lower) {
            return true;
        }
    }
    false
}

/// A four-digit year not preceded by '$', '.' or another digit, so dollar
/// amounts like "$2000" don't read as dates
const YEAR_PATTERN: &str = r"(?:^|[^$.\d])((?:19|20)\d{2})\b";

/// Extracts entities against the known vendor and project name lists.
///
/// `reference_date` anchors relative phrases ("this summer", "last month")
/// so extraction stays deterministic and testable.
pub struct EntityExtractor<'a> {
    known_vendors: &'a [String],
    known_projects: &'a [String],
    reference_date: NaiveDate,
}

impl<'a> EntityExtractor<'a> {
    pub fn new(
        known_vendors: &'a [String],
        known_projects: &'a [String],
        reference_date: NaiveDate,
    ) -> Self {
        Self {
            known_vendors,
            known_projects,
            reference_date,
        }
    }

    pub fn extract(&self, question: &str) -> ExtractedEntities {
        let lower = question.to_lowercase();

        let (amount_min, amount_max) = self.extract_amounts(&lower);

        ExtractedEntities {
            date_range: self.extract_date_range(&lower),
            amount_min,
            amount_max,
            categories: taxonomy::categories_in_text(question),
            vendor: longest_name_match(&lower, self.known_vendors),
            project: longest_name_match(&lower, self.known_projects),
        }
    }

    fn extract_date_range(&self, lower: &str) -> Option<(NaiveDate, NaiveDate)> {
        let words = words_of(lower);
        let ref_year = self.reference_date.year();

        // Explicit ISO dates win over everything else
        if let Ok(re) = Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b") {
            let mut dates: Vec<NaiveDate> = re
                .captures_iter(lower)
                .filter_map(|c| {
                    NaiveDate::from_ymd_opt(
                        c[1].parse().ok()?,
                        c[2].parse().ok()?,
                        c[3].parse().ok()?,
                    )
                })
                .collect();
            if !dates.is_empty() {
                dates.sort();
                return Some((dates[0], dates[dates.len() - 1]));
            }
        }

        // Named seasons map to calendar month ranges of the reference year;
        // winter spans the year boundary and means the most recent one
        for (name, start_month, end_month) in SEASONS {
            if words.iter().any(|w| w == name) {
                return if start_month > end_month {
                    Some((
                        month_start(ref_year - 1, start_month)?,
                        month_end(ref_year, end_month)?,
                    ))
                } else {
                    Some((
                        month_start(ref_year, start_month)?,
                        month_end(ref_year, end_month)?,
                    ))
                };
            }
        }

        // Relative phrases
        if lower.contains("this month") {
            let month = self.reference_date.month();
            return Some((month_start(ref_year, month)?, month_end(ref_year, month)?));
        }
        if lower.contains("last month") {
            let (year, month) = if self.reference_date.month() == 1 {
                (ref_year - 1, 12)
            } else {
                (ref_year, self.reference_date.month() - 1)
            };
            return Some((month_start(year, month)?, month_end(year, month)?));
        }
        if lower.contains("this year") {
            return Some((month_start(ref_year, 1)?, month_end(ref_year, 12)?));
        }
        if lower.contains("last year") {
            return Some((month_start(ref_year - 1, 1)?, month_end(ref_year - 1, 12)?));
        }

        // Month names; an explicit year in the question overrides the
        // reference year
        let year = Regex::new(YEAR_PATTERN)
            .ok()
            .and_then(|re| re.captures(lower))
            .and_then(|c| c[1].parse::<i32>().ok())
            .unwrap_or(ref_year);

        let mentioned: Vec<u32> = words
            .iter()
            .filter_map(|w| {
                MONTHS
                    .iter()
                    .find(|(name, _)| name == w)
                    .map(|(_, number)| *number)
            })
            .collect();
        match mentioned.as_slice() {
            [] => {}
            [month] => return Some((month_start(year, *month)?, month_end(year, *month)?)),
            months => {
                let first = months[0];
                let last = months[months.len() - 1];
                // "June to August": forward range; a reversed mention order
                // still yields a valid range
                let (lo, hi) = if first <= last { (first, last) } else { (last, first) };
                return Some((month_start(year, lo)?, month_end(year, hi)?));
            }
        }

        // A bare year means the whole year
        if let Ok(re) = Regex::new(YEAR_PATTERN) {
            if let Some(c) = re.captures(lower) {
                if let Ok(y) = c[1].parse::<i32>() {
                    return Some((month_start(y, 1)?, month_end(y, 12)?));
                }
            }
        }

        None
    }

    fn extract_amounts(&self, lower: &str) -> (Option<f64>, Option<f64>) {
        let number = r"\$?([\d,]+(?:\.\d{1,2})?)";

        let parse = |s: &str| -> Option<f64> { s.replace(',', "").parse().ok() };

        if let Ok(re) = Regex::new(&format!(r"between\s+{}\s+and\s+{}", number, number)) {
            if let Some(c) = re.captures(lower) {
                let low = parse(&c[1]);
                let high = parse(&c[2]);
                if low.is_some() || high.is_some() {
                    return (low, high);
                }
            }
        }

        let mut amount_min = None;
        let mut amount_max = None;

        if let Ok(re) = Regex::new(&format!(
            r"\b(?:over|above|more than|at least|exceeding)\s+{}",
            number
        )) {
            if let Some(c) = re.captures(lower) {
                amount_min = parse(&c[1]);
            }
        }
        if let Ok(re) = Regex::new(&format!(
            r"\b(?:under|below|less than|at most|up to)\s+{}",
            number
        )) {
            if let Some(c) = re.captures(lower) {
                amount_max = parse(&c[1]);
            }
        }

        (amount_min, amount_max)
    }
}

/// The longest known name appearing in the question (case-insensitive);
/// longest wins so "Home Depot Tool Rental" beats "Home Depot"
fn longest_name_match(lower: &str, names: &[String]) -> Option<String> {
    names
        .iter()
        .filter(|name| !name.trim().is_empty() && lower.contains(&name.to_lowercase()))
        .max_by_key(|name| name.len())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor<'a>(vendors: &'a [String], projects: &'a [String]) -> EntityExtractor<'a> {
        EntityExtractor::new(
            vendors,
            projects,
            NaiveDate::from_ymd_opt(2025, 7, 15).unwrap(),
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_summer_maps_to_june_through_august() {
        let entities = extractor(&[], &[]).extract("How much did I spend on paint this summer?");
        assert_eq!(entities.date_range, Some((date(2025, 6, 1), date(2025, 8, 31))));
        assert!(entities.categories.contains(&ExpenseCategory::PaintInterior));
        assert!(entities.categories.contains(&ExpenseCategory::PaintSupplies));
    }

    #[test]
    fn test_winter_spans_year_boundary() {
        let entities = extractor(&[], &[]).extract("heating costs last winter");
        assert_eq!(entities.date_range, Some((date(2024, 12, 1), date(2025, 2, 28))));
    }

    #[test]
    fn test_month_range() {
        let entities = extractor(&[], &[]).extract("electrical expenses from June to August");
        assert_eq!(entities.date_range, Some((date(2025, 6, 1), date(2025, 8, 31))));
    }

    #[test]
    fn test_single_month_with_explicit_year() {
        let entities = extractor(&[], &[]).extract("what did I pay in June 2024");
        assert_eq!(entities.date_range, Some((date(2024, 6, 1), date(2024, 6, 30))));
    }

    #[test]
    fn test_relative_phrases() {
        let e = extractor(&[], &[]);
        assert_eq!(
            e.extract("spending last month").date_range,
            Some((date(2025, 6, 1), date(2025, 6, 30)))
        );
        assert_eq!(
            e.extract("spending this year").date_range,
            Some((date(2025, 1, 1), date(2025, 12, 31)))
        );
    }

    #[test]
    fn test_iso_dates_win() {
        let entities =
            extractor(&[], &[]).extract("expenses from 2025-03-01 to 2025-04-15 in June");
        assert_eq!(entities.date_range, Some((date(2025, 3, 1), date(2025, 4, 15))));
    }

    #[test]
    fn test_amount_bounds() {
        let e = extractor(&[], &[]);
        let entities = e.extract("show expenses over $500");
        assert_eq!(entities.amount_min, Some(500.0));
        assert_eq!(entities.amount_max, None);

        let entities = e.extract("purchases under 1,250.50");
        assert_eq!(entities.amount_max, Some(1250.5));

        let entities = e.extract("items between $100 and $200");
        assert_eq!(entities.amount_min, Some(100.0));
        assert_eq!(entities.amount_max, Some(200.0));
    }

    #[test]
    fn test_vendor_and_project_candidates() {
        let vendors = vec!["Home Depot".to_string(), "Sherwin-Williams".to_string()];
        let projects = vec!["Master Bath Remodel".to_string()];
        let entities = extractor(&vendors, &projects)
            .extract("What did the master bath remodel cost at Home Depot?");
        assert_eq!(entities.vendor.as_deref(), Some("Home Depot"));
        assert_eq!(entities.project.as_deref(), Some("Master Bath Remodel"));
    }

    #[test]
    fn test_dollar_amount_is_not_a_year() {
        let entities = extractor(&[], &[]).extract("show expenses over $2000");
        assert_eq!(entities.amount_min, Some(2000.0));
        assert!(entities.date_range.is_none());
        assert!(!contains_date_phrase("over $2000"));
    }

    #[test]
    fn test_absent_kinds_stay_absent() {
        let entities = extractor(&[], &[]).extract("show me everything");
        assert!(entities.date_range.is_none());
        assert!(entities.amount_min.is_none());
        assert!(entities.amount_max.is_none());
        assert!(entities.categories.is_empty());
        assert!(entities.vendor.is_none());
        assert!(entities.project.is_none());
    }
}
