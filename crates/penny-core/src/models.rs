//! Domain models for Penny

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::taxonomy::ExpenseCategory;

/// Tolerance for the line-total arithmetic invariant, in currency units
pub const LINE_TOTAL_EPSILON: f64 = 0.01;

/// Types of financial documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Invoice,
    Receipt,
    Estimate,
    Contract,
    PurchaseOrder,
    Warranty,
    Other,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Receipt => "receipt",
            Self::Estimate => "estimate",
            Self::Contract => "contract",
            Self::PurchaseOrder => "purchase_order",
            Self::Warranty => "warranty",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "invoice" => Ok(Self::Invoice),
            "receipt" => Ok(Self::Receipt),
            "estimate" => Ok(Self::Estimate),
            "contract" => Ok(Self::Contract),
            "purchase_order" => Ok(Self::PurchaseOrder),
            "warranty" => Ok(Self::Warranty),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown document type: {}", s)),
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Types of home renovation projects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    KitchenRemodel,
    BathroomRemodel,
    BasementRenovation,
    Addition,
    RoofReplacement,
    Flooring,
    Painting,
    ElectricalUpgrade,
    PlumbingUpgrade,
    HvacInstallation,
    SidingReplacement,
    WindowReplacement,
    DeckConstruction,
    Driveway,
    Landscaping,
    GeneralMaintenance,
    Other,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KitchenRemodel => "kitchen_remodel",
            Self::BathroomRemodel => "bathroom_remodel",
            Self::BasementRenovation => "basement_renovation",
            Self::Addition => "addition",
            Self::RoofReplacement => "roof_replacement",
            Self::Flooring => "flooring",
            Self::Painting => "painting",
            Self::ElectricalUpgrade => "electrical_upgrade",
            Self::PlumbingUpgrade => "plumbing_upgrade",
            Self::HvacInstallation => "hvac_installation",
            Self::SidingReplacement => "siding_replacement",
            Self::WindowReplacement => "window_replacement",
            Self::DeckConstruction => "deck_construction",
            Self::Driveway => "driveway",
            Self::Landscaping => "landscaping",
            Self::GeneralMaintenance => "general_maintenance",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for ProjectType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kitchen_remodel" => Ok(Self::KitchenRemodel),
            "bathroom_remodel" => Ok(Self::BathroomRemodel),
            "basement_renovation" => Ok(Self::BasementRenovation),
            "addition" => Ok(Self::Addition),
            "roof_replacement" => Ok(Self::RoofReplacement),
            "flooring" => Ok(Self::Flooring),
            "painting" => Ok(Self::Painting),
            "electrical_upgrade" => Ok(Self::ElectricalUpgrade),
            "plumbing_upgrade" => Ok(Self::PlumbingUpgrade),
            "hvac_installation" => Ok(Self::HvacInstallation),
            "siding_replacement" => Ok(Self::SidingReplacement),
            "window_replacement" => Ok(Self::WindowReplacement),
            "deck_construction" => Ok(Self::DeckConstruction),
            "driveway" => Ok(Self::Driveway),
            "landscaping" => Ok(Self::Landscaping),
            "general_maintenance" => Ok(Self::GeneralMaintenance),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown project type: {}", s)),
        }
    }
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment status for invoices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Partial,
    Overdue,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Partial => "partial",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "partial" => Ok(Self::Partial),
            "overdue" => Ok(Self::Overdue),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown payment status: {}", s)),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A vendor/supplier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub tax_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A home renovation project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub project_type: ProjectType,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Total project budget; budget alerts are driven from this unless a
    /// more specific budget row exists
    pub budget: Option<f64>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// One purchased item/service row within a financial document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: i64,
    pub document_id: i64,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub line_total: f64,
    /// Null until categorized
    pub category: Option<ExpenseCategory>,
    pub subcategory: Option<String>,
    pub tax_rate: Option<f64>,
    pub tax_amount: Option<f64>,
    pub project_id: Option<i64>,
}

/// A line item as handed over by the ingestion collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLineItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub line_total: f64,
    #[serde(default)]
    pub category: Option<ExpenseCategory>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub tax_rate: Option<f64>,
    #[serde(default)]
    pub tax_amount: Option<f64>,
    #[serde(default)]
    pub project_id: Option<i64>,
}

impl NewLineItem {
    /// Check the line item invariants.
    ///
    /// Violations are rejected outright, never silently corrected.
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(Error::Validation("Line item description is empty".into()));
        }
        if self.quantity < 0.0 {
            return Err(Error::Validation(format!(
                "Quantity must be non-negative, got {}",
                self.quantity
            )));
        }
        if self.unit_price < 0.0 {
            return Err(Error::Validation(format!(
                "Unit price must be non-negative, got {}",
                self.unit_price
            )));
        }
        let expected = self.quantity * self.unit_price;
        if (self.line_total - expected).abs() > LINE_TOTAL_EPSILON {
            return Err(Error::Validation(format!(
                "Line total {} does not equal quantity x unit price ({:.2}) for '{}'",
                self.line_total, expected, self.description
            )));
        }
        if let Some(rate) = self.tax_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(Error::Validation(format!(
                    "Tax rate must be between 0 and 1, got {}",
                    rate
                )));
            }
        }
        if let Some(tax) = self.tax_amount {
            if tax < 0.0 {
                return Err(Error::Validation(format!(
                    "Tax amount must be non-negative, got {}",
                    tax
                )));
            }
        }
        Ok(())
    }
}

/// A parsed financial document (invoice, receipt, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialDocument {
    pub id: i64,
    pub document_type: DocumentType,
    pub vendor_id: i64,
    pub vendor_name: String,
    pub invoice_number: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub subtotal: Option<f64>,
    pub total_tax: Option<f64>,
    pub total_amount: Option<f64>,
    pub currency: String,
    pub project_id: Option<i64>,
    pub payment_status: PaymentStatus,
    /// SHA-256 over the parsed content, for idempotent re-ingestion
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A parsed financial document as handed over by the ingestion collaborator
/// (vendor still unresolved, line items inline)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFinancialDocument {
    pub document_type: DocumentType,
    pub vendor_name: String,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub invoice_date: Option<NaiveDate>,
    #[serde(default)]
    pub subtotal: Option<f64>,
    #[serde(default)]
    pub total_tax: Option<f64>,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub line_items: Vec<NewLineItem>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl NewFinancialDocument {
    pub fn validate(&self) -> Result<()> {
        if self.vendor_name.trim().is_empty() {
            return Err(Error::Validation("Vendor name is empty".into()));
        }
        if let Some(total) = self.total_amount {
            if total < 0.0 {
                return Err(Error::Validation(format!(
                    "Total amount must be non-negative, got {}",
                    total
                )));
            }
        }
        for item in &self.line_items {
            item.validate()?;
        }
        Ok(())
    }
}

/// A pattern-based categorization rule.
///
/// Rules are evaluated in priority order (higher first, ties broken by
/// most-recently-created). They are never deleted, only deactivated, so
/// suggestion history stays explainable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoCategorizationRule {
    pub id: i64,
    pub name: String,
    pub vendor_patterns: Vec<String>,
    pub description_patterns: Vec<String>,
    pub amount_min: Option<f64>,
    pub amount_max: Option<f64>,
    pub category: ExpenseCategory,
    pub subcategory: Option<String>,
    pub project_id: Option<i64>,
    pub priority: i64,
    pub is_active: bool,
    /// Base confidence when this rule matches
    pub confidence_threshold: f64,
    pub last_used: Option<DateTime<Utc>>,
    pub usage_count: i64,
    /// Optimistic-concurrency version for statistics updates
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

/// A new rule before DB insertion
#[derive(Debug, Clone)]
pub struct NewRule {
    pub name: String,
    pub vendor_patterns: Vec<String>,
    pub description_patterns: Vec<String>,
    pub amount_min: Option<f64>,
    pub amount_max: Option<f64>,
    pub category: ExpenseCategory,
    pub subcategory: Option<String>,
    pub project_id: Option<i64>,
    pub priority: i64,
    pub confidence_threshold: f64,
}

impl NewRule {
    pub fn validate(&self) -> Result<()> {
        if self.vendor_patterns.is_empty()
            && self.description_patterns.is_empty()
            && self.amount_min.is_none()
            && self.amount_max.is_none()
        {
            return Err(Error::Validation(
                "Rule needs at least one pattern or an amount bound".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::Validation(format!(
                "Confidence threshold must be between 0 and 1, got {}",
                self.confidence_threshold
            )));
        }
        if let (Some(min), Some(max)) = (self.amount_min, self.amount_max) {
            if min > max {
                return Err(Error::Validation(format!(
                    "Amount range is inverted: {} > {}",
                    min, max
                )));
            }
        }
        Ok(())
    }
}

/// A proposed categorization awaiting acceptance or override
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizationSuggestion {
    pub id: i64,
    pub line_item_id: i64,
    pub category: ExpenseCategory,
    pub subcategory: Option<String>,
    pub project_id: Option<i64>,
    /// Which rule produced this suggestion, if any (None = similarity fallback)
    pub rule_id: Option<i64>,
    pub confidence: f64,
    pub reasoning: String,
    /// Ids of similar previously categorized line items
    pub similar_items: Vec<i64>,
    /// None = awaiting feedback
    pub accepted: Option<bool>,
    /// User's chosen category when it differs from the suggestion
    pub user_category: Option<ExpenseCategory>,
    pub created_at: DateTime<Utc>,
}

/// A rule candidate proposed by the feedback loop for operator review.
///
/// Candidates are never auto-promoted into rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCandidate {
    pub id: i64,
    pub vendor_pattern: Option<String>,
    pub description_pattern: String,
    pub category: ExpenseCategory,
    pub occurrences: i64,
    pub status: RuleCandidateStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCandidateStatus {
    Proposed,
    Approved,
    Dismissed,
}

impl RuleCandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Approved => "approved",
            Self::Dismissed => "dismissed",
        }
    }
}

impl std::str::FromStr for RuleCandidateStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "proposed" => Ok(Self::Proposed),
            "approved" => Ok(Self::Approved),
            "dismissed" => Ok(Self::Dismissed),
            _ => Err(format!("Unknown rule candidate status: {}", s)),
        }
    }
}

/// A project/category budget scope watched by the alert monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub project_id: i64,
    /// None = whole-project budget
    pub category: Option<ExpenseCategory>,
    pub amount: f64,
    /// Percentage (0-100) at which the warning state begins
    pub warning_threshold: f64,
    pub created_at: DateTime<Utc>,
}
