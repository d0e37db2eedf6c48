//! Penny Core Library
//!
//! Shared engine for the Penny renovation expense tracker:
//! - Database access and migrations
//! - Fixed expense category taxonomy
//! - Rule-based auto-categorization with confidence scoring
//! - Feedback loop with rule statistics and rule candidate proposals
//! - Natural-language query pipeline (intent -> entities -> filters ->
//!   aggregation) with an append-only query log
//! - Budget alert monitor
//! - Job tracking for the asynchronous document pipeline

pub mod budget;
pub mod config;
pub mod db;
pub mod error;
pub mod feedback;
pub mod ingest;
pub mod jobs;
pub mod models;
pub mod query;
pub mod rules;
pub mod suggest;
pub mod taxonomy;

pub use budget::{AlertSeverity, AlertState, BudgetAlert, BudgetMonitor};
pub use config::EngineConfig;
pub use db::{Database, LineItemFilter};
pub use error::{Error, Result};
pub use feedback::{FeedbackDecision, FeedbackLoop, FeedbackOutcome};
pub use ingest::{content_hash, DocumentIngestor, IngestOutcome};
pub use jobs::{JobSnapshot, JobState, JobTracker, ProcessingJob};
pub use models::{
    AutoCategorizationRule, Budget, CategorizationSuggestion, DocumentType, FinancialDocument,
    LineItem, NewFinancialDocument, NewLineItem, NewRule, PaymentStatus, Project, ProjectType,
    RuleCandidate, RuleCandidateStatus, Vendor,
};
pub use query::{
    classify_intent, AggregationSpec, CompiledQuery, EntityExtractor, ExtractedEntities,
    FilterCompiler, QueryIntent, QueryOutcome, QueryPipeline, QueryResult,
};
pub use rules::{RuleMatch, RuleMatcher};
pub use suggest::{SimilarityScorer, SuggestionGenerator, TokenOverlapScorer};
pub use taxonomy::{CategoryGroup, ExpenseCategory};
