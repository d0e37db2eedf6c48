//! Natural-language query pipeline
//!
//! A raw question flows intent classification -> entity extraction ->
//! filter compilation -> execution. Prose generation from the structured
//! result belongs to an external collaborator; this pipeline ends at the
//! structured result and the query log entry.

mod compiler;
mod entities;
mod executor;
mod intent;

pub use compiler::{AggregationSpec, CompiledQuery, FilterCompiler};
pub use entities::{EntityExtractor, ExtractedEntities};
pub use executor::{QueryOutcome, QueryPipeline, QueryResult};
pub use intent::{classify_intent, QueryIntent};
