//! Engine configuration
//!
//! All categorization and budget tunables live here so behavior can be
//! adjusted per deployment without recompiling. Config is loaded from a
//! TOML file when present and falls back to compiled defaults.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Tunable parameters for the categorization and budget engines
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Suggestions at or above this confidence finalize the line item's
    /// category without waiting for user feedback
    pub acceptance_threshold: f64,

    /// Confidence scale applied when both vendor and description patterns
    /// of a rule matched
    pub full_text_match_scale: f64,

    /// Confidence scale applied when only one of the rule's text patterns
    /// matched
    pub partial_text_match_scale: f64,

    /// Upper bound on similarity-fallback confidence. The generator
    /// additionally clamps below the lowest active rule threshold so
    /// rule-based suggestions always rank first.
    pub similarity_confidence_cap: f64,

    /// Minimum similarity score required before the fallback proposes a
    /// category at all
    pub similarity_min_score: f64,

    /// How many times the same correction must repeat before the feedback
    /// loop proposes a rule candidate
    pub rule_candidate_min_repeats: i64,

    /// Default budget warning threshold, percent of budget (0-100)
    pub default_warning_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.85,
            full_text_match_scale: 1.0,
            partial_text_match_scale: 0.85,
            similarity_confidence_cap: 0.5,
            similarity_min_score: 0.4,
            rule_candidate_min_repeats: 3,
            default_warning_threshold: 80.0,
        }
    }
}

impl EngineConfig {
    /// Load config from a TOML file, falling back to defaults when the file
    /// does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse config from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse engine config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("acceptance_threshold", self.acceptance_threshold),
            ("full_text_match_scale", self.full_text_match_scale),
            ("partial_text_match_scale", self.partial_text_match_scale),
            ("similarity_confidence_cap", self.similarity_confidence_cap),
            ("similarity_min_score", self.similarity_min_score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }
        if self.rule_candidate_min_repeats < 1 {
            return Err(Error::Config(
                "rule_candidate_min_repeats must be at least 1".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.default_warning_threshold) {
            return Err(Error::Config(format!(
                "default_warning_threshold must be between 0 and 100, got {}",
                self.default_warning_threshold
            )));
        }
        Ok(())
    }
}
