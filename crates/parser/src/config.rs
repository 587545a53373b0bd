//! # Parser Configuration
//!
//! Every knob of the chart parser in one serde struct. Missing fields take
//! their defaults, so a partial JSON document is a valid configuration:
//!
//! ```rust
//! use semparse_parser::config::{InferenceMode, ParserConfig};
//!
//! let config = ParserConfig::from_json(r#"{ "beam": 20, "mode": "graph" }"#).unwrap();
//! assert_eq!(config.beam, Some(20));
//! assert_eq!(config.mode, InferenceMode::Graph);
//! assert_eq!(config.max_unary_depth, ParserConfig::default().max_unary_depth);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// How much of each cell the chart keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceMode {
    /// Keep only the steps of the best derivations of each cell.
    #[default]
    Viterbi,
    /// Keep every step, so inside and outside scores are exact.
    Graph,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Cells kept per span. `None` disables beam pruning.
    pub beam: Option<usize>,
    /// Let the beam drop cells built from lexical entries. When off, lexical
    /// cells are kept outside the beam and never compete with derived cells.
    pub prune_lexical_cells: bool,
    /// Longer sentences are rejected before any work is done.
    pub max_sentence_length: usize,
    /// Rounds of unary rule application per span.
    pub max_unary_depth: usize,
    pub mode: InferenceMode,
    /// Add an `EMPTY` entry for every token so words can be skipped.
    pub word_skipping: bool,
    /// Per-sentence deadline in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Sentences parsed concurrently by the parallel parser. `None` uses
    /// the available parallelism.
    pub workers: Option<usize>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            beam: Some(50),
            prune_lexical_cells: false,
            max_sentence_length: 50,
            max_unary_depth: 2,
            mode: InferenceMode::Viterbi,
            word_skipping: false,
            timeout_ms: None,
            workers: None,
        }
    }
}

impl ParserConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(text: &str) -> Result<Self, ParseError> {
        let config: ParserConfig = serde_json::from_str(text).map_err(|err| ParseError::Config {
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        let invalid = |message: &str| {
            Err(ParseError::Config {
                message: message.to_string(),
            })
        };
        if self.beam == Some(0) {
            return invalid("beam must be positive or absent");
        }
        if self.max_sentence_length == 0 {
            return invalid("max_sentence_length must be positive");
        }
        if self.workers == Some(0) {
            return invalid("workers must be positive or absent");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = ParserConfig::from_json("{}").unwrap();
        assert_eq!(config, ParserConfig::default());
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_full_json() {
        let config = ParserConfig::from_json(
            r#"{
                "beam": null,
                "prune_lexical_cells": true,
                "max_sentence_length": 12,
                "max_unary_depth": 1,
                "mode": "graph",
                "word_skipping": true,
                "timeout_ms": 250,
                "workers": 3
            }"#,
        )
        .unwrap();
        assert_eq!(config.beam, None);
        assert!(config.prune_lexical_cells);
        assert_eq!(config.max_sentence_length, 12);
        assert_eq!(config.mode, InferenceMode::Graph);
        assert!(config.word_skipping);
        assert_eq!(config.timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.workers, Some(3));
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            ParserConfig::from_json(r#"{ "beam": 0 }"#),
            Err(ParseError::Config { .. })
        ));
        assert!(ParserConfig::from_json(r#"{ "workers": 0 }"#).is_err());
        assert!(ParserConfig::from_json(r#"{ "mode": "exhaustive" }"#).is_err());
        assert!(ParserConfig::from_json("[1, 2]").is_err());
    }

    #[test]
    fn test_round_trip() {
        let config = ParserConfig {
            beam: Some(5),
            word_skipping: true,
            ..ParserConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(ParserConfig::from_json(&json).unwrap(), config);
    }
}
