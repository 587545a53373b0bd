//! # Model and Feature Sets
//!
//! A [`Model`] is a weight vector plus the feature sets that turn a parse
//! step into sparse features. The score of a step is the dot product of
//! its features with the weights; derivation scores add up step scores.
//!
//! ```text
//!   step ──▶ [LexicalFeatureSet]   ──┐
//!        ──▶ [RuleUsageFeatureSet] ──┼──▶ features ──· weights ──▶ score
//!        ──▶ [WordSkippingFeatureSet]┘
//! ```
//!
//! The model is read-only while parsing and shared through an `Arc`.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use semparse_ccg::{Category, LexicalEntry, RuleName, SentenceSpan};
use semparse_core::SparseVector;

use crate::ParseError;

/// Produces features for parse steps.
///
/// Lexical steps go through [`FeatureSet::lexical_features`], unary and
/// binary steps through [`FeatureSet::rule_features`]. Both default to
/// adding nothing.
pub trait FeatureSet: fmt::Debug + Send + Sync {
    fn lexical_features(
        &self,
        _entry: &LexicalEntry,
        _span: SentenceSpan,
        _features: &mut SparseVector,
    ) {
    }

    fn rule_features(
        &self,
        _rule: &RuleName,
        _unary: bool,
        _category: &Category,
        _span: SentenceSpan,
        _features: &mut SparseVector,
    ) {
    }
}

pub const LEXICAL_TAG: &str = "LEX";
pub const RULE_TAG: &str = "RULE";
pub const SKIPPING_TAG: &str = "SKIP";

/// One indicator feature per lexical entry: `LEX#<tokens>#<category>`.
///
/// Skipped words (`EMPTY` entries) are left to [`WordSkippingFeatureSet`].
#[derive(Debug, Clone, Default)]
pub struct LexicalFeatureSet;

impl FeatureSet for LexicalFeatureSet {
    fn lexical_features(&self, entry: &LexicalEntry, _span: SentenceSpan, features: &mut SparseVector) {
        if entry.is_empty_category() {
            return;
        }
        features.add(
            (LEXICAL_TAG, entry.tokens().join(" "), entry.category().to_string()),
            1.0,
        );
    }
}

/// Counts rule usage: `RULE#<rule>` += scale.
#[derive(Debug, Clone)]
pub struct RuleUsageFeatureSet {
    scale: f64,
    unary_only: bool,
    ignore: BTreeSet<String>,
}

impl Default for RuleUsageFeatureSet {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RuleUsageFeatureSet {
    pub fn new(scale: f64) -> Self {
        Self {
            scale,
            unary_only: false,
            ignore: BTreeSet::new(),
        }
    }

    /// Only count unary rules.
    pub fn unary_only(mut self, unary_only: bool) -> Self {
        self.unary_only = unary_only;
        self
    }

    /// Never count the rules with these display names (`">apply"`, ...).
    pub fn ignore<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.extend(rules.into_iter().map(Into::into));
        self
    }
}

impl FeatureSet for RuleUsageFeatureSet {
    fn rule_features(
        &self,
        rule: &RuleName,
        unary: bool,
        _category: &Category,
        _span: SentenceSpan,
        features: &mut SparseVector,
    ) {
        if self.unary_only && !unary {
            return;
        }
        let name = rule.to_string();
        if self.ignore.contains(&name) {
            return;
        }
        features.add((RULE_TAG, name), self.scale);
    }
}

/// `SKIP` = 1 for every skipped word.
#[derive(Debug, Clone, Default)]
pub struct WordSkippingFeatureSet;

impl FeatureSet for WordSkippingFeatureSet {
    fn lexical_features(&self, entry: &LexicalEntry, _span: SentenceSpan, features: &mut SparseVector) {
        if entry.is_empty_category() {
            features.add(SKIPPING_TAG, 1.0);
        }
    }
}

/// Weights plus feature sets.
#[derive(Debug, Clone, Default)]
pub struct Model {
    weights: SparseVector,
    feature_sets: Vec<Arc<dyn FeatureSet>>,
}

impl Model {
    /// A model with no feature sets; every step scores zero.
    pub fn new(weights: SparseVector) -> Self {
        Self {
            weights,
            feature_sets: Vec::new(),
        }
    }

    /// Lexical, rule usage and word skipping features.
    pub fn standard(weights: SparseVector) -> Self {
        Self::new(weights)
            .with_feature_set(LexicalFeatureSet)
            .with_feature_set(RuleUsageFeatureSet::default())
            .with_feature_set(WordSkippingFeatureSet)
    }

    /// Read weights serialized as a map of `A#B` keys to values.
    pub fn weights_from_json(text: &str) -> Result<SparseVector, ParseError> {
        let weights: SparseVector = serde_json::from_str(text).map_err(|err| ParseError::Config {
            message: format!("model weights: {}", err),
        })?;
        weights.check_finite("model weights")?;
        Ok(weights)
    }

    pub fn with_feature_set(mut self, feature_set: impl FeatureSet + 'static) -> Self {
        self.feature_sets.push(Arc::new(feature_set));
        self
    }

    pub fn weights(&self) -> &SparseVector {
        &self.weights
    }

    pub fn feature_sets(&self) -> &[Arc<dyn FeatureSet>] {
        &self.feature_sets
    }

    pub fn lexical_features(&self, entry: &LexicalEntry, span: SentenceSpan) -> SparseVector {
        let mut features = SparseVector::new();
        for feature_set in &self.feature_sets {
            feature_set.lexical_features(entry, span, &mut features);
        }
        features
    }

    pub fn rule_features(
        &self,
        rule: &RuleName,
        unary: bool,
        category: &Category,
        span: SentenceSpan,
    ) -> SparseVector {
        let mut features = SparseVector::new();
        for feature_set in &self.feature_sets {
            feature_set.rule_features(rule, unary, category, span, &mut features);
        }
        features
    }

    pub fn score(&self, features: &SparseVector) -> f64 {
        self.weights.dot(features)
    }
}
