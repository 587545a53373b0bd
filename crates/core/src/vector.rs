//! # Sparse Feature Vectors
//!
//! Model weights and per-step feature counts live in a [`SparseVector`]:
//! an ordered map from a [`FeatureKey`] (one to five string components) to
//! an `f64`. Ordering makes iteration, printing and serialization
//! deterministic, which the chart relies on when it reports derivations.
//!
//! # Example
//!
//! ```rust
//! use semparse_core::vector::{FeatureKey, SparseVector};
//!
//! let mut weights = SparseVector::new();
//! weights.set(("LEX", "city", "N"), 0.5);
//!
//! let mut features = SparseVector::new();
//! features.add(("LEX", "city", "N"), 2.0);
//!
//! assert_eq!(weights.dot(&features), 1.0);
//! assert_eq!(features.to_string(), "{LEX#city#N=2.000}");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Separator used when a key is printed or serialized.
pub const KEY_SEPARATOR: char = '#';

const ESCAPE: char = '%';

/// Values with an absolute value below this are treated as noise.
pub const NOISE: f64 = 0.001;

/// A feature name made of 1 to [`FeatureKey::MAX_COMPONENTS`] components.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeatureKey(Box<[String]>);

impl FeatureKey {
    /// Maximum number of components in a key.
    pub const MAX_COMPONENTS: usize = 5;

    /// Build a key, validating arity and components.
    pub fn new<I, S>(components: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parts: Vec<String> = components.into_iter().map(Into::into).collect();
        if parts.is_empty() || parts.len() > Self::MAX_COMPONENTS {
            return Err(CoreError::KeyArity {
                len: parts.len(),
                max: Self::MAX_COMPONENTS,
            });
        }
        if let Some(bad) = parts
            .iter()
            .find(|p| p.is_empty() || p.contains(KEY_SEPARATOR))
        {
            return Err(CoreError::KeyComponent {
                component: bad.clone(),
            });
        }
        Ok(Self(parts.into_boxed_slice()))
    }

    /// Construct from the infallible conversions, where the arity is fixed
    /// by the type. Components are escaped so the printed key always parses
    /// back to the same key.
    fn from_parts(parts: Vec<String>) -> Self {
        Self(parts.into_iter().map(escape_component).collect())
    }

    pub fn components(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if the leading components equal `prefix`.
    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        prefix.len() <= self.0.len() && prefix.iter().zip(self.0.iter()).all(|(p, c)| *p == c)
    }
}

/// `%` and the separator are percent-encoded; an empty component becomes `%`.
fn escape_component(part: String) -> String {
    if part.is_empty() {
        return ESCAPE.to_string();
    }
    if !part.contains([KEY_SEPARATOR, ESCAPE]) {
        return part;
    }
    let mut escaped = String::with_capacity(part.len() + 4);
    for c in part.chars() {
        match c {
            KEY_SEPARATOR => escaped.push_str("%23"),
            ESCAPE => escaped.push_str("%25"),
            c => escaped.push(c),
        }
    }
    escaped
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", KEY_SEPARATOR)?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

impl FromStr for FeatureKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.split(KEY_SEPARATOR))
    }
}

impl TryFrom<String> for FeatureKey {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FeatureKey> for String {
    fn from(key: FeatureKey) -> Self {
        key.to_string()
    }
}

impl From<&str> for FeatureKey {
    fn from(s: &str) -> Self {
        Self::from_parts(vec![s.to_string()])
    }
}

macro_rules! key_from_tuple {
    ($($name:ident),+) => {
        impl<$($name: Into<String>),+> From<($($name,)+)> for FeatureKey {
            #[allow(non_snake_case)]
            fn from(($($name,)+): ($($name,)+)) -> Self {
                Self::from_parts(vec![$($name.into()),+])
            }
        }
    };
}

key_from_tuple!(A);
key_from_tuple!(A, B);
key_from_tuple!(A, B, C);
key_from_tuple!(A, B, C, D);
key_from_tuple!(A, B, C, D, E);

/// Sparse mapping from feature keys to weights.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SparseVector {
    values: BTreeMap<FeatureKey, f64>,
}

impl SparseVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value for `key`, zero when absent.
    pub fn get(&self, key: impl Into<FeatureKey>) -> f64 {
        self.values.get(&key.into()).copied().unwrap_or(0.0)
    }

    pub fn get_key(&self, key: &FeatureKey) -> f64 {
        self.values.get(key).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, key: impl Into<FeatureKey>, value: f64) {
        self.values.insert(key.into(), value);
    }

    /// Accumulate `value` into the entry for `key`.
    pub fn add(&mut self, key: impl Into<FeatureKey>, value: f64) {
        *self.values.entry(key.into()).or_insert(0.0) += value;
    }

    pub fn contains(&self, key: &FeatureKey) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FeatureKey, f64)> {
        self.values.iter().map(|(k, v)| (k, *v))
    }

    /// `self + times * other` as a new vector.
    pub fn add_times(&self, times: f64, other: &SparseVector) -> SparseVector {
        let mut result = self.clone();
        other.add_times_into(times, &mut result);
        result
    }

    /// Add `times * self` into `target`.
    pub fn add_times_into(&self, times: f64, target: &mut SparseVector) {
        for (key, value) in &self.values {
            *target.values.entry(key.clone()).or_insert(0.0) += times * value;
        }
    }

    /// In-place `self += other`.
    pub fn add_all(&mut self, other: &SparseVector) {
        other.add_times_into(1.0, self);
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .values
            .iter()
            .filter_map(|(k, v)| large.values.get(k).map(|w| v * w))
            .sum()
    }

    pub fn l1_norm(&self) -> f64 {
        self.values.values().map(|v| v.abs()).sum()
    }

    /// Remove entries whose magnitude is below [`NOISE`].
    pub fn drop_noise(&mut self) {
        self.values.retain(|_, v| v.abs() >= NOISE);
    }

    pub fn drop_zeros(&mut self) {
        self.values.retain(|_, v| *v != 0.0);
    }

    pub fn multiply_by(&mut self, factor: f64) {
        for v in self.values.values_mut() {
            *v *= factor;
        }
    }

    pub fn divide_by(&mut self, divisor: f64) {
        for v in self.values.values_mut() {
            *v /= divisor;
        }
    }

    /// True if any value is NaN or infinite.
    pub fn is_bad(&self) -> bool {
        self.values.values().any(|v| !v.is_finite())
    }

    /// Fail with [`CoreError::NonFinite`] if the vector [`is_bad`](Self::is_bad).
    pub fn check_finite(&self, context: &str) -> Result<(), CoreError> {
        if self.is_bad() {
            Err(CoreError::NonFinite {
                context: context.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// True if every value lies in `[min, max]`.
    pub fn values_in_range(&self, min: f64, max: f64) -> bool {
        self.values.values().all(|v| *v >= min && *v <= max)
    }

    /// All entries whose key starts with `prefix`.
    pub fn get_all(&self, prefix: &[&str]) -> SparseVector {
        self.values
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}

impl FromIterator<(FeatureKey, f64)> for SparseVector {
    fn from_iter<I: IntoIterator<Item = (FeatureKey, f64)>>(iter: I) -> Self {
        let mut vector = SparseVector::new();
        for (k, v) in iter {
            vector.add(k, v);
        }
        vector
    }
}

impl fmt::Display for SparseVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={:.3}", key, value)?;
        }
        write!(f, "}}")
    }
}
