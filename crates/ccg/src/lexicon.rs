//! Lexicon: Token Sequences Paired with Categories
//!
//! Lexicons are read from plain text, one entry per line:
//!
//! ```text
//! // adjectives
//! big :- N/N : (lambda $0:<e,t> (lambda $1:e (and:<t*,t> (big:<e,t> $1) ($0 $1))))
//! new york :- NP : new_york:e
//! ```
//!
//! Multi-word entries are keyed by their full token sequence; the parser
//! looks up every sub-span up to [`Lexicon::max_tokens`] long.

use std::collections::BTreeMap;
use std::fmt;

use crate::category::{Category, CategoryServices};
use crate::CcgError;

pub const ORIGIN_PROPERTY: &str = "origin";

/// Origin of entries read without an explicit one.
pub const FIXED_ORIGIN: &str = "fixed";

const ENTRY_SEPARATOR: &str = ":-";
const COMMENT_PREFIX: &str = "//";

/// A lexical entry: tokens, their category and free-form properties.
///
/// Two entries are the same when tokens and category match; properties
/// (including the origin) are informational.
#[derive(Debug, Clone)]
pub struct LexicalEntry {
    tokens: Vec<String>,
    category: Category,
    properties: BTreeMap<String, String>,
}

impl LexicalEntry {
    pub fn new(tokens: Vec<String>, category: Category, origin: &str) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert(ORIGIN_PROPERTY.to_string(), origin.to_string());
        Self {
            tokens,
            category,
            properties,
        }
    }

    /// Read a `tokens :- category` line.
    pub fn read(line: &str, services: &CategoryServices, origin: &str) -> Result<Self, CcgError> {
        let invalid = |message: String| CcgError::InvalidLexicalEntry {
            line: line.to_string(),
            message,
        };
        let (tokens, category) = line
            .split_once(ENTRY_SEPARATOR)
            .ok_or_else(|| invalid(format!("missing '{}'", ENTRY_SEPARATOR)))?;
        let tokens = tokenize(tokens);
        if tokens.is_empty() {
            return Err(invalid("no tokens".to_string()));
        }
        let category = services
            .read(category)
            .map_err(|e| invalid(e.to_string()))?;
        Ok(Self::new(tokens, category, origin))
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn origin(&self) -> Option<&str> {
        self.property(ORIGIN_PROPERTY)
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn is_empty_category(&self) -> bool {
        self.category.is_empty()
    }
}

impl PartialEq for LexicalEntry {
    fn eq(&self, other: &Self) -> bool {
        self.tokens == other.tokens && self.category == other.category
    }
}

impl Eq for LexicalEntry {}

impl std::hash::Hash for LexicalEntry {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.tokens.hash(state);
        self.category.hash(state);
    }
}

impl fmt::Display for LexicalEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.tokens.join(" "), ENTRY_SEPARATOR, self.category)
    }
}

/// Whitespace tokenization.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Entries indexed by token sequence.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    entries: BTreeMap<Vec<String>, Vec<LexicalEntry>>,
    max_tokens: usize,
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a lexicon file. Blank lines and lines starting with `//` are
    /// skipped.
    pub fn read(text: &str, services: &CategoryServices, origin: &str) -> Result<Self, CcgError> {
        let mut lexicon = Self::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
                continue;
            }
            lexicon.add(LexicalEntry::read(line, services, origin)?);
        }
        tracing::debug!(entries = lexicon.len(), origin, "lexicon read");
        Ok(lexicon)
    }

    /// Add an entry; returns `false` if it was already present.
    pub fn add(&mut self, entry: LexicalEntry) -> bool {
        let bucket = self.entries.entry(entry.tokens.clone()).or_default();
        if bucket.contains(&entry) {
            return false;
        }
        self.max_tokens = self.max_tokens.max(entry.tokens.len());
        bucket.push(entry);
        true
    }

    pub fn add_all(&mut self, entries: impl IntoIterator<Item = LexicalEntry>) -> usize {
        entries.into_iter().filter(|e| self.add(e.clone())).count()
    }

    pub fn get(&self, tokens: &[String]) -> &[LexicalEntry] {
        self.entries.get(tokens).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, entry: &LexicalEntry) -> bool {
        self.get(&entry.tokens).contains(entry)
    }

    /// Length of the longest token sequence in the lexicon.
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LexicalEntry> {
        self.entries.values().flatten()
    }
}
