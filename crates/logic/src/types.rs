//! Types of the typed lambda calculus.
//!
//! A [`Type`] is one of
//!
//! - a **term type** such as `e`, `t` or a user type with a parent (`city < e`),
//! - a **complex type** `<domain,range>`,
//! - a **recursive complex type** `<t*,t>` that accepts any number of
//!   arguments of its domain (`*` order-insensitive, `+` order-sensitive,
//!   optional minimum argument count suffix such as `<e*3,t>`),
//! - an **array type** `e[]`.
//!
//! Types compare and hash by their canonical name, so two separately built
//! `<e,t>` values are equal.
//!
//! # Example
//!
//! ```rust
//! use semparse_logic::types::TypeRepository;
//!
//! let repo = TypeRepository::new();
//! let pred = repo.resolve("<e,t>").unwrap();
//! let and = repo.resolve("<t*,t>").unwrap();
//!
//! assert_eq!(pred.domain().unwrap(), &repo.entity());
//! assert!(and.is_recursive());
//! assert_eq!(and.final_range().unwrap(), &repo.truth());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::LogicError;

pub const ENTITY: &str = "e";
pub const TRUTH: &str = "t";
pub const INDEX: &str = "ind";
pub const ID: &str = "id";

const ARRAY_SUFFIX: &str = "[]";
const ORDER_INSENSITIVE: char = '*';
const ORDER_SENSITIVE: char = '+';

/// Repetition option of a recursive complex type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecursiveOption {
    pub order_sensitive: bool,
    pub min_args: usize,
}

impl RecursiveOption {
    pub const DEFAULT_MIN_ARGS: usize = 2;

    pub fn new(order_sensitive: bool, min_args: usize) -> Self {
        Self {
            order_sensitive,
            min_args,
        }
    }
}

impl fmt::Display for RecursiveOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.order_sensitive {
            ORDER_SENSITIVE
        } else {
            ORDER_INSENSITIVE
        };
        if self.min_args == Self::DEFAULT_MIN_ARGS {
            write!(f, "{}", marker)
        } else {
            write!(f, "{}{}", marker, self.min_args)
        }
    }
}

/// Structure of a type.
#[derive(Debug, Clone)]
pub enum TypeKind {
    Term {
        parent: Option<Type>,
    },
    /// For a recursive type `range` holds the final range.
    Complex {
        domain: Type,
        range: Type,
        option: Option<RecursiveOption>,
    },
    Array {
        base: Type,
    },
}

#[derive(Debug)]
struct TypeData {
    name: String,
    kind: TypeKind,
}

/// A type, shared and immutable.
#[derive(Clone)]
pub struct Type(Arc<TypeData>);

impl Type {
    /// A term type with an optional parent.
    pub fn term(name: impl Into<String>, parent: Option<Type>) -> Self {
        Self(Arc::new(TypeData {
            name: name.into(),
            kind: TypeKind::Term { parent },
        }))
    }

    pub fn complex(domain: Type, range: Type) -> Self {
        let name = format!("<{},{}>", domain, range);
        Self(Arc::new(TypeData {
            name,
            kind: TypeKind::Complex {
                domain,
                range,
                option: None,
            },
        }))
    }

    /// A recursive complex type; `range` is the final range.
    pub fn recursive(domain: Type, range: Type, option: RecursiveOption) -> Self {
        let name = format!("<{}{},{}>", domain, option, range);
        Self(Arc::new(TypeData {
            name,
            kind: TypeKind::Complex {
                domain,
                range,
                option: Some(option),
            },
        }))
    }

    pub fn array(base: Type) -> Self {
        let name = format!("{}{}", base, ARRAY_SUFFIX);
        Self(Arc::new(TypeData {
            name,
            kind: TypeKind::Array { base },
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> &TypeKind {
        &self.0.kind
    }

    pub fn is_complex(&self) -> bool {
        matches!(self.0.kind, TypeKind::Complex { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self.0.kind, TypeKind::Array { .. })
    }

    pub fn is_recursive(&self) -> bool {
        self.option().is_some()
    }

    /// True for recursive types whose arguments may be reordered.
    pub fn is_order_insensitive(&self) -> bool {
        matches!(self.option(), Some(opt) if !opt.order_sensitive)
    }

    pub fn option(&self) -> Option<RecursiveOption> {
        match &self.0.kind {
            TypeKind::Complex { option, .. } => *option,
            _ => None,
        }
    }

    pub fn domain(&self) -> Option<&Type> {
        match &self.0.kind {
            TypeKind::Complex { domain, .. } => Some(domain),
            _ => None,
        }
    }

    /// The range after consuming one argument. A recursive type returns
    /// itself: it keeps accepting arguments.
    pub fn range(&self) -> Option<Type> {
        match &self.0.kind {
            TypeKind::Complex {
                option: Some(_), ..
            } => Some(self.clone()),
            TypeKind::Complex { range, .. } => Some(range.clone()),
            _ => None,
        }
    }

    /// The range once all arguments are consumed.
    pub fn final_range(&self) -> Option<&Type> {
        match &self.0.kind {
            TypeKind::Complex { range, .. } => Some(range),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<&Type> {
        match &self.0.kind {
            TypeKind::Term { parent } => parent.as_ref(),
            _ => None,
        }
    }

    pub fn array_base(&self) -> Option<&Type> {
        match &self.0.kind {
            TypeKind::Array { base } => Some(base),
            _ => None,
        }
    }

    /// Subtype test: `self` can be used where `other` is expected.
    pub fn is_extending(&self, other: &Type) -> bool {
        if self == other {
            return true;
        }
        match (&self.0.kind, &other.0.kind) {
            (TypeKind::Term { parent }, TypeKind::Term { .. }) => {
                let mut current = parent.clone();
                while let Some(p) = current {
                    if &p == other {
                        return true;
                    }
                    current = p.parent().cloned();
                }
                false
            }
            (
                TypeKind::Complex {
                    domain,
                    range,
                    option,
                },
                TypeKind::Complex {
                    domain: other_domain,
                    range: other_range,
                    option: other_option,
                },
            ) => option == other_option && domain.is_extending(other_domain) && range.is_extending(other_range),
            (TypeKind::Array { base }, TypeKind::Array { base: other_base }) => {
                base.is_extending(other_base)
            }
            _ => false,
        }
    }

    pub fn is_extending_or_extended_by(&self, other: &Type) -> bool {
        self.is_extending(other) || other.is_extending(self)
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.name)
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.0.name)
    }
}

/// Registry of term types. Complex and array types are built on demand
/// from their parts, so only term types need declaring.
///
/// Term types can only be added through `&mut self`; once the repository is
/// moved into a shared [`crate::LogicContext`] the primitive set is fixed.
#[derive(Debug, Clone)]
pub struct TypeRepository {
    terms: HashMap<String, Type>,
    entity: Type,
    truth: Type,
    index: Type,
    id: Type,
}

impl Default for TypeRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRepository {
    /// A repository holding the built-in `e`, `t`, `ind` and `id` types.
    pub fn new() -> Self {
        let entity = Type::term(ENTITY, None);
        let truth = Type::term(TRUTH, None);
        let index = Type::term(INDEX, None);
        let id = Type::term(ID, None);
        let terms = [&entity, &truth, &index, &id]
            .into_iter()
            .map(|t| (t.name().to_string(), t.clone()))
            .collect();
        Self {
            terms,
            entity,
            truth,
            index,
            id,
        }
    }

    pub fn entity(&self) -> Type {
        self.entity.clone()
    }

    pub fn truth(&self) -> Type {
        self.truth.clone()
    }

    pub fn index(&self) -> Type {
        self.index.clone()
    }

    pub fn id(&self) -> Type {
        self.id.clone()
    }

    /// Declare a term type, optionally extending an existing term type.
    pub fn add_term_type(&mut self, name: &str, parent: Option<&str>) -> Result<Type, LogicError> {
        if self.terms.contains_key(name) {
            return Err(LogicError::DuplicateType {
                name: name.to_string(),
            });
        }
        if name.is_empty() || name.contains(|c: char| "<>,[]*+()".contains(c) || c.is_whitespace()) {
            return Err(LogicError::InvalidType {
                text: name.to_string(),
            });
        }
        let parent = match parent {
            Some(p) => Some(self.term(p)?),
            None => None,
        };
        let ty = Type::term(name, parent);
        self.terms.insert(name.to_string(), ty.clone());
        Ok(ty)
    }

    /// Read declarations, one per entry: `name` or `(name parent)`.
    /// `//` starts a comment.
    pub fn read_declarations(&mut self, text: &str) -> Result<(), LogicError> {
        for line in text.lines() {
            let line = line.split("//").next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if let Some(inner) = line.strip_prefix('(').and_then(|l| l.strip_suffix(')')) {
                let parts: Vec<&str> = inner.split_whitespace().collect();
                match parts.as_slice() {
                    [name] => self.add_term_type(name, None)?,
                    [name, parent] => self.add_term_type(name, Some(parent))?,
                    _ => {
                        return Err(LogicError::InvalidType {
                            text: line.to_string(),
                        })
                    }
                };
            } else {
                self.add_term_type(line, None)?;
            }
        }
        Ok(())
    }

    fn term(&self, name: &str) -> Result<Type, LogicError> {
        self.terms
            .get(name)
            .cloned()
            .ok_or_else(|| LogicError::UnknownType {
                name: name.to_string(),
            })
    }

    pub fn get(&self, name: &str) -> Option<Type> {
        self.resolve(name).ok()
    }

    /// Parse a type string, building complex and array types as needed.
    pub fn resolve(&self, text: &str) -> Result<Type, LogicError> {
        let text = text.trim();
        let invalid = || LogicError::InvalidType {
            text: text.to_string(),
        };
        if let Some(inner) = text.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
            let split = top_level_comma(inner).ok_or_else(invalid)?;
            let (domain_text, range_text) = (&inner[..split], &inner[split + 1..]);
            let range = self.resolve(range_text)?;
            let (domain_text, option) = split_option(domain_text);
            let domain = self.resolve(domain_text)?;
            Ok(match option {
                Some(option) => Type::recursive(domain, range, option),
                None => Type::complex(domain, range),
            })
        } else if let Some(base) = text.strip_suffix(ARRAY_SUFFIX) {
            Ok(Type::array(self.resolve(base)?))
        } else if text.is_empty() || text.contains(|c: char| "<>,".contains(c)) {
            Err(invalid())
        } else {
            self.term(text)
        }
    }

    /// Replace every term type by its root ancestor.
    pub fn generalize(&self, ty: &Type) -> Type {
        match ty.kind() {
            TypeKind::Term { .. } => {
                let mut current = ty.clone();
                while let Some(parent) = current.parent().cloned() {
                    current = parent;
                }
                current
            }
            TypeKind::Complex {
                domain,
                range,
                option,
            } => {
                let domain = self.generalize(domain);
                let range = self.generalize(range);
                match option {
                    Some(option) => Type::recursive(domain, range, *option),
                    None => Type::complex(domain, range),
                }
            }
            TypeKind::Array { base } => Type::array(self.generalize(base)),
        }
    }
}

/// Position of the comma separating domain from range.
fn top_level_comma(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Split a trailing `*`/`+` marker with optional minimum count off a domain.
fn split_option(domain: &str) -> (&str, Option<RecursiveOption>) {
    let digits_start = domain
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)
        .unwrap_or(domain.len());
    let before_digits = &domain[..digits_start];
    let order_sensitive = match before_digits.chars().last() {
        Some(ORDER_INSENSITIVE) => false,
        Some(ORDER_SENSITIVE) => true,
        _ => return (domain, None),
    };
    let min_args = domain[digits_start..]
        .parse()
        .unwrap_or(RecursiveOption::DEFAULT_MIN_ARGS);
    (
        &before_digits[..before_digits.len() - 1],
        Some(RecursiveOption::new(order_sensitive, min_args)),
    )
}
