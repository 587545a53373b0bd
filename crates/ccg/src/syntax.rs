//! CCG Syntactic Categories and Unification
//!
//! A syntactic category is either simple (`N`, `NP`, `S[dcl]`) or a
//! function built with a slash:
//!
//! - **Forward** `X/Y`: looks for a `Y` to its right
//! - **Backward** `X\Y`: looks for a `Y` to its left
//! - **Vertical** `X|Y`: direction-free, used by coordination
//!
//! Slashes associate to the left, so `S\NP/NP` is `(S\NP)/NP`. Only a
//! complex right-hand side is printed in parentheses.
//!
//! # Attributes
//!
//! A simple category may carry an attribute (`S[dcl]`) or the attribute
//! variable `x` (`S[x]`). Unification binds the variable once per side and
//! reports the binding of the first argument's variable, so a rule can
//! propagate it with [`Syntax::set_variable`].
//!
//! # Example
//!
//! ```rust
//! use semparse_ccg::syntax::{Slash, Syntax};
//!
//! let verb = Syntax::read("S\\NP/NP").unwrap();
//! assert_eq!(verb.num_slashes(), 2);
//! assert_eq!(verb.slash(), Some(Slash::Forward));
//! assert_eq!(verb.to_string(), "S\\NP/NP");
//!
//! let s = Syntax::read("S[x]").unwrap();
//! let dcl = Syntax::read("S[dcl]").unwrap();
//! let unified = s.unify(&dcl).unwrap();
//! assert_eq!(unified.syntax, dcl);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::CcgError;

/// Direction of a functor's argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slash {
    Forward,
    Backward,
    Vertical,
}

impl Slash {
    pub fn from_char(c: char) -> Option<Slash> {
        match c {
            '/' => Some(Slash::Forward),
            '\\' => Some(Slash::Backward),
            '|' => Some(Slash::Vertical),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Slash::Forward => '/',
            Slash::Backward => '\\',
            Slash::Vertical => '|',
        }
    }
}

impl fmt::Display for Slash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Attribute of a simple category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    None,
    /// The attribute variable `x`.
    Variable,
    Value(String),
}

pub const VARIABLE_ATTRIBUTE: &str = "x";
const RESERVED_ATTRIBUTE: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimpleSyntax {
    label: String,
    attribute: Attribute,
}

impl SimpleSyntax {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ComplexSyntax {
    left: Syntax,
    right: Syntax,
    slash: Slash,
    num_slashes: usize,
}

impl ComplexSyntax {
    pub fn left(&self) -> &Syntax {
        &self.left
    }

    pub fn right(&self) -> &Syntax {
        &self.right
    }

    pub fn slash(&self) -> Slash {
        self.slash
    }
}

/// A CCG syntactic category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Syntax {
    Simple(SimpleSyntax),
    Complex(Arc<ComplexSyntax>),
}

/// Result of a successful unification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unification {
    pub syntax: Syntax,
    /// Binding of the first argument's attribute variable, if it was bound
    /// to something other than another variable.
    pub assignment: Option<Attribute>,
}

#[derive(Debug, Default)]
struct Bindings {
    this: Option<Attribute>,
    other: Option<Attribute>,
}

impl Syntax {
    pub fn simple(label: impl Into<String>) -> Syntax {
        Syntax::Simple(SimpleSyntax {
            label: label.into(),
            attribute: Attribute::None,
        })
    }

    pub fn with_attribute(label: impl Into<String>, attribute: Attribute) -> Syntax {
        Syntax::Simple(SimpleSyntax {
            label: label.into(),
            attribute,
        })
    }

    pub fn complex(left: Syntax, right: Syntax, slash: Slash) -> Syntax {
        let num_slashes = left.num_slashes() + right.num_slashes() + 1;
        Syntax::Complex(Arc::new(ComplexSyntax {
            left,
            right,
            slash,
            num_slashes,
        }))
    }

    pub fn empty() -> Syntax {
        Syntax::simple("EMPTY")
    }

    pub fn punct() -> Syntax {
        Syntax::simple("PUNCT")
    }

    pub fn coordination() -> Syntax {
        Syntax::simple("C")
    }

    pub fn n() -> Syntax {
        Syntax::simple("N")
    }

    pub fn np() -> Syntax {
        Syntax::simple("NP")
    }

    pub fn s() -> Syntax {
        Syntax::simple("S")
    }

    /// Parse a category such as `(S\NP)/NP` or `S[dcl]`.
    pub fn read(text: &str) -> Result<Syntax, CcgError> {
        let text = strip_outer_parens(text.trim());
        let invalid = |message: &str| CcgError::InvalidSyntax {
            text: text.to_string(),
            message: message.to_string(),
        };

        let mut depth = 0i32;
        let mut split = None;
        for (i, c) in text.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return Err(invalid("unbalanced parentheses"));
            }
            if depth == 0 {
                if let Some(slash) = Slash::from_char(c) {
                    split = Some((i, slash));
                }
            }
        }
        if depth != 0 {
            return Err(invalid("unbalanced parentheses"));
        }

        match split {
            Some((i, slash)) => {
                let left = Syntax::read(&text[..i])?;
                let right = Syntax::read(&text[i + 1..])?;
                Ok(Syntax::complex(left, right, slash))
            }
            None => read_simple(text),
        }
    }

    pub fn num_slashes(&self) -> usize {
        match self {
            Syntax::Simple(_) => 0,
            Syntax::Complex(c) => c.num_slashes,
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Syntax::Complex(_))
    }

    pub fn as_complex(&self) -> Option<&ComplexSyntax> {
        match self {
            Syntax::Complex(c) => Some(c),
            Syntax::Simple(_) => None,
        }
    }

    pub fn as_simple(&self) -> Option<&SimpleSyntax> {
        match self {
            Syntax::Simple(s) => Some(s),
            Syntax::Complex(_) => None,
        }
    }

    pub fn slash(&self) -> Option<Slash> {
        self.as_complex().map(|c| c.slash)
    }

    pub fn left(&self) -> Option<&Syntax> {
        self.as_complex().map(|c| &c.left)
    }

    pub fn right(&self) -> Option<&Syntax> {
        self.as_complex().map(|c| &c.right)
    }

    /// Number of arguments a functor takes before yielding a simple category.
    pub fn num_arguments(&self) -> usize {
        let mut count = 0;
        let mut current = self;
        while let Syntax::Complex(c) = current {
            count += 1;
            current = &c.left;
        }
        count
    }

    pub fn has_attribute_variable(&self) -> bool {
        match self {
            Syntax::Simple(s) => s.attribute == Attribute::Variable,
            Syntax::Complex(c) => c.left.has_attribute_variable() || c.right.has_attribute_variable(),
        }
    }

    /// Replace the attribute variable with `assignment`.
    pub fn set_variable(&self, assignment: Option<&Attribute>) -> Syntax {
        let Some(assignment) = assignment else {
            return self.clone();
        };
        match self {
            Syntax::Simple(s) if s.attribute == Attribute::Variable => {
                Syntax::with_attribute(s.label.clone(), assignment.clone())
            }
            Syntax::Simple(_) => self.clone(),
            Syntax::Complex(c) => {
                if !self.has_attribute_variable() {
                    return self.clone();
                }
                Syntax::complex(
                    c.left.set_variable(Some(assignment)),
                    c.right.set_variable(Some(assignment)),
                    c.slash,
                )
            }
        }
    }

    /// Remove all attributes.
    pub fn strip_attributes(&self) -> Syntax {
        match self {
            Syntax::Simple(s) => Syntax::simple(s.label.clone()),
            Syntax::Complex(c) => {
                Syntax::complex(c.left.strip_attributes(), c.right.strip_attributes(), c.slash)
            }
        }
    }

    /// Unify with `other`. Both categories must have the same shape.
    pub fn unify(&self, other: &Syntax) -> Option<Unification> {
        if self.num_slashes() != other.num_slashes() {
            return None;
        }
        let mut bindings = Bindings::default();
        let syntax = self.unify_with(other, &mut bindings)?;
        let assignment = bindings.this.filter(|a| *a != Attribute::Variable);
        Some(Unification { syntax, assignment })
    }

    fn unify_with(&self, other: &Syntax, bindings: &mut Bindings) -> Option<Syntax> {
        match (self, other) {
            (Syntax::Simple(a), Syntax::Simple(b)) => {
                if a.label != b.label {
                    return None;
                }
                unify_attributes(a, b, bindings).map(|chosen| match chosen {
                    Side::This => self.clone(),
                    Side::Other => other.clone(),
                })
            }
            (Syntax::Complex(a), Syntax::Complex(b)) => {
                if a.slash != b.slash {
                    return None;
                }
                let right = a.right.unify_with(&b.right, bindings)?;
                let left = a.left.unify_with(&b.left, bindings)?;
                if left == a.left && right == a.right {
                    Some(self.clone())
                } else {
                    Some(Syntax::complex(left, right, a.slash))
                }
            }
            _ => None,
        }
    }
}

enum Side {
    This,
    Other,
}

fn unify_attributes(a: &SimpleSyntax, b: &SimpleSyntax, bindings: &mut Bindings) -> Option<Side> {
    use Attribute::{None as NoAttr, Value, Variable};

    match (&a.attribute, &b.attribute) {
        (NoAttr, NoAttr) => Some(Side::This),
        (NoAttr, Variable) => bind(&mut bindings.other, NoAttr, Side::This),
        (NoAttr, Value(_)) => Some(Side::Other),
        (Variable, NoAttr) => bind(&mut bindings.this, NoAttr, Side::Other),
        (Value(_), NoAttr) => Some(Side::This),
        (Variable, attr) => bind(&mut bindings.this, attr.clone(), Side::Other),
        (Value(v), Variable) => bind(&mut bindings.other, Value(v.clone()), Side::This),
        (Value(x), Value(y)) if x == y => Some(Side::This),
        (Value(_), Value(_)) => None,
    }
}

/// Record `value` for a variable, or check it against an earlier binding.
fn bind(slot: &mut Option<Attribute>, value: Attribute, side: Side) -> Option<Side> {
    match slot {
        Some(existing) if *existing == value => Some(side),
        Some(_) => None,
        None => {
            *slot = Some(value);
            Some(side)
        }
    }
}

fn strip_outer_parens(text: &str) -> &str {
    let mut current = text;
    while current.starts_with('(') && current.ends_with(')') {
        let inner = &current[1..current.len() - 1];
        let mut depth = 0i32;
        let encloses = inner.chars().all(|c| {
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            depth >= 0
        });
        if !encloses || depth != 0 {
            break;
        }
        current = inner.trim();
    }
    current
}

fn read_simple(text: &str) -> Result<Syntax, CcgError> {
    let invalid = |message: &str| CcgError::InvalidSyntax {
        text: text.to_string(),
        message: message.to_string(),
    };
    let (label, attribute) = match text.find('[') {
        Some(open) => {
            let value = text[open + 1..]
                .strip_suffix(']')
                .ok_or_else(|| invalid("unterminated attribute"))?;
            let attribute = match value {
                VARIABLE_ATTRIBUTE => Attribute::Variable,
                RESERVED_ATTRIBUTE => return Err(invalid("'none' is a reserved attribute")),
                "" => return Err(invalid("empty attribute")),
                v if v.chars().all(|c| c.is_ascii_alphanumeric()) => Attribute::Value(v.to_string()),
                _ => return Err(invalid("invalid attribute")),
            };
            (&text[..open], attribute)
        }
        None => (text, Attribute::None),
    };
    if label.is_empty() || !label.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(invalid("labels are upper-case letters"));
    }
    Ok(Syntax::with_attribute(label, attribute))
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Syntax::Simple(s) => match &s.attribute {
                Attribute::None => write!(f, "{}", s.label),
                Attribute::Variable => write!(f, "{}[{}]", s.label, VARIABLE_ATTRIBUTE),
                Attribute::Value(v) => write!(f, "{}[{}]", s.label, v),
            },
            Syntax::Complex(c) => {
                if c.right.is_complex() {
                    write!(f, "{}{}({})", c.left, c.slash, c.right)
                } else {
                    write!(f, "{}{}{}", c.left, c.slash, c.right)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(text: &str) -> Syntax {
        Syntax::read(text).unwrap()
    }

    #[test]
    fn test_read_simple() {
        assert_eq!(read("N"), Syntax::n());
        assert_eq!(read(" NP "), Syntax::np());
        assert_eq!(
            read("S[dcl]"),
            Syntax::with_attribute("S", Attribute::Value("dcl".into()))
        );
        assert!(read("S[x]").has_attribute_variable());
    }

    #[test]
    fn test_read_rejects_bad_input() {
        assert!(Syntax::read("n").is_err());
        assert!(Syntax::read("S[none]").is_err());
        assert!(Syntax::read("S[dcl").is_err());
        assert!(Syntax::read("(S/NP").is_err());
        assert!(Syntax::read("").is_err());
    }

    #[test]
    fn test_left_associative() {
        let s = read("S\\NP/NP");
        let c = s.as_complex().unwrap();
        assert_eq!(c.slash(), Slash::Forward);
        assert_eq!(c.left(), &read("S\\NP"));
        assert_eq!(c.right(), &Syntax::np());
        assert_eq!(s, read("(S\\NP)/NP"));
        assert_eq!(s.num_arguments(), 2);
    }

    #[test]
    fn test_display_parenthesizes_right() {
        let s = read("(S/(S\\NP))");
        assert_eq!(s.to_string(), "S/(S\\NP)");
        assert_eq!(read(&s.to_string()), s);
        assert_eq!(read("(C|N)\\N").to_string(), "C|N\\N");
    }

    #[test]
    fn test_unify_slash_count() {
        assert!(read("N").unify(&read("N/N")).is_none());
        assert!(read("N/N").unify(&read("N\\N")).is_none());
        assert!(read("N/N").unify(&read("N/N")).is_some());
    }

    #[test]
    fn test_unify_attributes() {
        let plain = read("S");
        let dcl = read("S[dcl]");
        let b = read("S[b]");
        assert_eq!(plain.unify(&dcl).unwrap().syntax, dcl);
        assert_eq!(dcl.unify(&plain).unwrap().syntax, dcl);
        assert!(dcl.unify(&b).is_none());
    }

    #[test]
    fn test_unify_variable_assignment() {
        let var = read("S[x]");
        let dcl = read("S[dcl]");
        let result = var.unify(&dcl).unwrap();
        assert_eq!(result.assignment, Some(Attribute::Value("dcl".into())));

        let result = var.unify(&read("S")).unwrap();
        assert_eq!(result.assignment, Some(Attribute::None));

        let result = var.unify(&var).unwrap();
        assert_eq!(result.assignment, None);
    }

    #[test]
    fn test_unify_variable_consistency() {
        let var = read("S[x]/S[x]");
        assert!(var.unify(&read("S[dcl]/S[dcl]")).is_some());
        assert!(var.unify(&read("S[dcl]/S[b]")).is_none());
        let other_side = read("S[dcl]/S[b]");
        assert!(other_side.unify(&var).is_none());
    }

    #[test]
    fn test_set_variable() {
        let s = read("S[x]\\NP");
        let set = s.set_variable(Some(&Attribute::Value("dcl".into())));
        assert_eq!(set, read("S[dcl]\\NP"));
        let cleared = s.set_variable(Some(&Attribute::None));
        assert_eq!(cleared, read("S\\NP"));
        assert_eq!(s.set_variable(None), s);
    }
}
