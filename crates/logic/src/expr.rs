//! Logical expressions: lambda terms over typed constants and variables.
//!
//! Expressions are immutable trees of shared nodes. Every node caches a
//! hash that ignores variable identity, so alpha-equivalent expressions
//! hash alike; equality itself goes through [`crate::scope::ScopeMapping`].
//!
//! # Example
//!
//! ```rust
//! use semparse_logic::LogicContext;
//!
//! let ctx = LogicContext::builder().build().unwrap();
//! let a = ctx.read("(lambda $0:e (city:<e,t> $0))").unwrap();
//! let b = ctx.read("(lambda $0:e  (city:<e,t>   $0))").unwrap();
//!
//! assert_eq!(a, b);
//! assert_eq!(a.ty().name(), "<e,t>");
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::scope::{alpha_equals, ScopeMapping};
use crate::types::{Type, TypeKind};
use crate::LogicError;

/// Identity of a variable, stable while the variable is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableId(usize);

#[derive(Debug)]
struct VariableData {
    ty: Type,
    skolem: bool,
}

/// A typed variable. Two variables are the same only if they are the same
/// object; alpha-equivalence relates distinct variables through binders.
///
/// Skolem identifiers are variables of the `id` type that are never bound:
/// they name a specific entity introduced by a quantifier.
#[derive(Clone)]
pub struct Variable(Arc<VariableData>);

impl Variable {
    pub fn new(ty: Type) -> Self {
        Self(Arc::new(VariableData { ty, skolem: false }))
    }

    /// A fresh skolem identifier.
    pub fn skolem(ty: Type) -> Self {
        Self(Arc::new(VariableData { ty, skolem: true }))
    }

    pub fn ty(&self) -> &Type {
        &self.0.ty
    }

    pub fn is_skolem(&self) -> bool {
        self.0.skolem
    }

    pub fn id(&self) -> VariableId {
        VariableId(Arc::as_ptr(&self.0) as usize)
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.is_skolem() { "!" } else { "$" };
        write!(f, "{}{:x}:{}", prefix, self.id().0, self.0.ty)
    }
}

#[derive(Debug)]
struct ConstantData {
    name: String,
    ty: Type,
}

/// A named, typed constant. Constants are interned by
/// [`crate::LogicContext`], but compare by name and type either way.
#[derive(Clone)]
pub struct LogicalConstant(Arc<ConstantData>);

impl LogicalConstant {
    /// Prefix marking constants created on the fly rather than declared.
    pub const DYNAMIC_PREFIX: char = '@';

    pub(crate) fn new(name: String, ty: Type) -> Self {
        Self(Arc::new(ConstantData { name, ty }))
    }

    /// True if `name` can be used as a constant name.
    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty()
            && !name.starts_with('$')
            && !name.starts_with('!')
            && !name.contains(|c: char| "(),:#".contains(c) || c.is_whitespace())
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn ty(&self) -> &Type {
        &self.0.ty
    }

    pub fn is_dynamic(&self) -> bool {
        self.0.name.starts_with(Self::DYNAMIC_PREFIX)
    }
}

impl PartialEq for LogicalConstant {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || (self.0.name == other.0.name && self.0.ty == other.0.ty)
    }
}

impl Eq for LogicalConstant {}

impl Hash for LogicalConstant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
        self.0.ty.hash(state);
    }
}

impl fmt::Display for LogicalConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.0.name, self.0.ty)
    }
}

impl fmt::Debug for LogicalConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// `(lambda $x body)`
#[derive(Debug)]
pub struct Lambda {
    argument: Variable,
    body: LogicalExpression,
    ty: Type,
    hash: u64,
}

impl Lambda {
    pub fn argument(&self) -> &Variable {
        &self.argument
    }

    pub fn body(&self) -> &LogicalExpression {
        &self.body
    }
}

/// `(predicate arg1 arg2 ...)`, at least one argument.
#[derive(Debug)]
pub struct Literal {
    predicate: LogicalExpression,
    arguments: Vec<LogicalExpression>,
    ty: Type,
    hash: u64,
}

impl Literal {
    pub fn predicate(&self) -> &LogicalExpression {
        &self.predicate
    }

    pub fn arguments(&self) -> &[LogicalExpression] {
        &self.arguments
    }

    /// Arguments may be matched as a multiset.
    pub fn is_order_insensitive(&self) -> bool {
        self.predicate.ty().is_order_insensitive()
    }

    /// The predicate when it is a constant.
    pub fn constant_predicate(&self) -> Option<&LogicalConstant> {
        self.predicate.as_constant()
    }
}

/// A typed lambda-calculus term.
#[derive(Clone)]
pub enum LogicalExpression {
    Lambda(Arc<Lambda>),
    Literal(Arc<Literal>),
    Constant(LogicalConstant),
    Variable(Variable),
}

fn hash_of<T: Hash>(value: T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Type of `predicate` applied to `arguments`.
///
/// Regular arrows consume one argument each; a recursive type consumes all
/// remaining arguments and yields its final range once at least its minimum
/// count is reached. With `check` off the walk never fails: it stops at the
/// first non-function type.
pub(crate) fn literal_type(
    predicate: &Type,
    arguments: &[LogicalExpression],
    check: bool,
) -> Result<Type, String> {
    let mut current = predicate.clone();
    let mut index = 0;
    while index < arguments.len() {
        let (domain, range, option) = match current.kind() {
            TypeKind::Complex {
                domain,
                range,
                option,
            } => (domain.clone(), range.clone(), *option),
            _ if check => {
                return Err(format!(
                    "{} arguments given to predicate of type {}",
                    arguments.len(),
                    predicate
                ))
            }
            _ => return Ok(current),
        };
        match option {
            Some(option) => {
                let remaining = &arguments[index..];
                if check {
                    if let Some(bad) = remaining
                        .iter()
                        .find(|a| !a.ty().is_extending_or_extended_by(&domain))
                    {
                        return Err(format!("argument of type {} where {} expected", bad.ty(), domain));
                    }
                }
                return Ok(if remaining.len() >= option.min_args {
                    range
                } else {
                    current
                });
            }
            None => {
                let arg_ty = arguments[index].ty();
                if check && !arg_ty.is_extending_or_extended_by(&domain) {
                    return Err(format!("argument of type {} where {} expected", arg_ty, domain));
                }
                current = range;
                index += 1;
            }
        }
    }
    Ok(current)
}

impl LogicalExpression {
    pub fn lambda(argument: Variable, body: LogicalExpression) -> Self {
        let ty = Type::complex(argument.ty().clone(), body.ty());
        let hash = hash_of(("lambda", argument.ty().name(), body.structural_hash()));
        LogicalExpression::Lambda(Arc::new(Lambda {
            argument,
            body,
            ty,
            hash,
        }))
    }

    /// Build a literal, checking argument types against the predicate.
    pub fn literal(
        predicate: LogicalExpression,
        arguments: Vec<LogicalExpression>,
    ) -> Result<Self, LogicError> {
        if arguments.is_empty() {
            return Err(LogicError::IllTyped {
                expression: predicate.to_string(),
                message: "literal without arguments".to_string(),
            });
        }
        let ty = literal_type(&predicate.ty(), &arguments, true).map_err(|message| {
            LogicError::IllTyped {
                expression: format!("({} ...)", predicate),
                message,
            }
        })?;
        Ok(Self::make_literal(predicate, arguments, ty))
    }

    /// Build a literal without argument checks; used when rebuilding terms
    /// whose types were already verified.
    pub(crate) fn literal_unchecked(
        predicate: LogicalExpression,
        arguments: Vec<LogicalExpression>,
    ) -> Self {
        let ty = match literal_type(&predicate.ty(), &arguments, false) {
            Ok(ty) => ty,
            Err(_) => predicate.ty(),
        };
        Self::make_literal(predicate, arguments, ty)
    }

    fn make_literal(
        predicate: LogicalExpression,
        arguments: Vec<LogicalExpression>,
        ty: Type,
    ) -> Self {
        let args_hash = if predicate.ty().is_order_insensitive() {
            arguments
                .iter()
                .fold(0u64, |acc, a| acc.wrapping_add(a.structural_hash()))
        } else {
            hash_of(arguments.iter().map(|a| a.structural_hash()).collect::<Vec<_>>())
        };
        let hash = hash_of(("literal", predicate.structural_hash(), args_hash));
        LogicalExpression::Literal(Arc::new(Literal {
            predicate,
            arguments,
            ty,
            hash,
        }))
    }

    pub fn ty(&self) -> Type {
        match self {
            LogicalExpression::Lambda(l) => l.ty.clone(),
            LogicalExpression::Literal(l) => l.ty.clone(),
            LogicalExpression::Constant(c) => c.ty().clone(),
            LogicalExpression::Variable(v) => v.ty().clone(),
        }
    }

    /// Hash invariant under renaming of variables.
    pub fn structural_hash(&self) -> u64 {
        match self {
            LogicalExpression::Lambda(l) => l.hash,
            LogicalExpression::Literal(l) => l.hash,
            LogicalExpression::Constant(c) => hash_of(("constant", c)),
            LogicalExpression::Variable(v) => {
                hash_of((if v.is_skolem() { "skolem" } else { "variable" }, v.ty()))
            }
        }
    }

    pub fn as_lambda(&self) -> Option<&Lambda> {
        match self {
            LogicalExpression::Lambda(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            LogicalExpression::Literal(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<&LogicalConstant> {
        match self {
            LogicalExpression::Constant(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            LogicalExpression::Variable(v) => Some(v),
            _ => None,
        }
    }

    /// Free non-skolem variables in order of first occurrence.
    pub fn free_variables(&self) -> Vec<Variable> {
        let mut bound = Vec::new();
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect_free(&mut bound, &mut seen, &mut out);
        out
    }

    fn collect_free(
        &self,
        bound: &mut Vec<VariableId>,
        seen: &mut HashSet<VariableId>,
        out: &mut Vec<Variable>,
    ) {
        match self {
            LogicalExpression::Variable(v) => {
                if !v.is_skolem() && !bound.contains(&v.id()) && seen.insert(v.id()) {
                    out.push(v.clone());
                }
            }
            LogicalExpression::Constant(_) => {}
            LogicalExpression::Lambda(l) => {
                bound.push(l.argument.id());
                l.body.collect_free(bound, seen, out);
                bound.pop();
            }
            LogicalExpression::Literal(l) => {
                l.predicate.collect_free(bound, seen, out);
                for arg in &l.arguments {
                    arg.collect_free(bound, seen, out);
                }
            }
        }
    }

    pub fn has_free_variables(&self) -> bool {
        !self.free_variables().is_empty()
    }

    pub fn contains_free_variable(&self, variable: &Variable) -> bool {
        self.free_variables().iter().any(|v| v == variable)
    }

    /// Number of occurrences of `variable` (bound or free) in the term.
    pub(crate) fn count_occurrences(&self, variable: &Variable) -> usize {
        match self {
            LogicalExpression::Variable(v) => usize::from(v == variable),
            LogicalExpression::Constant(_) => 0,
            LogicalExpression::Lambda(l) => l.body.count_occurrences(variable),
            LogicalExpression::Literal(l) => {
                l.predicate.count_occurrences(variable)
                    + l
                        .arguments
                        .iter()
                        .map(|a| a.count_occurrences(variable))
                        .sum::<usize>()
            }
        }
    }

    /// Rewrite free variables through `f`. Returns `None` when nothing
    /// changed so callers can keep sharing the original node.
    pub(crate) fn map_free_variables(
        &self,
        f: &mut dyn FnMut(&Variable) -> Option<LogicalExpression>,
    ) -> Option<LogicalExpression> {
        let mut bound = Vec::new();
        self.map_free(&mut bound, f)
    }

    fn map_free(
        &self,
        bound: &mut Vec<VariableId>,
        f: &mut dyn FnMut(&Variable) -> Option<LogicalExpression>,
    ) -> Option<LogicalExpression> {
        match self {
            LogicalExpression::Variable(v) => {
                if bound.contains(&v.id()) {
                    None
                } else {
                    f(v)
                }
            }
            LogicalExpression::Constant(_) => None,
            LogicalExpression::Lambda(l) => {
                bound.push(l.argument.id());
                let body = l.body.map_free(bound, f);
                bound.pop();
                body.map(|body| LogicalExpression::lambda(l.argument.clone(), body))
            }
            LogicalExpression::Literal(l) => {
                let predicate = l.predicate.map_free(bound, f);
                let arguments: Vec<Option<LogicalExpression>> =
                    l.arguments.iter().map(|a| a.map_free(bound, f)).collect();
                if predicate.is_none() && arguments.iter().all(Option::is_none) {
                    return None;
                }
                let predicate = predicate.unwrap_or_else(|| l.predicate.clone());
                let arguments = arguments
                    .into_iter()
                    .zip(&l.arguments)
                    .map(|(new, old)| new.unwrap_or_else(|| old.clone()))
                    .collect();
                Some(LogicalExpression::literal_unchecked(predicate, arguments))
            }
        }
    }

    /// Replace free occurrences of `variable` with `replacement`.
    pub fn substitute(&self, variable: &Variable, replacement: &LogicalExpression) -> LogicalExpression {
        self.map_free_variables(&mut |v| (v == variable).then(|| replacement.clone()))
            .unwrap_or_else(|| self.clone())
    }
}

impl From<LogicalConstant> for LogicalExpression {
    fn from(constant: LogicalConstant) -> Self {
        LogicalExpression::Constant(constant)
    }
}

impl From<Variable> for LogicalExpression {
    fn from(variable: Variable) -> Self {
        LogicalExpression::Variable(variable)
    }
}

impl PartialEq for LogicalExpression {
    fn eq(&self, other: &Self) -> bool {
        if self.structural_hash() != other.structural_hash() {
            return false;
        }
        match (self, other) {
            (LogicalExpression::Lambda(a), LogicalExpression::Lambda(b)) if Arc::ptr_eq(a, b) => {
                return true
            }
            (LogicalExpression::Literal(a), LogicalExpression::Literal(b)) if Arc::ptr_eq(a, b) => {
                return true
            }
            _ => {}
        }
        alpha_equals(self, other, &mut ScopeMapping::new())
    }
}

impl Eq for LogicalExpression {}

impl Hash for LogicalExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.structural_hash());
    }
}

impl fmt::Display for LogicalExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::printer::print(self))
    }
}

impl fmt::Debug for LogicalExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRepository;

    fn constant(repo: &TypeRepository, name: &str, ty: &str) -> LogicalExpression {
        LogicalConstant::new(name.to_string(), repo.resolve(ty).unwrap()).into()
    }

    #[test]
    fn test_literal_type_full_application() {
        let repo = TypeRepository::new();
        let pred = constant(&repo, "near", "<e,<e,t>>");
        let a = constant(&repo, "a", "e");
        let lit = LogicalExpression::literal(pred.clone(), vec![a.clone(), a.clone()]).unwrap();
        assert_eq!(lit.ty().name(), "t");
        let partial = LogicalExpression::literal(pred, vec![a]).unwrap();
        assert_eq!(partial.ty().name(), "<e,t>");
    }

    #[test]
    fn test_literal_type_recursive() {
        let repo = TypeRepository::new();
        let and = constant(&repo, "and", "<t*,t>");
        let p = constant(&repo, "p", "t");
        let one = LogicalExpression::literal(and.clone(), vec![p.clone()]).unwrap();
        assert_eq!(one.ty().name(), "<t*,t>");
        let three = LogicalExpression::literal(and, vec![p.clone(), p.clone(), p]).unwrap();
        assert_eq!(three.ty().name(), "t");
    }

    #[test]
    fn test_literal_ill_typed() {
        let repo = TypeRepository::new();
        let pred = constant(&repo, "city", "<e,t>");
        let p = constant(&repo, "p", "t");
        assert!(LogicalExpression::literal(pred.clone(), vec![p]).is_err());
        let a = constant(&repo, "a", "e");
        assert!(LogicalExpression::literal(pred, vec![a.clone(), a]).is_err());
    }

    #[test]
    fn test_variable_identity() {
        let repo = TypeRepository::new();
        let x = Variable::new(repo.entity());
        let y = Variable::new(repo.entity());
        assert_ne!(x, y);
        assert_eq!(x, x.clone());
        assert_eq!(
            LogicalExpression::from(x.clone()).structural_hash(),
            LogicalExpression::from(y).structural_hash()
        );
    }

    #[test]
    fn test_constant_names() {
        assert!(LogicalConstant::is_valid_name("city"));
        assert!(LogicalConstant::is_valid_name("@dyn"));
        assert!(!LogicalConstant::is_valid_name("$0"));
        assert!(!LogicalConstant::is_valid_name("!1"));
        assert!(!LogicalConstant::is_valid_name("a:b"));
        assert!(!LogicalConstant::is_valid_name("a(b"));
        assert!(!LogicalConstant::is_valid_name(""));
    }

    #[test]
    fn test_free_variables_and_substitute() {
        let repo = TypeRepository::new();
        let x = Variable::new(repo.entity());
        let y = Variable::new(repo.entity());
        let pred = constant(&repo, "near", "<e,<e,t>>");
        let body =
            LogicalExpression::literal(pred, vec![x.clone().into(), y.clone().into()]).unwrap();
        let lam = LogicalExpression::lambda(x.clone(), body);
        assert_eq!(lam.free_variables(), vec![y.clone()]);

        let a = constant(&repo, "a", "e");
        let replaced = lam.substitute(&y, &a);
        assert!(replaced.free_variables().is_empty());
        // bound occurrences are untouched
        let same = lam.substitute(&x, &a);
        assert_eq!(same, lam);
    }
}
