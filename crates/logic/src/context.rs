//! The logic context: types, constants and built-ins for one grammar.
//!
//! A [`LogicContext`] replaces process-wide registries. It owns the
//! [`TypeRepository`], interns constants, holds the built-in connectives and
//! the optional closed ontology, and is the entry point for reading,
//! simplifying, applying and composing expressions. Build it once, wrap it
//! in an `Arc`, and share it read-only across parses.
//!
//! # Example
//!
//! ```rust
//! use semparse_logic::LogicContext;
//!
//! let ctx = LogicContext::builder().build().unwrap();
//! let f = ctx.read("(lambda $0:e (city:<e,t> $0))").unwrap();
//! let a = ctx.read("paris:e").unwrap();
//!
//! let result = ctx.apply(&f, &a).unwrap();
//! assert_eq!(result.to_string(), "(city:<e,t> paris:e)");
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::apply;
use crate::expr::{LogicalConstant, LogicalExpression};
use crate::reader::Reader;
use crate::simplify;
use crate::types::{Type, TypeRepository};
use crate::LogicError;

/// Configures and builds a [`LogicContext`].
#[derive(Debug, Default)]
pub struct LogicContextBuilder {
    types: TypeRepository,
    ontology: Option<Vec<String>>,
    strip_lambdas: bool,
}

impl LogicContextBuilder {
    /// Declare a term type extending `parent`, if given.
    pub fn term_type(mut self, name: &str, parent: Option<&str>) -> Result<Self, LogicError> {
        self.types.add_term_type(name, parent)?;
        Ok(self)
    }

    /// Read type declarations (`name` or `(name parent)` per line).
    pub fn type_declarations(mut self, text: &str) -> Result<Self, LogicError> {
        self.types.read_declarations(text)?;
        Ok(self)
    }

    /// Close the ontology to the given `name:type` constants. Dynamic
    /// constants (`@name`) and the built-ins are always allowed.
    pub fn ontology<I, S>(mut self, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ontology = Some(constants.into_iter().map(Into::into).collect());
        self
    }

    /// Rewrite `(lambda $0 (p a $0))` to `(p a)` during simplification.
    pub fn strip_lambdas(mut self, strip: bool) -> Self {
        self.strip_lambdas = strip;
        self
    }

    pub fn build(self) -> Result<LogicContext, LogicError> {
        let types = self.types;
        let truth = types.truth();
        let coordination = types.resolve("<t*,t>")?;
        let make = |name: &str, ty: Type| LogicalConstant::new(name.to_string(), ty);

        let builtins = Builtins {
            conjunction: make("and", coordination.clone()),
            disjunction: make("or", coordination),
            negation: make("not", types.resolve("<t,t>")?),
            index_increment: make("inc", types.resolve("<ind,ind>")?),
            true_constant: make("true", truth.clone()),
            false_constant: make("false", truth),
            skolem_placeholder: make("na", types.id()),
        };

        let mut constants = HashMap::new();
        for c in builtins.all() {
            constants.insert((c.name().to_string(), c.ty().clone()), c.clone());
        }

        let ontology = match self.ontology {
            Some(names) => {
                let mut set = HashSet::new();
                for full in names {
                    let (name, ty) = full.split_once(':').ok_or_else(|| {
                        LogicError::InvalidConstantName { name: full.clone() }
                    })?;
                    if !LogicalConstant::is_valid_name(name) {
                        return Err(LogicError::InvalidConstantName {
                            name: name.to_string(),
                        });
                    }
                    let ty = types.resolve(ty)?;
                    set.insert((name.to_string(), ty));
                }
                Some(set)
            }
            None => None,
        };

        tracing::debug!(
            closed_ontology = ontology.is_some(),
            strip_lambdas = self.strip_lambdas,
            "logic context built"
        );

        Ok(LogicContext {
            types,
            constants: RwLock::new(constants),
            ontology,
            strip_lambdas: self.strip_lambdas,
            builtins,
        })
    }
}

#[derive(Debug)]
struct Builtins {
    conjunction: LogicalConstant,
    disjunction: LogicalConstant,
    negation: LogicalConstant,
    index_increment: LogicalConstant,
    true_constant: LogicalConstant,
    false_constant: LogicalConstant,
    skolem_placeholder: LogicalConstant,
}

impl Builtins {
    fn all(&self) -> [&LogicalConstant; 7] {
        [
            &self.conjunction,
            &self.disjunction,
            &self.negation,
            &self.index_increment,
            &self.true_constant,
            &self.false_constant,
            &self.skolem_placeholder,
        ]
    }
}

/// Shared registry and operations for logical expressions.
#[derive(Debug)]
pub struct LogicContext {
    types: TypeRepository,
    constants: RwLock<HashMap<(String, Type), LogicalConstant>>,
    ontology: Option<HashSet<(String, Type)>>,
    strip_lambdas: bool,
    builtins: Builtins,
}

impl LogicContext {
    pub fn builder() -> LogicContextBuilder {
        LogicContextBuilder::default()
    }

    pub fn types(&self) -> &TypeRepository {
        &self.types
    }

    pub fn strips_lambdas(&self) -> bool {
        self.strip_lambdas
    }

    pub fn conjunction(&self) -> &LogicalConstant {
        &self.builtins.conjunction
    }

    pub fn disjunction(&self) -> &LogicalConstant {
        &self.builtins.disjunction
    }

    pub fn negation(&self) -> &LogicalConstant {
        &self.builtins.negation
    }

    pub fn index_increment(&self) -> &LogicalConstant {
        &self.builtins.index_increment
    }

    pub fn true_constant(&self) -> &LogicalConstant {
        &self.builtins.true_constant
    }

    pub fn false_constant(&self) -> &LogicalConstant {
        &self.builtins.false_constant
    }

    /// The `na:id` constant quantifiers carry until a skolem ID is assigned.
    pub fn skolem_placeholder(&self) -> &LogicalConstant {
        &self.builtins.skolem_placeholder
    }

    /// Intern a constant, bypassing the ontology. Used by services that
    /// create predicates on the fly.
    pub fn constant(&self, name: &str, ty: Type) -> Result<LogicalConstant, LogicError> {
        if !LogicalConstant::is_valid_name(name) {
            return Err(LogicError::InvalidConstantName {
                name: name.to_string(),
            });
        }
        let key = (name.to_string(), ty);
        if let Some(existing) = self
            .constants
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&key)
        {
            return Ok(existing.clone());
        }
        let mut constants = self
            .constants
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let constant = constants
            .entry(key)
            .or_insert_with_key(|(name, ty)| LogicalConstant::new(name.clone(), ty.clone()));
        Ok(constant.clone())
    }

    /// Intern a constant read from text, enforcing the closed ontology.
    pub fn read_constant(&self, name: &str, ty: &str) -> Result<LogicalConstant, LogicError> {
        let ty = self.types.resolve(ty)?;
        if let Some(ontology) = &self.ontology {
            let is_builtin = self.builtins.all().iter().any(|c| c.name() == name && c.ty() == &ty);
            let allowed = name.starts_with(LogicalConstant::DYNAMIC_PREFIX)
                || is_builtin
                || ontology.contains(&(name.to_string(), ty.clone()));
            if !allowed {
                return Err(LogicError::UnknownConstant {
                    name: format!("{}:{}", name, ty),
                });
            }
        }
        self.constant(name, ty)
    }

    /// Read an expression, checking literal argument types.
    pub fn read(&self, text: &str) -> Result<LogicalExpression, LogicError> {
        Reader::new(self, text, true).read()
    }

    /// Read an expression without checking literal argument types.
    pub fn read_unchecked(&self, text: &str) -> Result<LogicalExpression, LogicError> {
        Reader::new(self, text, false).read()
    }

    pub fn read_type(&self, text: &str) -> Result<Type, LogicError> {
        self.types.resolve(text)
    }

    pub fn generalize(&self, ty: &Type) -> Type {
        self.types.generalize(ty)
    }

    pub fn simplify(&self, expr: &LogicalExpression) -> LogicalExpression {
        simplify::simplify(self, expr)
    }

    /// Apply `function` to `argument`; `None` if the types do not fit.
    pub fn apply(
        &self,
        function: &LogicalExpression,
        argument: &LogicalExpression,
    ) -> Option<LogicalExpression> {
        apply::apply(self, function, argument)
    }

    /// Generalized composition `f . g` of the given order (at least 1).
    pub fn compose(
        &self,
        f: &LogicalExpression,
        g: &LogicalExpression,
        order: usize,
    ) -> Option<LogicalExpression> {
        apply::compose(self, f, g, order)
    }

    pub fn is_coordinator(&self, constant: &LogicalConstant) -> bool {
        constant == self.conjunction() || constant == self.disjunction()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_are_interned() {
        let ctx = LogicContext::builder().build().unwrap();
        let ty = ctx.read_type("<e,t>").unwrap();
        let a = ctx.constant("city", ty.clone()).unwrap();
        let b = ctx.constant("city", ty).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_builtins_read_back() {
        let ctx = LogicContext::builder().build().unwrap();
        let and = ctx.read("and:<t*,t>").unwrap();
        assert_eq!(and.as_constant(), Some(ctx.conjunction()));
    }

    #[test]
    fn test_closed_ontology() {
        let ctx = LogicContext::builder()
            .ontology(["city:<e,t>", "paris:e"])
            .build()
            .unwrap();
        assert!(ctx.read("(city:<e,t> paris:e)").is_ok());
        assert!(matches!(
            ctx.read("(town:<e,t> paris:e)"),
            Err(LogicError::UnknownConstant { .. })
        ));
        assert!(ctx.read("(@town:<e,t> paris:e)").is_ok());
        assert!(ctx.read("(and:<t*,t> true:t false:t)").is_ok());
    }

    #[test]
    fn test_invalid_constant_name() {
        let ctx = LogicContext::builder().build().unwrap();
        let ty = ctx.types().entity();
        assert!(matches!(
            ctx.constant("a#b", ty),
            Err(LogicError::InvalidConstantName { .. })
        ));
    }

    #[test]
    fn test_user_types() {
        let ctx = LogicContext::builder()
            .type_declarations("(loc e)\n(city loc)")
            .unwrap()
            .build()
            .unwrap();
        let expr = ctx.read("(capital:<loc,t> springfield:city)").unwrap();
        assert_eq!(expr.ty(), ctx.types().truth());
    }
}
