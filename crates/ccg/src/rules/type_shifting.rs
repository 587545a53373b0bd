//! Type shifting by application of a fixed function category.

use crate::category::{Category, CategoryServices};
use crate::rules::{RuleName, SentenceSpan};
use crate::syntax::Syntax;
use crate::CcgError;

/// Shifts `Y` to `X` by applying a fixed `X/Y : f` (or `X\Y : f`).
///
/// ```text
/// N : city:<e,t>  =>  NP : (a:<id,<<e,t>,e>> na:id city:<e,t>)
/// ```
#[derive(Debug, Clone)]
pub struct ApplicationTypeShifting {
    name: RuleName,
    function: Category,
    input_syntax: Syntax,
    start_only: bool,
    end_only: bool,
    match_syntax: bool,
}

impl ApplicationTypeShifting {
    /// `function` must be complex and carry semantics.
    pub fn new(label: &str, function: Category) -> Result<Self, CcgError> {
        let invalid = |message: &str| CcgError::InvalidRule {
            message: format!("type shifting '{}': {}", label, message),
        };
        if label.is_empty() {
            return Err(invalid("empty label"));
        }
        let input_syntax = function
            .syntax()
            .right()
            .cloned()
            .ok_or_else(|| invalid("function category must be complex"))?;
        if function.semantics().is_none() {
            return Err(invalid("function category has no semantics"));
        }
        Ok(Self {
            name: RuleName::unary(label),
            function,
            input_syntax,
            start_only: false,
            end_only: false,
            match_syntax: false,
        })
    }

    /// Read the function category from text.
    pub fn read(label: &str, function: &str, services: &CategoryServices) -> Result<Self, CcgError> {
        Self::new(label, services.read(function)?)
    }

    /// Only apply to spans starting the sentence.
    pub fn start_only(mut self, start_only: bool) -> Self {
        self.start_only = start_only;
        self
    }

    /// Only apply to spans ending the sentence.
    pub fn end_only(mut self, end_only: bool) -> Self {
        self.end_only = end_only;
        self
    }

    /// Only apply to categories whose syntax equals the function's argument
    /// exactly, without attribute unification.
    pub fn match_syntax(mut self, match_syntax: bool) -> Self {
        self.match_syntax = match_syntax;
        self
    }

    pub fn name(&self) -> &RuleName {
        &self.name
    }

    pub fn function(&self) -> &Category {
        &self.function
    }

    fn span_allowed(&self, span: SentenceSpan) -> bool {
        (!self.start_only || span.is_start()) && (!self.end_only || span.is_end())
    }

    pub fn apply(
        &self,
        services: &CategoryServices,
        category: &Category,
        span: SentenceSpan,
    ) -> Option<Category> {
        if !self.span_allowed(span) {
            return None;
        }
        if self.match_syntax && category.syntax() != &self.input_syntax {
            return None;
        }
        services.apply(&self.function, category)
    }

    pub fn is_valid_argument(&self, category: &Category, span: SentenceSpan) -> bool {
        if !self.span_allowed(span) {
            return false;
        }
        if self.match_syntax {
            category.syntax() == &self.input_syntax
        } else {
            self.input_syntax.unify(category.syntax()).is_some()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semparse_logic::LogicContext;
    use std::sync::Arc;

    fn services() -> CategoryServices {
        CategoryServices::new(Arc::new(LogicContext::builder().build().unwrap()))
    }

    fn shifting(services: &CategoryServices) -> ApplicationTypeShifting {
        ApplicationTypeShifting::read(
            "shift_np",
            "NP/N : (lambda $0:<e,t> (a:<id,<<e,t>,e>> na:id $0))",
            services,
        )
        .unwrap()
    }

    #[test]
    fn test_shift_noun() {
        let services = services();
        let rule = shifting(&services);
        let city = services.read("N : city:<e,t>").unwrap();
        let span = SentenceSpan::new(1, 1, 3);
        let shifted = rule.apply(&services, &city, span).unwrap();
        assert_eq!(
            shifted.to_string(),
            "NP : (a:<id,<<e,t>,e>> na:id city:<e,t>)"
        );
        assert!(rule.is_valid_argument(&city, span));
        assert_eq!(rule.name().to_string(), "shift_np");
    }

    #[test]
    fn test_position_restrictions() {
        let services = services();
        let rule = shifting(&services).start_only(true);
        let city = services.read("N : city:<e,t>").unwrap();
        assert!(rule.apply(&services, &city, SentenceSpan::new(1, 1, 3)).is_none());
        assert!(rule.apply(&services, &city, SentenceSpan::new(0, 1, 3)).is_some());
        assert!(!rule.is_valid_argument(&city, SentenceSpan::new(1, 2, 3)));

        let rule = shifting(&services).end_only(true);
        assert!(rule.apply(&services, &city, SentenceSpan::new(0, 1, 3)).is_none());
        assert!(rule.apply(&services, &city, SentenceSpan::new(1, 2, 3)).is_some());
    }

    #[test]
    fn test_match_syntax() {
        let services = services();
        let rule = ApplicationTypeShifting::read("shift_s", "S/S[x] : (lambda $0:t $0)", &services)
            .unwrap()
            .match_syntax(true);
        let dcl = services.read("S[dcl] : p:t").unwrap();
        let var = services.read("S[x] : p:t").unwrap();
        let span = SentenceSpan::new(0, 0, 1);
        assert!(rule.apply(&services, &dcl, span).is_none());
        assert!(!rule.is_valid_argument(&dcl, span));
        assert!(rule.is_valid_argument(&var, span));
    }

    #[test]
    fn test_invalid_function() {
        let services = services();
        assert!(ApplicationTypeShifting::read("bad", "N : city:<e,t>", &services).is_err());
        assert!(ApplicationTypeShifting::read("bad", "NP/N", &services).is_err());
        assert!(ApplicationTypeShifting::read("bad", "NP/N : (lambda", &services).is_err());
    }
}
