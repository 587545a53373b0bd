//! Unary rule assigning skolem IDs to closed quantifiers.

use std::collections::HashSet;

use semparse_logic::{assign_skolem_ids, LogicalConstant};

use crate::category::{Category, CategoryServices};

pub const SKOLEM_LABEL: &str = "skolem";

#[derive(Debug, Clone)]
pub struct SkolemIdRule {
    quantifiers: HashSet<LogicalConstant>,
}

impl SkolemIdRule {
    pub fn new(quantifiers: impl IntoIterator<Item = LogicalConstant>) -> Self {
        Self {
            quantifiers: quantifiers.into_iter().collect(),
        }
    }

    pub fn quantifiers(&self) -> &HashSet<LogicalConstant> {
        &self.quantifiers
    }

    /// `None` when the semantics has no closed quantifier left to mark.
    pub fn apply(&self, services: &CategoryServices, category: &Category) -> Option<Category> {
        let semantics = category.semantics()?;
        let assigned = assign_skolem_ids(services.context(), semantics, &self.quantifiers)?;
        Some(Category::with_semantics(category.syntax().clone(), assigned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{SentenceSpan, UnaryRule};
    use semparse_logic::LogicContext;
    use std::sync::Arc;

    #[test]
    fn test_skolem_rule() {
        let ctx = Arc::new(LogicContext::builder().build().unwrap());
        let services = CategoryServices::new(Arc::clone(&ctx));
        let a = ctx.read("a:<id,<<e,t>,e>>").unwrap().as_constant().cloned().unwrap();
        let rule = UnaryRule::SkolemId(SkolemIdRule::new([a]));

        let np = services
            .read("NP : (a:<id,<<e,t>,e>> na:id city:<e,t>)")
            .unwrap();
        let span = SentenceSpan::new(0, 0, 1);
        let result = rule.apply(&services, &np, span).unwrap();
        assert_eq!(result.name.to_string(), "skolem");
        assert_eq!(
            result.category.to_string(),
            "NP : (a:<id,<<e,t>,e>> !1 city:<e,t>)"
        );
        assert!(rule.apply(&services, &result.category, span).is_none());
        assert!(rule.is_valid_argument(&np, span));
        assert!(!rule.is_valid_argument(&Category::empty(), span));
    }
}
