//! Categories: Syntax Paired with Semantics
//!
//! A [`Category`] is a syntactic category with an optional logical form,
//! written `syntax : semantics`:
//!
//! ```text
//! N/N : (lambda $0:<e,t> (lambda $1:e (and:<t*,t> (big:<e,t> $1) ($0 $1))))
//! ```
//!
//! [`CategoryServices`] implements the two operations every combinator is
//! built from: function application and generalized composition. Both
//! combine the syntactic and the semantic side in lockstep, and both return
//! `None` when either side refuses.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use semparse_ccg::category::CategoryServices;
//! use semparse_logic::LogicContext;
//!
//! let ctx = Arc::new(LogicContext::builder().build().unwrap());
//! let services = CategoryServices::new(ctx);
//!
//! let big = services
//!     .read("N/N : (lambda $0:<e,t> (lambda $1:e (and:<t*,t> (big:<e,t> $1) ($0 $1))))")
//!     .unwrap();
//! let city = services.read("N : city:<e,t>").unwrap();
//!
//! let phrase = services.apply(&big, &city).unwrap();
//! assert_eq!(
//!     phrase.to_string(),
//!     "N : (lambda $0:e (and:<t*,t> (big:<e,t> $0) (city:<e,t> $0)))"
//! );
//! ```

use std::fmt;
use std::sync::Arc;

use semparse_logic::{LogicContext, LogicalExpression};

use crate::syntax::{Slash, Syntax};
use crate::CcgError;

/// A syntactic category with optional semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category {
    syntax: Syntax,
    semantics: Option<LogicalExpression>,
}

impl Category {
    pub fn new(syntax: Syntax, semantics: Option<LogicalExpression>) -> Self {
        Self { syntax, semantics }
    }

    pub fn with_semantics(syntax: Syntax, semantics: LogicalExpression) -> Self {
        Self::new(syntax, Some(semantics))
    }

    /// The `EMPTY` category used for skipped words. It has no semantics.
    pub fn empty() -> Self {
        Self::new(Syntax::empty(), None)
    }

    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    pub fn semantics(&self) -> Option<&LogicalExpression> {
        self.semantics.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.syntax == Syntax::empty()
    }

    pub fn is_complex(&self) -> bool {
        self.syntax.is_complex()
    }

    pub fn slash(&self) -> Option<Slash> {
        self.syntax.slash()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.semantics {
            Some(semantics) => write!(f, "{} : {}", self.syntax, semantics),
            None => write!(f, "{}", self.syntax),
        }
    }
}

/// Application, composition and reading of categories over one
/// [`LogicContext`].
#[derive(Debug, Clone)]
pub struct CategoryServices {
    ctx: Arc<LogicContext>,
}

impl CategoryServices {
    pub fn new(ctx: Arc<LogicContext>) -> Self {
        tracing::debug!(strip_lambdas = ctx.strips_lambdas(), "category services created");
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<LogicContext> {
        &self.ctx
    }

    /// Read `syntax` or `syntax : semantics`. The semantics is type
    /// checked and simplified.
    pub fn read(&self, text: &str) -> Result<Category, CcgError> {
        let trimmed = text.trim();
        let (syntax, semantics) = match trimmed.split_once(':') {
            Some((syntax, semantics)) => {
                let semantics = semantics.trim();
                if semantics.is_empty() {
                    return Err(CcgError::InvalidCategory {
                        text: text.to_string(),
                        message: "empty semantics after ':'".to_string(),
                    });
                }
                let expr = self.ctx.read(semantics)?;
                (syntax, Some(self.ctx.simplify(&expr)))
            }
            None => (trimmed, None),
        };
        let syntax = Syntax::read(syntax)?;
        Ok(Category::new(syntax, semantics))
    }

    /// `X/Y : f` applied to `Y : a` gives `X : f(a)`; the same for `X\Y`.
    ///
    /// The slash direction is not checked here, the calling rule decides
    /// which side the function sits on. Vertical slashes never apply.
    pub fn apply(&self, function: &Category, argument: &Category) -> Option<Category> {
        let complex = function.syntax.as_complex()?;
        if complex.slash() == Slash::Vertical {
            return None;
        }
        let function_semantics = function.semantics.as_ref()?;
        let argument_semantics = argument.semantics.as_ref()?;

        let unification = complex.right().unify(&argument.syntax)?;
        let syntax = complex.left().set_variable(unification.assignment.as_ref());
        let semantics = self.ctx.apply(function_semantics, argument_semantics)?;
        Some(Category::with_semantics(syntax, semantics))
    }

    /// Generalized composition of the given order.
    ///
    /// With `primary = X/Y` and `order = 1`, `secondary = Y/Z` gives `X/Z`.
    /// Higher orders reach deeper into the secondary: at order 2,
    /// `(Y/Z)/W` gives `(X/Z)/W`. Crossed composition is only defined at
    /// order 1 and requires the secondary's slash to lean the other way.
    pub fn compose(
        &self,
        primary: &Category,
        secondary: &Category,
        order: usize,
        cross: bool,
    ) -> Option<Category> {
        if order == 0 || (cross && order != 1) {
            return None;
        }
        let primary_syntax = primary.syntax.as_complex()?;
        let primary_slash = primary_syntax.slash();
        if primary_slash == Slash::Vertical {
            return None;
        }
        let primary_semantics = primary.semantics.as_ref()?;
        let secondary_semantics = secondary.semantics.as_ref()?;

        let mut stack: Vec<(Syntax, Slash)> = Vec::with_capacity(order);
        let mut current = &secondary.syntax;
        for _ in 0..order {
            let complex = current.as_complex()?;
            stack.push((complex.right().clone(), complex.slash()));
            current = complex.left();
        }

        if order == 1 {
            let secondary_slash = stack[0].1;
            if secondary_slash == Slash::Vertical {
                return None;
            }
            if cross == (primary_slash == secondary_slash) {
                return None;
            }
        }

        let unification = primary_syntax.right().unify(current)?;
        let yield_syntax = primary_syntax
            .left()
            .set_variable(unification.assignment.as_ref());
        let semantics = self
            .ctx
            .compose(primary_semantics, secondary_semantics, order)?;

        let syntax = stack
            .into_iter()
            .rev()
            .fold(yield_syntax, |inner, (argument, slash)| {
                Syntax::complex(inner, argument, slash)
            });
        Some(Category::with_semantics(syntax, semantics))
    }
}
