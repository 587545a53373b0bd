//! Coordination Rules
//!
//! Coordination is built in stages. A coordinator word carries the category
//! `C : conj:t` (or `disj:t`); the rules then collect conjuncts into a
//! `C|Y` category whose semantics is a coordination literal, and finally
//! distribute a function over it:
//!
//! ```text
//! and    town          C : conj:t   N : town:<e,t>
//!        ------------ c1
//!        (C|N)\N : (lambda $0:<e,t> (conj:<<e,t>,<<e,t>,t>> $0 town:<e,t>))
//! city   ------------------------------------------------------ <apply
//!        C|N : (conj:<<e,t>,<<e,t>,t>> city:<e,t> town:<e,t>)
//! ```
//!
//! A function `X/N : f` then consumes `C|N` through `cx`, giving
//! `X : (and (f city) (f town))` with the shared binders of `f` kept
//! outermost. Truth-typed conjuncts skip the `C|Y` stage: `c1` directly
//! yields `Y\Y : (lambda $0:t (and:<t*,t> $0 y))`.

use std::sync::Arc;

use semparse_logic::{LogicContext, LogicalConstant, LogicalExpression, Type, Variable};

use crate::category::Category;
use crate::rules::RuleName;
use crate::syntax::{Slash, Syntax};

/// Which of the three coordination rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinationKind {
    /// `C Y => (C|Y)\Y`, or `Y\Y` for truth-typed `Y`.
    C1,
    /// `C C|Y => (C|Y)\Y`, extending a coordination by one slot.
    C2,
    /// `X/Y C|Y => X`, distributing a function over a coordination.
    CX,
}

impl CoordinationKind {
    pub fn name(self) -> RuleName {
        let label = match self {
            CoordinationKind::C1 => "c1",
            CoordinationKind::C2 => "c2",
            CoordinationKind::CX => "cx",
        };
        RuleName::new(label, None, 0)
    }
}

/// Semantic side of coordination.
#[derive(Debug, Clone)]
pub struct CoordinationServices {
    ctx: Arc<LogicContext>,
    conjunction: LogicalConstant,
    disjunction: LogicalConstant,
}

impl CoordinationServices {
    /// Services with the base coordinators `conj:t` and `disj:t`.
    pub fn new(ctx: Arc<LogicContext>) -> Result<Self, semparse_logic::LogicError> {
        let truth = ctx.types().truth();
        let conjunction = ctx.constant("conj", truth.clone())?;
        let disjunction = ctx.constant("disj", truth)?;
        Ok(Self::with_coordinators(ctx, conjunction, disjunction))
    }

    pub fn with_coordinators(
        ctx: Arc<LogicContext>,
        conjunction: LogicalConstant,
        disjunction: LogicalConstant,
    ) -> Self {
        tracing::debug!(%conjunction, %disjunction, "coordination services created");
        Self {
            ctx,
            conjunction,
            disjunction,
        }
    }

    pub fn conjunction(&self) -> &LogicalConstant {
        &self.conjunction
    }

    pub fn disjunction(&self) -> &LogicalConstant {
        &self.disjunction
    }

    pub(crate) fn apply(
        &self,
        kind: CoordinationKind,
        left: &Category,
        right: &Category,
    ) -> Option<Category> {
        match kind {
            CoordinationKind::C1 => self.apply_c1(left, right),
            CoordinationKind::C2 => self.apply_c2(left, right),
            CoordinationKind::CX => self.apply_cx(left, right),
        }
    }

    fn apply_c1(&self, left: &Category, right: &Category) -> Option<Category> {
        if left.syntax() != &Syntax::coordination() {
            return None;
        }
        let coordinator = left.semantics()?.as_constant()?;
        let coordinated = right.semantics()?;
        let y = right.syntax();

        if let Some(simple) = self.simple_coordination(coordinated, coordinator) {
            let syntax = Syntax::complex(y.clone(), y.clone(), Slash::Backward);
            return Some(Category::with_semantics(syntax, simple));
        }
        let partial = self.partial_coordination(coordinated, coordinator)?;
        let syntax = Syntax::complex(
            Syntax::complex(Syntax::coordination(), y.clone(), Slash::Vertical),
            y.clone(),
            Slash::Backward,
        );
        Some(Category::with_semantics(syntax, partial))
    }

    fn apply_c2(&self, left: &Category, right: &Category) -> Option<Category> {
        if left.syntax() != &Syntax::coordination() {
            return None;
        }
        let coordinated_type = coordination_argument(right.syntax(), None)?;
        let expanded = self.expand_coordination(right.semantics()?)?;
        let syntax = Syntax::complex(right.syntax().clone(), coordinated_type.clone(), Slash::Backward);
        Some(Category::with_semantics(syntax, expanded))
    }

    fn apply_cx(&self, left: &Category, right: &Category) -> Option<Category> {
        let function = left.syntax().as_complex()?;
        if function.slash() != Slash::Forward {
            return None;
        }
        coordination_argument(right.syntax(), Some(function.right()))?;
        let applied = self.apply_coordination(left.semantics()?, right.semantics()?)?;
        Some(Category::with_semantics(function.left().clone(), applied))
    }

    fn is_base_coordinator(&self, constant: &LogicalConstant) -> bool {
        constant == &self.conjunction || constant == &self.disjunction
    }

    fn is_conjunction(&self, constant: &LogicalConstant) -> bool {
        constant.name() == self.conjunction.name()
    }

    fn is_disjunction(&self, constant: &LogicalConstant) -> bool {
        constant.name() == self.disjunction.name()
    }

    /// A coordination predicate whose arity matches `num_args`.
    fn is_coordinator(&self, constant: &LogicalConstant, num_args: usize) -> bool {
        if !(self.is_conjunction(constant) || self.is_disjunction(constant)) {
            return false;
        }
        let mut arity = 0;
        let mut current = constant.ty().clone();
        while current.is_complex() {
            if current.is_recursive() {
                return false;
            }
            arity += 1;
            match current.range() {
                Some(range) => current = range,
                None => break,
            }
        }
        arity > 0 && arity == num_args
    }

    /// `(lambda $0:t (and $0 y))` for truth-typed `y`.
    fn simple_coordination(
        &self,
        coordinated: &LogicalExpression,
        coordinator: &LogicalConstant,
    ) -> Option<LogicalExpression> {
        if !self.is_base_coordinator(coordinator) {
            return None;
        }
        let truth = self.ctx.types().truth();
        if coordinated.ty() != truth {
            return None;
        }
        let predicate = if coordinator == &self.conjunction {
            self.ctx.conjunction()
        } else {
            self.ctx.disjunction()
        };
        let variable = Variable::new(truth);
        let body = LogicalExpression::literal(
            predicate.clone().into(),
            vec![variable.clone().into(), coordinated.clone()],
        )
        .ok()?;
        Some(self.ctx.simplify(&LogicalExpression::lambda(variable, body)))
    }

    /// `(lambda $0:T (conj:<T,<T,t>> $0 y))` where `T` generalizes the type
    /// of `y`.
    fn partial_coordination(
        &self,
        coordinated: &LogicalExpression,
        coordinator: &LogicalConstant,
    ) -> Option<LogicalExpression> {
        if !self.is_base_coordinator(coordinator) {
            return None;
        }
        let argument_type = self.ctx.generalize(&coordinated.ty());
        let predicate = self.coordination_predicate(coordinator, 2, &argument_type)?;
        let variable = Variable::new(argument_type);
        let body = LogicalExpression::literal(
            predicate.into(),
            vec![variable.clone().into(), coordinated.clone()],
        )
        .ok()?;
        Some(LogicalExpression::lambda(variable, body))
    }

    /// `(conj a b)` to `(lambda $0 (conj $0 a b))`.
    fn expand_coordination(&self, coordination: &LogicalExpression) -> Option<LogicalExpression> {
        let literal = coordination.as_literal()?;
        let predicate = literal.constant_predicate()?;
        if !self.is_coordinator(predicate, literal.arguments().len()) {
            return None;
        }
        let argument_type = predicate.ty().domain()?.clone();
        let expanded =
            self.coordination_predicate(predicate, literal.arguments().len() + 1, &argument_type)?;
        let variable = Variable::new(argument_type);
        let mut arguments = Vec::with_capacity(literal.arguments().len() + 1);
        arguments.push(variable.clone().into());
        arguments.extend(literal.arguments().iter().cloned());
        let body = LogicalExpression::literal(expanded.into(), arguments).ok()?;
        Some(LogicalExpression::lambda(variable, body))
    }

    /// Distribute `function` over the coordinates of `coordination`.
    ///
    /// Binders of `function` below the first are shared by all coordinates
    /// and stay outermost; the body under them must be truth-typed.
    pub fn apply_coordination(
        &self,
        function: &LogicalExpression,
        coordination: &LogicalExpression,
    ) -> Option<LogicalExpression> {
        let literal = coordination.as_literal()?;
        let predicate = literal.constant_predicate()?;
        if !self.is_coordinator(predicate, literal.arguments().len()) {
            return None;
        }
        let argument_type = predicate.ty().domain()?.clone();

        let lambda = function.as_lambda()?;
        if !argument_type.is_extending(lambda.argument().ty()) {
            return None;
        }

        let mut shared = Vec::new();
        let mut body = lambda.body().clone();
        loop {
            let (argument, inner) = match body.as_lambda() {
                Some(l) => (l.argument().clone(), l.body().clone()),
                None => break,
            };
            shared.push(argument);
            body = inner;
        }
        if body.ty() != self.ctx.types().truth() {
            return None;
        }

        let reduced = LogicalExpression::lambda(lambda.argument().clone(), body);
        let items = literal
            .arguments()
            .iter()
            .map(|coordinate| self.ctx.apply(&reduced, coordinate))
            .collect::<Option<Vec<_>>>()?;

        let coordinator = if self.is_conjunction(predicate) {
            self.ctx.conjunction()
        } else {
            self.ctx.disjunction()
        };
        let mut result = LogicalExpression::literal(coordinator.clone().into(), items).ok()?;
        for variable in shared.into_iter().rev() {
            result = LogicalExpression::lambda(variable, result);
        }
        Some(self.ctx.simplify(&result))
    }

    /// `coordinator` retyped to take `num_args` arguments of `argument_type`.
    fn coordination_predicate(
        &self,
        coordinator: &LogicalConstant,
        num_args: usize,
        argument_type: &Type,
    ) -> Option<LogicalConstant> {
        let ty = coordination_type(argument_type, num_args, self.ctx.types().truth());
        self.ctx.constant(coordinator.name(), ty).ok()
    }
}

/// `<T,<T,...,t>>` with `num_args` arguments.
fn coordination_type(argument_type: &Type, num_args: usize, truth: Type) -> Type {
    (0..num_args).fold(truth, |range, _| Type::complex(argument_type.clone(), range))
}

/// For `C|Y` returns `Y`, provided `Y` unifies with `expected` when given.
fn coordination_argument<'a>(syntax: &'a Syntax, expected: Option<&Syntax>) -> Option<&'a Syntax> {
    let complex = syntax.as_complex()?;
    if complex.slash() != Slash::Vertical || complex.left() != &Syntax::coordination() {
        return None;
    }
    match expected {
        Some(expected) => expected.unify(complex.right()).map(|_| complex.right()),
        None => Some(complex.right()),
    }
}
