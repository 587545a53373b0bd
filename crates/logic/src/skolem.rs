//! Skolem identifier assignment.
//!
//! Quantifier literals are written with the placeholder `na:id` as their
//! first argument, e.g. `(a:<id,<<e,t>,e>> na:id (lambda $0:e (city:<e,t> $0)))`.
//! Once such a literal no longer mentions any free variable its referent is
//! fixed, and the placeholder is replaced by a fresh skolem ID (`!1`).

use std::collections::HashSet;

use crate::context::LogicContext;
use crate::expr::{LogicalConstant, LogicalExpression, Variable, VariableId};

/// Replace placeholders of closed quantifier literals with fresh skolem IDs.
///
/// Returns `None` if nothing was replaced.
pub fn assign_skolem_ids(
    ctx: &LogicContext,
    expr: &LogicalExpression,
    quantifiers: &HashSet<LogicalConstant>,
) -> Option<LogicalExpression> {
    let (result, _) = visit(ctx, expr, quantifiers);
    result
}

/// Returns the rewritten node (if changed) and its free variables.
fn visit(
    ctx: &LogicContext,
    expr: &LogicalExpression,
    quantifiers: &HashSet<LogicalConstant>,
) -> (Option<LogicalExpression>, HashSet<VariableId>) {
    match expr {
        LogicalExpression::Variable(v) if !v.is_skolem() => (None, HashSet::from([v.id()])),
        LogicalExpression::Variable(_) | LogicalExpression::Constant(_) => (None, HashSet::new()),
        LogicalExpression::Lambda(l) => {
            let (body, mut free) = visit(ctx, l.body(), quantifiers);
            free.remove(&l.argument().id());
            (
                body.map(|b| LogicalExpression::lambda(l.argument().clone(), b)),
                free,
            )
        }
        LogicalExpression::Literal(l) => {
            let (predicate, mut free) = visit(ctx, l.predicate(), quantifiers);
            let mut changed = predicate.is_some();
            let mut arguments = Vec::with_capacity(l.arguments().len());
            for arg in l.arguments() {
                let (new_arg, arg_free) = visit(ctx, arg, quantifiers);
                free.extend(arg_free);
                changed |= new_arg.is_some();
                arguments.push(new_arg.unwrap_or_else(|| arg.clone()));
            }

            let is_open_quantifier = free.is_empty()
                && l
                    .constant_predicate()
                    .is_some_and(|c| quantifiers.contains(c))
                && arguments[0].as_constant() == Some(ctx.skolem_placeholder());
            if is_open_quantifier {
                arguments[0] = Variable::skolem(ctx.types().id()).into();
                changed = true;
            }

            if !changed {
                return (None, free);
            }
            let predicate = predicate.unwrap_or_else(|| l.predicate().clone());
            (
                Some(LogicalExpression::literal_unchecked(predicate, arguments)),
                free,
            )
        }
    }
}
