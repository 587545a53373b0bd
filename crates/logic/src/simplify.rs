//! Normalization of logical expressions.
//!
//! Simplification runs bottom-up and is idempotent:
//!
//! - **beta reduction**: a literal whose predicate is a lambda consumes
//!   its arguments one at a time,
//! - **currying**: `((p a) b)` becomes `(p a b)`,
//! - **coordination**: `and`/`or` flatten nested uses of themselves, drop
//!   their neutral value and collapse to the absorbing value when present,
//! - **negation**: `(not (not x))` is `x`, `not` swaps `true` and `false`,
//! - **lambda stripping** (opt-in): `(lambda $0 (p a $0))` becomes `(p a)`.

use crate::context::LogicContext;
use crate::expr::{LogicalConstant, LogicalExpression};

pub(crate) fn simplify(ctx: &LogicContext, expr: &LogicalExpression) -> LogicalExpression {
    match expr {
        LogicalExpression::Lambda(l) => {
            let body = simplify(ctx, l.body());
            if ctx.strips_lambdas() {
                if let Some(stripped) = strip_lambda(l.argument(), &body) {
                    return stripped;
                }
            }
            LogicalExpression::lambda(l.argument().clone(), body)
        }
        LogicalExpression::Literal(l) => {
            // Flatten the curried spine before touching the predicate, so a
            // partial `(and a)` is never collapsed on its own.
            let mut predicate = l.predicate().clone();
            let mut arguments: Vec<LogicalExpression> = l.arguments().to_vec();
            while let Some(inner) = predicate.as_literal() {
                let mut merged = inner.arguments().to_vec();
                merged.append(&mut arguments);
                arguments = merged;
                predicate = inner.predicate().clone();
            }
            let predicate = simplify(ctx, &predicate);
            let arguments = arguments.iter().map(|a| simplify(ctx, a)).collect();
            reduce_literal(ctx, predicate, arguments)
        }
        LogicalExpression::Constant(_) | LogicalExpression::Variable(_) => expr.clone(),
    }
}

/// Combine a simplified predicate with simplified arguments.
fn reduce_literal(
    ctx: &LogicContext,
    predicate: LogicalExpression,
    mut arguments: Vec<LogicalExpression>,
) -> LogicalExpression {
    if arguments.is_empty() {
        return predicate;
    }
    match &predicate {
        LogicalExpression::Lambda(l) => {
            let rest = arguments.split_off(1);
            let reduced = l.body().substitute(l.argument(), &arguments[0]);
            let reduced = simplify(ctx, &reduced);
            if rest.is_empty() {
                reduced
            } else {
                reduce_literal(ctx, reduced, rest)
            }
        }
        LogicalExpression::Literal(inner) => {
            let mut merged = inner.arguments().to_vec();
            merged.append(&mut arguments);
            reduce_literal(ctx, inner.predicate().clone(), merged)
        }
        LogicalExpression::Constant(c) if ctx.is_coordinator(c) => {
            coordinate(ctx, c, arguments)
        }
        LogicalExpression::Constant(c) if c == ctx.negation() && arguments.len() == 1 => {
            negate(ctx, predicate.clone(), arguments)
        }
        _ => LogicalExpression::literal_unchecked(predicate, arguments),
    }
}

fn coordinate(
    ctx: &LogicContext,
    coordinator: &LogicalConstant,
    arguments: Vec<LogicalExpression>,
) -> LogicalExpression {
    let is_conjunction = coordinator == ctx.conjunction();
    let (neutral, absorbing) = if is_conjunction {
        (ctx.true_constant(), ctx.false_constant())
    } else {
        (ctx.false_constant(), ctx.true_constant())
    };

    let mut flat = Vec::with_capacity(arguments.len());
    for arg in arguments {
        match arg.as_literal() {
            Some(inner) if inner.constant_predicate() == Some(coordinator) => {
                flat.extend(inner.arguments().iter().cloned())
            }
            _ => flat.push(arg),
        }
    }

    if flat.iter().any(|a| a.as_constant() == Some(absorbing)) {
        return absorbing.clone().into();
    }
    flat.retain(|a| a.as_constant() != Some(neutral));

    match flat.len() {
        0 => neutral.clone().into(),
        1 => flat.remove(0),
        _ => LogicalExpression::literal_unchecked(coordinator.clone().into(), flat),
    }
}

fn negate(
    ctx: &LogicContext,
    predicate: LogicalExpression,
    arguments: Vec<LogicalExpression>,
) -> LogicalExpression {
    let arg = &arguments[0];
    if let Some(inner) = arg.as_literal() {
        if inner.constant_predicate() == Some(ctx.negation()) && inner.arguments().len() == 1 {
            return inner.arguments()[0].clone();
        }
    }
    match arg.as_constant() {
        Some(c) if c == ctx.true_constant() => ctx.false_constant().clone().into(),
        Some(c) if c == ctx.false_constant() => ctx.true_constant().clone().into(),
        _ => LogicalExpression::literal_unchecked(predicate, arguments),
    }
}

/// `(lambda $0 (p a $0))` to `(p a)` when `$0` occurs only as the last
/// argument and `p` does not take a variable number of arguments.
fn strip_lambda(
    argument: &crate::expr::Variable,
    body: &LogicalExpression,
) -> Option<LogicalExpression> {
    let literal = body.as_literal()?;
    let (last, init) = literal.arguments().split_last()?;
    if last.as_variable() != Some(argument)
        || body.count_occurrences(argument) != 1
        || literal.predicate().ty().is_recursive()
    {
        return None;
    }
    Some(if init.is_empty() {
        literal.predicate().clone()
    } else {
        LogicalExpression::literal_unchecked(literal.predicate().clone(), init.to_vec())
    })
}
