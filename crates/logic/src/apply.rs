//! Function application and generalized composition.
//!
//! Both operations are total: a type mismatch yields `None`, never a panic.

use std::collections::HashMap;

use crate::context::LogicContext;
use crate::expr::{LogicalExpression, Variable, VariableId};

pub(crate) fn apply(
    ctx: &LogicContext,
    function: &LogicalExpression,
    argument: &LogicalExpression,
) -> Option<LogicalExpression> {
    let function_type = function.ty();
    let domain = function_type.domain()?;
    if !argument.ty().is_extending_or_extended_by(domain) {
        return None;
    }

    let argument = rename_clashing_variables(function, argument);

    let applied = match function {
        LogicalExpression::Lambda(l) => l.body().substitute(l.argument(), &argument),
        LogicalExpression::Literal(l) => {
            let mut arguments = l.arguments().to_vec();
            arguments.push(argument);
            LogicalExpression::literal_unchecked(l.predicate().clone(), arguments)
        }
        LogicalExpression::Constant(_) | LogicalExpression::Variable(_) => {
            LogicalExpression::literal_unchecked(function.clone(), vec![argument])
        }
    };
    Some(ctx.simplify(&applied))
}

/// Give fresh identities to free variables of `argument` that are also
/// free in `function`.
fn rename_clashing_variables(
    function: &LogicalExpression,
    argument: &LogicalExpression,
) -> LogicalExpression {
    let function_free = function.free_variables();
    if function_free.is_empty() {
        return argument.clone();
    }
    let renames: HashMap<VariableId, Variable> = argument
        .free_variables()
        .into_iter()
        .filter(|v| function_free.contains(v))
        .map(|v| (v.id(), Variable::new(v.ty().clone())))
        .collect();
    if renames.is_empty() {
        return argument.clone();
    }
    argument
        .map_free_variables(&mut |v| renames.get(&v.id()).cloned().map(LogicalExpression::from))
        .unwrap_or_else(|| argument.clone())
}

/// `f . g`: strip `order - 1` binders off `g`, compose with the remaining
/// function and re-wrap the stripped binders outermost.
pub(crate) fn compose(
    ctx: &LogicContext,
    f: &LogicalExpression,
    g: &LogicalExpression,
    order: usize,
) -> Option<LogicalExpression> {
    if order == 0 {
        return None;
    }

    let mut stripped = Vec::with_capacity(order - 1);
    let mut inner = g.clone();
    for _ in 1..order {
        let next = match &inner {
            LogicalExpression::Lambda(l) => {
                stripped.push(l.argument().clone());
                l.body().clone()
            }
            _ => return None,
        };
        inner = next;
    }

    let f_type = f.ty();
    let g_type = inner.ty();
    let f_domain = f_type.domain()?;
    let g_range = g_type.range()?;
    let g_domain = g_type.domain()?;
    if !f_domain.is_extending_or_extended_by(&g_range) {
        return None;
    }

    let variable = Variable::new(ctx.generalize(g_domain));
    let g_of_x = apply(ctx, &inner, &variable.clone().into())?;
    let body = apply(ctx, f, &g_of_x)?;

    let mut result = ctx.simplify(&LogicalExpression::lambda(variable, body));
    for binder in stripped.into_iter().rev() {
        result = LogicalExpression::lambda(binder, result);
    }
    Some(result)
}
