//! Canonical text rendering of logical expressions.
//!
//! Variables are numbered `$0`, `$1`, ... in the order they are defined:
//! a lambda defines its argument, a free variable is defined by its first
//! occurrence, which also carries its type (`$1:e`). Skolem identifiers are
//! numbered `!1`, `!2`, ... in order of appearance.

use std::collections::HashMap;

use crate::expr::{LogicalExpression, VariableId};

struct Printer {
    out: String,
    variables: HashMap<VariableId, usize>,
    next_variable: usize,
    skolems: HashMap<VariableId, usize>,
}

pub(crate) fn print(expr: &LogicalExpression) -> String {
    let mut printer = Printer {
        out: String::new(),
        variables: HashMap::new(),
        next_variable: 0,
        skolems: HashMap::new(),
    };
    printer.visit(expr);
    printer.out
}

impl Printer {
    fn define(&mut self, id: VariableId) -> usize {
        let index = self.next_variable;
        self.next_variable += 1;
        self.variables.insert(id, index);
        index
    }

    fn visit(&mut self, expr: &LogicalExpression) {
        match expr {
            LogicalExpression::Lambda(l) => {
                let index = self.define(l.argument().id());
                self.out.push_str(&format!("(lambda ${}:{} ", index, l.argument().ty()));
                self.visit(l.body());
                self.out.push(')');
            }
            LogicalExpression::Literal(l) => {
                self.out.push('(');
                self.visit(l.predicate());
                for arg in l.arguments() {
                    self.out.push(' ');
                    self.visit(arg);
                }
                self.out.push(')');
            }
            LogicalExpression::Constant(c) => self.out.push_str(&c.to_string()),
            LogicalExpression::Variable(v) if v.is_skolem() => {
                let next = self.skolems.len() + 1;
                let index = *self.skolems.entry(v.id()).or_insert(next);
                self.out.push_str(&format!("!{}", index));
            }
            LogicalExpression::Variable(v) => match self.variables.get(&v.id()) {
                Some(index) => self.out.push_str(&format!("${}", index)),
                None => {
                    let index = self.define(v.id());
                    self.out.push_str(&format!("${}:{}", index, v.ty()));
                }
            },
        }
    }
}
