//! Reader for the parenthesized expression syntax.
//!
//! ```text
//! expr     := '(' 'lambda' vardef expr ')' | '(' expr expr+ ')' | atom
//! vardef   := '$' N ':' type
//! atom     := name ':' type | '$' N | '$' N ':' type | '!' N
//! ```
//!
//! Whitespace between tokens is insignificant. A `$N:type` atom outside a
//! lambda header defines a free variable; later `$N` atoms refer to it.

use std::collections::HashMap;

use crate::context::LogicContext;
use crate::expr::{LogicalExpression, Variable};
use crate::LogicError;

const LAMBDA: &str = "lambda";

#[derive(Debug)]
enum Sexp {
    Atom(String),
    List(Vec<Sexp>),
}

fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '(' | ')' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(c.to_string());
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

pub(crate) struct Reader<'a> {
    ctx: &'a LogicContext,
    input: &'a str,
    check_types: bool,
    scopes: Vec<(String, Variable)>,
    free: HashMap<String, Variable>,
    skolems: HashMap<String, Variable>,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(ctx: &'a LogicContext, input: &'a str, check_types: bool) -> Self {
        Self {
            ctx,
            input,
            check_types,
            scopes: Vec::new(),
            free: HashMap::new(),
            skolems: HashMap::new(),
        }
    }

    fn syntax(&self, message: impl Into<String>) -> LogicError {
        LogicError::Syntax {
            input: self.input.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn read(mut self) -> Result<LogicalExpression, LogicError> {
        let tokens = tokenize(self.input);
        let mut pos = 0;
        let sexp = self.parse_sexp(&tokens, &mut pos)?;
        if pos != tokens.len() {
            return Err(self.syntax(format!("unexpected trailing token '{}'", tokens[pos])));
        }
        self.build(&sexp)
    }

    fn parse_sexp(&self, tokens: &[String], pos: &mut usize) -> Result<Sexp, LogicError> {
        let token = tokens
            .get(*pos)
            .ok_or_else(|| self.syntax("unexpected end of input"))?;
        *pos += 1;
        match token.as_str() {
            "(" => {
                let mut items = Vec::new();
                loop {
                    match tokens.get(*pos).map(String::as_str) {
                        Some(")") => {
                            *pos += 1;
                            return Ok(Sexp::List(items));
                        }
                        Some(_) => items.push(self.parse_sexp(tokens, pos)?),
                        None => return Err(self.syntax("missing ')'")),
                    }
                }
            }
            ")" => Err(self.syntax("unbalanced ')'")),
            atom => Ok(Sexp::Atom(atom.to_string())),
        }
    }

    fn build(&mut self, sexp: &Sexp) -> Result<LogicalExpression, LogicError> {
        match sexp {
            Sexp::Atom(atom) => self.atom(atom),
            Sexp::List(items) => match items.as_slice() {
                [Sexp::Atom(head), Sexp::Atom(def), body] if head == LAMBDA => {
                    let (name, variable) = self.variable_definition(def)?;
                    self.scopes.push((name, variable.clone()));
                    let body = self.build(body);
                    self.scopes.pop();
                    Ok(LogicalExpression::lambda(variable, body?))
                }
                [Sexp::Atom(head), ..] if head == LAMBDA => {
                    Err(self.syntax("lambda expects a variable definition and a body"))
                }
                [predicate, arguments @ ..] if !arguments.is_empty() => {
                    let predicate = self.build(predicate)?;
                    let arguments = arguments
                        .iter()
                        .map(|a| self.build(a))
                        .collect::<Result<Vec<_>, _>>()?;
                    if self.check_types {
                        LogicalExpression::literal(predicate, arguments)
                    } else {
                        Ok(LogicalExpression::literal_unchecked(predicate, arguments))
                    }
                }
                _ => Err(self.syntax("a literal needs a predicate and at least one argument")),
            },
        }
    }

    fn variable_definition(&self, atom: &str) -> Result<(String, Variable), LogicError> {
        let (name, ty) = atom
            .split_once(':')
            .filter(|(name, _)| name.starts_with('$'))
            .ok_or_else(|| self.syntax(format!("expected variable definition, got '{}'", atom)))?;
        let ty = self.ctx.types().resolve(ty)?;
        Ok((name.to_string(), Variable::new(ty)))
    }

    fn lookup(&self, name: &str) -> Option<&Variable> {
        self.scopes
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .or_else(|| self.free.get(name))
    }

    fn atom(&mut self, atom: &str) -> Result<LogicalExpression, LogicError> {
        if atom.starts_with('$') {
            if atom.contains(':') {
                let (name, variable) = self.variable_definition(atom)?;
                if self.lookup(&name).is_some() {
                    return Err(LogicError::RedefinedVariable { name });
                }
                self.free.insert(name, variable.clone());
                return Ok(variable.into());
            }
            return self
                .lookup(atom)
                .cloned()
                .map(LogicalExpression::from)
                .ok_or_else(|| LogicError::UndefinedVariable {
                    name: atom.to_string(),
                });
        }
        if atom.starts_with('!') {
            let id_type = self.ctx.types().id();
            let skolem = self
                .skolems
                .entry(atom.to_string())
                .or_insert_with(|| Variable::skolem(id_type))
                .clone();
            return Ok(skolem.into());
        }
        let (name, ty) = atom
            .split_once(':')
            .ok_or_else(|| self.syntax(format!("constant '{}' has no type", atom)))?;
        Ok(self.ctx.read_constant(name, ty)?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_collapses_whitespace() {
        let tokens = tokenize("(lambda  $0:e\n ( p:<e,t> $0 ))");
        assert_eq!(
            tokens,
            vec!["(", "lambda", "$0:e", "(", "p:<e,t>", "$0", ")", ")"]
        );
    }
}
