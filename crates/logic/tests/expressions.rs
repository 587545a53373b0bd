//! Reading, printing and comparing logical expressions.
//!
//! These tests exercise the public surface of the logic crate:
//! - text round trips through the reader and the printer
//! - alpha-equivalence, including order-insensitive arguments and skolem IDs
//! - error reporting for malformed or ill-typed input

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use semparse_logic::{LogicContext, LogicError};

fn ctx() -> LogicContext {
    LogicContext::builder().build().unwrap()
}

fn hash(expr: &semparse_logic::LogicalExpression) -> u64 {
    let mut hasher = DefaultHasher::new();
    expr.hash(&mut hasher);
    hasher.finish()
}

// ============================================================================
// Round Trips
// ============================================================================

#[test]
fn canonical_text_round_trips() {
    let ctx = ctx();
    let inputs = [
        "city:<e,t>",
        "(lambda $0:e (city:<e,t> $0))",
        "(lambda $0:<e,t> (lambda $1:e (and:<t*,t> (big:<e,t> $1) ($0 $1))))",
        "(lambda $0:e (near:<e,<e,t>> $0 $1:e))",
        "(a:<id,<<e,t>,e>> !1 (lambda $0:e (city:<e,t> $0)))",
        "(count:<e[],ind> list:e[])",
        "(inc:<ind,ind> (count:<e[],ind> list:e[]))",
    ];
    for input in inputs {
        let expr = ctx.read(input).unwrap();
        assert_eq!(expr.to_string(), input);
        assert_eq!(ctx.read(&expr.to_string()).unwrap(), expr);
    }
}

#[test]
fn whitespace_is_collapsed() {
    let ctx = ctx();
    let expr = ctx.read("  ( lambda   $0:e\n\t(city:<e,t>  $0 ) ) ").unwrap();
    assert_eq!(expr.to_string(), "(lambda $0:e (city:<e,t> $0))");
}

#[test]
fn variables_are_renumbered() {
    let ctx = ctx();
    let expr = ctx.read("(lambda $7:e (lambda $3:e (near:<e,<e,t>> $3 $7)))").unwrap();
    assert_eq!(
        expr.to_string(),
        "(lambda $0:e (lambda $1:e (near:<e,<e,t>> $1 $0)))"
    );
}

// ============================================================================
// Alpha-Equivalence
// ============================================================================

#[test]
fn renamed_binders_are_equal() {
    let ctx = ctx();
    let a = ctx.read("(lambda $0:e (lambda $1:e (near:<e,<e,t>> $0 $1)))").unwrap();
    let b = ctx.read("(lambda $5:e (lambda $2:e (near:<e,<e,t>> $5 $2)))").unwrap();
    let swapped = ctx.read("(lambda $0:e (lambda $1:e (near:<e,<e,t>> $1 $0)))").unwrap();
    assert_eq!(a, b);
    assert_eq!(hash(&a), hash(&b));
    assert_ne!(a, swapped);
}

#[test]
fn binder_types_matter() {
    let ctx = ctx();
    let a = ctx.read("(lambda $0:e (p:<e,t> $0))").unwrap();
    let b = ctx.read("(lambda $0:e (q:<e,t> $0))").unwrap();
    assert_ne!(a, b);
}

#[test]
fn order_insensitive_arguments() {
    let ctx = ctx();
    let a = ctx
        .read("(lambda $0:e (and:<t*,t> (big:<e,t> $0) (city:<e,t> $0)))")
        .unwrap();
    let b = ctx
        .read("(lambda $0:e (and:<t*,t> (city:<e,t> $0) (big:<e,t> $0)))")
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(hash(&a), hash(&b));

    // Order-sensitive recursive predicates do not commute.
    let c = ctx.read("(seq:<t+,t> p:t q:t)").unwrap();
    let d = ctx.read("(seq:<t+,t> q:t p:t)").unwrap();
    assert_ne!(c, d);
}

#[test]
fn unordered_match_needs_consistent_variables() {
    let ctx = ctx();
    let a = ctx
        .read("(lambda $0:e (lambda $1:e (and:<t*,t> (p:<e,t> $0) (p:<e,t> $1) (q:<e,<e,t>> $0 $1))))")
        .unwrap();
    let b = ctx
        .read("(lambda $0:e (lambda $1:e (and:<t*,t> (p:<e,t> $1) (q:<e,<e,t>> $0 $1) (p:<e,t> $0))))")
        .unwrap();
    let c = ctx
        .read("(lambda $0:e (lambda $1:e (and:<t*,t> (p:<e,t> $1) (q:<e,<e,t>> $1 $0) (p:<e,t> $0))))")
        .unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn skolem_ids_pair_consistently() {
    let ctx = ctx();
    let a = ctx.read("(near:<id,<id,t>> !1 !2)").unwrap();
    let b = ctx.read("(near:<id,<id,t>> !8 !3)").unwrap();
    let c = ctx.read("(near:<id,<id,t>> !1 !1)").unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn free_variables_compare_by_identity() {
    let ctx = ctx();
    let a = ctx.read("(p:<e,t> $0:e)").unwrap();
    let b = ctx.read("(p:<e,t> $0:e)").unwrap();
    assert_ne!(a, b);
    assert_eq!(a, a.clone());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn malformed_text_is_rejected() {
    let ctx = ctx();
    for input in ["(city:<e,t> paris:e", "city:<e,t>)", "(city:<e,t>)", "()", "city"] {
        assert!(
            matches!(ctx.read(input), Err(LogicError::Syntax { .. })),
            "expected syntax error for {input}"
        );
    }
}

#[test]
fn unknown_type_is_rejected() {
    let ctx = ctx();
    assert!(matches!(
        ctx.read("city:<loc,t>"),
        Err(LogicError::UnknownType { .. })
    ));
}

#[test]
fn undefined_variable_is_rejected() {
    let ctx = ctx();
    assert!(matches!(
        ctx.read("(lambda $0:e (near:<e,<e,t>> $0 $1))"),
        Err(LogicError::UndefinedVariable { .. })
    ));
}

#[test]
fn ill_typed_literal_is_rejected() {
    let ctx = ctx();
    assert!(matches!(
        ctx.read("(city:<e,t> p:t)"),
        Err(LogicError::IllTyped { .. })
    ));
    assert!(ctx.read_unchecked("(city:<e,t> p:t)").is_ok());
}
