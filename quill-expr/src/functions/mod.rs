//! The function registry.
//!
//! Ported from the original source's `FuncMap` (`expression/function.go`),
//! which builds function nodes by reflectively zeroing a prototype struct
//! and assigning its `Args` field. Per the specification's design note,
//! this is replaced with ordinary constructors keyed by lowercase name: no
//! reflection, no prototype structs, just arity-checked builders that
//! return the right `Expr` variant.

pub mod aggregate;
pub mod scalar;

use crate::expr::Expr;
use quill_common::{Error, Result};

/// Whether a registered name builds a scalar or an aggregate expression.
/// The lexer and parser both need this to tell `count(x)` (legal only
/// beneath an `Aggregate`) from `substr(x, 1)` (legal anywhere).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Scalar,
    Aggregate,
}

/// Returns the kind of a registered function name, or `None` if `name`
/// (already lowercased) is not a function at all — in which case the
/// lexer should emit a `Name` token rather than a `Function` token.
pub fn kind(name: &str) -> Option<FunctionKind> {
    match name {
        "concat" | "length" | "substr" | "regexp_extract" => Some(FunctionKind::Scalar),
        "count" | "sum" | "min" | "max" => Some(FunctionKind::Aggregate),
        _ => None,
    }
}

/// Builds a function expression, validating arity against the registered
/// name. `name` must already be lowercased (the lexer/parser does this
/// once, at tokenization time).
pub fn build(name: &str, args: Vec<Expr>) -> Result<Expr> {
    match kind(name) {
        Some(FunctionKind::Scalar) => {
            check_arity(name, &args)?;
            Ok(Expr::ScalarFunction {
                name: name.to_string(),
                args,
                regex_cache: Default::default(),
            })
        }
        Some(FunctionKind::Aggregate) => {
            if args.len() != 1 {
                return Err(Error::parse_unpositioned(format!(
                    "{name} takes exactly one argument, found {}",
                    args.len()
                )));
            }
            Ok(Expr::AggregateFunction {
                name: name.to_string(),
                args,
            })
        }
        None => Err(Error::parse_unpositioned(format!(
            "'{name}' is not a registered function"
        ))),
    }
}

fn check_arity(name: &str, args: &[Expr]) -> Result<()> {
    let ok = match name {
        "concat" => !args.is_empty(),
        "length" => args.len() == 1,
        "substr" => args.len() == 2 || args.len() == 3,
        "regexp_extract" => args.len() == 3,
        _ => unreachable!("check_arity only called for registered scalar functions"),
    };
    if ok {
        Ok(())
    } else {
        Err(Error::parse_unpositioned(format!(
            "wrong number of arguments to {name}(): got {}",
            args.len()
        )))
    }
}
