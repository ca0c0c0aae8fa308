//! The expression algebra: the `Expr` tree, its three-valued evaluator,
//! schema inference, printing, and the scalar/aggregate function registry.
//!
//! Ported from the original engine's `expression` package
//! (`expression.go`, `execution.go`, `schema.go`, `printer.go`,
//! `function.go`), restructured as a single `Expr` enum with methods
//! instead of an interface plus a free-standing `Transform` visitor —
//! see `Expr::children`/`Expr::map_children`, which play the role of
//! `GetChildren`/`Transform` from the original source.

pub mod eval;
pub mod expr;
pub mod functions;
pub mod print;
pub mod proxy;
pub mod schema;

pub use eval::EvalContext;
pub use expr::{Expr, Operator};
