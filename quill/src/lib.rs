//! `quill`: an embeddable, pedagogical single-node SQL query engine.
//!
//! This crate owns the last two pipeline stages (§2) plus the one
//! public entry point: the tree-walking executor (`executor`, ported
//! from `original_source/plan/execution.go`), the sort-based group-by
//! it delegates to (`group`), and the `Source` trait together with its
//! two built-in implementations, re-exported here from `quill_plan` as
//! `sources` (see `quill_plan::source`'s module doc comment for why the
//! trait itself lives in that crate rather than this one).
//!
//! The four earlier stages — lexer, parser, analyzer, optimizer — live
//! in `quill-sql` and `quill-plan`; `execute` below is the one call
//! that threads a SQL string through all five.

pub mod executor;
pub mod group;

pub use quill_common::{DataType, Dataset, Error, Position, Result, Row, ScalarValue, StructField};
pub use quill_plan::source::Config;
pub use quill_plan::LogicalPlan;

/// The `Source` trait and its built-in implementations (`fs`, `hdfs`),
/// re-exported from `quill_plan` under the name the specification (§4.8)
/// uses for this boundary.
pub mod sources {
    pub use quill_plan::source::{build, fs, hdfs, Source};
}

/// Parses `sql` into an unanalyzed logical plan, binding each `from`
/// clause's relation to a concrete `Source` via `config` along the way.
pub fn plan(sql: &str, config: &Config) -> Result<LogicalPlan> {
    quill_sql::parse(sql, config)
}

/// Runs the fixed analyzer rule batch (§4.4) over a parsed plan.
pub fn analyze(plan: LogicalPlan) -> Result<LogicalPlan> {
    quill_plan::analyze(plan)
}

/// Runs the fixed optimizer rule batch (§4.5) over an analyzed plan.
pub fn optimize(plan: LogicalPlan) -> Result<LogicalPlan> {
    quill_plan::optimize(plan)
}

/// The engine's one public library call (§6): parse, analyze, optimize,
/// then execute, returning the result set.
pub fn execute(sql: &str, config: &Config) -> Result<Dataset> {
    let parsed = plan(sql, config)?;
    let analyzed = analyze(parsed)?;
    let optimized = optimize(analyzed)?;
    executor::execute_plan(&optimized)
}
