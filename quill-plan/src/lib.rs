//! The logical plan algebra, schema derivation, and the fixed analyzer
//! and optimizer rule batches.
//!
//! Ported from the original engine's `plan` package
//! (`plan.go`, `schema.go`, `analyzer.go`, `optimizer.go`) plus `source`
//! (`source.go`, `filesystem.go`, `hdfs.go`) — the `Source` trait lives
//! here rather than in the top crate; see `source`'s module doc comment
//! for why.

pub mod analyzer;
pub mod optimizer;
pub mod plan;
pub mod schema;
pub mod source;

pub use analyzer::analyze;
pub use optimizer::optimize;
pub use plan::{Aggregate, Filter, Limit, LogicalPlan, Project, Relation, Sort, SortOrder, Subquery, Union};
pub use source::{Config, Source};
