//! The tree-walking executor: every `LogicalPlan` variant produces a
//! `Dataset` by recursively executing its children first.
//!
//! Ported from `original_source/plan/execution.go`. `Union` is the one
//! node that fans out (§5); every other variant is a plain recursive,
//! synchronous pull. Because recursion through `async fn` needs a boxed
//! future at each level, `execute_node` follows the usual
//! boxed-future-per-call pattern instead of being declared `async fn`
//! directly.

use crate::group::{build_groups, Group};
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use quill_common::row::Row;
use quill_common::schema::StructField;
use quill_common::{Dataset, Error, Result, ScalarValue};
use quill_expr::{Expr, EvalContext};
use quill_plan::plan::{Aggregate, Filter, Limit, LogicalPlan, Project, Relation, Sort, SortOrder, Subquery, Union};
use std::cmp::Ordering;

/// The maximum number of `Union` branches evaluated concurrently, per §5.
const UNION_PARALLELISM: usize = 5;

/// Runs the whole plan to completion on a dedicated single-threaded
/// `tokio` runtime, started and torn down for the duration of this one
/// call. `Union` is the only node that needs a runtime at all; every
/// other plan shape runs to completion on the first poll.
pub fn execute_plan(plan: &LogicalPlan) -> Result<Dataset> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::execution(format!("failed to start executor runtime: {e}")))?;
    // `spawn_local` is never used here: plan nodes cache state in
    // `RefCell`s (schema caches, `Attribute::idx`, the regex cache),
    // which makes `&LogicalPlan` `!Sync` and therefore unfit to share
    // across OS threads. `Union`'s fan-out below is modeled as bounded
    // *cooperative* concurrency on this single thread instead — see
    // `execute_union`.
    runtime.block_on(execute_node(plan))
}

fn execute_node(plan: &LogicalPlan) -> BoxFuture<'_, Result<Dataset>> {
    async move {
        let schema = plan.schema()?;
        match plan {
            LogicalPlan::Project(p) => execute_project(p, schema).await,
            LogicalPlan::Filter(f) => execute_filter(f, schema).await,
            LogicalPlan::Relation(r) => execute_relation(r, schema),
            LogicalPlan::Subquery(s) => execute_subquery(s, schema).await,
            LogicalPlan::Union(u) => execute_union(u, schema).await,
            LogicalPlan::Aggregate(a) => execute_aggregate(a, schema).await,
            LogicalPlan::Sort(s) => execute_sort(s, schema).await,
            LogicalPlan::Limit(l) => execute_limit(l, schema).await,
        }
    }
    .boxed()
}

/// Evaluates each projection expression per input row; `Star`/`table.*`
/// expand in place against the child schema, filtering by table prefix
/// when qualified. Field naming/de-duplication already happened in
/// `LogicalPlan::schema` — this only has to produce values in the same
/// order.
async fn execute_project(p: &Project, schema: Vec<StructField>) -> Result<Dataset> {
    let input = execute_node(&p.child).await?;
    let mut rows = Vec::with_capacity(input.rows.len());
    for row in &input.rows {
        let ctx = EvalContext::new(row);
        let mut values = Vec::with_capacity(schema.len());
        for expr in &p.project_list {
            match expr {
                Expr::Star(table) => {
                    for (i, field) in input.schema.iter().enumerate() {
                        let matches = match table {
                            None => true,
                            Some(t) => field.name.starts_with(&format!("{t}.")),
                        };
                        if matches {
                            values.push(row.get(i).clone());
                        }
                    }
                }
                other => values.push(other.eval(&ctx)?),
            }
        }
        rows.push(Row::new(values));
    }
    Ok(Dataset::new(schema, rows))
}

/// Keeps a row iff its condition evaluates to non-NULL `true`.
async fn execute_filter(f: &Filter, schema: Vec<StructField>) -> Result<Dataset> {
    let input = execute_node(&f.child).await?;
    let mut rows = Vec::with_capacity(input.rows.len());
    for row in input.rows {
        let value = f.condition.eval(&EvalContext::new(&row))?;
        let keep = match value {
            ScalarValue::Boolean(b) => b,
            other => {
                return Err(Error::execution(format!(
                    "filter condition produced non-boolean value {other:?}"
                )))
            }
        };
        if keep == Some(true) {
            rows.push(row);
        }
    }
    Ok(Dataset::new(schema, rows))
}

fn execute_relation(r: &Relation, schema: Vec<StructField>) -> Result<Dataset> {
    let hints = r.push_down_predicate.borrow();
    let rows = r.source.execute(&hints)?;
    Ok(Dataset::new(schema, rows))
}

/// Passes the child's data through unchanged; only the schema (names
/// rewritten to `alias.col` by `LogicalPlan::schema`) differs.
async fn execute_subquery(s: &Subquery, schema: Vec<StructField>) -> Result<Dataset> {
    let input = execute_node(&s.child).await?;
    Ok(Dataset::new(schema, input.rows))
}

/// Fans each branch out as a concurrently-polled future, gated to
/// `UNION_PARALLELISM` in-flight at a time, and concatenates results in
/// completion order (§5; ordering across branches is explicitly
/// permitted to be nondeterministic). A branch that panics aborts the
/// whole union with an `Error::Execution` wrapping the panic payload,
/// mirroring the original source's `recover()` inside each goroutine.
async fn execute_union(u: &Union, schema: Vec<StructField>) -> Result<Dataset> {
    let semaphore = tokio::sync::Semaphore::new(UNION_PARALLELISM);
    let mut branches = FuturesUnordered::new();
    for (i, child) in u.children.iter().enumerate() {
        let semaphore = &semaphore;
        branches.push(async move {
            let _permit = semaphore
                .acquire()
                .await
                .map_err(|e| Error::execution(e.to_string()))?;
            log::trace!("union branch {i} dispatched");
            run_union_branch(child).await
        });
    }

    let mut rows = Vec::new();
    while let Some(result) = branches.next().await {
        rows.extend(result?.rows);
    }
    Ok(Dataset::new(schema, rows))
}

async fn run_union_branch(plan: &LogicalPlan) -> Result<Dataset> {
    match std::panic::AssertUnwindSafe(execute_node(plan))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(panic) => Err(Error::execution(format!(
            "union branch panicked: {}",
            panic_message(&panic)
        ))),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Sort-then-scan group-by (§4.7): `crate::group::build_groups` does the
/// sorting and boundary-splitting; this evaluates each
/// (already-`ExprProxy`-wrapped, by the analyzer) aggregate expression
/// once per discovered group, against an `EvalContext` whose `row` is
/// the group's key row (or a fabricated NULL row) and whose
/// `row_group` is every member row.
async fn execute_aggregate(a: &Aggregate, schema: Vec<StructField>) -> Result<Dataset> {
    let input = execute_node(&a.child).await?;
    let group_schema = a.group_schema()?;
    let groups: Vec<Group> = build_groups(&a.group_exprs, &input.rows)?;

    let mut rows = Vec::with_capacity(groups.len());
    for group in &groups {
        let key_row = group.key_row_or_null(&group_schema);
        let ctx = EvalContext::with_row_group(&key_row, &group.rows);
        let values = a
            .aggregate_exprs
            .iter()
            .map(|expr| expr.eval(&ctx))
            .collect::<Result<Vec<_>>>()?;
        rows.push(Row::new(coerce_null_types(values, &schema)));
    }
    Ok(Dataset::new(schema, rows))
}

/// `sum`/`min`/`max` over a group with no rows to read a runtime type from
/// (an empty group, or every member NULL) fall back to a NULL of whatever
/// type happens to fall out of their own bookkeeping — not necessarily the
/// type `LogicalPlan::schema` already settled on for that column. Restores
/// the dataset invariant (§3: "cell i's dynamic type is either NULL or
/// matches schema[i].type") by re-typing a mistyped NULL; a non-NULL value
/// is never touched.
fn coerce_null_types(values: Vec<ScalarValue>, schema: &[StructField]) -> Vec<ScalarValue> {
    values
        .into_iter()
        .zip(schema)
        .map(|(value, field)| {
            if value.is_null() && value.data_type() != field.data_type {
                ScalarValue::null_of(field.data_type)
            } else {
                value
            }
        })
        .collect()
}

/// Stable multi-key sort; NULL sorts as the minimum of its column,
/// ties fall through to the next key, per-column reversal handles
/// `desc`.
async fn execute_sort(s: &Sort, schema: Vec<StructField>) -> Result<Dataset> {
    let input = execute_node(&s.child).await?;
    let mut keyed: Vec<(Vec<ScalarValue>, Row)> = Vec::with_capacity(input.rows.len());
    for row in input.rows {
        let ctx = EvalContext::new(&row);
        let keys = s
            .order
            .iter()
            .map(|o| o.expr.eval(&ctx))
            .collect::<Result<Vec<_>>>()?;
        keyed.push((keys, row));
    }
    keyed.sort_by(|(ka, _), (kb, _)| compare_sort_keys(ka, kb, &s.order));
    let rows = keyed.into_iter().map(|(_, row)| row).collect();
    Ok(Dataset::new(schema, rows))
}

fn compare_sort_keys(a: &[ScalarValue], b: &[ScalarValue], order: &[SortOrder]) -> Ordering {
    for (i, key_order) in order.iter().enumerate() {
        let cmp = a[i].compare(&b[i]).unwrap_or(Ordering::Equal);
        let cmp = if key_order.reverse { cmp.reverse() } else { cmp };
        if cmp != Ordering::Equal {
            return cmp;
        }
    }
    Ordering::Equal
}

/// Keeps the first `count` rows; a `count` at or beyond the dataset's
/// length passes the data through unchanged rather than truncating.
async fn execute_limit(l: &Limit, schema: Vec<StructField>) -> Result<Dataset> {
    let input = execute_node(&l.child).await?;
    let rows = if l.count >= input.rows.len() {
        input.rows
    } else {
        input.rows.into_iter().take(l.count).collect()
    };
    Ok(Dataset::new(schema, rows))
}
