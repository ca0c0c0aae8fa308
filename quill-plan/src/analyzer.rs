use crate::plan::{Aggregate, LogicalPlan, Project};
use quill_common::{Error, Result};
use quill_common::scalar::ScalarValue;
use quill_expr::proxy::ExprProxy;
use quill_expr::Expr;
use std::rc::Rc;

/// Runs the fixed batch of analyzer rules, once each, in order.
///
/// Ported from `original_source/parser/sql.go`'s `analysisBatches` /
/// `AnalysePlan`: every rule in this engine runs exactly once (the Go
/// source's `Strategy` field distinguishes a `Repeat` batch from `Once`,
/// but every registered rule here is `Once`, so that distinction carries
/// no weight and is not modeled).
pub fn analyze(plan: LogicalPlan) -> Result<LogicalPlan> {
    log::debug!("analyzer rule: PureAggregateReplace");
    let plan = pure_aggregate_replace(plan)?;
    log::debug!("analyzer rule: CheckAggregateUse");
    let plan = check_aggregate_use(plan)?;
    log::debug!("analyzer rule: ProxyExprInAggregate");
    let plan = proxy_expr_in_aggregate(plan)?;
    log::debug!("analyzer rule: CheckSchema");
    let plan = check_schema(plan)?;
    log::debug!("analyzer rule: CheckStarInAggregate");
    let plan = check_star_in_aggregate(plan)?;
    Ok(plan)
}

/// `select count(*), max(a) from t` has no `group by` clause at all; this
/// rule rewrites any `Project` whose select list contains an aggregate
/// function into an `Aggregate` grouped by the constant `1`, so every row
/// collapses into a single group. Ported from `PureAggregateReplace`.
fn pure_aggregate_replace(plan: LogicalPlan) -> Result<LogicalPlan> {
    plan.map_children(&mut |p| {
        if let LogicalPlan::Project(project) = p {
            if project_has_aggregate(&project) {
                return Ok(LogicalPlan::Aggregate(Aggregate::new(
                    *project.child,
                    vec![Expr::Literal(ScalarValue::Int(Some(1)))],
                    project.project_list,
                )));
            }
            return Ok(LogicalPlan::Project(project));
        }
        Ok(p)
    })
}

fn project_has_aggregate(project: &Project) -> bool {
    project
        .project_list
        .iter()
        .any(contains_aggregate)
}

fn contains_aggregate(expr: &Expr) -> bool {
    if matches!(expr, Expr::AggregateFunction { .. }) {
        return true;
    }
    expr.children().iter().any(|c| contains_aggregate(c))
}

/// Aggregate functions may only appear under an `Aggregate` node's select
/// list; a `Project`/`Filter`/`Sort` referencing one directly is an error.
/// Ported from `CheckAggregateUse`.
fn check_aggregate_use(plan: LogicalPlan) -> Result<LogicalPlan> {
    plan.map_children(&mut |p| {
        let exprs: Vec<&Expr> = match &p {
            LogicalPlan::Project(project) => project.project_list.iter().collect(),
            LogicalPlan::Filter(filter) => vec![&filter.condition],
            LogicalPlan::Sort(sort) => sort.order.iter().map(|o| &o.expr).collect(),
            _ => Vec::new(),
        };
        for expr in exprs {
            if contains_aggregate(expr) {
                return Err(Error::schema("just use in group by"));
            }
        }
        Ok(p)
    })
}

/// Wraps every node of an `Aggregate`'s select-list expressions with an
/// `ExprProxy` bound to that aggregate's group-by key schema. Ported from
/// `ProxyExprInAggregate`.
fn proxy_expr_in_aggregate(plan: LogicalPlan) -> Result<LogicalPlan> {
    plan.map_children(&mut |p| {
        let LogicalPlan::Aggregate(agg) = p else {
            return Ok(p);
        };
        let group_schema = Rc::new(agg.group_schema()?);
        let aggregate_exprs = agg
            .aggregate_exprs
            .into_iter()
            .map(|expr| wrap_in_proxy(expr, &group_schema))
            .collect::<Result<_>>()?;
        Ok(LogicalPlan::Aggregate(Aggregate::new(
            *agg.child,
            agg.group_exprs,
            aggregate_exprs,
        )))
    })
}

/// Wraps every node of `expr`, post-order, in an `ExprProxy` bound to
/// `group_schema`, matching the Go source's
/// `expression.Transform(aggExpr, func(expr) { return &ExprProxy{...} })`.
fn wrap_in_proxy(expr: Expr, group_schema: &Rc<Vec<quill_common::schema::StructField>>) -> Result<Expr> {
    expr.map_children(&mut |e| Ok(Expr::Proxy(ExprProxy::new(e, Rc::clone(group_schema)))))
}

/// Forces schema derivation over the whole tree, surfacing reference and
/// type errors eagerly rather than at execution time. Ported from
/// `CheckSchema`.
fn check_schema(plan: LogicalPlan) -> Result<LogicalPlan> {
    plan.map_children(&mut |p| {
        p.schema()?;
        match &p {
            LogicalPlan::Project(project) => {
                let input = project.child.schema()?;
                for expr in &project.project_list {
                    check_expr_schema(expr, &input)?;
                }
            }
            LogicalPlan::Filter(filter) => {
                let input = filter.child.schema()?;
                check_expr_schema(&filter.condition, &input)?;
            }
            LogicalPlan::Aggregate(agg) => {
                let input = agg.child.schema()?;
                for expr in agg.group_exprs.iter().chain(agg.aggregate_exprs.iter()) {
                    check_expr_schema(expr, &input)?;
                }
            }
            _ => {}
        }
        Ok(p)
    })
}

fn check_expr_schema(expr: &Expr, input: &[quill_common::schema::StructField]) -> Result<()> {
    if !matches!(expr, Expr::Star(_)) {
        expr.schema(input)?;
    }
    for child in expr.children() {
        check_expr_schema(child, input)?;
    }
    Ok(())
}

/// `select *` is meaningless once grouped (an aggregate collapses many
/// rows into one and a `Star` has no fixed arity); reject it. Ported from
/// `CheckStarInAggregate`.
fn check_star_in_aggregate(plan: LogicalPlan) -> Result<LogicalPlan> {
    plan.map_children(&mut |p| {
        if let LogicalPlan::Aggregate(agg) = &p {
            if agg.aggregate_exprs.iter().any(contains_star) {
                return Err(Error::schema("'*' can not in group by"));
            }
        }
        Ok(p)
    })
}

/// By the time this rule runs, `ProxyExprInAggregate` has already wrapped
/// every node of every `aggregate_exprs` tree (the `Star` included) in an
/// `Expr::Proxy`, so a top-level `matches!(e, Expr::Star(_))` would never
/// fire; recurse through children (which unwraps `Proxy::inner` the same
/// as every other single-child node) to find it underneath.
fn contains_star(expr: &Expr) -> bool {
    if matches!(expr, Expr::Star(_)) {
        return true;
    }
    expr.children().iter().any(|c| contains_star(c))
}
