use crate::source::Source;
use quill_common::schema::StructField;
use quill_expr::Expr;
use std::cell::RefCell;
use std::sync::Arc;

/// An `order by` key: the expression to sort by and whether to reverse it.
#[derive(Debug)]
pub struct SortOrder {
    pub expr: Expr,
    pub reverse: bool,
}

/// The logical plan algebra.
///
/// One struct per variant, following the shape of `datafusion_expr::LogicalPlan`
/// and `examples/other_examples/.../rustmemodb/planner/logical_plan.rs`'s
/// `LogicalPlan` enum, ported from `original_source/plan/plan.go`'s
/// interface-per-struct shape. Every variant owns a `schema_cache`, matching
/// the Go source's `schemaCache` fields — filled in lazily and idempotently
/// the first time `LogicalPlan::schema` is called on that node (§3).
#[derive(Debug)]
pub enum LogicalPlan {
    Project(Project),
    Filter(Filter),
    Relation(Relation),
    Subquery(Subquery),
    Union(Union),
    Aggregate(Aggregate),
    Sort(Sort),
    Limit(Limit),
}

#[derive(Debug)]
pub struct Project {
    pub project_list: Vec<Expr>,
    pub child: Box<LogicalPlan>,
    pub schema_cache: RefCell<Option<Vec<StructField>>>,
}

#[derive(Debug)]
pub struct Filter {
    pub condition: Expr,
    pub child: Box<LogicalPlan>,
}

#[derive(Debug)]
pub struct Relation {
    pub input: String,
    pub alias: Option<String>,
    pub source: Arc<dyn Source>,
    pub push_down_predicate: RefCell<Vec<Expr>>,
}

#[derive(Debug)]
pub struct Union {
    pub children: Vec<LogicalPlan>,
}

#[derive(Debug)]
pub struct Aggregate {
    pub child: Box<LogicalPlan>,
    pub group_exprs: Vec<Expr>,
    pub aggregate_exprs: Vec<Expr>,
    pub schema_cache: RefCell<Option<Vec<StructField>>>,
}

#[derive(Debug)]
pub struct Subquery {
    pub child: Box<LogicalPlan>,
    pub alias: String,
    pub schema_cache: RefCell<Option<Vec<StructField>>>,
}

#[derive(Debug)]
pub struct Sort {
    pub child: Box<LogicalPlan>,
    pub order: Vec<SortOrder>,
}

#[derive(Debug)]
pub struct Limit {
    pub child: Box<LogicalPlan>,
    pub count: usize,
}

impl LogicalPlan {
    /// Borrowed child plan slots, in evaluation order. `Relation` is the
    /// only leaf.
    pub fn children(&self) -> Vec<&LogicalPlan> {
        match self {
            LogicalPlan::Project(p) => vec![&p.child],
            LogicalPlan::Filter(f) => vec![&f.child],
            LogicalPlan::Relation(_) => vec![],
            LogicalPlan::Subquery(s) => vec![&s.child],
            LogicalPlan::Union(u) => u.children.iter().collect(),
            LogicalPlan::Aggregate(a) => vec![&a.child],
            LogicalPlan::Sort(s) => vec![&s.child],
            LogicalPlan::Limit(l) => vec![&l.child],
        }
    }

    /// Rebuilds this node, post-order: every child is transformed by `f`
    /// first, then the rebuilt node itself is passed to `f`. The idiomatic
    /// stand-in for `original_source/plan/plan.go::Transform`, which
    /// mutates `*Plan` slots in place.
    pub fn map_children(
        self,
        f: &mut impl FnMut(LogicalPlan) -> quill_common::Result<LogicalPlan>,
    ) -> quill_common::Result<LogicalPlan> {
        let rebuilt = match self {
            LogicalPlan::Project(p) => LogicalPlan::Project(Project {
                project_list: p.project_list,
                child: Box::new(p.child.map_children(f)?),
                schema_cache: p.schema_cache,
            }),
            LogicalPlan::Filter(filt) => LogicalPlan::Filter(Filter {
                condition: filt.condition,
                child: Box::new(filt.child.map_children(f)?),
            }),
            LogicalPlan::Relation(r) => LogicalPlan::Relation(r),
            LogicalPlan::Subquery(s) => LogicalPlan::Subquery(Subquery {
                child: Box::new(s.child.map_children(f)?),
                alias: s.alias,
                schema_cache: s.schema_cache,
            }),
            LogicalPlan::Union(u) => LogicalPlan::Union(Union {
                children: u
                    .children
                    .into_iter()
                    .map(|c| c.map_children(f))
                    .collect::<quill_common::Result<_>>()?,
            }),
            LogicalPlan::Aggregate(a) => LogicalPlan::Aggregate(Aggregate {
                child: Box::new(a.child.map_children(f)?),
                group_exprs: a.group_exprs,
                aggregate_exprs: a.aggregate_exprs,
                schema_cache: a.schema_cache,
            }),
            LogicalPlan::Sort(s) => LogicalPlan::Sort(Sort {
                child: Box::new(s.child.map_children(f)?),
                order: s.order,
            }),
            LogicalPlan::Limit(l) => LogicalPlan::Limit(Limit {
                child: Box::new(l.child.map_children(f)?),
                count: l.count,
            }),
        };
        f(rebuilt)
    }
}

impl Project {
    pub fn new(project_list: Vec<Expr>, child: LogicalPlan) -> Self {
        Project {
            project_list,
            child: Box::new(child),
            schema_cache: RefCell::new(None),
        }
    }
}

impl Aggregate {
    pub fn new(child: LogicalPlan, group_exprs: Vec<Expr>, aggregate_exprs: Vec<Expr>) -> Self {
        Aggregate {
            child: Box::new(child),
            group_exprs,
            aggregate_exprs,
            schema_cache: RefCell::new(None),
        }
    }
}

impl Subquery {
    pub fn new(child: LogicalPlan, alias: impl Into<String>) -> Self {
        Subquery {
            child: Box::new(child),
            alias: alias.into(),
            schema_cache: RefCell::new(None),
        }
    }
}
