use crate::plan::{Aggregate, LogicalPlan, Project, Subquery};
use quill_common::schema::StructField;
use quill_common::{DataType, Error, Result};
use quill_expr::Expr;
use std::collections::HashSet;

impl LogicalPlan {
    /// The output schema of this plan node, computed lazily and cached on
    /// `Project`/`Aggregate`/`Subquery` (the three variants the original
    /// source caches — `original_source/plan/schema.go`). Errors surface
    /// reference/type problems the way `quill_expr::Expr::schema` does.
    pub fn schema(&self) -> Result<Vec<StructField>> {
        match self {
            LogicalPlan::Project(p) => project_schema(p),
            LogicalPlan::Filter(f) => {
                let schema = f.child.schema()?;
                let condition = f.condition.schema(&schema)?;
                if condition.data_type != DataType::Boolean {
                    return Err(Error::schema("filter condition must be boolean"));
                }
                Ok(schema)
            }
            LogicalPlan::Relation(r) => Ok(r.source.schema()),
            LogicalPlan::Subquery(s) => subquery_schema(s),
            LogicalPlan::Union(u) => union_schema(u),
            LogicalPlan::Aggregate(a) => aggregate_schema(a),
            LogicalPlan::Sort(s) => s.child.schema(),
            LogicalPlan::Limit(l) => l.child.schema(),
        }
    }
}

impl Aggregate {
    /// The schema of the group-by key tuple, used both by
    /// `crate::analyzer::ProxyExprInAggregate` (to build each
    /// `ExprProxy`'s `group_schema`) and `quill`'s group-by executor.
    ///
    /// Each field's name is replaced by the expression's printed form
    /// rather than any name the expression schema would naturally carry,
    /// matching `GetGroupSchema`'s explicit `s.Name = expr.Print()`.
    pub fn group_schema(&self) -> Result<Vec<StructField>> {
        let input = self.child.schema()?;
        self.group_exprs
            .iter()
            .map(|expr| {
                let field = expr.schema(&input)?;
                Ok(StructField::new(expr.print(), field.data_type))
            })
            .collect()
    }
}

fn project_schema(p: &Project) -> Result<Vec<StructField>> {
    if let Some(cached) = p.schema_cache.borrow().as_ref() {
        return Ok(cached.clone());
    }
    let input = p.child.schema()?;
    let mut gen = FieldNamer::new();
    let mut result = Vec::new();
    for expr in &p.project_list {
        if let Expr::Star(table) = expr {
            for field in &input {
                let matches_table = match table {
                    None => true,
                    Some(t) => field.name.starts_with(&format!("{t}.")),
                };
                if matches_table {
                    result.push(gen.next(field.clone(), ""));
                }
            }
        } else {
            let field = expr.schema(&input)?;
            result.push(gen.next(field, &expr.print()));
        }
    }
    *p.schema_cache.borrow_mut() = Some(result.clone());
    Ok(result)
}

fn union_schema(u: &crate::plan::Union) -> Result<Vec<StructField>> {
    let mut children = u.children.iter();
    let first = children
        .next()
        .ok_or_else(|| Error::schema("union has no children"))?
        .schema()?;
    for child in children {
        let other = child.schema()?;
        if other.len() != first.len() {
            return Err(Error::schema("union all length is not match"));
        }
        for (a, b) in first.iter().zip(other.iter()) {
            if a.data_type != b.data_type {
                return Err(Error::schema(format!(
                    "union all field data type is not match, {} and {}",
                    a.data_type, b.data_type
                )));
            }
        }
    }
    Ok(first)
}

fn aggregate_schema(a: &Aggregate) -> Result<Vec<StructField>> {
    if let Some(cached) = a.schema_cache.borrow().as_ref() {
        return Ok(cached.clone());
    }
    let input = a.child.schema()?;
    let mut gen = FieldNamer::new();
    let mut result = Vec::new();
    for expr in &a.aggregate_exprs {
        let field = expr.schema(&input)?;
        result.push(gen.next(field, &expr.print()));
    }

    let group_names: HashSet<String> = a
        .group_schema()?
        .into_iter()
        .map(|field| field.name)
        .collect();
    for expr in &a.aggregate_exprs {
        check_aggregate_field(expr, &group_names)?;
    }

    *a.schema_cache.borrow_mut() = Some(result.clone());
    Ok(result)
}

/// Every attribute reachable under an aggregate's select-list expression
/// must either land inside an aggregate function (not checked further) or
/// exactly match one of the group-by keys' printed forms.
fn check_aggregate_field(expr: &Expr, group_names: &HashSet<String>) -> Result<()> {
    if group_names.contains(&expr.print()) {
        return Ok(());
    }
    if let Expr::AggregateFunction { .. } = expr {
        return Ok(());
    }
    if let Expr::Attribute(attr) = expr {
        return Err(Error::schema(format!("can't find '{}' in group by", attr.name)));
    }
    for child in expr.children() {
        check_aggregate_field(child, group_names)?;
    }
    Ok(())
}

fn subquery_schema(s: &Subquery) -> Result<Vec<StructField>> {
    if let Some(cached) = s.schema_cache.borrow().as_ref() {
        return Ok(cached.clone());
    }
    let mut gen = FieldNamer::new();
    let mut result = Vec::new();
    for field in s.child.schema()? {
        let mut renamed = gen.next(field, "");
        renamed.name = format!("{}.{}", s.alias, renamed.name);
        result.push(renamed);
    }
    *s.schema_cache.borrow_mut() = Some(result.clone());
    Ok(result)
}

/// Normalizes and de-duplicates generated field names, matching
/// `original_source/plan/schema.go::genFields`: a dotted `table.column`
/// name is trimmed to `column`; an empty name falls back to the
/// expression's printed form; a name already seen gets a `_$n` suffix.
struct FieldNamer {
    seen: HashSet<String>,
    counter: usize,
}

impl FieldNamer {
    fn new() -> Self {
        FieldNamer {
            seen: HashSet::new(),
            counter: 1,
        }
    }

    fn next(&mut self, field: StructField, fallback: &str) -> StructField {
        let mut name = if field.name.contains('.') {
            field.name.split('.').nth(1).unwrap_or("").to_string()
        } else {
            field.name.clone()
        };
        if name.is_empty() {
            name = fallback.to_string();
        }
        if self.seen.contains(&name) {
            name = format!("{name}_${}", self.counter);
            self.counter += 1;
        }
        self.seen.insert(name.clone());
        StructField::new(name, field.data_type)
    }
}
