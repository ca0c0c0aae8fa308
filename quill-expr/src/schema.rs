use crate::expr::{Expr, Operator};
use quill_common::schema::StructField;
use quill_common::{DataType, Error, Result};

impl Expr {
    /// Derives this expression's output field against a concrete input
    /// schema, validating child types along the way (unknown attributes,
    /// ambiguous unqualified names, `LIKE`/`SUM` type mismatches, …).
    ///
    /// The returned field's `name` is the expression's "natural" name —
    /// empty for most computed expressions, the resolved column name for
    /// an `Attribute`. `quill_plan`'s `Project::schema` is what applies
    /// the dotted-name / fallback-to-print / de-duplication normalization
    /// described in the specification; this method only derives type and,
    /// where one clearly exists, name.
    pub fn schema(&self, input: &[StructField]) -> Result<StructField> {
        match self {
            Expr::Literal(v) => Ok(StructField::new("", v.data_type())),
            Expr::Attribute(attr) => resolve_attribute(attr, input),
            Expr::Star(_) => Err(Error::schema("'*' has no schema of its own")),
            Expr::Binary { op, left, right } => binary_schema(*op, left, right, input),
            Expr::Not(e) => {
                require_boolean(e, input, "NOT")?;
                Ok(StructField::new("", DataType::Boolean))
            }
            Expr::IsNull(e) => {
                e.schema(input)?;
                Ok(StructField::new("", DataType::Boolean))
            }
            Expr::In { value, list } => {
                value.schema(input)?;
                for item in list {
                    item.schema(input)?;
                }
                Ok(StructField::new("", DataType::Boolean))
            }
            Expr::Like { left, right } => {
                let l = left.schema(input)?;
                let r = right.schema(input)?;
                if l.data_type != DataType::String || r.data_type != DataType::String {
                    return Err(Error::schema("LIKE requires both sides to be string"));
                }
                Ok(StructField::new("", DataType::Boolean))
            }
            Expr::Cast { expr, data_type } => {
                expr.schema(input)?;
                Ok(StructField::new("", *data_type))
            }
            Expr::If {
                predicate,
                if_true,
                if_false,
            } => {
                require_boolean(predicate, input, "IF")?;
                let t = if_true.schema(input)?;
                if_false.schema(input)?;
                Ok(StructField::new("", t.data_type))
            }
            Expr::CaseWhen {
                branches,
                else_branch,
            } => {
                let mut result_type = None;
                for branch in branches {
                    require_boolean(&branch.when, input, "CASE WHEN")?;
                    let t = branch.then.schema(input)?;
                    result_type.get_or_insert(t.data_type);
                }
                if let Some(e) = else_branch {
                    let t = e.schema(input)?;
                    result_type.get_or_insert(t.data_type);
                }
                Ok(StructField::new("", result_type.unwrap_or(DataType::Boolean)))
            }
            Expr::Alias { expr, name } => {
                let inner = expr.schema(input)?;
                Ok(StructField::new(name.clone(), inner.data_type))
            }
            Expr::ScalarFunction { name, args, .. } => {
                crate::functions::scalar::schema(name, args, input)
            }
            Expr::AggregateFunction { name, args } => {
                crate::functions::aggregate::schema(name, args, input)
            }
            Expr::Proxy(proxy) => proxy_schema(proxy, input),
        }
    }
}

fn require_boolean(e: &Expr, input: &[StructField], context: &str) -> Result<()> {
    let field = e.schema(input)?;
    if field.data_type != DataType::Boolean {
        return Err(Error::schema(format!(
            "{context} requires a boolean expression, found {}",
            field.data_type
        )));
    }
    Ok(())
}

/// Exact name match first; otherwise a dotted-suffix fallback (`t.a`
/// matches a field literally named `t.a`, and a bare `a` matches any
/// field whose name's tail after the last `.` is `a`, as long as exactly
/// one field qualifies).
fn resolve_attribute(attr: &crate::expr::Attribute, input: &[StructField]) -> Result<StructField> {
    if let Some((idx, field)) = input.iter().enumerate().find(|(_, f)| f.name == attr.name) {
        attr.idx.set(Some(idx));
        return Ok(field.clone());
    }

    let matches: Vec<(usize, &StructField)> = input
        .iter()
        .enumerate()
        .filter(|(_, f)| f.name.rsplit('.').next() == Some(attr.name.as_str()))
        .collect();

    match matches.len() {
        0 => Err(Error::schema(format!("can't find '{}' in schema", attr.name))),
        1 => {
            let (idx, field) = matches[0];
            attr.idx.set(Some(idx));
            Ok(field.clone())
        }
        _ => Err(Error::schema(format!("'{}' is ambiguous", attr.name))),
    }
}

/// `Add`/`Subtract`/`Multiply`/`Modulo` infer `Int` unless either side is
/// non-`Int` (then `Float`). `Divide` is always `Float`. Comparisons and
/// `And`/`Or` are `Boolean`.
fn binary_schema(op: Operator, left: &Expr, right: &Expr, input: &[StructField]) -> Result<StructField> {
    let l = left.schema(input)?;
    let r = right.schema(input)?;

    if op == Operator::And || op == Operator::Or {
        if l.data_type != DataType::Boolean || r.data_type != DataType::Boolean {
            return Err(Error::schema(format!(
                "{} requires boolean operands",
                op.symbol()
            )));
        }
        return Ok(StructField::new("", DataType::Boolean));
    }

    if op.is_comparison() {
        return Ok(StructField::new("", DataType::Boolean));
    }

    debug_assert!(op.is_arithmetic());
    if op == Operator::Divide {
        return Ok(StructField::new("", DataType::Float));
    }
    let data_type = if l.data_type == DataType::Int && r.data_type == DataType::Int {
        DataType::Int
    } else {
        DataType::Float
    };
    Ok(StructField::new("", data_type))
}

fn proxy_schema(proxy: &crate::proxy::ExprProxy, input: &[StructField]) -> Result<StructField> {
    let printed = proxy.inner_ref().print();
    if let Some((idx, key_field)) = proxy
        .group_schema
        .iter()
        .enumerate()
        .find(|(_, f)| f.name == printed)
    {
        proxy.key_index.set(Some(idx));
        return Ok(key_field.clone());
    }
    proxy.inner_ref().schema(input)
}
