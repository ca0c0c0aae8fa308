use crate::expr::{Expr, Operator};
use quill_common::row::Row;
use quill_common::{DataType, Error, Result, ScalarValue};

/// Everything an expression needs to evaluate itself.
///
/// `row` is the row being evaluated — for an `Aggregate` plan this is the
/// group's key row (or a fabricated empty row when there is none, see
/// `quill::group`). `row_group` is only `Some` while evaluating beneath an
/// `ExprProxy` that wraps an aggregate function, and carries every row
/// that belongs to the current group; plain aggregate functions read it
/// instead of `row`.
pub struct EvalContext<'a> {
    pub row: &'a Row,
    pub row_group: Option<&'a [Row]>,
}

impl<'a> EvalContext<'a> {
    pub fn new(row: &'a Row) -> Self {
        EvalContext {
            row,
            row_group: None,
        }
    }

    pub fn with_row_group(row: &'a Row, row_group: &'a [Row]) -> Self {
        EvalContext {
            row,
            row_group: Some(row_group),
        }
    }

    fn with_group(&self, row_group: &'a [Row]) -> Self {
        EvalContext {
            row: self.row,
            row_group: Some(row_group),
        }
    }
}

impl Expr {
    pub fn eval(&self, ctx: &EvalContext) -> Result<ScalarValue> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Attribute(attr) => {
                let idx = attr.idx.get().ok_or_else(|| {
                    Error::execution(format!("attribute '{}' was never resolved", attr.name))
                })?;
                Ok(ctx.row.get(idx).clone())
            }
            Expr::Star(_) => Err(Error::execution("'*' cannot be evaluated directly")),
            Expr::Binary { op, left, right } => eval_binary(*op, left, right, ctx),
            Expr::Not(e) => {
                let v = e.eval(ctx)?;
                Ok(match v.as_bool() {
                    Some(b) => ScalarValue::Boolean(Some(!b)),
                    None => ScalarValue::Boolean(None),
                })
            }
            Expr::IsNull(e) => {
                let v = e.eval(ctx)?;
                Ok(ScalarValue::Boolean(Some(v.is_null())))
            }
            Expr::In { value, list } => eval_in(value, list, ctx),
            Expr::Like { left, right } => eval_like(left, right, ctx),
            Expr::Cast { expr, data_type } => {
                let v = expr.eval(ctx)?;
                cast(&v, *data_type)
            }
            Expr::If {
                predicate,
                if_true,
                if_false,
            } => {
                let p = predicate.eval(ctx)?;
                if p.as_bool() == Some(true) {
                    if_true.eval(ctx)
                } else {
                    if_false.eval(ctx)
                }
            }
            Expr::CaseWhen {
                branches,
                else_branch,
            } => {
                for branch in branches {
                    let cond = branch.when.eval(ctx)?;
                    if cond.as_bool() == Some(true) {
                        return branch.then.eval(ctx);
                    }
                }
                match else_branch {
                    Some(e) => e.eval(ctx),
                    None => Ok(ScalarValue::Boolean(None)),
                }
            }
            Expr::Alias { expr, .. } => expr.eval(ctx),
            Expr::ScalarFunction {
                name,
                args,
                regex_cache,
            } => crate::functions::scalar::eval(name, args, regex_cache, ctx),
            Expr::AggregateFunction { name, args } => {
                let group = ctx.row_group.ok_or_else(|| {
                    Error::execution(format!(
                        "aggregate function '{name}' evaluated outside a group"
                    ))
                })?;
                crate::functions::aggregate::eval(name, args, group)
            }
            Expr::Proxy(proxy) => eval_proxy(proxy, ctx),
        }
    }
}

fn eval_proxy(proxy: &crate::proxy::ExprProxy, ctx: &EvalContext) -> Result<ScalarValue> {
    // `key_index` is an index into the group's *key row* schema. `ctx.row`
    // only ever holds that key row while evaluating directly against a
    // group (`ctx.row_group` is `Some`, set by `execute_aggregate`); once
    // evaluation has descended into an aggregate function's per-member-row
    // loop, `ctx.row` is a plain member row from the original input and
    // this index would point at the wrong column (or out of bounds). Only
    // short-circuit in the former case; otherwise fall through and let the
    // wrapped expression resolve itself against whatever row it's handed.
    if ctx.row_group.is_some() {
        if let Some(idx) = proxy.key_index.get() {
            return Ok(ctx.row.get(idx).clone());
        }
    }
    match proxy.inner_ref() {
        Expr::AggregateFunction { .. } => {
            let group = ctx.row_group.ok_or_else(|| {
                Error::execution("aggregate expression evaluated without a row group")
            })?;
            proxy.inner_ref().eval(&ctx.with_group(group))
        }
        Expr::Proxy(_) => proxy.inner_ref().eval(ctx),
        other => other.eval(ctx),
    }
}

fn to_bool3(v: &ScalarValue) -> Option<bool> {
    v.as_bool()
}

fn eval_binary(op: Operator, left: &Expr, right: &Expr, ctx: &EvalContext) -> Result<ScalarValue> {
    match op {
        Operator::And => {
            let l = left.eval(ctx)?;
            if to_bool3(&l) == Some(false) {
                return Ok(ScalarValue::Boolean(Some(false)));
            }
            let r = right.eval(ctx)?;
            if to_bool3(&r) == Some(false) {
                return Ok(ScalarValue::Boolean(Some(false)));
            }
            match (to_bool3(&l), to_bool3(&r)) {
                (Some(a), Some(b)) => Ok(ScalarValue::Boolean(Some(a && b))),
                _ => Ok(ScalarValue::Boolean(None)),
            }
        }
        Operator::Or => {
            let l = left.eval(ctx)?;
            if to_bool3(&l) == Some(true) {
                return Ok(ScalarValue::Boolean(Some(true)));
            }
            let r = right.eval(ctx)?;
            if to_bool3(&r) == Some(true) {
                return Ok(ScalarValue::Boolean(Some(true)));
            }
            match (to_bool3(&l), to_bool3(&r)) {
                (Some(a), Some(b)) => Ok(ScalarValue::Boolean(Some(a || b))),
                _ => Ok(ScalarValue::Boolean(None)),
            }
        }
        Operator::Eq | Operator::NotEq | Operator::Lt | Operator::LtEq | Operator::Gt | Operator::GtEq => {
            let l = left.eval(ctx)?;
            let r = right.eval(ctx)?;
            eval_comparison(op, &l, &r)
        }
        Operator::Plus
        | Operator::Minus
        | Operator::Multiply
        | Operator::Divide
        | Operator::Modulo => {
            let l = left.eval(ctx)?;
            let r = right.eval(ctx)?;
            eval_arithmetic(op, &l, &r)
        }
    }
}

/// Both int64 ⇒ compute in int64. Otherwise coerce both to float64.
/// `Divide` always coerces to float64. `Modulo` on floats truncates both
/// operands to int64, computes, and restores to float64. A non-coercible
/// operand yields NULL, not an error.
fn eval_arithmetic(op: Operator, l: &ScalarValue, r: &ScalarValue) -> Result<ScalarValue> {
    if op != Operator::Divide {
        if let (Some(a), Some(b)) = (l.as_i64(), r.as_i64()) {
            let result = match op {
                Operator::Plus => a.wrapping_add(b),
                Operator::Minus => a.wrapping_sub(b),
                Operator::Multiply => a.wrapping_mul(b),
                Operator::Modulo => {
                    if b == 0 {
                        return Ok(ScalarValue::Int(None));
                    }
                    a % b
                }
                _ => unreachable!(),
            };
            return Ok(ScalarValue::Int(Some(result)));
        }
    }

    let (Some(a), Some(b)) = (coerce_to_f64(l), coerce_to_f64(r)) else {
        return Ok(ScalarValue::Float(None));
    };
    let result = match op {
        Operator::Plus => a + b,
        Operator::Minus => a - b,
        Operator::Multiply => a * b,
        Operator::Divide => a / b,
        Operator::Modulo => ((a as i64) % (b as i64)) as f64,
        _ => unreachable!(),
    };
    Ok(ScalarValue::Float(Some(result)))
}

/// Both strings ⇒ lexicographic. Otherwise coerce both to float64.
/// Equality has an extra int64/int64 fast path.
fn eval_comparison(op: Operator, l: &ScalarValue, r: &ScalarValue) -> Result<ScalarValue> {
    if l.is_null() || r.is_null() {
        return Ok(ScalarValue::Boolean(None));
    }

    if (op == Operator::Eq || op == Operator::NotEq) && l.as_i64().is_some() && r.as_i64().is_some()
    {
        let eq = l.as_i64() == r.as_i64();
        return Ok(ScalarValue::Boolean(Some(if op == Operator::Eq {
            eq
        } else {
            !eq
        })));
    }

    let ordering = if let (Some(a), Some(b)) = (l.as_str(), r.as_str()) {
        a.cmp(b)
    } else {
        let (Some(a), Some(b)) = (coerce_to_f64(l), coerce_to_f64(r)) else {
            return Ok(ScalarValue::Boolean(None));
        };
        match a.partial_cmp(&b) {
            Some(o) => o,
            None => return Ok(ScalarValue::Boolean(None)),
        }
    };

    let result = match op {
        Operator::Eq => ordering.is_eq(),
        Operator::NotEq => !ordering.is_eq(),
        Operator::Lt => ordering.is_lt(),
        Operator::LtEq => ordering.is_le(),
        Operator::Gt => ordering.is_gt(),
        Operator::GtEq => ordering.is_ge(),
        _ => unreachable!(),
    };
    Ok(ScalarValue::Boolean(Some(result)))
}

fn coerce_to_f64(v: &ScalarValue) -> Option<f64> {
    match v {
        ScalarValue::Int(Some(i)) => Some(*i as f64),
        ScalarValue::Float(f) => *f,
        ScalarValue::Boolean(Some(b)) => Some(if *b { 1.0 } else { 0.0 }),
        ScalarValue::String(Some(s)) => s.parse::<f64>().ok(),
        _ => None,
    }
}

/// NULL elements of the list are skipped. A NULL probe value yields NULL.
fn eval_in(value: &Expr, list: &[Expr], ctx: &EvalContext) -> Result<ScalarValue> {
    let probe = value.eval(ctx)?;
    if probe.is_null() {
        return Ok(ScalarValue::Boolean(None));
    }
    for item in list {
        let candidate = item.eval(ctx)?;
        if candidate.is_null() {
            continue;
        }
        if let Ok(ScalarValue::Boolean(Some(true))) = eval_comparison(Operator::Eq, &probe, &candidate) {
            return Ok(ScalarValue::Boolean(Some(true)));
        }
    }
    Ok(ScalarValue::Boolean(Some(false)))
}

/// `%` only, with a single interior wildcard. NULL operands ⇒ NULL.
fn eval_like(left: &Expr, right: &Expr, ctx: &EvalContext) -> Result<ScalarValue> {
    let l = left.eval(ctx)?;
    let r = right.eval(ctx)?;
    if l.is_null() || r.is_null() {
        return Ok(ScalarValue::Boolean(None));
    }
    let (Some(subject), Some(pattern)) = (l.as_str(), r.as_str()) else {
        return Ok(ScalarValue::Boolean(None));
    };
    Ok(ScalarValue::Boolean(Some(like_match(subject, pattern))))
}

pub(crate) fn like_match(subject: &str, pattern: &str) -> bool {
    let starts = pattern.starts_with('%');
    let ends = pattern.ends_with('%');
    match (starts, ends) {
        (true, true) if pattern.len() >= 2 => subject.contains(&pattern[1..pattern.len() - 1]),
        (true, _) => subject.ends_with(&pattern[1..]),
        (_, true) => subject.starts_with(&pattern[..pattern.len() - 1]),
        (false, false) => {
            if let Some(mid) = pattern.find('%') {
                let (prefix, rest) = pattern.split_at(mid);
                let suffix = &rest[1..];
                subject.starts_with(prefix) && subject.ends_with(suffix)
            } else {
                subject == pattern
            }
        }
    }
}

/// NULL maps to typed NULL of the target type.
pub fn cast(v: &ScalarValue, target: DataType) -> Result<ScalarValue> {
    if v.is_null() {
        return Ok(ScalarValue::null_of(target));
    }
    Ok(match (v, target) {
        (ScalarValue::Int(Some(i)), DataType::Int) => ScalarValue::Int(Some(*i)),
        (ScalarValue::Int(Some(i)), DataType::Float) => ScalarValue::Float(Some(*i as f64)),
        (ScalarValue::Int(Some(i)), DataType::String) => ScalarValue::String(Some(i.to_string())),
        (ScalarValue::Int(Some(i)), DataType::Boolean) => ScalarValue::Boolean(Some(*i != 0)),

        (ScalarValue::Float(Some(f)), DataType::Int) => ScalarValue::Int(Some(*f as i64)),
        (ScalarValue::Float(Some(f)), DataType::Float) => ScalarValue::Float(Some(*f)),
        (ScalarValue::Float(Some(f)), DataType::String) => ScalarValue::String(Some(f.to_string())),
        (ScalarValue::Float(Some(f)), DataType::Boolean) => ScalarValue::Boolean(Some(*f != 0.0)),

        (ScalarValue::String(Some(s)), DataType::Int) => ScalarValue::Int(s.trim().parse().ok()),
        (ScalarValue::String(Some(s)), DataType::Float) => ScalarValue::Float(s.trim().parse().ok()),
        (ScalarValue::String(Some(s)), DataType::String) => ScalarValue::String(Some(s.clone())),
        (ScalarValue::String(Some(s)), DataType::Boolean) => ScalarValue::Boolean(match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }),

        (ScalarValue::Boolean(Some(b)), DataType::Int) => ScalarValue::Int(Some(if *b { 1 } else { 0 })),
        (ScalarValue::Boolean(Some(b)), DataType::Float) => {
            ScalarValue::Float(Some(if *b { 1.0 } else { 0.0 }))
        }
        (ScalarValue::Boolean(Some(b)), DataType::String) => {
            ScalarValue::String(Some(if *b { "true" } else { "false" }.to_string()))
        }
        (ScalarValue::Boolean(Some(b)), DataType::Boolean) => ScalarValue::Boolean(Some(*b)),

        _ => unreachable!("is_null() guard above handles every NULL variant"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ScalarValue::Int(Some(2)), ScalarValue::Int(Some(3)), ScalarValue::Int(Some(5)))]
    #[case(ScalarValue::Int(Some(2)), ScalarValue::Float(Some(3.5)), ScalarValue::Float(Some(5.5)))]
    #[case(ScalarValue::Float(Some(2.5)), ScalarValue::Int(Some(2)), ScalarValue::Float(Some(4.5)))]
    #[case(ScalarValue::Boolean(Some(true)), ScalarValue::Int(Some(1)), ScalarValue::Float(Some(2.0)))]
    #[case(ScalarValue::String(Some("nope".into())), ScalarValue::Int(Some(1)), ScalarValue::Float(None))]
    fn add_upcasts_to_the_widest_operand(
        #[case] left: ScalarValue,
        #[case] right: ScalarValue,
        #[case] expected: ScalarValue,
    ) {
        assert_eq!(eval_arithmetic(Operator::Plus, &left, &right).unwrap(), expected);
    }

    #[test]
    fn divide_always_yields_float_even_for_two_ints() {
        let result = eval_arithmetic(Operator::Divide, &ScalarValue::Int(Some(7)), &ScalarValue::Int(Some(2))).unwrap();
        assert_eq!(result, ScalarValue::Float(Some(3.5)));
    }

    #[test]
    fn modulo_on_floats_truncates_both_sides_to_int_first() {
        let result = eval_arithmetic(
            Operator::Modulo,
            &ScalarValue::Float(Some(7.9)),
            &ScalarValue::Float(Some(2.9)),
        )
        .unwrap();
        assert_eq!(result, ScalarValue::Float(Some(1.0)));
    }

    #[test]
    fn modulo_by_zero_yields_null_instead_of_panicking() {
        let result = eval_arithmetic(Operator::Modulo, &ScalarValue::Int(Some(5)), &ScalarValue::Int(Some(0))).unwrap();
        assert_eq!(result, ScalarValue::Int(None));
    }

    #[rstest]
    #[case("x", "%x%", true)]
    #[case("fox", "%ox", true)]
    #[case("fox", "fo%", true)]
    #[case("fox", "f%x", true)]
    #[case("fox", "fox", true)]
    #[case("fox", "f%y", false)]
    #[case("fox", "box", false)]
    fn like_match_handles_every_wildcard_position(#[case] subject: &str, #[case] pattern: &str, #[case] matches: bool) {
        assert_eq!(like_match(subject, pattern), matches);
    }

    #[rstest]
    #[case(ScalarValue::Int(Some(-7)), DataType::String, ScalarValue::String(Some("-7".into())))]
    #[case(ScalarValue::Float(Some(2.0)), DataType::Int, ScalarValue::Int(Some(2)))]
    #[case(ScalarValue::String(Some("42".into())), DataType::Int, ScalarValue::Int(Some(42)))]
    #[case(ScalarValue::String(Some("nope".into())), DataType::Int, ScalarValue::Int(None))]
    #[case(ScalarValue::Boolean(Some(true)), DataType::String, ScalarValue::String(Some("true".into())))]
    #[case(ScalarValue::Int(None), DataType::String, ScalarValue::String(None))]
    fn cast_follows_the_per_type_table(#[case] value: ScalarValue, #[case] target: DataType, #[case] expected: ScalarValue) {
        assert_eq!(cast(&value, target).unwrap(), expected);
    }

    #[test]
    fn int_round_trips_through_a_string_cast() {
        let original = ScalarValue::Int(Some(123));
        let as_string = cast(&original, DataType::String).unwrap();
        let back = cast(&as_string, DataType::Int).unwrap();
        assert_eq!(back, original);
    }

    #[rstest]
    #[case(ScalarValue::Int(Some(1)), ScalarValue::Int(None), ScalarValue::Boolean(None))]
    #[case(ScalarValue::String(Some("a".into())), ScalarValue::String(Some("b".into())), ScalarValue::Boolean(Some(true)))]
    #[case(ScalarValue::Int(Some(2)), ScalarValue::Float(Some(2.0)), ScalarValue::Boolean(Some(false)))]
    fn lt_upcasts_like_arithmetic_does(#[case] left: ScalarValue, #[case] right: ScalarValue, #[case] expected: ScalarValue) {
        assert_eq!(eval_comparison(Operator::Lt, &left, &right).unwrap(), expected);
    }
}
