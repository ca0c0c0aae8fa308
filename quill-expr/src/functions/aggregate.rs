use crate::eval::EvalContext;
use crate::expr::Expr;
use quill_common::row::Row;
use quill_common::schema::StructField;
use quill_common::{DataType, Error, Result, ScalarValue};

pub fn schema(name: &str, args: &[Expr], input: &[StructField]) -> Result<StructField> {
    let arg = args[0].schema(input)?;
    let data_type = match name {
        "count" => DataType::Int,
        "sum" => {
            if arg.data_type != DataType::Int && arg.data_type != DataType::Float {
                return Err(Error::schema(format!(
                    "sum() requires a numeric argument, found {}",
                    arg.data_type
                )));
            }
            arg.data_type
        }
        "min" | "max" => arg.data_type,
        _ => unreachable!("unregistered aggregate function reached schema derivation: {name}"),
    };
    Ok(StructField::new("", data_type))
}

pub fn eval(name: &str, args: &[Expr], group: &[Row]) -> Result<ScalarValue> {
    match name {
        "count" => eval_count(&args[0], group),
        "sum" => eval_sum(&args[0], group),
        "min" => eval_min_max(&args[0], group, true),
        "max" => eval_min_max(&args[0], group, false),
        _ => Err(Error::execution(format!("unregistered aggregate function {name}"))),
    }
}

/// `count(<literal>)` — including the `count(*)` desugaring to
/// `count(1)` — returns the group's row count, except a literal NULL
/// always counts to 0. `count(<expr>)` counts non-NULL evaluations.
fn eval_count(arg: &Expr, group: &[Row]) -> Result<ScalarValue> {
    if let Expr::Literal(v) = arg {
        return Ok(ScalarValue::Int(Some(if v.is_null() {
            0
        } else {
            group.len() as i64
        })));
    }
    let mut count = 0i64;
    for row in group {
        let v = arg.eval(&EvalContext::new(row))?;
        if !v.is_null() {
            count += 1;
        }
    }
    Ok(ScalarValue::Int(Some(count)))
}

fn eval_sum(arg: &Expr, group: &[Row]) -> Result<ScalarValue> {
    let mut int_sum: Option<i64> = None;
    let mut float_sum: Option<f64> = None;
    let mut saw_int = false;
    let mut saw_any = false;

    for row in group {
        let v = arg.eval(&EvalContext::new(row))?;
        match v {
            ScalarValue::Int(Some(i)) => {
                if !saw_any {
                    saw_int = true;
                }
                saw_any = true;
                int_sum = Some(int_sum.unwrap_or(0) + i);
                float_sum = Some(float_sum.unwrap_or(0.0) + i as f64);
            }
            ScalarValue::Float(Some(f)) => {
                saw_any = true;
                float_sum = Some(float_sum.unwrap_or(0.0) + f);
            }
            _ => continue,
        }
    }

    if !saw_any {
        return Ok(if saw_int {
            ScalarValue::Int(None)
        } else {
            ScalarValue::Float(None)
        });
    }
    if saw_int {
        Ok(ScalarValue::Int(Some(int_sum.unwrap_or(0))))
    } else {
        Ok(ScalarValue::Float(Some(float_sum.unwrap_or(0.0))))
    }
}

fn eval_min_max(arg: &Expr, group: &[Row], want_min: bool) -> Result<ScalarValue> {
    let mut best: Option<ScalarValue> = None;
    let mut data_type = DataType::Boolean;
    for row in group {
        let v = arg.eval(&EvalContext::new(row))?;
        data_type = v.data_type();
        if v.is_null() {
            continue;
        }
        best = Some(match best {
            None => v,
            Some(current) => {
                let better = match v.compare(&current) {
                    Some(ord) => {
                        if want_min {
                            ord.is_lt()
                        } else {
                            ord.is_gt()
                        }
                    }
                    None => false,
                };
                if better {
                    v
                } else {
                    current
                }
            }
        });
    }
    Ok(best.unwrap_or_else(|| ScalarValue::null_of(data_type)))
}
