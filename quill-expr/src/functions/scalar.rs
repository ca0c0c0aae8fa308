use crate::eval::{cast, EvalContext};
use crate::expr::Expr;
use quill_common::schema::StructField;
use quill_common::{DataType, Error, Result, ScalarValue};
use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;

pub fn schema(name: &str, args: &[Expr], input: &[StructField]) -> Result<StructField> {
    for arg in args {
        arg.schema(input)?;
    }
    let data_type = match name {
        "concat" | "substr" | "regexp_extract" => DataType::String,
        "length" => DataType::Int,
        _ => unreachable!("unregistered scalar function reached schema derivation: {name}"),
    };
    Ok(StructField::new("", data_type))
}

pub fn eval(
    name: &str,
    args: &[Expr],
    regex_cache: &RefCell<HashMap<String, Regex>>,
    ctx: &EvalContext,
) -> Result<ScalarValue> {
    match name {
        "concat" => eval_concat(args, ctx),
        "length" => eval_length(args, ctx),
        "substr" => eval_substr(args, ctx),
        "regexp_extract" => eval_regexp_extract(args, regex_cache, ctx),
        _ => Err(Error::execution(format!("unregistered scalar function {name}"))),
    }
}

fn plain_string(v: &ScalarValue) -> Result<Option<String>> {
    if v.is_null() {
        return Ok(None);
    }
    match cast(v, DataType::String)? {
        ScalarValue::String(s) => Ok(s),
        _ => unreachable!("cast to DataType::String always yields ScalarValue::String"),
    }
}

fn eval_concat(args: &[Expr], ctx: &EvalContext) -> Result<ScalarValue> {
    let mut out = String::new();
    for arg in args {
        let v = arg.eval(ctx)?;
        match plain_string(&v)? {
            Some(s) => out.push_str(&s),
            None => return Ok(ScalarValue::String(None)),
        }
    }
    Ok(ScalarValue::String(Some(out)))
}

fn eval_length(args: &[Expr], ctx: &EvalContext) -> Result<ScalarValue> {
    let v = args[0].eval(ctx)?;
    match plain_string(&v)? {
        Some(s) => Ok(ScalarValue::Int(Some(s.len() as i64))),
        None => Ok(ScalarValue::Int(None)),
    }
}

fn eval_substr(args: &[Expr], ctx: &EvalContext) -> Result<ScalarValue> {
    let subject = args[0].eval(ctx)?;
    let Some(s) = plain_string(&subject)? else {
        return Ok(ScalarValue::String(None));
    };
    let start = args[1].eval(ctx)?;
    let Some(start) = start.as_i64() else {
        return Ok(ScalarValue::String(None));
    };
    let len = match args.get(2) {
        Some(expr) => {
            let v = expr.eval(ctx)?;
            match v.as_i64() {
                Some(l) => Some(l),
                None => return Ok(ScalarValue::String(None)),
            }
        }
        None => None,
    };

    let bytes = s.as_bytes();
    if start < 1 || (start as usize) > bytes.len() {
        return Ok(ScalarValue::String(None));
    }
    let start_idx = (start - 1) as usize;
    let end_idx = match len {
        Some(l) => {
            if l < 1 || start_idx + (l as usize) > bytes.len() {
                return Ok(ScalarValue::String(None));
            }
            start_idx + l as usize
        }
        None => bytes.len(),
    };
    Ok(ScalarValue::String(Some(
        String::from_utf8_lossy(&bytes[start_idx..end_idx]).into_owned(),
    )))
}

fn eval_regexp_extract(
    args: &[Expr],
    regex_cache: &RefCell<HashMap<String, Regex>>,
    ctx: &EvalContext,
) -> Result<ScalarValue> {
    let subject = args[0].eval(ctx)?;
    let Some(subject) = plain_string(&subject)? else {
        return Ok(ScalarValue::String(None));
    };
    let pattern = args[1].eval(ctx)?;
    let Some(pattern) = plain_string(&pattern)? else {
        return Ok(ScalarValue::String(None));
    };
    let group_idx = args[2].eval(ctx)?;
    let Some(group_idx) = group_idx.as_i64() else {
        return Ok(ScalarValue::String(None));
    };

    if !regex_cache.borrow().contains_key(&pattern) {
        match Regex::new(&pattern) {
            Ok(re) => {
                regex_cache.borrow_mut().insert(pattern.clone(), re);
            }
            Err(e) => {
                log::debug!("regexp_extract: pattern '{pattern}' failed to compile: {e}");
                return Ok(ScalarValue::String(None));
            }
        }
    }

    let cache = regex_cache.borrow();
    let re = cache.get(&pattern).expect("just inserted or already present");
    let Some(captures) = re.captures(&subject) else {
        return Ok(ScalarValue::String(None));
    };
    let group_idx = usize::try_from(group_idx).unwrap_or(usize::MAX);
    match captures.get(group_idx) {
        Some(m) => Ok(ScalarValue::String(Some(m.as_str().to_string()))),
        None => Ok(ScalarValue::String(None)),
    }
}
