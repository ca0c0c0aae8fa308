mod common;

use common::fixture_config;
use quill_common::{Row, ScalarValue};
use rstest::rstest;

fn string(v: &str) -> ScalarValue {
    ScalarValue::String(Some(v.to_string()))
}

/// `select if(a = 2, 'two', cast(a as string)) from t` — spec.md §8 case 5.
#[test]
fn if_and_cast_to_string() {
    let config = fixture_config();
    let result = quill::execute(
        "select if(a = 2, 'two', cast(a as string)) from t",
        &config,
    )
    .unwrap();
    assert_eq!(
        result.rows,
        vec![
            Row::new(vec![string("1")]),
            Row::new(vec![string("two")]),
            Row::new(vec![string("two")]),
            Row::new(vec![string("3")]),
        ]
    );
}

/// `select substr(b, 1, 1) from t where b is not null` — spec.md §8 case 6.
#[test]
fn substr_over_non_null_rows() {
    let config = fixture_config();
    let result = quill::execute(
        "select substr(b, 1, 1) from t where b is not null",
        &config,
    )
    .unwrap();
    assert_eq!(
        result.rows,
        vec![
            Row::new(vec![string("x")]),
            Row::new(vec![string("y")]),
            Row::new(vec![string("y")]),
        ]
    );
}

/// `substr` with a `length` that runs past the end of the string, or that
/// is less than 1, yields NULL rather than a truncated/empty string.
#[test]
fn substr_with_out_of_range_length_is_null() {
    let config = fixture_config();
    let result = quill::execute(
        "select substr(b, 2, 10), substr(b, 2, 0) from t where a = 1",
        &config,
    )
    .unwrap();
    assert_eq!(
        result.rows,
        vec![Row::new(vec![
            ScalarValue::String(None),
            ScalarValue::String(None)
        ])]
    );
}

/// A `case when` whose every branch (including `else`) is NULL evaluates
/// to a typed NULL, not an error.
#[test]
fn case_when_with_every_branch_null_yields_null() {
    let config = fixture_config();
    let result = quill::execute(
        "select case when a > 100 then cast(a as string) else cast(null as string) end from t",
        &config,
    )
    .unwrap();
    assert!(result.rows.iter().all(|r| r.get(0) == &ScalarValue::String(None)));
}

/// `%` is the only wildcard (§4.3) — a pattern with none is a plain
/// equality check, not a single-character match.
#[test]
fn like_with_no_wildcard_is_plain_equality() {
    let config = fixture_config();
    let result = quill::execute("select a from t where b like 'y'", &config).unwrap();
    assert_eq!(
        result.rows,
        vec![
            Row::new(vec![ScalarValue::Int(Some(2))]),
            Row::new(vec![ScalarValue::Int(Some(2))]),
        ]
    );
}

/// `a%b` with a single interior `%` is start-with(`a`) AND ends-with(`b`).
#[test]
fn like_with_a_single_interior_wildcard_matches_prefix_and_suffix() {
    let config = fixture_config();
    let result = quill::execute("select a from t where b like 'x%x'", &config).unwrap();
    assert_eq!(result.rows, vec![Row::new(vec![ScalarValue::Int(Some(1))])]);
}

#[test]
fn in_list_skips_null_elements_and_null_probe_yields_null() {
    let config = fixture_config();
    let result = quill::execute("select a from t where b in ('x', 'y')", &config).unwrap();
    assert_eq!(result.rows.len(), 3);

    let on_null = quill::execute("select b in ('x', 'y') from t where a = 3", &config).unwrap();
    assert_eq!(on_null.rows, vec![Row::new(vec![ScalarValue::Boolean(None)])]);
}

/// Every `cast` source/target pair the CAST table supports, driven through
/// a single fixture row (`a=1, b='x', c=10`) so each case is a full
/// lex-parse-analyze-optimize-execute round trip rather than a unit call
/// into `quill_expr::eval`.
#[rstest]
#[case("select cast(a as string) from t where a = 1", string("1"))]
#[case("select cast(a as double) from t where a = 1", ScalarValue::Float(Some(1.0)))]
#[case("select cast(c as double) from t where a = 1", ScalarValue::Float(Some(10.0)))]
#[case("select cast(b as bigint) from t where a = 1", ScalarValue::Int(None))]
#[case("select cast(cast(a as string) as bigint) from t where a = 1", ScalarValue::Int(Some(1)))]
#[case("select cast(true as string) from t where a = 1", string("true"))]
fn cast_end_to_end(#[case] sql: &str, #[case] expected: ScalarValue) {
    let config = fixture_config();
    let result = quill::execute(sql, &config).unwrap();
    assert_eq!(result.rows, vec![Row::new(vec![expected])]);
}
