mod common;

use common::fixture_config;
use quill_common::{Row, ScalarValue};

fn int(v: i64) -> ScalarValue {
    ScalarValue::Int(Some(v))
}

fn string(v: &str) -> ScalarValue {
    ScalarValue::String(Some(v.to_string()))
}

/// `select s.a from (select a, b from t where c > 15) as s` — the
/// subquery's own `where` narrows the rows, and its alias renames every
/// output column to `s.col` per §4.6, so the outer select must qualify
/// `a` as `s.a` to reach it.
#[test]
fn subquery_schema_is_renamed_to_alias_dot_col() {
    let config = fixture_config();
    let result = quill::execute(
        "select s.a, s.b from (select a, b from t where c > 15) as s",
        &config,
    )
    .unwrap();
    assert_eq!(result.schema[0].name, "s.a");
    assert_eq!(result.schema[1].name, "s.b");
    assert_eq!(
        result.rows,
        vec![
            Row::new(vec![int(2), string("y")]),
            Row::new(vec![int(2), string("y")]),
        ]
    );
}

/// An aggregate nested inside a subquery is fully resolved before the
/// alias rename, so the outer query only ever sees plain columns.
#[test]
fn subquery_over_an_aggregate_is_queryable_by_its_alias() {
    let config = fixture_config();
    let result = quill::execute(
        "select s.a, s.total from (select a, sum(c) as total from t group by a) as s order by s.a",
        &config,
    )
    .unwrap();
    assert_eq!(
        result.rows,
        vec![
            Row::new(vec![int(1), int(10)]),
            Row::new(vec![int(2), int(50)]),
            Row::new(vec![int(3), int(40)]),
        ]
    );
}
