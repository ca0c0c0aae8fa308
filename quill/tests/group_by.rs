mod common;

use common::{empty_fixture_config, fixture_config};
use quill_common::{Row, ScalarValue};

fn int(v: i64) -> ScalarValue {
    ScalarValue::Int(Some(v))
}

fn string(v: &str) -> ScalarValue {
    ScalarValue::String(Some(v.to_string()))
}

/// `select a, sum(c) from t group by a` — spec.md §8 case 1.
#[test]
fn sums_by_group_key() {
    let config = fixture_config();
    let result = quill::execute("select a, sum(c) from t group by a", &config).unwrap();
    assert_eq!(result.schema[0].name, "a");
    assert_eq!(result.schema[1].name, "sum(c)");
    assert_eq!(
        result.rows,
        vec![
            Row::new(vec![int(1), int(10)]),
            Row::new(vec![int(2), int(50)]),
            Row::new(vec![int(3), int(40)]),
        ]
    );
}

/// `select count(*) from t` — spec.md §8 case 2; desugars via
/// `PureAggregateReplace` into a constant group-by over `count(1)`.
#[test]
fn count_star_collapses_to_one_group() {
    let config = fixture_config();
    let result = quill::execute("select count(*) from t", &config).unwrap();
    assert_eq!(result.schema[0].name, "count(1)");
    assert_eq!(result.rows, vec![Row::new(vec![int(4)])]);
}

/// `select b, count(b) from t group by b order by b` — spec.md §8 case 4:
/// NULL sorts first, and `count(b)` skips the NULL member of its group.
#[test]
fn count_of_a_column_skips_nulls_and_null_key_sorts_first() {
    let config = fixture_config();
    let result = quill::execute(
        "select b, count(b) from t group by b order by b",
        &config,
    )
    .unwrap();
    assert_eq!(
        result.rows,
        vec![
            Row::new(vec![ScalarValue::String(None), int(0)]),
            Row::new(vec![string("x"), int(1)]),
            Row::new(vec![string("y"), int(2)]),
        ]
    );
}

#[test]
fn a_group_of_a_single_row_aggregates_trivially() {
    let config = fixture_config();
    let result = quill::execute("select a, min(c), max(c) from t group by a", &config).unwrap();
    // a = 1 and a = 3 each have exactly one member row.
    assert_eq!(result.rows[0], Row::new(vec![int(1), int(10), int(10)]));
    assert_eq!(result.rows[2], Row::new(vec![int(3), int(40), int(40)]));
}

/// A constant group-by over an empty source still yields exactly one
/// group (spec.md §8: "or 1 when G = [Literal(1)]"), whose aggregates
/// see a zero-row group.
#[test]
fn count_star_over_empty_source_yields_one_group_of_zero() {
    let config = empty_fixture_config();
    let result = quill::execute("select count(*), sum(c) from t", &config).unwrap();
    assert_eq!(result.rows, vec![Row::new(vec![int(0), ScalarValue::Int(None)])]);
}

/// A non-constant group-by over an empty source yields zero groups,
/// not one fabricated NULL-keyed group.
#[test]
fn grouping_by_a_real_column_over_empty_source_yields_no_rows() {
    let config = empty_fixture_config();
    let result = quill::execute("select a, count(*) from t group by a", &config).unwrap();
    assert!(result.rows.is_empty());
}
