mod common;

use common::{empty_fixture_config, fixture_config};
use quill_common::{Row, ScalarValue};

fn int(v: i64) -> ScalarValue {
    ScalarValue::Int(Some(v))
}

fn string(v: &str) -> ScalarValue {
    ScalarValue::String(Some(v.to_string()))
}

/// `select * from t where c > 15 and b like 'y%'` — spec.md §8 case 3.
#[test]
fn filters_with_and_and_like() {
    let config = fixture_config();
    let result = quill::execute("select * from t where c > 15 and b like 'y%'", &config).unwrap();
    assert_eq!(
        result.rows,
        vec![
            Row::new(vec![int(2), string("y"), int(20)]),
            Row::new(vec![int(2), string("y"), int(30)]),
        ]
    );
}

#[test]
fn projects_a_subset_of_columns_in_requested_order() {
    let config = fixture_config();
    let result = quill::execute("select c, a from t", &config).unwrap();
    assert_eq!(result.schema.len(), 2);
    assert_eq!(result.schema[0].name, "c");
    assert_eq!(result.schema[1].name, "a");
    assert_eq!(result.rows[0], Row::new(vec![int(10), int(1)]));
}

#[test]
fn star_alongside_an_explicit_column_duplicates_that_column() {
    let config = fixture_config();
    let result = quill::execute("select *, a from t", &config).unwrap();
    assert_eq!(result.schema.len(), 4);
    assert_eq!(result.rows[0], Row::new(vec![int(1), string("x"), int(10), int(1)]));
}

#[test]
fn where_over_a_null_column_excludes_the_null_row() {
    let config = fixture_config();
    let result = quill::execute("select a from t where b = 'x'", &config).unwrap();
    assert_eq!(result.rows, vec![Row::new(vec![int(1)])]);
}

#[test]
fn empty_source_produces_zero_rows_with_a_populated_schema() {
    let config = empty_fixture_config();
    let result = quill::execute("select a, b from t where c > 0", &config).unwrap();
    assert!(result.rows.is_empty());
    assert_eq!(result.schema.len(), 2);
}

#[test]
fn is_null_and_is_not_null_partition_the_table() {
    let config = fixture_config();
    let null_rows = quill::execute("select a from t where b is null", &config).unwrap();
    assert_eq!(null_rows.rows, vec![Row::new(vec![int(3)])]);

    let non_null_rows = quill::execute("select a from t where b is not null", &config).unwrap();
    assert_eq!(non_null_rows.rows.len(), 3);
}
