mod common;

use common::fixture_config;
use quill_common::{Row, ScalarValue};

fn int(v: i64) -> ScalarValue {
    ScalarValue::Int(Some(v))
}

#[test]
fn order_by_desc_reverses_the_sort() {
    let config = fixture_config();
    let result = quill::execute("select a from t order by a desc", &config).unwrap();
    assert_eq!(
        result.rows,
        vec![
            Row::new(vec![int(3)]),
            Row::new(vec![int(2)]),
            Row::new(vec![int(2)]),
            Row::new(vec![int(1)]),
        ]
    );
}

#[test]
fn multi_key_sort_breaks_ties_on_the_second_key() {
    let config = fixture_config();
    let result = quill::execute("select a, c from t order by a, c desc", &config).unwrap();
    assert_eq!(
        result.rows,
        vec![
            Row::new(vec![int(1), int(10)]),
            Row::new(vec![int(2), int(30)]),
            Row::new(vec![int(2), int(20)]),
            Row::new(vec![int(3), int(40)]),
        ]
    );
}

#[test]
fn limit_zero_yields_no_rows() {
    let config = fixture_config();
    let result = quill::execute("select a from t limit 0", &config).unwrap();
    assert!(result.rows.is_empty());
}

#[test]
fn limit_larger_than_the_dataset_passes_everything_through() {
    let config = fixture_config();
    let result = quill::execute("select a from t limit 1000", &config).unwrap();
    assert_eq!(result.rows.len(), 4);
}

#[test]
fn limit_applies_after_sort() {
    let config = fixture_config();
    let result = quill::execute("select a from t order by a desc limit 2", &config).unwrap();
    assert_eq!(result.rows, vec![Row::new(vec![int(3)]), Row::new(vec![int(2)])]);
}
