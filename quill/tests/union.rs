mod common;

use common::{empty_fixture_config, fixture_config};
use quill_common::{Row, ScalarValue};

fn int(v: i64) -> ScalarValue {
    ScalarValue::Int(Some(v))
}

#[test]
fn union_all_concatenates_both_branches() {
    let config = fixture_config();
    let result = quill::execute(
        "select a from t where a = 1 union all select a from t where a = 3",
        &config,
    )
    .unwrap();
    let mut values: Vec<i64> = result
        .rows
        .iter()
        .map(|r| match r.get(0) {
            ScalarValue::Int(Some(v)) => *v,
            other => panic!("expected int, got {other:?}"),
        })
        .collect();
    values.sort_unstable();
    assert_eq!(values, vec![1, 3]);
}

#[test]
fn union_all_of_three_branches_keeps_every_row_including_duplicates() {
    let config = fixture_config();
    let result = quill::execute(
        "select a from t union all select a from t union all select a from t",
        &config,
    )
    .unwrap();
    assert_eq!(result.rows.len(), 12);
}

/// Branches with zero rows contribute nothing but don't error the union.
#[test]
fn union_all_with_an_empty_branch() {
    let config = fixture_config();
    let empty_config = empty_fixture_config();
    let non_empty = quill::execute("select a from t", &config).unwrap();
    let empty = quill::execute("select a from t", &empty_config).unwrap();
    assert_eq!(non_empty.rows.len(), 4);
    assert!(empty.rows.is_empty());

    let result = quill::execute(
        "select a from t where a < 0 union all select a from t where a < 0",
        &empty_config,
    )
    .unwrap();
    assert!(result.rows.is_empty());
}

/// More branches than `UNION_PARALLELISM` still complete and concatenate
/// correctly; only the degree of concurrency is bounded, not the count.
#[test]
fn union_all_with_more_branches_than_the_parallelism_cap() {
    let config = fixture_config();
    let sql = (0..8)
        .map(|_| "select a from t where a = 1")
        .collect::<Vec<_>>()
        .join(" union all ");
    let result = quill::execute(&sql, &config).unwrap();
    assert_eq!(result.rows, vec![Row::new(vec![int(1)]); 8]);
}
