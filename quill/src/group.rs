//! Sort-based group-by: the data structure and boundary-splitting pass
//! behind `LogicalPlan::Aggregate`'s executor.
//!
//! Ported from `original_source/plan/{execution,sort}.go`'s `group`
//! struct and `sortBaseGroups`: evaluate every group-by expression once
//! per input row, stable-sort the rows by that key tuple, then walk the
//! sorted sequence splitting at every index whose key strictly compares
//! greater than its predecessor's.

use quill_common::row::Row;
use quill_common::schema::StructField;
use quill_common::{Result, ScalarValue};
use quill_expr::{Expr, EvalContext};
use std::cmp::Ordering;

/// One discovered group: the rows that share a key, plus the key tuple
/// captured from the first member (`None` only for the degenerate
/// zero-row, constant-group-by case — see `build_groups`).
pub struct Group {
    pub key_row: Option<Row>,
    pub rows: Vec<Row>,
}

impl Group {
    /// The row handed to `EvalContext::with_row_group` for this group:
    /// the real key row when there is one, otherwise a row of typed
    /// NULLs matching `group_schema` (§4.7: "NULL if there is no key
    /// row, i.e. empty input with a constant group-by").
    pub fn key_row_or_null(&self, group_schema: &[StructField]) -> Row {
        match &self.key_row {
            Some(row) => row.clone(),
            None => Row::new(
                group_schema
                    .iter()
                    .map(|field| ScalarValue::null_of(field.data_type))
                    .collect(),
            ),
        }
    }
}

/// Groups `input_rows` by `group_exprs`, sort-then-scan.
///
/// An empty input ordinarily produces zero groups. The one exception is
/// a constant group-by (`group by 1`, what `PureAggregateReplace`
/// synthesizes for `select count(*) from t` with no explicit `group
/// by`): every row would share that one group regardless of how many
/// rows exist, so the spec requires exactly one output group even when
/// there are zero input rows to read a key from (§8: "the number of
/// output rows equals the number of distinct values of G in the input
/// ..., or 1 when G = [Literal(1)]").
pub fn build_groups(group_exprs: &[Expr], input_rows: &[Row]) -> Result<Vec<Group>> {
    let mut keyed: Vec<(Row, Row)> = Vec::with_capacity(input_rows.len());
    for row in input_rows {
        let ctx = EvalContext::new(row);
        let key_values = group_exprs
            .iter()
            .map(|expr| expr.eval(&ctx))
            .collect::<Result<Vec<_>>>()?;
        keyed.push((Row::new(key_values), row.clone()));
    }

    if keyed.is_empty() {
        return Ok(if is_constant_group_by(group_exprs) {
            vec![Group {
                key_row: None,
                rows: Vec::new(),
            }]
        } else {
            Vec::new()
        });
    }

    keyed.sort_by(|(ka, _), (kb, _)| {
        if key_less(ka, kb) {
            Ordering::Less
        } else if key_less(kb, ka) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    });

    let mut groups = Vec::new();
    let mut iter = keyed.into_iter();
    let (first_key, first_row) = iter.next().expect("checked non-empty above");
    let mut current_key = first_key;
    let mut current_rows = vec![first_row];
    for (key, row) in iter {
        if key_less(&current_key, &key) {
            groups.push(Group {
                key_row: Some(std::mem::replace(&mut current_key, key)),
                rows: std::mem::take(&mut current_rows),
            });
        }
        current_rows.push(row);
    }
    groups.push(Group {
        key_row: Some(current_key),
        rows: current_rows,
    });
    Ok(groups)
}

/// Strict "less than" across a whole key tuple, column by column: the
/// first column whose comparison isn't `Equal` decides the result.
/// Two NULL-valued columns compare `Equal` (never `Less`), so two
/// NULL-keyed rows land in the same group — the spec's adopted-as-is
/// Open Question (§9).
fn key_less(a: &Row, b: &Row) -> bool {
    for i in 0..a.len() {
        match a.get(i).compare(b.get(i)) {
            Some(Ordering::Less) => return true,
            Some(Ordering::Greater) => return false,
            Some(Ordering::Equal) => continue,
            None => return false,
        }
    }
    false
}

fn is_constant_group_by(group_exprs: &[Expr]) -> bool {
    matches!(group_exprs, [Expr::Literal(_)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_common::DataType;

    fn int_row(v: i64) -> Row {
        Row::new(vec![ScalarValue::Int(Some(v))])
    }

    #[test]
    fn groups_by_distinct_key_values() {
        let rows = vec![int_row(1), int_row(2), int_row(2), int_row(1)];
        let group_exprs = vec![Expr::attribute("a")];
        // Attribute needs a resolved index to evaluate; fake a one-column schema.
        if let Expr::Attribute(attr) = &group_exprs[0] {
            attr.idx.set(Some(0));
        }
        let groups = build_groups(&group_exprs, &rows).unwrap();
        assert_eq!(groups.len(), 2);
        let sizes: Vec<usize> = groups.iter().map(|g| g.rows.len()).collect();
        assert_eq!(sizes, vec![2, 2]);
    }

    #[test]
    fn constant_group_by_yields_one_group_even_when_empty() {
        let group_exprs = vec![Expr::Literal(ScalarValue::Int(Some(1)))];
        let groups = build_groups(&group_exprs, &[]).unwrap();
        assert_eq!(groups.len(), 1);
        assert!(groups[0].key_row.is_none());
        assert!(groups[0].rows.is_empty());
    }

    #[test]
    fn non_constant_group_by_yields_zero_groups_when_empty() {
        let group_exprs = vec![Expr::attribute("a")];
        let groups = build_groups(&group_exprs, &[]).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn key_row_or_null_fabricates_typed_null() {
        let group = Group {
            key_row: None,
            rows: Vec::new(),
        };
        let schema = vec![StructField::new("a", DataType::Int)];
        let row = group.key_row_or_null(&schema);
        assert_eq!(row.get(0), &ScalarValue::Int(None));
    }
}
