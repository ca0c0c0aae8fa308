use crate::plan::LogicalPlan;
use quill_common::Result;
use quill_expr::expr::{Attribute, CaseBranch};
use quill_expr::proxy::ExprProxy;
use quill_expr::{Expr, Operator};
use std::rc::Rc;

/// Runs the fixed batch of optimizer rules, once each. Ported from
/// `original_source/parser/sql.go`'s `optimizeBatches` / `OptimizePlan`.
/// This engine registers a single rule, kept as a batch of one rather than
/// a direct call so a second rule can be added without disturbing the
/// calling convention.
pub fn optimize(plan: LogicalPlan) -> Result<LogicalPlan> {
    log::debug!("optimizer rule: PushDownPredicateIntoSource");
    push_down_predicate_into_source(plan)
}

/// When a `Filter` sits directly on top of a `Relation`, splits the
/// filter's condition on every top-level `AND` and attaches the resulting
/// conjuncts to the relation as push-down hints. The `Filter` node itself
/// is left in place — a source is free to ignore the hints (§4.8), so the
/// filter must still be evaluated. Ported from
/// `PushDownPredicateIntoSource`.
fn push_down_predicate_into_source(plan: LogicalPlan) -> Result<LogicalPlan> {
    plan.map_children(&mut |p| {
        if let LogicalPlan::Filter(filter) = &p {
            if let LogicalPlan::Relation(relation) = filter.child.as_ref() {
                let conjuncts = split_conjuncts(&filter.condition);
                log::trace!(
                    "pushing {} conjunct(s) down to relation '{}'",
                    conjuncts.len(),
                    relation.input
                );
                *relation.push_down_predicate.borrow_mut() = conjuncts;
            }
        }
        Ok(p)
    })
}

fn split_conjuncts(condition: &Expr) -> Vec<Expr> {
    if let Expr::Binary {
        op: Operator::And,
        left,
        right,
    } = condition
    {
        let mut result = split_conjuncts(left);
        result.extend(split_conjuncts(right));
        result
    } else {
        vec![deep_clone(condition)]
    }
}

/// `Expr` deliberately does not derive `Clone` (most nodes never need
/// duplicating), but pushing filter conjuncts down to a relation needs an
/// owned copy alongside the `Filter` node's own, unmodified condition.
/// Rebuilds an equivalent tree node by node; attribute indices and the
/// scalar function regex cache are left to repopulate themselves lazily.
fn deep_clone(expr: &Expr) -> Expr {
    match expr {
        Expr::Literal(v) => Expr::Literal(v.clone()),
        Expr::Attribute(attr) => Expr::Attribute(Attribute::new(attr.name.clone())),
        Expr::Star(table) => Expr::Star(table.clone()),
        Expr::Binary { op, left, right } => Expr::Binary {
            op: *op,
            left: Box::new(deep_clone(left)),
            right: Box::new(deep_clone(right)),
        },
        Expr::Not(e) => Expr::Not(Box::new(deep_clone(e))),
        Expr::IsNull(e) => Expr::IsNull(Box::new(deep_clone(e))),
        Expr::In { value, list } => Expr::In {
            value: Box::new(deep_clone(value)),
            list: list.iter().map(deep_clone).collect(),
        },
        Expr::Like { left, right } => Expr::Like {
            left: Box::new(deep_clone(left)),
            right: Box::new(deep_clone(right)),
        },
        Expr::Cast { expr, data_type } => Expr::Cast {
            expr: Box::new(deep_clone(expr)),
            data_type: *data_type,
        },
        Expr::If {
            predicate,
            if_true,
            if_false,
        } => Expr::If {
            predicate: Box::new(deep_clone(predicate)),
            if_true: Box::new(deep_clone(if_true)),
            if_false: Box::new(deep_clone(if_false)),
        },
        Expr::CaseWhen {
            branches,
            else_branch,
        } => Expr::CaseWhen {
            branches: branches
                .iter()
                .map(|b| CaseBranch {
                    when: deep_clone(&b.when),
                    then: deep_clone(&b.then),
                })
                .collect(),
            else_branch: else_branch.as_ref().map(|e| Box::new(deep_clone(e))),
        },
        Expr::Alias { expr, name } => Expr::Alias {
            expr: Box::new(deep_clone(expr)),
            name: name.clone(),
        },
        Expr::ScalarFunction { name, args, .. } => Expr::ScalarFunction {
            name: name.clone(),
            args: args.iter().map(deep_clone).collect(),
            regex_cache: std::cell::RefCell::new(std::collections::HashMap::new()),
        },
        Expr::AggregateFunction { name, args } => Expr::AggregateFunction {
            name: name.clone(),
            args: args.iter().map(deep_clone).collect(),
        },
        Expr::Proxy(proxy) => Expr::Proxy(ExprProxy::new(
            deep_clone(proxy.inner_ref()),
            Rc::clone(&proxy.group_schema),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Filter, Relation};
    use crate::source::Source;
    use quill_common::schema::StructField;
    use quill_common::{DataType, Result as QResult, Row, ScalarValue};
    use rstest::rstest;
    use std::cell::RefCell as StdRefCell;
    use std::sync::Arc;

    #[derive(Debug)]
    struct EmptySource;

    impl Source for EmptySource {
        fn schema(&self) -> Vec<StructField> {
            vec![StructField::new("a", DataType::Int)]
        }

        fn execute(&self, _push_down_predicate: &[Expr]) -> QResult<Vec<Row>> {
            Ok(Vec::new())
        }
    }

    fn relation() -> LogicalPlan {
        LogicalPlan::Relation(Relation {
            input: "t".to_string(),
            alias: None,
            source: Arc::new(EmptySource),
            push_down_predicate: StdRefCell::new(Vec::new()),
        })
    }

    fn filter_over_relation(condition: Expr) -> LogicalPlan {
        LogicalPlan::Filter(Filter {
            condition,
            child: Box::new(relation()),
        })
    }

    fn attr_gt(name: &str, n: i64) -> Expr {
        Expr::Binary {
            op: Operator::Gt,
            left: Box::new(Expr::attribute(name)),
            right: Box::new(Expr::Literal(ScalarValue::Int(Some(n)))),
        }
    }

    #[rstest]
    #[case(attr_gt("a", 1), 1)]
    #[case(
        Expr::Binary {
            op: Operator::And,
            left: Box::new(attr_gt("a", 1)),
            right: Box::new(attr_gt("a", 2)),
        },
        2
    )]
    #[case(
        Expr::Binary {
            op: Operator::And,
            left: Box::new(Expr::Binary {
                op: Operator::And,
                left: Box::new(attr_gt("a", 1)),
                right: Box::new(attr_gt("a", 2)),
            }),
            right: Box::new(attr_gt("a", 3)),
        },
        3
    )]
    #[case(
        Expr::Binary {
            op: Operator::Or,
            left: Box::new(attr_gt("a", 1)),
            right: Box::new(attr_gt("a", 2)),
        },
        1
    )]
    fn splits_top_level_and_conjuncts_but_not_or(#[case] condition: Expr, #[case] expected_conjuncts: usize) {
        let plan = filter_over_relation(condition);
        let plan = optimize(plan).unwrap();
        let LogicalPlan::Filter(filter) = &plan else {
            panic!("expected Filter")
        };
        let LogicalPlan::Relation(relation) = filter.child.as_ref() else {
            panic!("expected Relation")
        };
        assert_eq!(relation.push_down_predicate.borrow().len(), expected_conjuncts);
    }

    #[test]
    fn filter_node_itself_survives_the_rewrite() {
        let plan = filter_over_relation(attr_gt("a", 1));
        let plan = optimize(plan).unwrap();
        assert!(matches!(plan, LogicalPlan::Filter(_)));
    }

    #[test]
    fn a_filter_not_directly_over_a_relation_pushes_nothing_down() {
        // Filter -> Filter -> Relation: the outer filter's condition has
        // no relation directly beneath it, so nothing is pushed for it.
        let inner = filter_over_relation(attr_gt("a", 1));
        let outer = LogicalPlan::Filter(Filter {
            condition: attr_gt("a", 2),
            child: Box::new(inner),
        });
        let plan = optimize(outer).unwrap();
        let LogicalPlan::Filter(outer_filter) = &plan else {
            panic!("expected Filter")
        };
        let LogicalPlan::Filter(inner_filter) = outer_filter.child.as_ref() else {
            panic!("expected inner Filter")
        };
        let LogicalPlan::Relation(relation) = inner_filter.child.as_ref() else {
            panic!("expected Relation")
        };
        // Only the inner filter (directly over the relation) pushes down.
        assert_eq!(relation.push_down_predicate.borrow().len(), 1);
    }
}
