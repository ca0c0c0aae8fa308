use crate::expr::Expr;
use quill_common::schema::StructField;
use std::cell::Cell;
use std::rc::Rc;

/// Wraps every node of an `Aggregate` plan's `AggregateExprs` trees.
///
/// Grounds on the original source's `ExprProxy` (`expression/expression.go`),
/// which is both a schema-derivation observer and an evaluation
/// redirector. It serves two purposes:
///
/// 1. At schema derivation, it checks whether the wrapped expression's
///    printed form matches one of the group-by key schema's field names;
///    if so it memoizes that key's index in `key_index` so evaluation can
///    look the value up directly in the group's key row instead of
///    re-evaluating the (possibly non-aggregate, non-group-able)
///    expression.
/// 2. At evaluation, if it does not match a key, it evaluates the wrapped
///    expression against the group's key row, handing the whole row
///    group down through `EvalContext` so a nested aggregate function can
///    see every member row.
///
/// Per the design note in the specification, this is modeled as a normal
/// `Expr` variant carrying `(inner, group_schema, key_index)` rather than
/// through any form of runtime type injection or field mutation.
#[derive(Debug)]
pub struct ExprProxy {
    pub inner: Box<Expr>,
    pub group_schema: Rc<Vec<StructField>>,
    pub key_index: Cell<Option<usize>>,
}

impl ExprProxy {
    pub fn new(inner: Expr, group_schema: Rc<Vec<StructField>>) -> Self {
        ExprProxy {
            inner: Box::new(inner),
            group_schema,
            key_index: Cell::new(None),
        }
    }

    pub fn inner_ref(&self) -> &Expr {
        &self.inner
    }

    pub fn with_inner(self, new_inner: Expr) -> Self {
        ExprProxy {
            inner: Box::new(new_inner),
            group_schema: self.group_schema,
            key_index: self.key_index,
        }
    }
}
