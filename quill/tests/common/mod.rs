//! Shared fixture for the integration test suite: an in-memory `Source`
//! wrapping the `t(a:int, b:string, c:int)` table used throughout
//! `spec.md` §8's end-to-end scenarios, registered under the name `t`.

use quill::sources::Source;
use quill::{Config, DataType, Result, Row, ScalarValue, StructField};
use std::sync::Arc;

#[derive(Debug)]
pub struct VecSource {
    schema: Vec<StructField>,
    rows: Vec<Row>,
}

impl VecSource {
    pub fn new(schema: Vec<StructField>, rows: Vec<Row>) -> Self {
        VecSource { schema, rows }
    }
}

impl Source for VecSource {
    fn schema(&self) -> Vec<StructField> {
        self.schema.clone()
    }

    fn execute(&self, _push_down_predicate: &[quill_expr::Expr]) -> Result<Vec<Row>> {
        Ok(self.rows.clone())
    }
}

/// `t(a:int, b:string, c:int)`, rows `(1,"x",10), (2,"y",20), (2,"y",30),
/// (3,NULL,40)` — the fixture `spec.md` §8 assumes throughout.
pub fn fixture_config() -> Config {
    let schema = vec![
        StructField::new("a", DataType::Int),
        StructField::new("b", DataType::String),
        StructField::new("c", DataType::Int),
    ];
    let rows = vec![
        row(1, Some("x"), 10),
        row(2, Some("y"), 20),
        row(2, Some("y"), 30),
        row(3, None, 40),
    ];
    Config::default().with_table("t", Arc::new(VecSource::new(schema, rows)))
}

/// Same fixture, but with zero rows — for the empty-input boundary
/// cases in `spec.md` §8.
pub fn empty_fixture_config() -> Config {
    let schema = vec![
        StructField::new("a", DataType::Int),
        StructField::new("b", DataType::String),
        StructField::new("c", DataType::Int),
    ];
    Config::default().with_table("t", Arc::new(VecSource::new(schema, Vec::new())))
}

fn row(a: i64, b: Option<&str>, c: i64) -> Row {
    Row::new(vec![
        ScalarValue::Int(Some(a)),
        ScalarValue::String(b.map(str::to_string)),
        ScalarValue::Int(Some(c)),
    ])
}

#[ctor::ctor]
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
