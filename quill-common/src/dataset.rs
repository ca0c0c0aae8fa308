use crate::row::Row;
use crate::schema::StructField;
use std::fmt;

/// The result of executing a query: a schema and the rows that satisfy it.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub schema: Vec<StructField>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(schema: Vec<StructField>, rows: Vec<Row>) -> Self {
        Dataset { schema, rows }
    }

    pub fn empty(schema: Vec<StructField>) -> Self {
        Dataset {
            schema,
            rows: Vec::new(),
        }
    }
}

impl fmt::Display for Dataset {
    /// One line per row, `field: value` pairs separated by `, `.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            for (i, field) in self.schema.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", field.name, row.get(i))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
