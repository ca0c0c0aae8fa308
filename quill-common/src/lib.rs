//! Scalar values, schemas, rows, datasets and the shared error type for the
//! quill SQL engine.

pub mod dataset;
pub mod error;
pub mod row;
pub mod scalar;
pub mod schema;

pub use dataset::Dataset;
pub use error::{Error, Position, Result};
pub use row::Row;
pub use scalar::{DataType, ScalarValue};
pub use schema::StructField;
