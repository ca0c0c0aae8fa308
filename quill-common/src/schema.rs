use crate::scalar::DataType;
use std::fmt;

/// A single named, typed output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructField {
    pub name: String,
    pub data_type: DataType,
}

impl StructField {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        StructField {
            name: name.into(),
            data_type,
        }
    }
}

impl fmt::Display for StructField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.data_type)
    }
}
