use std::cmp::Ordering;
use std::fmt;

/// The four scalar types the engine knows about.
///
/// Mirrors the original engine's `DataType` enum; names match the SQL type
/// keywords used in `CAST` (`bigint`, `double`, `boolean`, `string`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int,
    Float,
    Boolean,
    String,
}

impl DataType {
    /// The name used both in `CAST(expr AS <name>)` and schema printing.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int => "bigint",
            DataType::Float => "double",
            DataType::Boolean => "boolean",
            DataType::String => "string",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A nullable value of one of the engine's four scalar types.
///
/// Every value carries its type even when it is `NULL`, so a column of all
/// nulls still has a well-defined `DataType` for schema inference and casts.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Int(Option<i64>),
    Float(Option<f64>),
    Boolean(Option<bool>),
    String(Option<String>),
}

impl ScalarValue {
    pub fn data_type(&self) -> DataType {
        match self {
            ScalarValue::Int(_) => DataType::Int,
            ScalarValue::Float(_) => DataType::Float,
            ScalarValue::Boolean(_) => DataType::Boolean,
            ScalarValue::String(_) => DataType::String,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            ScalarValue::Int(v) => v.is_none(),
            ScalarValue::Float(v) => v.is_none(),
            ScalarValue::Boolean(v) => v.is_none(),
            ScalarValue::String(v) => v.is_none(),
        }
    }

    pub fn null_of(data_type: DataType) -> Self {
        match data_type {
            DataType::Int => ScalarValue::Int(None),
            DataType::Float => ScalarValue::Float(None),
            DataType::Boolean => ScalarValue::Boolean(None),
            DataType::String => ScalarValue::String(None),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Int(v) => *v,
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Float(v) => *v,
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Boolean(v) => *v,
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::String(v) => v.as_deref(),
            _ => None,
        }
    }

    /// Ordering used by the sort executor and by `min`/`max`.
    ///
    /// Two values of different types are never compared by callers; NULLs
    /// compare equal to each other and the comparison is otherwise total
    /// within a type, with `false < true` for booleans.
    pub fn compare(&self, other: &ScalarValue) -> Option<Ordering> {
        match (self, other) {
            (ScalarValue::Int(a), ScalarValue::Int(b)) => compare_option(a, b),
            (ScalarValue::Float(a), ScalarValue::Float(b)) => {
                compare_option_with(a, b, |x, y| x.partial_cmp(y))
            }
            (ScalarValue::Boolean(a), ScalarValue::Boolean(b)) => compare_option(a, b),
            (ScalarValue::String(a), ScalarValue::String(b)) => compare_option(a, b),
            _ => None,
        }
    }
}

fn compare_option<T: PartialOrd>(a: &Option<T>, b: &Option<T>) -> Option<Ordering> {
    compare_option_with(a, b, |x, y| x.partial_cmp(y))
}

fn compare_option_with<T>(
    a: &Option<T>,
    b: &Option<T>,
    cmp: impl FnOnce(&T, &T) -> Option<Ordering>,
) -> Option<Ordering> {
    match (a, b) {
        (None, None) => Some(Ordering::Equal),
        (None, Some(_)) => Some(Ordering::Less),
        (Some(_), None) => Some(Ordering::Greater),
        (Some(x), Some(y)) => cmp(x, y),
    }
}

impl fmt::Display for ScalarValue {
    /// Renders the literal text form used in dataset dumps: strings are
    /// single-quoted, booleans print as `true`/`false`, numbers print in
    /// their shortest round-trip decimal form, and any null prints `null`
    /// regardless of its underlying type.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Int(Some(v)) => write!(f, "{v}"),
            ScalarValue::Float(Some(v)) => write!(f, "{v}"),
            ScalarValue::Boolean(Some(v)) => write!(f, "{v}"),
            ScalarValue::String(Some(v)) => write!(f, "'{v}'"),
            ScalarValue::Int(None)
            | ScalarValue::Float(None)
            | ScalarValue::Boolean(None)
            | ScalarValue::String(None) => write!(f, "null"),
        }
    }
}
