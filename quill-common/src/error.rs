use std::fmt;

/// A location in the original SQL text, used to annotate lex/parse errors.
///
/// `row` is 1-indexed, `col` is 0-indexed, matching the scanner's own
/// bookkeeping convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The error type returned by every fallible operation in the workspace.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("lex error: {0}")]
    Lex(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("execution error: {0}")]
    Execution(String),
}

impl Error {
    pub fn lex(message: impl Into<String>, position: Position) -> Self {
        Error::Lex(format!("{} at {position}", message.into()))
    }

    pub fn parse(message: impl Into<String>, position: Position) -> Self {
        Error::Parse(format!("{} at {position}", message.into()))
    }

    pub fn parse_unpositioned(message: impl Into<String>) -> Self {
        Error::Parse(message.into())
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Error::Schema(message.into())
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Error::Execution(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
