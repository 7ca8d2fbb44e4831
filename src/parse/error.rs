//! Error types for the patch parser.

use serde::Serialize;
use thiserror::Error;

/// A value that could not be coerced to the requested type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("not a valid number arg: {0}")]
    Number(String),
    #[error("expected 0 or 1, got {0}")]
    Bool(f64),
    #[error("not a valid string arg: {0}")]
    String(String),
    #[error("not a valid arg: {0}")]
    Arg(String),
}

/// Why a single statement could not be turned into document content.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatementError {
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error("unknown chunk `{0}`")]
    UnknownChunk(String),
    #[error("unknown element `{0}`")]
    UnknownElement(String),
    #[error("`{element}` expects {expected} fields, got {found}")]
    Arity {
        element: String,
        expected: String,
        found: usize,
    },
    #[error("`{element}` is missing its {field}")]
    MissingField {
        element: &'static str,
        field: &'static str,
    },
    #[error("array data found outside of an array")]
    DanglingArrayData,
    #[error("array data offset {offset} out of bounds for array of size {size}")]
    ArrayDataOutOfBounds { offset: usize, size: usize },
    #[error("array of size {size} exceeds the maximum of {max}")]
    ArrayTooLarge { size: usize, max: usize },
    #[error("restore without a matching canvas")]
    UnmatchedRestore,
    #[error("the root canvas cannot be restored")]
    RootRestore,
    #[error("canvas opened here is never restored")]
    UnclosedCanvas,
    #[error("statement found before the root canvas")]
    OutsideCanvas,
    #[error("no canvas found")]
    NoCanvas,
    #[error("canvas nesting exceeds the maximum depth of {0}")]
    TooDeep(usize),
}

/// A line-attributed error or warning.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Zero-based line where the offending statement starts.
    pub line_index: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn new(line_index: usize, message: impl Into<String>) -> Self {
        Self {
            line_index,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[line {}] {}", self.line_index, self.message)
    }
}

/// A failed parse: every error found in the input, plus any warnings.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} error(s) while parsing patch, first: {}", .errors.len(), first_error(.errors))]
pub struct ParseFailure {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

fn first_error(errors: &[Diagnostic]) -> String {
    errors
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}
