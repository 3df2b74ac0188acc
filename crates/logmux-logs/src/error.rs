use thiserror::Error;

/// Failure to compile a predicate expression
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredicateError {
    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("invalid number {text:?} at offset {offset}")]
    InvalidNumber { text: String, offset: usize },

    #[error("unexpected {found} at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        offset: usize,
    },

    #[error("right side of `=~` must be a string literal (offset {offset})")]
    PatternNotLiteral { offset: usize },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Failure while evaluating a compiled predicate against a record
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("{0} is not defined")]
    UnknownIdentifier(String),

    #[error("cannot read property {property:?} of {target}")]
    NullAccess {
        property: String,
        target: &'static str,
    },

    #[error("operator `{op}` cannot be applied to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
}

/// Filter configuration errors, fatal at startup
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("unknown level {0:?}")]
    UnknownLevel(String),

    #[error("invalid condition {expression:?}: {source}")]
    Compile {
        expression: String,
        #[source]
        source: PredicateError,
    },

    #[error("invalid condition {expression:?}\n  error: {source}\n  checked against: {record}")]
    Validate {
        expression: String,
        record: String,
        #[source]
        source: EvalError,
    },
}
