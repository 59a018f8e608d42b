//! Unified error handling for encsql.
//!
//! This module defines [`Error`], the single error type propagated through
//! every stage of the front end: the lexer and grammar, the AST builder, the
//! CNF normalizer and the configuration loader.
//!
//! A convenience [`Result<T>`] alias is re-exported so that callers can write
//! `Result<T>` instead of `std::result::Result<T, Error>`.

use thiserror::Error;

/// The canonical error type for all encsql operations.
///
/// Variants are organised by failure category so that callers can match on
/// the kind of failure without inspecting free-form strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The SQL text does not match the dialect's grammar (bad token, missing
    /// keyword, unterminated literal).
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },

    /// Uniform wrapper around a lexical or grammar failure. Built through
    /// [`Error::parse_failed`], which never nests one wrapper in another.
    #[error("parse failed: {source}")]
    ParseFailed {
        #[source]
        source: Box<Error>,
    },

    /// A syntactically valid tree violates an invariant of the query model,
    /// e.g. a fixed-width type declared with a length or a hex literal with an
    /// odd number of digits.
    #[error("invalid query: {0}")]
    Semantic(String),

    /// A recognised construct that this front end deliberately rejects.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The parser configuration could not be loaded or is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create a syntax error at the given 1-based position.
    pub fn syntax(message: impl Into<String>, line: usize, column: usize) -> Self {
        Error::Syntax {
            message: message.into(),
            line,
            column,
        }
    }

    /// Create a semantic construction error.
    pub fn semantic(message: impl Into<String>) -> Self {
        Error::Semantic(message.into())
    }

    /// Create an unsupported-feature error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Error::Unsupported(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// Wrap a grammar-layer failure as [`Error::ParseFailed`].
    ///
    /// An error that is already a `ParseFailed` is returned unchanged.
    pub fn parse_failed(cause: Error) -> Self {
        match cause {
            Error::ParseFailed { .. } => cause,
            other => Error::ParseFailed {
                source: Box::new(other),
            },
        }
    }

    /// Returns true for failures that originate in the lexer or grammar.
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Error::ParseFailed { .. } | Error::Syntax { .. })
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// A specialised [`Result`] type for encsql operations.
pub type Result<T> = std::result::Result<T, Error>;
