//! Top-level error type for registry operations.
//!
//! Every stage error is wrapped with the formula's name so callers can log
//! a failure without tracking the name separately.

use crate::eval::EvalError;
use crate::lexer::LexError;
use crate::parser::ParseError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("formula '{formula}': {source}")]
    Lex {
        formula: String,
        #[source]
        source: LexError,
    },

    #[error("formula '{formula}': {source}")]
    Parse {
        formula: String,
        #[source]
        source: ParseError,
    },

    #[error("formula '{formula}': {source}")]
    Eval {
        formula: String,
        #[source]
        source: EvalError,
    },

    #[error("unknown formula '{0}'")]
    UnknownFormula(String),
}

impl Error {
    /// Name of the formula the error concerns.
    pub fn formula(&self) -> &str {
        match self {
            Error::Lex { formula, .. }
            | Error::Parse { formula, .. }
            | Error::Eval { formula, .. } => formula,
            Error::UnknownFormula(name) => name,
        }
    }
}
