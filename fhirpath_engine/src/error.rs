//! Engine error types
//!
//! Runtime errors are plain messages without source positions; lexical and
//! syntactic errors (from the compiler crate) carry spans and render carets.

use crate::compile::error::CompileError;
use fhirpath_compiler::ParseError;

/// A failure while evaluating a compiled expression. Aborts the current
/// top-level `evaluate` call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("Cannot compare different types")]
    TypeMismatch,

    #[error("Logical operators require boolean operands")]
    NonBooleanOperand,

    #[error("Function '{name}' error: {message}")]
    Function { name: String, message: String },

    #[error("{0}")]
    Message(String),
}

impl EvalError {
    pub fn function(name: &str, message: impl Into<String>) -> Self {
        Self::Function {
            name: name.to_string(),
            message: message.into(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// Any failure surfaced by the top-level API.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}
