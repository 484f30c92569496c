//! FHIRPath front end: tokenizer and parser
//!
//! Turns expression text into a spanned, tagged expression tree. The
//! `fhirpath_engine` crate compiles that tree into an executable form and
//! evaluates it against JSON documents.

// Internal modules
pub mod grammar;
pub mod lexical;
pub mod syntax;
pub mod tokens;
pub mod utils;

// Re-export key types for library consumers
pub use grammar::ast::{BinaryOp, Expr, ExprKind, LiteralValue, UnaryOp};
pub use grammar::keywords::Keyword;
pub use lexical::{LexerError, Tokenizer};
pub use syntax::error::{ParseError, ParseErrorKind};
pub use syntax::parser::parse;
pub use utils::{Position, Span};
