//! Parse errors with source positions and caret rendering
//!
//! Every parse error keeps the originating expression text so the Display
//! impl can point a caret at the offending character.

use crate::lexical::LexerError;
use crate::utils::{Position, Span};
use std::fmt;

pub type ParseResult<T> = Result<T, ParseError>;

/// What went wrong, without the positional envelope.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("Empty expression")]
    EmptyExpression,

    #[error(transparent)]
    Lexical(#[from] LexerError),

    #[error("Unexpected {found}")]
    UnexpectedToken { found: String },

    #[error("Expected {expected}, found {found}")]
    Expected { expected: String, found: String },

    #[error("Unexpected {found} at end of expression")]
    TrailingInput { found: String },

    #[error("Expected a type name after '{operator}'")]
    ExpectedTypeName { operator: String },

    #[error("Expected an identifier after '.', found {found}")]
    ExpectedProperty { found: String },

    #[error("'(' is only valid after a function name")]
    InvalidCallTarget,

    #[error("Maximum expression nesting depth exceeded")]
    MaxNestingDepth,

    #[error("Invalid number literal '{text}'")]
    InvalidNumber { text: String },
}

/// A parse failure: kind, position, and the full expression for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Option<Span>,
    pub expression: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Option<Span>, expression: &str) -> Self {
        Self {
            kind,
            span,
            expression: expression.to_string(),
        }
    }

    pub fn lexical(error: LexerError, expression: &str) -> Self {
        let position = error.position();
        Self {
            kind: ParseErrorKind::Lexical(error),
            span: Some(Span::new(position, position)),
            expression: expression.to_string(),
        }
    }

    /// The offending position, when known.
    pub fn position(&self) -> Option<Position> {
        self.span.map(|s| s.start)
    }

    /// Render the offending line with a caret underneath.
    fn render_caret(&self, f: &mut fmt::Formatter<'_>, position: Position) -> fmt::Result {
        let line_text = self
            .expression
            .lines()
            .nth(position.line.saturating_sub(1) as usize)
            .unwrap_or("");
        writeln!(f)?;
        writeln!(f, "  {}", line_text)?;
        write!(f, "  {}^", " ".repeat(position.column.saturating_sub(1) as usize))
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position() {
            Some(position) => {
                write!(
                    f,
                    "{} at line {}, column {}",
                    self.kind, position.line, position.column
                )?;
                self.render_caret(f, position)
            }
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ParseErrorKind::Lexical(e) => Some(e),
            _ => None,
        }
    }
}
