//! Tokenizer with bounded lookahead and backtracking
//!
//! The scanner walks the input byte-by-byte, keeping a line/column counter in
//! step with the byte offset. Quantity literals (`4 days`, `5 'mg'`) need
//! lookahead past the number: the scanner saves its state, peeks at the next
//! lexeme, and backtracks when the continuation is not a unit. The parser
//! uses the same save/restore mechanism for its own bounded peeking.

use crate::grammar::keywords::Keyword;
use crate::tokens::{Token, TokenKind};
use crate::utils::{Position, Span};
use std::borrow::Cow;

/// Units that promote `NUMBER unit` to a quantity literal.
const TEMPORAL_UNITS: &[&str] = &[
    "year",
    "years",
    "month",
    "months",
    "week",
    "weeks",
    "day",
    "days",
    "hour",
    "hours",
    "minute",
    "minutes",
    "second",
    "seconds",
    "millisecond",
    "milliseconds",
];

/// Lexical errors, each carrying the byte offset, line, and column of the
/// offending position.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexerError {
    #[error("Unexpected character '{character}' at line {line}, column {column}")]
    UnexpectedCharacter {
        character: char,
        offset: usize,
        line: u32,
        column: u32,
    },

    #[error("Unterminated string literal at line {line}, column {column}")]
    UnterminatedString { offset: usize, line: u32, column: u32 },

    #[error("Unterminated quoted identifier at line {line}, column {column}")]
    UnterminatedIdentifier { offset: usize, line: u32, column: u32 },

    #[error("Unterminated comment at line {line}, column {column}")]
    UnterminatedComment { offset: usize, line: u32, column: u32 },

    #[error("Unterminated quoted external constant at line {line}, column {column}")]
    UnterminatedExternalConstant { offset: usize, line: u32, column: u32 },

    #[error("Incomplete Unicode escape at line {line}, column {column}")]
    IncompleteUnicodeEscape { offset: usize, line: u32, column: u32 },

    #[error("Invalid hex digit in Unicode escape at line {line}, column {column}")]
    InvalidHexDigit { offset: usize, line: u32, column: u32 },

    #[error("Invalid escape sequence '\\{character}' at line {line}, column {column}")]
    InvalidEscapeSequence {
        character: char,
        offset: usize,
        line: u32,
        column: u32,
    },

    #[error("Strings must be delimited with single quotes at line {line}, column {column}")]
    DoubleQuotedString { offset: usize, line: u32, column: u32 },
}

impl LexerError {
    /// The offending position for caret rendering.
    pub fn position(&self) -> Position {
        match *self {
            Self::UnexpectedCharacter {
                offset, line, column, ..
            }
            | Self::UnterminatedString { offset, line, column }
            | Self::UnterminatedIdentifier { offset, line, column }
            | Self::UnterminatedComment { offset, line, column }
            | Self::UnterminatedExternalConstant { offset, line, column }
            | Self::IncompleteUnicodeEscape { offset, line, column }
            | Self::InvalidHexDigit { offset, line, column }
            | Self::InvalidEscapeSequence {
                offset, line, column, ..
            }
            | Self::DoubleQuotedString { offset, line, column } => {
                Position::new(offset, line, column)
            }
        }
    }
}

/// A scanner checkpoint for bounded lookahead.
#[derive(Debug, Clone, Copy)]
pub struct TokenizerState {
    pos: usize,
    line: u32,
    column: u32,
}

/// The expression scanner.
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Restart the scanner on new input.
    pub fn reset(&mut self, input: &'a str) {
        self.input = input;
        self.pos = 0;
        self.line = 1;
        self.column = 1;
    }

    pub fn save_state(&self) -> TokenizerState {
        TokenizerState {
            pos: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    pub fn restore_state(&mut self, state: TokenizerState) {
        self.pos = state.pos;
        self.line = state.line;
        self.column = state.column;
    }

    pub fn position(&self) -> Position {
        Position::new(self.pos, self.line, self.column)
    }

    // === low-level cursor ===

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + offset).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Advance over `n` bytes known to be ASCII and not newlines.
    fn bump(&mut self, n: usize) {
        self.pos += n;
        self.column += n as u32;
    }

    fn bump_char(&mut self, ch: char) {
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    fn unexpected(&self, ch: char) -> LexerError {
        LexerError::UnexpectedCharacter {
            character: ch,
            offset: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    // === trivia ===

    /// Skip whitespace and comments. Whitespace classification is a single
    /// byte compare per character.
    fn skip_trivia(&mut self) -> Result<(), LexerError> {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') => self.bump(1),
                Some(b'\n') => {
                    self.pos += 1;
                    self.line += 1;
                    self.column = 1;
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    self.bump(2);
                    while let Some(ch) = self.peek_char() {
                        if ch == '\n' {
                            break;
                        }
                        self.bump_char(ch);
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.position();
                    self.bump(2);
                    let mut closed = false;
                    while let Some(ch) = self.peek_char() {
                        if ch == '*' && self.peek_at(1) == Some(b'/') {
                            self.bump(2);
                            closed = true;
                            break;
                        }
                        self.bump_char(ch);
                    }
                    if !closed {
                        return Err(LexerError::UnterminatedComment {
                            offset: start.offset,
                            line: start.line,
                            column: start.column,
                        });
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    // === public scanning entry ===

    pub fn next_token(&mut self) -> Result<Token<'a>, LexerError> {
        self.skip_trivia()?;

        let start = self.position();
        let b = match self.peek() {
            Some(b) => b,
            None => {
                return Ok(Token::new(
                    TokenKind::Eof,
                    Cow::Borrowed(""),
                    Span::new(start, start),
                ))
            }
        };

        match b {
            b'(' => Ok(self.punct(TokenKind::LeftParen, "(", start)),
            b')' => Ok(self.punct(TokenKind::RightParen, ")", start)),
            b'[' => Ok(self.punct(TokenKind::LeftBracket, "[", start)),
            b']' => Ok(self.punct(TokenKind::RightBracket, "]", start)),
            b'{' => Ok(self.punct(TokenKind::LeftBrace, "{", start)),
            b'}' => Ok(self.punct(TokenKind::RightBrace, "}", start)),
            b',' => Ok(self.punct(TokenKind::Comma, ",", start)),
            b'.' => Ok(self.punct(TokenKind::Dot, ".", start)),
            b'|' => Ok(self.punct(TokenKind::Pipe, "|", start)),
            b'+' => Ok(self.punct(TokenKind::Plus, "+", start)),
            b'-' => Ok(self.punct(TokenKind::Minus, "-", start)),
            b'*' => Ok(self.punct(TokenKind::Star, "*", start)),
            b'/' => Ok(self.punct(TokenKind::Slash, "/", start)),
            b'&' => Ok(self.punct(TokenKind::Ampersand, "&", start)),
            b'=' => Ok(self.punct(TokenKind::Equals, "=", start)),
            b'~' => Ok(self.punct(TokenKind::Equivalent, "~", start)),
            b'<' => {
                if self.peek_at(1) == Some(b'=') {
                    Ok(self.punct2(TokenKind::LessThanOrEqual, "<=", start))
                } else {
                    Ok(self.punct(TokenKind::LessThan, "<", start))
                }
            }
            b'>' => {
                if self.peek_at(1) == Some(b'=') {
                    Ok(self.punct2(TokenKind::GreaterThanOrEqual, ">=", start))
                } else {
                    Ok(self.punct(TokenKind::GreaterThan, ">", start))
                }
            }
            b'!' => match self.peek_at(1) {
                Some(b'=') => Ok(self.punct2(TokenKind::NotEquals, "!=", start)),
                Some(b'~') => Ok(self.punct2(TokenKind::NotEquivalent, "!~", start)),
                _ => Err(self.unexpected('!')),
            },
            b'\'' => self.scan_string(start),
            b'"' => Err(LexerError::DoubleQuotedString {
                offset: start.offset,
                line: start.line,
                column: start.column,
            }),
            b'`' => self.scan_delimited_identifier(start),
            b'@' => Ok(self.scan_temporal(start)),
            b'$' => self.scan_variable(start),
            b'%' => self.scan_env_variable(start),
            b'0'..=b'9' => self.scan_number(start),
            b'A'..=b'Z' | b'a'..=b'z' | b'_' => Ok(self.scan_word(start)),
            _ => {
                let ch = self.peek_char().unwrap_or('\u{FFFD}');
                Err(self.unexpected(ch))
            }
        }
    }

    fn punct(&mut self, kind: TokenKind, text: &'static str, start: Position) -> Token<'a> {
        self.bump(1);
        Token::new(kind, Cow::Borrowed(text), Span::new(start, self.position()))
    }

    fn punct2(&mut self, kind: TokenKind, text: &'static str, start: Position) -> Token<'a> {
        self.bump(2);
        Token::new(kind, Cow::Borrowed(text), Span::new(start, self.position()))
    }

    // === identifiers and keywords ===

    fn scan_identifier_text(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.bump(1);
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    fn scan_word(&mut self, start: Position) -> Token<'a> {
        let word = self.scan_identifier_text();
        let span = Span::new(start, self.position());

        // `div.total` navigates a property named div; only a bare `div` is
        // the division operator.
        if word == "div" && self.peek() == Some(b'.') {
            return Token::new(TokenKind::Identifier, Cow::Borrowed(word), span);
        }

        match Keyword::from_str(word) {
            Some(kw) => Token::new(TokenKind::Keyword(kw), Cow::Borrowed(word), span),
            None => Token::new(TokenKind::Identifier, Cow::Borrowed(word), span),
        }
    }

    fn scan_variable(&mut self, start: Position) -> Result<Token<'a>, LexerError> {
        self.bump(1); // $
        if !matches!(self.peek(), Some(b) if b.is_ascii_alphabetic() || b == b'_') {
            let ch = self.peek_char().unwrap_or('$');
            return Err(self.unexpected(ch));
        }
        let name = self.scan_identifier_text();
        let span = Span::new(start, self.position());
        let kind = if name == "total" {
            TokenKind::Total
        } else {
            TokenKind::Variable
        };
        Ok(Token::new(kind, Cow::Borrowed(name), span))
    }

    fn scan_env_variable(&mut self, start: Position) -> Result<Token<'a>, LexerError> {
        self.bump(1); // %
        match self.peek() {
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => {
                let name = self.scan_identifier_text();
                let span = Span::new(start, self.position());
                Ok(Token::new(TokenKind::EnvVariable, Cow::Borrowed(name), span))
            }
            Some(q @ (b'\'' | b'"')) => {
                // Quoted external constants keep their delimiters and raw
                // escape sequences; nothing is decoded.
                let name_start = self.pos;
                self.bump(1);
                loop {
                    match self.peek_char() {
                        Some(ch) if ch as u32 == q as u32 => {
                            self.bump(1);
                            break;
                        }
                        Some('\\') => {
                            self.bump(1);
                            if let Some(ch) = self.peek_char() {
                                self.bump_char(ch);
                            }
                        }
                        Some(ch) => self.bump_char(ch),
                        None => {
                            return Err(LexerError::UnterminatedExternalConstant {
                                offset: start.offset,
                                line: start.line,
                                column: start.column,
                            })
                        }
                    }
                }
                let span = Span::new(start, self.position());
                Ok(Token::new(
                    TokenKind::EnvVariable,
                    Cow::Borrowed(&self.input[name_start..self.pos]),
                    span,
                ))
            }
            _ => {
                let ch = self.peek_char().unwrap_or('%');
                Err(self.unexpected(ch))
            }
        }
    }

    // === numbers and quantities ===

    fn scan_number(&mut self, start: Position) -> Result<Token<'a>, LexerError> {
        let num_start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.bump(1);
        }

        let mut is_decimal = false;
        // `5.toString()` must stay number + dot: only consume the dot when a
        // digit follows.
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            is_decimal = true;
            self.bump(1);
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.bump(1);
            }
        }

        if !is_decimal && matches!(self.peek(), Some(b'L') | Some(b'l')) {
            self.bump(1);
            let span = Span::new(start, self.position());
            return Ok(Token::new(
                TokenKind::LongNumber,
                Cow::Borrowed(&self.input[num_start..self.pos]),
                span,
            ));
        }

        let number_text = &self.input[num_start..self.pos];
        let number_end = self.position();

        // Bounded lookahead for a unit: whitespace plus either a quoted unit
        // or a temporal-unit word promotes to a quantity; anything else
        // backtracks to the end of the number.
        let checkpoint = self.save_state();
        let mut saw_space = false;
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.bump(1);
            saw_space = true;
        }
        if saw_space {
            match self.peek() {
                Some(b'\'') => {
                    let unit_start = self.position();
                    if let Ok(unit_token) = self.scan_string(unit_start) {
                        let span = Span::new(start, self.position());
                        return Ok(Token::quantity(
                            Cow::Borrowed(number_text),
                            unit_token.value,
                            span,
                        ));
                    }
                }
                Some(b) if b.is_ascii_alphabetic() => {
                    let word_state = self.save_state();
                    let word = self.scan_identifier_text();
                    if TEMPORAL_UNITS.contains(&word) {
                        let span = Span::new(start, self.position());
                        return Ok(Token::quantity(
                            Cow::Borrowed(number_text),
                            Cow::Borrowed(word),
                            span,
                        ));
                    }
                    self.restore_state(word_state);
                }
                _ => {}
            }
        }
        self.restore_state(checkpoint);

        Ok(Token::new(
            TokenKind::Number,
            Cow::Borrowed(number_text),
            Span::new(start, number_end),
        ))
    }

    // === temporal literals ===

    fn scan_temporal(&mut self, start: Position) -> Token<'a> {
        self.bump(1); // @
        let value_start = self.pos;

        if self.peek() == Some(b'T') {
            self.bump(1);
            loop {
                match self.peek() {
                    Some(b'0'..=b'9') | Some(b':') => self.bump(1),
                    // A dot only continues the literal when digits follow
                    // (`@T12:00.type()` must leave the dot for the parser).
                    Some(b'.') if matches!(self.peek_at(1), Some(b'0'..=b'9')) => self.bump(1),
                    _ => break,
                }
            }
            let span = Span::new(start, self.position());
            return Token::new(
                TokenKind::Time,
                Cow::Borrowed(&self.input[value_start..self.pos]),
                span,
            );
        }

        let mut saw_time_marker = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' | b'-' | b'Z' => self.bump(1),
                // Fractional seconds and offsets continue only into digits,
                // so `@2023-01-01.type()` keeps its dot.
                b'.' | b'+' if matches!(self.peek_at(1), Some(b'0'..=b'9')) => self.bump(1),
                b':' | b'T' => {
                    saw_time_marker = true;
                    self.bump(1);
                }
                _ => break,
            }
        }

        let value = &self.input[value_start..self.pos];
        let span = Span::new(start, self.position());
        if value.is_empty() {
            return Token::new(TokenKind::At, Cow::Borrowed("@"), span);
        }
        let kind = if saw_time_marker {
            TokenKind::DateTime
        } else {
            TokenKind::Date
        };
        Token::new(kind, Cow::Borrowed(value), span)
    }

    // === strings and delimited identifiers ===

    /// Decode a `\uXXXX` escape. The leading `\u` is already consumed.
    fn scan_unicode_escape(&mut self, escape_start: Position) -> Result<char, LexerError> {
        let mut code: u32 = 0;
        for _ in 0..4 {
            let b = match self.peek() {
                Some(b) => b,
                None => {
                    return Err(LexerError::IncompleteUnicodeEscape {
                        offset: escape_start.offset,
                        line: escape_start.line,
                        column: escape_start.column,
                    })
                }
            };
            let digit = match b {
                b'0'..=b'9' => (b - b'0') as u32,
                b'a'..=b'f' => (b - b'a') as u32 + 10,
                b'A'..=b'F' => (b - b'A') as u32 + 10,
                _ => {
                    return Err(LexerError::InvalidHexDigit {
                        offset: self.pos,
                        line: self.line,
                        column: self.column,
                    })
                }
            };
            code = code * 16 + digit;
            self.bump(1);
        }
        Ok(char::from_u32(code).unwrap_or('\u{FFFD}'))
    }

    /// Scan a single-quoted string literal. The decoded value borrows from
    /// the input until the first escape forces an owned buffer; there is no
    /// per-character fragment allocation.
    fn scan_string(&mut self, start: Position) -> Result<Token<'a>, LexerError> {
        self.bump(1); // opening quote
        let content_start = self.pos;
        let mut decoded: Option<String> = None;

        loop {
            let ch = match self.peek_char() {
                Some(ch) => ch,
                None => {
                    return Err(LexerError::UnterminatedString {
                        offset: start.offset,
                        line: start.line,
                        column: start.column,
                    })
                }
            };
            match ch {
                '\'' => {
                    // A doubled quote is an escaped apostrophe.
                    if self.peek_at(1) == Some(b'\'') {
                        let buf = decoded
                            .get_or_insert_with(|| self.input[content_start..self.pos].to_string());
                        buf.push('\'');
                        self.bump(2);
                    } else {
                        let value = match decoded {
                            Some(buf) => Cow::Owned(buf),
                            None => Cow::Borrowed(&self.input[content_start..self.pos]),
                        };
                        self.bump(1); // closing quote
                        let span = Span::new(start, self.position());
                        return Ok(Token::new(TokenKind::String, value, span));
                    }
                }
                '\\' => {
                    let escape_start = self.position();
                    let buf = decoded
                        .get_or_insert_with(|| self.input[content_start..self.pos].to_string());
                    self.bump(1);
                    let esc = match self.peek_char() {
                        Some(esc) => esc,
                        None => {
                            return Err(LexerError::UnterminatedString {
                                offset: start.offset,
                                line: start.line,
                                column: start.column,
                            })
                        }
                    };
                    match esc {
                        '\'' | '"' | '`' | '\\' | '/' => {
                            buf.push(esc);
                            self.bump_char(esc);
                        }
                        'n' => {
                            buf.push('\n');
                            self.bump(1);
                        }
                        'r' => {
                            buf.push('\r');
                            self.bump(1);
                        }
                        't' => {
                            buf.push('\t');
                            self.bump(1);
                        }
                        'f' => {
                            buf.push('\u{000C}');
                            self.bump(1);
                        }
                        'u' => {
                            self.bump(1);
                            buf.push(self.scan_unicode_escape(escape_start)?);
                        }
                        other => {
                            return Err(LexerError::InvalidEscapeSequence {
                                character: other,
                                offset: escape_start.offset,
                                line: escape_start.line,
                                column: escape_start.column,
                            })
                        }
                    }
                }
                _ => {
                    if let Some(buf) = decoded.as_mut() {
                        buf.push(ch);
                    }
                    self.bump_char(ch);
                }
            }
        }
    }

    /// Scan a backtick-delimited identifier. Unknown escapes are kept
    /// literally rather than rejected.
    fn scan_delimited_identifier(&mut self, start: Position) -> Result<Token<'a>, LexerError> {
        self.bump(1); // opening backtick
        let content_start = self.pos;
        let mut decoded: Option<String> = None;

        loop {
            let ch = match self.peek_char() {
                Some(ch) => ch,
                None => {
                    return Err(LexerError::UnterminatedIdentifier {
                        offset: start.offset,
                        line: start.line,
                        column: start.column,
                    })
                }
            };
            match ch {
                '`' => {
                    let value = match decoded {
                        Some(buf) => Cow::Owned(buf),
                        None => Cow::Borrowed(&self.input[content_start..self.pos]),
                    };
                    self.bump(1);
                    let span = Span::new(start, self.position());
                    return Ok(Token::new(TokenKind::Identifier, value, span));
                }
                '\\' => {
                    let escape_start = self.position();
                    let buf = decoded
                        .get_or_insert_with(|| self.input[content_start..self.pos].to_string());
                    self.bump(1);
                    let esc = match self.peek_char() {
                        Some(esc) => esc,
                        None => {
                            return Err(LexerError::UnterminatedIdentifier {
                                offset: start.offset,
                                line: start.line,
                                column: start.column,
                            })
                        }
                    };
                    match esc {
                        '`' | '\\' | '/' => {
                            buf.push(esc);
                            self.bump_char(esc);
                        }
                        'n' => {
                            buf.push('\n');
                            self.bump(1);
                        }
                        'r' => {
                            buf.push('\r');
                            self.bump(1);
                        }
                        't' => {
                            buf.push('\t');
                            self.bump(1);
                        }
                        'f' => {
                            buf.push('\u{000C}');
                            self.bump(1);
                        }
                        'u' => {
                            self.bump(1);
                            buf.push(self.scan_unicode_escape(escape_start)?);
                        }
                        other => {
                            buf.push('\\');
                            buf.push(other);
                            self.bump_char(other);
                        }
                    }
                }
                _ => {
                    if let Some(buf) = decoded.as_mut() {
                        buf.push(ch);
                    }
                    self.bump_char(ch);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut tz = Tokenizer::new(input);
        let mut out = Vec::new();
        loop {
            let t = tz.next_token().unwrap();
            if t.is_eof() {
                break;
            }
            out.push(t.kind);
        }
        out
    }

    fn first(input: &str) -> Token<'_> {
        Tokenizer::new(input).next_token().unwrap()
    }

    #[test]
    fn scans_identifiers_and_keywords() {
        let toks = kinds("name and Patient");
        assert_eq!(
            toks,
            vec![
                TokenKind::Identifier,
                TokenKind::Keyword(Keyword::And),
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn div_before_dot_is_identifier() {
        let toks = kinds("div.text");
        assert_eq!(toks[0], TokenKind::Identifier);
        let toks = kinds("8 div 2");
        assert_eq!(toks[1], TokenKind::Keyword(Keyword::Div));
    }

    #[test]
    fn number_dot_method_stays_number() {
        let mut tz = Tokenizer::new("5.toString()");
        let n = tz.next_token().unwrap();
        assert_eq!(n.kind, TokenKind::Number);
        assert_eq!(n.value, "5");
        assert_eq!(tz.next_token().unwrap().kind, TokenKind::Dot);
    }

    #[test]
    fn decimal_and_long_numbers() {
        let t = first("3.14");
        assert_eq!(t.kind, TokenKind::Number);
        assert_eq!(t.value, "3.14");
        let t = first("42L");
        assert_eq!(t.kind, TokenKind::LongNumber);
        assert_eq!(t.value, "42L");
    }

    #[test]
    fn quantity_with_temporal_unit() {
        let t = first("4 days");
        assert_eq!(t.kind, TokenKind::Quantity);
        assert_eq!(t.value, "4");
        assert_eq!(t.unit.as_deref(), Some("days"));
    }

    #[test]
    fn quantity_with_quoted_unit() {
        let t = first("5.5 'mg'");
        assert_eq!(t.kind, TokenKind::Quantity);
        assert_eq!(t.value, "5.5");
        assert_eq!(t.unit.as_deref(), Some("mg"));
    }

    #[test]
    fn number_followed_by_operator_backtracks() {
        let toks = kinds("2 + 3");
        assert_eq!(
            toks,
            vec![TokenKind::Number, TokenKind::Plus, TokenKind::Number]
        );
        // `5 foo` is a number then an identifier, not a quantity.
        let toks = kinds("5 foo");
        assert_eq!(toks, vec![TokenKind::Number, TokenKind::Identifier]);
    }

    #[test]
    fn temporal_literals() {
        let t = first("@2023-05-01");
        assert_eq!(t.kind, TokenKind::Date);
        assert_eq!(t.value, "2023-05-01");

        let t = first("@2023-05-01T14:30:00Z");
        assert_eq!(t.kind, TokenKind::DateTime);
        assert_eq!(t.value, "2023-05-01T14:30:00Z");

        let t = first("@T14:30");
        assert_eq!(t.kind, TokenKind::Time);
        assert_eq!(t.value, "T14:30");

        let t = first("@2023");
        assert_eq!(t.kind, TokenKind::Date);
    }

    #[test]
    fn string_without_escapes_borrows() {
        let t = first("'official'");
        assert_eq!(t.kind, TokenKind::String);
        assert_matches!(t.value, Cow::Borrowed("official"));
    }

    #[test]
    fn string_escapes_decode() {
        let t = first(r"'a\nb\tA'");
        assert_eq!(t.value, "a\nb\tA");
        let t = first("'it''s'");
        assert_eq!(t.value, "it's");
    }

    #[test]
    fn string_error_cases() {
        let mut tz = Tokenizer::new("'open");
        assert_matches!(
            tz.next_token(),
            Err(LexerError::UnterminatedString { offset: 0, .. })
        );

        let mut tz = Tokenizer::new(r"'bad\q'");
        assert_matches!(
            tz.next_token(),
            Err(LexerError::InvalidEscapeSequence { character: 'q', .. })
        );

        let mut tz = Tokenizer::new(r"'\u00'");
        assert_matches!(tz.next_token(), Err(LexerError::InvalidHexDigit { .. }));

        let mut tz = Tokenizer::new("\"double\"");
        assert_matches!(tz.next_token(), Err(LexerError::DoubleQuotedString { .. }));
    }

    #[test]
    fn delimited_identifier_decodes_and_keeps_unknown_escapes() {
        let t = first("`odd name`");
        assert_eq!(t.kind, TokenKind::Identifier);
        assert_eq!(t.value, "odd name");

        let t = first(r"`a\qb`");
        assert_eq!(t.value, r"a\qb");

        let mut tz = Tokenizer::new("`open");
        assert_matches!(
            tz.next_token(),
            Err(LexerError::UnterminatedIdentifier { .. })
        );
    }

    #[test]
    fn delimited_identifier_is_never_a_keyword() {
        let t = first("`div`");
        assert_eq!(t.kind, TokenKind::Identifier);
        assert_eq!(t.value, "div");
    }

    #[test]
    fn variables() {
        let t = first("$this");
        assert_eq!(t.kind, TokenKind::Variable);
        assert_eq!(t.value, "this");

        let t = first("$total");
        assert_eq!(t.kind, TokenKind::Total);

        let t = first("%resource");
        assert_eq!(t.kind, TokenKind::EnvVariable);
        assert_eq!(t.value, "resource");
    }

    #[test]
    fn quoted_external_constant_keeps_delimiters() {
        let t = first("%'us-zip'");
        assert_eq!(t.kind, TokenKind::EnvVariable);
        assert_eq!(t.value, "'us-zip'");

        let t = first(r#"%"vs\n""#);
        assert_eq!(t.value, r#""vs\n""#);

        let mut tz = Tokenizer::new("%'open");
        assert_matches!(
            tz.next_token(),
            Err(LexerError::UnterminatedExternalConstant { .. })
        );
    }

    #[test]
    fn comments_are_trivia() {
        let toks = kinds("a // rest of line\n.b");
        assert_eq!(
            toks,
            vec![TokenKind::Identifier, TokenKind::Dot, TokenKind::Identifier]
        );
        let toks = kinds("a /* span\nlines */ .b");
        assert_eq!(
            toks,
            vec![TokenKind::Identifier, TokenKind::Dot, TokenKind::Identifier]
        );

        let mut tz = Tokenizer::new("a /* open");
        tz.next_token().unwrap();
        assert_matches!(tz.next_token(), Err(LexerError::UnterminatedComment { .. }));
    }

    #[test]
    fn line_and_column_tracking() {
        let mut tz = Tokenizer::new("a\n  b");
        tz.next_token().unwrap();
        let t = tz.next_token().unwrap();
        assert_eq!(t.span.start.line, 2);
        assert_eq!(t.span.start.column, 3);
        assert_eq!(t.span.start.offset, 4);
    }

    #[test]
    fn save_restore_roundtrip() {
        let mut tz = Tokenizer::new("a.b");
        tz.next_token().unwrap();
        let state = tz.save_state();
        assert_eq!(tz.next_token().unwrap().kind, TokenKind::Dot);
        tz.restore_state(state);
        assert_eq!(tz.next_token().unwrap().kind, TokenKind::Dot);
    }

    #[test]
    fn operator_tokens() {
        let toks = kinds("a <= b != c !~ d & e");
        assert_eq!(
            toks,
            vec![
                TokenKind::Identifier,
                TokenKind::LessThanOrEqual,
                TokenKind::Identifier,
                TokenKind::NotEquals,
                TokenKind::Identifier,
                TokenKind::NotEquivalent,
                TokenKind::Identifier,
                TokenKind::Ampersand,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn unexpected_character_reports_position() {
        let mut tz = Tokenizer::new("a ^ b");
        tz.next_token().unwrap();
        let err = tz.next_token().unwrap_err();
        assert_matches!(
            err,
            LexerError::UnexpectedCharacter {
                character: '^',
                offset: 2,
                line: 1,
                column: 3,
            }
        );
    }

    #[test]
    fn token_slice_matches_source() {
        // Parse–stringify law: for punctuation and identifiers the span
        // slices back to the token text.
        let input = "name.given[0] | other";
        let mut tz = Tokenizer::new(input);
        loop {
            let t = tz.next_token().unwrap();
            if t.is_eof() {
                break;
            }
            if matches!(t.kind, TokenKind::Identifier | TokenKind::Number)
                || t.kind.describe().starts_with('\'')
            {
                assert_eq!(t.span.slice(input), t.value);
            }
        }
    }
}
