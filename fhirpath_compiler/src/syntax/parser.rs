//! Precedence-climbing parser
//!
//! A Pratt parser over the tokenizer: one token of lookahead held in
//! `current`, a prefix rule per token kind, and a binding-power table driving
//! the infix/postfix loop. Postfix operators (dot, indexer, call, `as`) bind
//! tighter than any binary operator; `is` sits at inequality precedence. All
//! binary operators at one level are left-associative.

use crate::grammar::ast::{BinaryOp, Expr, ExprKind, LiteralValue, UnaryOp};
use crate::grammar::keywords::Keyword;
use crate::lexical::Tokenizer;
use crate::syntax::error::{ParseError, ParseErrorKind, ParseResult};
use crate::tokens::{Token, TokenKind};
use crate::utils::Span;

/// Recursion bound for nested expressions; exceeding it is a parse error,
/// not a stack overflow.
const MAX_PARSE_DEPTH: usize = 256;

// Binding powers, low to high.
const BP_IMPLIES: u8 = 1;
const BP_OR: u8 = 2;
const BP_AND: u8 = 3;
const BP_EQUALITY: u8 = 4;
const BP_INEQUALITY: u8 = 5;
const BP_UNION: u8 = 6;
const BP_ADDITIVE: u8 = 7;
const BP_MULTIPLICATIVE: u8 = 8;
const BP_UNARY: u8 = 9;

/// Parse expression text into a spanned tree.
pub fn parse(text: &str) -> ParseResult<Expr> {
    log::debug!("parsing expression ({} bytes)", text.len());
    Parser::new(text)?.parse_root()
}

struct Parser<'a> {
    tokenizer: Tokenizer<'a>,
    current: Token<'a>,
    input: &'a str,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> ParseResult<Self> {
        let mut tokenizer = Tokenizer::new(input);
        let current = tokenizer
            .next_token()
            .map_err(|e| ParseError::lexical(e, input))?;
        Ok(Self {
            tokenizer,
            current,
            input,
            depth: 0,
        })
    }

    fn parse_root(mut self) -> ParseResult<Expr> {
        if self.current.is_eof() {
            return Err(self.error(ParseErrorKind::EmptyExpression, None));
        }
        let expr = self.parse_expression(0)?;
        if !self.current.is_eof() {
            let found = format!("'{}'", self.current);
            return Err(self.error(
                ParseErrorKind::TrailingInput { found },
                Some(self.current.span),
            ));
        }
        Ok(expr)
    }

    // === token plumbing ===

    fn error(&self, kind: ParseErrorKind, span: Option<Span>) -> ParseError {
        ParseError::new(kind, span, self.input)
    }

    /// Consume the current token and pull the next one from the tokenizer.
    fn advance(&mut self) -> ParseResult<Token<'a>> {
        let next = self
            .tokenizer
            .next_token()
            .map_err(|e| ParseError::lexical(e, self.input))?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token<'a>> {
        if self.current.kind == kind {
            self.advance()
        } else {
            let found = format!("'{}'", self.current);
            Err(self.error(
                ParseErrorKind::Expected {
                    expected: expected.to_string(),
                    found,
                },
                Some(self.current.span),
            ))
        }
    }

    // === expression parsing ===

    fn parse_expression(&mut self, min_bp: u8) -> ParseResult<Expr> {
        if self.depth >= MAX_PARSE_DEPTH {
            return Err(self.error(
                ParseErrorKind::MaxNestingDepth,
                Some(self.current.span),
            ));
        }
        self.depth += 1;
        let result = self.parse_expression_at(min_bp);
        self.depth -= 1;
        result
    }

    fn parse_expression_at(&mut self, min_bp: u8) -> ParseResult<Expr> {
        let mut left = self.parse_prefix()?;

        loop {
            match self.current.kind {
                // Postfix operators always apply.
                TokenKind::Dot => {
                    self.advance()?;
                    let right = self.parse_invocation()?;
                    left = Expr::dot(left, right);
                }
                TokenKind::LeftBracket => {
                    self.advance()?;
                    let index = self.parse_expression(0)?;
                    let close = self.expect(TokenKind::RightBracket, "']'")?;
                    left = Expr::indexer(left, index, close.span);
                }
                TokenKind::LeftParen => {
                    // Calls are tied to names: `(` after anything but an
                    // identifier is a grammar error.
                    let (name, name_span) = match &left.kind {
                        ExprKind::Identifier(name) => (name.clone(), left.span),
                        _ => {
                            return Err(self.error(
                                ParseErrorKind::InvalidCallTarget,
                                Some(self.current.span),
                            ))
                        }
                    };
                    left = self.parse_call(name, name_span)?;
                }
                TokenKind::Keyword(Keyword::As) => {
                    self.advance()?;
                    let (type_name, type_span) = self.parse_type_name("as")?;
                    left = Expr::type_cast(left, type_name, type_span);
                }
                TokenKind::Keyword(Keyword::Is) if BP_INEQUALITY >= min_bp => {
                    self.advance()?;
                    let (type_name, type_span) = self.parse_type_name("is")?;
                    left = Expr::type_test(left, type_name, type_span);
                }
                _ => {
                    let Some((op, bp)) = infix_binding(self.current.kind) else {
                        break;
                    };
                    if bp < min_bp {
                        break;
                    }
                    self.advance()?;
                    let right = self.parse_expression(bp + 1)?;
                    left = Expr::binary(op, left, right);
                }
            }
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        match self.current.kind {
            TokenKind::Number => {
                let tok = self.advance()?;
                let value = self.parse_f64(&tok)?;
                Ok(Expr::new(
                    ExprKind::Literal(LiteralValue::Number(value)),
                    tok.span,
                ))
            }
            TokenKind::LongNumber => {
                let tok = self.advance()?;
                let digits = tok.value.trim_end_matches(['L', 'l']);
                let value = digits.parse::<i64>().map_err(|_| {
                    self.error(
                        ParseErrorKind::InvalidNumber {
                            text: tok.value.to_string(),
                        },
                        Some(tok.span),
                    )
                })?;
                Ok(Expr::new(
                    ExprKind::Literal(LiteralValue::LongNumber(value)),
                    tok.span,
                ))
            }
            TokenKind::String => {
                let tok = self.advance()?;
                Ok(Expr::new(
                    ExprKind::Literal(LiteralValue::String(tok.value.into_owned())),
                    tok.span,
                ))
            }
            TokenKind::Date => {
                let tok = self.advance()?;
                Ok(Expr::new(
                    ExprKind::Literal(LiteralValue::Date(tok.value.into_owned())),
                    tok.span,
                ))
            }
            TokenKind::Time => {
                let tok = self.advance()?;
                Ok(Expr::new(
                    ExprKind::Literal(LiteralValue::Time(tok.value.into_owned())),
                    tok.span,
                ))
            }
            TokenKind::DateTime => {
                let tok = self.advance()?;
                Ok(Expr::new(
                    ExprKind::Literal(LiteralValue::DateTime(tok.value.into_owned())),
                    tok.span,
                ))
            }
            TokenKind::Quantity => {
                let tok = self.advance()?;
                let value = self.parse_f64(&tok)?;
                let unit = tok.unit.map(|u| u.into_owned()).unwrap_or_default();
                Ok(Expr::new(
                    ExprKind::Literal(LiteralValue::Quantity { value, unit }),
                    tok.span,
                ))
            }
            TokenKind::Keyword(Keyword::True) => {
                let tok = self.advance()?;
                Ok(Expr::new(
                    ExprKind::Literal(LiteralValue::Boolean(true)),
                    tok.span,
                ))
            }
            TokenKind::Keyword(Keyword::False) => {
                let tok = self.advance()?;
                Ok(Expr::new(
                    ExprKind::Literal(LiteralValue::Boolean(false)),
                    tok.span,
                ))
            }
            TokenKind::Identifier => {
                let tok = self.advance()?;
                Ok(Expr::new(
                    ExprKind::Identifier(tok.value.into_owned()),
                    tok.span,
                ))
            }
            TokenKind::Keyword(Keyword::Not) => {
                // `not(...)` is a call on the focus; a bare `not` is the
                // prefix operator.
                let tok = self.advance()?;
                if self.current.kind == TokenKind::LeftParen {
                    return Ok(Expr::new(ExprKind::Identifier("not".into()), tok.span));
                }
                let operand = self.parse_expression(BP_UNARY)?;
                Ok(Expr::unary(UnaryOp::Not, tok.span, operand))
            }
            TokenKind::Keyword(kw) if kw.is_function_name() => {
                // A function-name keyword in expression position acts as an
                // identifier so `where(...)` can start a path.
                let tok = self.advance()?;
                Ok(Expr::new(
                    ExprKind::Identifier(kw.as_str().to_string()),
                    tok.span,
                ))
            }
            TokenKind::Plus => {
                let tok = self.advance()?;
                let operand = self.parse_expression(BP_UNARY)?;
                Ok(Expr::unary(UnaryOp::Plus, tok.span, operand))
            }
            TokenKind::Minus => {
                let tok = self.advance()?;
                let operand = self.parse_expression(BP_UNARY)?;
                Ok(Expr::unary(UnaryOp::Minus, tok.span, operand))
            }
            TokenKind::LeftParen => {
                let open = self.advance()?;
                let mut inner = self.parse_expression(0)?;
                let close = self.expect(TokenKind::RightParen, "')'")?;
                inner.span = open.span.to(close.span);
                Ok(inner)
            }
            TokenKind::LeftBrace => {
                let open = self.advance()?;
                let close = self.expect(TokenKind::RightBrace, "'}'")?;
                Ok(Expr::new(ExprKind::Null, open.span.to(close.span)))
            }
            TokenKind::Variable => {
                let tok = self.advance()?;
                Ok(Expr::new(
                    ExprKind::Variable(tok.value.into_owned()),
                    tok.span,
                ))
            }
            TokenKind::Total => {
                let tok = self.advance()?;
                Ok(Expr::new(ExprKind::Variable("total".into()), tok.span))
            }
            TokenKind::EnvVariable => {
                let tok = self.advance()?;
                Ok(Expr::new(
                    ExprKind::EnvVariable(tok.value.into_owned()),
                    tok.span,
                ))
            }
            _ => {
                let found = format!("'{}'", self.current);
                Err(self.error(
                    ParseErrorKind::UnexpectedToken { found },
                    Some(self.current.span),
                ))
            }
        }
    }

    /// What may follow a dot: an identifier, a function-name keyword
    /// (optionally called), one of the keywords usable as property names, or
    /// an environment variable (`defineVariable('x', e).%x`).
    fn parse_invocation(&mut self) -> ParseResult<Expr> {
        match self.current.kind {
            TokenKind::Identifier => {
                let tok = self.advance()?;
                let name = tok.value.into_owned();
                if self.current.kind == TokenKind::LeftParen {
                    self.parse_call(name, tok.span)
                } else {
                    Ok(Expr::new(ExprKind::Identifier(name), tok.span))
                }
            }
            TokenKind::Keyword(kw) if kw.is_function_name() => {
                let tok = self.advance()?;
                let name = kw.as_str().to_string();
                if self.current.kind == TokenKind::LeftParen {
                    self.parse_call(name, tok.span)
                } else {
                    Ok(Expr::new(ExprKind::Identifier(name), tok.span))
                }
            }
            TokenKind::Keyword(kw) if kw.is_property_name() => {
                let tok = self.advance()?;
                Ok(Expr::new(
                    ExprKind::Identifier(kw.as_str().to_string()),
                    tok.span,
                ))
            }
            TokenKind::EnvVariable => {
                let tok = self.advance()?;
                Ok(Expr::new(
                    ExprKind::EnvVariable(tok.value.into_owned()),
                    tok.span,
                ))
            }
            _ => {
                let found = format!("'{}'", self.current);
                Err(self.error(
                    ParseErrorKind::ExpectedProperty { found },
                    Some(self.current.span),
                ))
            }
        }
    }

    /// Parse `(args...)`; the opening paren is the current token.
    fn parse_call(&mut self, name: String, name_span: Span) -> ParseResult<Expr> {
        self.advance()?; // (
        let mut args = Vec::new();
        if self.current.kind != TokenKind::RightParen {
            loop {
                args.push(self.parse_expression(0)?);
                if self.current.kind == TokenKind::Comma {
                    self.advance()?;
                } else {
                    break;
                }
            }
        }
        let close = self.expect(TokenKind::RightParen, "')'")?;
        Ok(Expr::function(name, name_span, args, close.span))
    }

    /// Parse a qualified type name (`Patient`, `FHIR.Patient`). Dots are
    /// consumed into the name only when bounded lookahead shows an
    /// identifier after them, so `x as Patient.first()` still navigates.
    fn parse_type_name(&mut self, operator: &str) -> ParseResult<(String, Span)> {
        if self.current.kind != TokenKind::Identifier {
            return Err(self.error(
                ParseErrorKind::ExpectedTypeName {
                    operator: operator.to_string(),
                },
                Some(self.current.span),
            ));
        }
        let tok = self.advance()?;
        let mut name = tok.value.into_owned();
        let mut span = tok.span;

        while self.current.kind == TokenKind::Dot {
            let state = self.tokenizer.save_state();
            let after_dot = self
                .tokenizer
                .next_token()
                .map_err(|e| ParseError::lexical(e, self.input))?;
            if after_dot.kind != TokenKind::Identifier {
                self.tokenizer.restore_state(state);
                break;
            }
            let following = self
                .tokenizer
                .next_token()
                .map_err(|e| ParseError::lexical(e, self.input))?;
            if following.kind == TokenKind::LeftParen {
                // In `x as Quantity.first()` the dot starts a call chain,
                // not a qualified segment.
                self.tokenizer.restore_state(state);
                break;
            }
            name.push('.');
            name.push_str(&after_dot.value);
            span = span.to(after_dot.span);
            self.current = following;
        }

        Ok((name, span))
    }

    fn parse_f64(&self, tok: &Token<'a>) -> ParseResult<f64> {
        tok.value.parse::<f64>().map_err(|_| {
            self.error(
                ParseErrorKind::InvalidNumber {
                    text: tok.value.to_string(),
                },
                Some(tok.span),
            )
        })
    }
}

fn infix_binding(kind: TokenKind) -> Option<(BinaryOp, u8)> {
    let binding = match kind {
        TokenKind::Keyword(Keyword::Implies) => (BinaryOp::Implies, BP_IMPLIES),
        TokenKind::Keyword(Keyword::Or) => (BinaryOp::Or, BP_OR),
        TokenKind::Keyword(Keyword::Xor) => (BinaryOp::Xor, BP_OR),
        TokenKind::Keyword(Keyword::And) => (BinaryOp::And, BP_AND),
        TokenKind::Equals => (BinaryOp::Equals, BP_EQUALITY),
        TokenKind::NotEquals => (BinaryOp::NotEquals, BP_EQUALITY),
        TokenKind::Equivalent => (BinaryOp::Equivalent, BP_EQUALITY),
        TokenKind::NotEquivalent => (BinaryOp::NotEquivalent, BP_EQUALITY),
        TokenKind::Keyword(Keyword::In) => (BinaryOp::In, BP_EQUALITY),
        TokenKind::Keyword(Keyword::Contains) => (BinaryOp::Contains, BP_EQUALITY),
        TokenKind::LessThan => (BinaryOp::LessThan, BP_INEQUALITY),
        TokenKind::GreaterThan => (BinaryOp::GreaterThan, BP_INEQUALITY),
        TokenKind::LessThanOrEqual => (BinaryOp::LessThanOrEqual, BP_INEQUALITY),
        TokenKind::GreaterThanOrEqual => (BinaryOp::GreaterThanOrEqual, BP_INEQUALITY),
        TokenKind::Pipe => (BinaryOp::Union, BP_UNION),
        TokenKind::Plus => (BinaryOp::Add, BP_ADDITIVE),
        TokenKind::Minus => (BinaryOp::Subtract, BP_ADDITIVE),
        TokenKind::Ampersand => (BinaryOp::Concat, BP_ADDITIVE),
        TokenKind::Star => (BinaryOp::Multiply, BP_MULTIPLICATIVE),
        TokenKind::Slash => (BinaryOp::Divide, BP_MULTIPLICATIVE),
        TokenKind::Keyword(Keyword::Div) => (BinaryOp::IntDivide, BP_MULTIPLICATIVE),
        TokenKind::Keyword(Keyword::Mod) => (BinaryOp::Modulo, BP_MULTIPLICATIVE),
        _ => return None,
    };
    Some(binding)
}
