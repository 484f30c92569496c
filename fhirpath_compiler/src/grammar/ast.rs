//! Expression tree produced by the parser
//!
//! Nodes form a strict tree: children are owned uniquely by their parent.
//! Every node carries a source span, and a parent's span always covers the
//! union of its children's spans (`name.start` through `close-paren.end` for
//! calls, `left.start` through `right.end` for binary and dot nodes).

use crate::utils::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Literal payloads. Temporal literals keep their text form (`@` stripped,
/// the `T` prefix retained for times); quantities are split into magnitude
/// and unit at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    String(String),
    Number(f64),
    LongNumber(i64),
    Boolean(bool),
    Date(String),
    Time(String),
    DateTime(String),
    Quantity { value: f64, unit: String },
}

/// Binary operators, in source spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    IntDivide,
    Modulo,
    Concat,
    Equals,
    NotEquals,
    Equivalent,
    NotEquivalent,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    And,
    Or,
    Xor,
    Implies,
    Union,
    In,
    Contains,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::IntDivide => "div",
            Self::Modulo => "mod",
            Self::Concat => "&",
            Self::Equals => "=",
            Self::NotEquals => "!=",
            Self::Equivalent => "~",
            Self::NotEquivalent => "!~",
            Self::LessThan => "<",
            Self::GreaterThan => ">",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThanOrEqual => ">=",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Implies => "implies",
            Self::Union => "|",
            Self::In => "in",
            Self::Contains => "contains",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Not => "not",
        }
    }
}

/// The tagged expression variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(LiteralValue),
    /// The `{}` null literal
    Null,
    Identifier(String),
    /// `$name` with the `$` stripped
    Variable(String),
    /// `%name` with the `%` stripped; quoted forms keep their delimiters
    EnvVariable(String),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Dot {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Indexer {
        collection: Box<Expr>,
        index: Box<Expr>,
    },
    Function {
        name: String,
        args: Vec<Expr>,
    },
    As {
        expr: Box<Expr>,
        type_name: String,
    },
    Is {
        expr: Box<Expr>,
        type_name: String,
    },
}

/// A spanned expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// A binary node spanning `(left.start, right.end)`.
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        let span = left.span.to(right.span);
        Self::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    /// A dot node spanning `(left.start, right.end)`.
    pub fn dot(left: Expr, right: Expr) -> Self {
        let span = left.span.to(right.span);
        Self::new(
            ExprKind::Dot {
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    pub fn unary(op: UnaryOp, operator_span: Span, operand: Expr) -> Self {
        let span = operator_span.to(operand.span);
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        )
    }

    /// An indexer spanning the collection through the closing bracket.
    pub fn indexer(collection: Expr, index: Expr, close: Span) -> Self {
        let span = collection.span.to(close);
        Self::new(
            ExprKind::Indexer {
                collection: Box::new(collection),
                index: Box::new(index),
            },
            span,
        )
    }

    /// A call spanning the name through the closing parenthesis.
    pub fn function(name: String, name_span: Span, args: Vec<Expr>, close: Span) -> Self {
        Self::new(ExprKind::Function { name, args }, name_span.to(close))
    }

    pub fn type_cast(expr: Expr, type_name: String, type_span: Span) -> Self {
        let span = expr.span.to(type_span);
        Self::new(
            ExprKind::As {
                expr: Box::new(expr),
                type_name,
            },
            span,
        )
    }

    pub fn type_test(expr: Expr, type_name: String, type_span: Span) -> Self {
        let span = expr.span.to(type_span);
        Self::new(
            ExprKind::Is {
                expr: Box::new(expr),
                type_name,
            },
            span,
        )
    }

    /// Walk direct children, used by span-invariant checks.
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Literal(_)
            | ExprKind::Null
            | ExprKind::Identifier(_)
            | ExprKind::Variable(_)
            | ExprKind::EnvVariable(_) => Vec::new(),
            ExprKind::Binary { left, right, .. } | ExprKind::Dot { left, right } => {
                vec![left, right]
            }
            ExprKind::Unary { operand, .. } => vec![operand],
            ExprKind::Indexer { collection, index } => vec![collection, index],
            ExprKind::Function { args, .. } => args.iter().collect(),
            ExprKind::As { expr, .. } | ExprKind::Is { expr, .. } => vec![expr],
        }
    }
}
