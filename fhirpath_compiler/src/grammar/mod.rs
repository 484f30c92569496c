//! Grammar-level definitions: the keyword set and the expression tree

pub mod ast;
pub mod keywords;

pub use ast::{BinaryOp, Expr, ExprKind, LiteralValue, UnaryOp};
pub use keywords::Keyword;
