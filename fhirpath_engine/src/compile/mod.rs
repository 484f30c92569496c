//! Compilation: expression tree to executable tree
//!
//! Each parsed variant compiles to a `CompiledNode` carrying its resolved
//! strategy: literals become ready-made values, identifier nodes learn
//! whether they act as resource-type filters, and calls are bound to their
//! builtin (with arity checked here) or left for the context's custom
//! function map. A compiled tree captures no data and may be evaluated
//! against any number of documents, shared across contexts.

pub mod error;

use crate::functions::{self, Builtin};
use crate::model::{is_resource_type, number_value, Value};
use error::CompileError;
use fhirpath_compiler::{BinaryOp, Expr, ExprKind, LiteralValue, UnaryOp};
use serde_json::json;

/// The executable image of an expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledNode {
    /// A ready singleton value
    Literal(Value),
    /// The `{}` literal: always the empty sequence
    Empty,
    Identifier {
        name: String,
        /// Set when the name is a known root resource type
        type_filter: bool,
    },
    Variable(String),
    EnvVariable(String),
    Dot {
        left: Box<CompiledNode>,
        right: Box<CompiledNode>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<CompiledNode>,
    },
    Binary {
        op: BinaryOp,
        left: Box<CompiledNode>,
        right: Box<CompiledNode>,
    },
    Indexer {
        collection: Box<CompiledNode>,
        index: Box<CompiledNode>,
    },
    As {
        expr: Box<CompiledNode>,
        type_name: String,
    },
    Is {
        expr: Box<CompiledNode>,
        type_name: String,
    },
    /// A call bound to a builtin implementation
    Call {
        builtin: Builtin,
        name: String,
        args: Vec<CompiledNode>,
    },
    /// A call resolved at evaluation time from the context's function map
    CustomCall {
        name: String,
        args: Vec<CompiledNode>,
    },
}

/// Compile a parsed expression. Pure in the data; deterministic for a given
/// tree.
pub fn compile(expr: &Expr) -> Result<CompiledNode, CompileError> {
    let node = match &expr.kind {
        ExprKind::Literal(literal) => CompiledNode::Literal(literal_value(literal)),
        ExprKind::Null => CompiledNode::Empty,
        ExprKind::Identifier(name) => CompiledNode::Identifier {
            name: name.clone(),
            type_filter: is_resource_type(name),
        },
        ExprKind::Variable(name) => CompiledNode::Variable(name.clone()),
        ExprKind::EnvVariable(name) => CompiledNode::EnvVariable(name.clone()),
        ExprKind::Binary { op, left, right } => CompiledNode::Binary {
            op: *op,
            left: Box::new(compile(left)?),
            right: Box::new(compile(right)?),
        },
        ExprKind::Unary { op, operand } => CompiledNode::Unary {
            op: *op,
            operand: Box::new(compile(operand)?),
        },
        ExprKind::Dot { left, right } => CompiledNode::Dot {
            left: Box::new(compile(left)?),
            right: Box::new(compile(right)?),
        },
        ExprKind::Indexer { collection, index } => CompiledNode::Indexer {
            collection: Box::new(compile(collection)?),
            index: Box::new(compile(index)?),
        },
        ExprKind::Function { name, args } => {
            let compiled_args = args
                .iter()
                .map(compile)
                .collect::<Result<Vec<_>, _>>()?;
            match functions::lookup(name) {
                Some((builtin, signature)) => {
                    if !signature.accepts(compiled_args.len()) {
                        return Err(CompileError::WrongArity {
                            name: name.clone(),
                            expected: signature.expected(),
                            found: compiled_args.len(),
                        });
                    }
                    CompiledNode::Call {
                        builtin,
                        name: name.clone(),
                        args: compiled_args,
                    }
                }
                None => CompiledNode::CustomCall {
                    name: name.clone(),
                    args: compiled_args,
                },
            }
        }
        ExprKind::As { expr, type_name } => CompiledNode::As {
            expr: Box::new(compile(expr)?),
            type_name: type_name.clone(),
        },
        ExprKind::Is { expr, type_name } => CompiledNode::Is {
            expr: Box::new(compile(expr)?),
            type_name: type_name.clone(),
        },
    };
    Ok(node)
}

fn literal_value(literal: &LiteralValue) -> Value {
    match literal {
        LiteralValue::String(s) => Value::String(s.clone()),
        LiteralValue::Number(n) => number_value(*n),
        LiteralValue::LongNumber(n) => Value::from(*n),
        LiteralValue::Boolean(b) => Value::Bool(*b),
        LiteralValue::Date(s) | LiteralValue::Time(s) | LiteralValue::DateTime(s) => {
            Value::String(s.clone())
        }
        LiteralValue::Quantity { value, unit } => json!({
            "value": number_value(*value),
            "unit": unit,
        }),
    }
}
