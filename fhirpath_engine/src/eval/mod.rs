//! Tree-walking evaluator and the top-level evaluation driver
//!
//! Every node evaluates against `(focus, root, ctx)` and produces an ordered
//! sequence. The root document rides along unchanged through dots and
//! predicates so identifier navigation can fall back to it and `%resource`
//! can reach it.

pub mod operators;

use crate::compile::{compile, CompiledNode};
use crate::context::EvaluationContext;
use crate::error::{EngineError, EvalError};
use crate::functions;
use crate::model::{Sequence, Value};
use std::rc::Rc;

impl CompiledNode {
    /// Evaluate this node. Left-to-right, depth-first, run-to-completion.
    pub fn eval(
        &self,
        focus: &[Value],
        root: &Value,
        ctx: &mut EvaluationContext,
    ) -> Result<Sequence, EvalError> {
        match self {
            CompiledNode::Literal(value) => Ok(vec![value.clone()]),
            CompiledNode::Empty => Ok(vec![]),

            CompiledNode::Identifier { name, type_filter } => {
                Ok(eval_identifier(name, *type_filter, focus, root))
            }

            CompiledNode::Dot { left, right } => {
                let narrowed = left.eval(focus, root, ctx)?;
                right.eval(&narrowed, root, ctx)
            }

            CompiledNode::Unary { op, operand } => {
                let values = operand.eval(focus, root, ctx)?;
                operators::eval_unary(*op, &values)
            }

            CompiledNode::Binary { op, left, right } => {
                operators::eval_binary(*op, left, right, focus, root, ctx)
            }

            CompiledNode::Indexer { collection, index } => {
                eval_indexer(collection, index, focus, root, ctx)
            }

            // `as` is an identity coercion; narrowing is left to callers.
            CompiledNode::As { expr, .. } => expr.eval(focus, root, ctx),

            // `is` reports whether the expression produced anything.
            CompiledNode::Is { expr, .. } => {
                let values = expr.eval(focus, root, ctx)?;
                Ok(vec![Value::Bool(!values.is_empty())])
            }

            CompiledNode::Variable(name) => Ok(eval_variable(name, focus, ctx)),
            CompiledNode::EnvVariable(name) => Ok(eval_env_variable(name, focus, root, ctx)),

            CompiledNode::Call {
                builtin,
                name,
                args,
            } => functions::dispatch(*builtin, name, args, focus, root, ctx),

            CompiledNode::CustomCall { name, args } => {
                eval_custom_call(name, args, focus, root, ctx)
            }
        }
    }
}

/// Flat-map property access over a sequence: arrays spread, scalars wrap,
/// missing keys and explicit nulls contribute nothing.
fn navigate(name: &str, items: &[Value]) -> Sequence {
    let mut out = Vec::new();
    for item in items {
        if let Value::Object(map) = item {
            match map.get(name) {
                Some(Value::Array(elements)) => out.extend(elements.iter().cloned()),
                Some(Value::Null) | None => {}
                Some(value) => out.push(value.clone()),
            }
        }
    }
    out
}

fn eval_identifier(name: &str, type_filter: bool, focus: &[Value], root: &Value) -> Sequence {
    // Root type names filter a single-object focus by its resourceType.
    if type_filter && focus.len() == 1 {
        if let Value::Object(map) = &focus[0] {
            return if map.get("resourceType").and_then(Value::as_str) == Some(name) {
                focus.to_vec()
            } else {
                vec![]
            };
        }
    }

    let out = navigate(name, focus);
    if out.is_empty() && focus.len() == 1 && focus[0].is_object() {
        // Expressions nested in combinators may reach back to the root when
        // the current item has nothing under this name.
        return navigate(name, std::slice::from_ref(root));
    }
    out
}

fn eval_indexer(
    collection: &CompiledNode,
    index: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let items = collection.eval(focus, root, ctx)?;

    let index_values = index.eval(focus, root, ctx)?;
    if index_values.len() == 1 {
        if let Some(i) = crate::model::as_integer(&index_values[0]) {
            if i >= 0 && (i as usize) < items.len() {
                return Ok(vec![items[i as usize].clone()]);
            }
            return Ok(vec![]);
        }
    }

    // Anything but a single integer turns the bracket into a filter over the
    // indexed sequence.
    let mut out = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let kept = eval_for_element(index, item, i, root, ctx)?;
        if matches!(kept.as_slice(), [Value::Bool(true)]) {
            out.push(item.clone());
        }
    }
    Ok(out)
}

/// Evaluate a node against one element as focus, threading `$index`.
pub(crate) fn eval_for_element(
    node: &CompiledNode,
    item: &Value,
    index: usize,
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let saved = ctx.set_index(Some(index as i64));
    let result = node.eval(std::slice::from_ref(item), root, ctx);
    ctx.set_index(saved);
    result
}

fn spread(value: &Value) -> Sequence {
    match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn eval_variable(name: &str, focus: &[Value], ctx: &EvaluationContext) -> Sequence {
    match name {
        "this" => focus.to_vec(),
        "index" => ctx.index().map(Value::from).into_iter().collect(),
        "total" => ctx.total().cloned().unwrap_or_default(),
        _ => ctx.variable(name).map(spread).unwrap_or_default(),
    }
}

fn eval_env_variable(
    name: &str,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Sequence {
    // Quoted external constants keep their delimiters in the compiled name.
    let lookup_name = name
        .strip_prefix(['\'', '"'])
        .and_then(|n| n.strip_suffix(['\'', '"']))
        .unwrap_or(name);

    match lookup_name {
        "resource" => vec![root.clone()],
        "context" => focus.to_vec(),
        "now" => vec![ctx.now_value()],
        _ => {
            if let Some(defined) = ctx.defined(lookup_name) {
                return defined.clone();
            }
            ctx.variable(lookup_name).map(spread).unwrap_or_default()
        }
    }
}

fn eval_custom_call(
    name: &str,
    args: &[CompiledNode],
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    if let Some(function) = ctx.custom_function(name) {
        let mut evaluated = Vec::with_capacity(args.len());
        for arg in args {
            evaluated.push(arg.eval(focus, root, ctx)?);
        }
        return function(focus, &evaluated)
            .map_err(|message| EvalError::function(name, message));
    }

    // Documented quirk: an unknown function warns and passes the focus
    // through unchanged.
    log::warn!("unknown function '{name}', returning input unchanged");
    Ok(focus.to_vec())
}

// === evaluation driver ===

/// Evaluate `expression` against `data`, using (and populating) the
/// context's compiled-expression cache. An array becomes the focus as-is
/// with its first element as the root document; anything else is both the
/// single-element focus and the root.
pub fn evaluate(
    ctx: &mut EvaluationContext,
    expression: &str,
    data: &Value,
) -> Result<Sequence, EngineError> {
    ctx.begin_evaluation();
    let compiled = compiled_for(ctx, expression)?;

    let (focus, root) = match data {
        Value::Array(items) => (
            items.clone(),
            items.first().cloned().unwrap_or(Value::Null),
        ),
        other => (vec![other.clone()], other.clone()),
    };

    Ok(compiled.eval(&focus, &root, ctx)?)
}

/// Parse and compile ahead of time, seeding the cache.
pub fn precompile<S: AsRef<str>>(
    ctx: &mut EvaluationContext,
    expressions: &[S],
) -> Result<(), EngineError> {
    for expression in expressions {
        compiled_for(ctx, expression.as_ref())?;
    }
    Ok(())
}

fn compiled_for(
    ctx: &mut EvaluationContext,
    expression: &str,
) -> Result<Rc<CompiledNode>, EngineError> {
    if let Some(compiled) = ctx.cache_get(expression) {
        return Ok(compiled);
    }
    let ast = fhirpath_compiler::parse(expression)?;
    let compiled = Rc::new(compile(&ast)?);
    ctx.cache_put(expression, compiled.clone());
    Ok(compiled)
}
