//! Collection built-ins: filtering, projection, subsetting, set operations

use crate::compile::CompiledNode;
use crate::context::EvaluationContext;
use crate::error::EvalError;
use crate::eval::eval_for_element;
use crate::functions::{arg_integer, eval_arg};
use crate::model::{canonical_key, dedup_values, Sequence, Value};
use std::collections::HashSet;

fn is_true(seq: &[Value]) -> bool {
    matches!(seq, [Value::Bool(true)])
}

/// Keep the elements whose predicate evaluates to `[true]`.
pub fn where_fn(
    predicate: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let mut out = Vec::new();
    for (i, item) in focus.iter().enumerate() {
        if is_true(&eval_for_element(predicate, item, i, root, ctx)?) {
            out.push(item.clone());
        }
    }
    Ok(out)
}

/// Flat-map the projection over the focus, preserving outer-then-inner order.
pub fn select(
    projection: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let mut out = Vec::new();
    for (i, item) in focus.iter().enumerate() {
        out.extend(eval_for_element(projection, item, i, root, ctx)?);
    }
    Ok(out)
}

pub fn exists(
    args: &[CompiledNode],
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    match args {
        [] => Ok(vec![Value::Bool(!focus.is_empty())]),
        _ => any(&args[0], focus, root, ctx),
    }
}

/// `[true]` on empty input, else every element must satisfy the predicate.
pub fn all(
    predicate: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    for (i, item) in focus.iter().enumerate() {
        if !is_true(&eval_for_element(predicate, item, i, root, ctx)?) {
            return Ok(vec![Value::Bool(false)]);
        }
    }
    Ok(vec![Value::Bool(true)])
}

/// `[false]` on empty input, else some element must satisfy the predicate.
pub fn any(
    predicate: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    for (i, item) in focus.iter().enumerate() {
        if is_true(&eval_for_element(predicate, item, i, root, ctx)?) {
            return Ok(vec![Value::Bool(true)]);
        }
    }
    Ok(vec![Value::Bool(false)])
}

pub fn skip(
    name: &str,
    count: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let n = arg_integer(name, count, focus, root, ctx)?.max(0) as usize;
    Ok(focus.iter().skip(n).cloned().collect())
}

pub fn take(
    name: &str,
    count: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let n = arg_integer(name, count, focus, root, ctx)?.max(0) as usize;
    Ok(focus.iter().take(n).cloned().collect())
}

pub fn is_distinct(focus: &[Value]) -> Result<Sequence, EvalError> {
    let mut seen = HashSet::new();
    let distinct = focus.iter().all(|v| seen.insert(canonical_key(v)));
    Ok(vec![Value::Bool(distinct)])
}

/// Exactly zero or one element; more is an error.
pub fn single(name: &str, focus: &[Value]) -> Result<Sequence, EvalError> {
    match focus {
        [] => Ok(vec![]),
        [v] => Ok(vec![v.clone()]),
        _ => Err(EvalError::function(
            name,
            "expects a collection with at most one element",
        )),
    }
}

/// Concatenation without deduplication.
pub fn combine(
    other: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let mut out = focus.to_vec();
    out.extend(eval_arg(other, focus, root, ctx)?);
    Ok(out)
}

/// Elements present in both sides, deduplicated, left order preserved.
pub fn intersect(
    other: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let right: HashSet<String> = eval_arg(other, focus, root, ctx)?
        .iter()
        .map(canonical_key)
        .collect();
    let kept: Vec<Value> = focus
        .iter()
        .filter(|v| right.contains(&canonical_key(v)))
        .cloned()
        .collect();
    Ok(dedup_values(kept))
}

/// Elements not present in the argument; duplicates survive.
pub fn exclude(
    other: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let right: HashSet<String> = eval_arg(other, focus, root, ctx)?
        .iter()
        .map(canonical_key)
        .collect();
    Ok(focus
        .iter()
        .filter(|v| !right.contains(&canonical_key(v)))
        .cloned()
        .collect())
}

/// Transitive closure of the projection: apply it to the focus, then to each
/// new result, until nothing new appears. Structural dedup bounds the loop.
pub fn repeat(
    projection: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut current = focus.to_vec();

    while !current.is_empty() {
        let mut next = Vec::new();
        for (i, item) in current.iter().enumerate() {
            for produced in eval_for_element(projection, item, i, root, ctx)? {
                if seen.insert(canonical_key(&produced)) {
                    next.push(produced);
                }
            }
        }
        out.extend(next.iter().cloned());
        current = next;
    }
    Ok(out)
}

/// Immediate children: object field values (arrays spread) and array
/// elements.
pub fn children_of(focus: &[Value]) -> Sequence {
    let mut out = Vec::new();
    for item in focus {
        match item {
            Value::Object(map) => {
                for value in map.values() {
                    match value {
                        Value::Array(elements) => out.extend(elements.iter().cloned()),
                        Value::Null => {}
                        other => out.push(other.clone()),
                    }
                }
            }
            Value::Array(elements) => out.extend(elements.iter().cloned()),
            _ => {}
        }
    }
    out
}

/// Breadth-first closure of `children_of`.
pub fn descendants(focus: &[Value]) -> Sequence {
    let mut out = Vec::new();
    let mut level = children_of(focus);
    while !level.is_empty() {
        out.extend(level.iter().cloned());
        level = children_of(&level);
    }
    out
}
