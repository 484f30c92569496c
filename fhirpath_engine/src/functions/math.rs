//! Numeric aggregates and math built-ins

use crate::compile::CompiledNode;
use crate::context::EvaluationContext;
use crate::error::EvalError;
use crate::functions::arg_integer;
use crate::model::{as_number, number_value, temporal, Sequence, Value};
use std::cmp::Ordering;

fn numeric(name: &str, v: &Value) -> Result<f64, EvalError> {
    as_number(v).ok_or_else(|| EvalError::function(name, "requires numeric input"))
}

/// `sum()` is total over the focus; zero on empty.
pub fn sum(name: &str, focus: &[Value]) -> Result<Sequence, EvalError> {
    let mut total = 0.0;
    for item in focus {
        total += numeric(name, item)?;
    }
    Ok(vec![number_value(total)])
}

pub fn avg(name: &str, focus: &[Value]) -> Result<Sequence, EvalError> {
    if focus.is_empty() {
        return Ok(vec![]);
    }
    let mut total = 0.0;
    for item in focus {
        total += numeric(name, item)?;
    }
    Ok(vec![number_value(total / focus.len() as f64)])
}

/// Ordering used by min/max: numbers numerically, temporal strings by
/// temporal order, other strings lexicographically. Mixed types fail.
fn extremum_cmp(name: &str, a: &Value, b: &Value) -> Result<Ordering, EvalError> {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x
            .partial_cmp(&y)
            .ok_or_else(|| EvalError::function(name, "values are not comparable"));
    }
    if let (Value::String(x), Value::String(y)) = (a, b) {
        if temporal::is_temporal(x) && temporal::is_temporal(y) {
            if let Some(ord) = temporal::compare(x, y) {
                return Ok(ord);
            }
        }
        return Ok(x.cmp(y));
    }
    Err(EvalError::function(name, "values are not comparable"))
}

pub fn min(name: &str, focus: &[Value]) -> Result<Sequence, EvalError> {
    extremum(name, focus, Ordering::Less)
}

pub fn max(name: &str, focus: &[Value]) -> Result<Sequence, EvalError> {
    extremum(name, focus, Ordering::Greater)
}

fn extremum(name: &str, focus: &[Value], keep: Ordering) -> Result<Sequence, EvalError> {
    let mut best: Option<&Value> = None;
    for item in focus {
        best = Some(match best {
            None => item,
            Some(current) => {
                if extremum_cmp(name, item, current)? == keep {
                    item
                } else {
                    current
                }
            }
        });
    }
    Ok(best.cloned().into_iter().collect())
}

/// Element-wise numeric mapping used by abs/ceiling/floor/truncate.
pub fn map_numeric(
    name: &str,
    focus: &[Value],
    f: impl Fn(f64) -> f64,
) -> Result<Sequence, EvalError> {
    let mut out = Vec::with_capacity(focus.len());
    for item in focus {
        out.push(number_value(f(numeric(name, item)?)));
    }
    Ok(out)
}

pub fn round(
    name: &str,
    args: &[CompiledNode],
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let precision = match args.first() {
        Some(arg) => arg_integer(name, arg, focus, root, ctx)?.max(0),
        None => 0,
    };
    let factor = 10f64.powi(precision as i32);
    map_numeric(name, focus, |n| (n * factor).round() / factor)
}

/// A single negative input raises; over a collection, failing elements are
/// skipped instead.
pub fn sqrt(name: &str, focus: &[Value]) -> Result<Sequence, EvalError> {
    if let [v] = focus {
        let n = numeric(name, v)?;
        if n < 0.0 {
            return Err(EvalError::function(name, "square root of a negative number"));
        }
        return Ok(vec![number_value(n.sqrt())]);
    }
    let mut out = Vec::new();
    for item in focus {
        if let Some(n) = as_number(item) {
            if n >= 0.0 {
                out.push(number_value(n.sqrt()));
            }
        }
    }
    Ok(out)
}

/// Function-form integer division: unlike the `div` operator, dividing by
/// zero raises.
pub fn div_fn(
    name: &str,
    divisor: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let [v] = focus else {
        return Ok(vec![]);
    };
    let x = numeric(name, v)?;
    let y = arg_integer(name, divisor, focus, root, ctx)? as f64;
    if y == 0.0 {
        return Err(EvalError::function(name, "division by zero"));
    }
    Ok(vec![number_value((x / y).floor())])
}

pub fn mod_fn(
    name: &str,
    divisor: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let [v] = focus else {
        return Ok(vec![]);
    };
    let x = numeric(name, v)?;
    let y = arg_integer(name, divisor, focus, root, ctx)? as f64;
    if y == 0.0 {
        return Err(EvalError::function(name, "division by zero"));
    }
    Ok(vec![number_value(x % y)])
}
