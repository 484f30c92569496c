//! Conversions, type inspection, and utility built-ins

use crate::compile::CompiledNode;
use crate::context::EvaluationContext;
use crate::error::EvalError;
use crate::eval::operators::singleton_bool;
use crate::functions::{arg_string, eval_arg};
use crate::model::{
    as_integer, as_number, display_value, is_quantity, number_value, temporal, type_name,
    Sequence, Value,
};
use serde_json::json;

fn singleton<'a>(name: &str, focus: &'a [Value]) -> Result<Option<&'a Value>, EvalError> {
    match focus {
        [] => Ok(None),
        [v] => Ok(Some(v)),
        _ => Err(EvalError::function(name, "requires a singleton input")),
    }
}

pub fn to_string(name: &str, focus: &[Value]) -> Result<Sequence, EvalError> {
    Ok(match singleton(name, focus)? {
        Some(v) => display_value(v).map(Value::String).into_iter().collect(),
        None => vec![],
    })
}

pub fn to_integer(name: &str, focus: &[Value]) -> Result<Sequence, EvalError> {
    let Some(v) = singleton(name, focus)? else {
        return Ok(vec![]);
    };
    Ok(match v {
        Value::Number(_) => as_integer(v).map(Value::from).into_iter().collect(),
        Value::String(s) => s.trim().parse::<i64>().map(Value::from).into_iter().collect(),
        Value::Bool(b) => vec![Value::from(*b as i64)],
        _ => vec![],
    })
}

pub fn to_decimal(name: &str, focus: &[Value]) -> Result<Sequence, EvalError> {
    let Some(v) = singleton(name, focus)? else {
        return Ok(vec![]);
    };
    Ok(match v {
        Value::Number(_) => as_number(v).map(number_value).into_iter().collect(),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(number_value)
            .into_iter()
            .collect(),
        Value::Bool(b) => vec![number_value(if *b { 1.0 } else { 0.0 })],
        _ => vec![],
    })
}

/// Validates that a string is a date or datetime; passes the text through.
pub fn to_date_time(name: &str, focus: &[Value]) -> Result<Sequence, EvalError> {
    let Some(v) = singleton(name, focus)? else {
        return Ok(vec![]);
    };
    Ok(match v {
        Value::String(s) => match temporal::parse_temporal(s) {
            Some(t) if t.kind != temporal::TemporalKind::Time => {
                vec![Value::String(t.text.to_string())]
            }
            _ => vec![],
        },
        _ => vec![],
    })
}

pub fn not_fn(focus: &[Value]) -> Result<Sequence, EvalError> {
    match focus {
        [] => Ok(vec![]),
        [Value::Bool(b)] => Ok(vec![Value::Bool(!b)]),
        _ => Err(EvalError::NonBooleanOperand),
    }
}

/// `iif(condition, then, else)`: a single-boolean condition selects the one
/// branch that gets evaluated.
pub fn iif(
    args: &[CompiledNode],
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let condition = singleton_bool(&eval_arg(&args[0], focus, root, ctx)?)?;
    let branch = if condition == Some(true) {
        &args[1]
    } else {
        &args[2]
    };
    eval_arg(branch, focus, root, ctx)
}

/// Each element classified as `{name: …}`.
pub fn type_fn(focus: &[Value]) -> Sequence {
    focus
        .iter()
        .map(|v| json!({ "name": type_name(v) }))
        .collect()
}

/// Quantities yield their magnitude; everything else passes through.
pub fn value_fn(focus: &[Value]) -> Sequence {
    focus
        .iter()
        .map(|v| {
            if is_quantity(v) {
                v.get("value").cloned().unwrap_or(Value::Null)
            } else {
                v.clone()
            }
        })
        .collect()
}

pub fn has_value(focus: &[Value]) -> Sequence {
    let scalar = matches!(
        focus,
        [v] if !v.is_object() && !v.is_array() && !v.is_null()
    );
    vec![Value::Bool(scalar)]
}

/// Log the focus (or a projection of it) at info level and pass it through.
pub fn trace(
    name: &str,
    args: &[CompiledNode],
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let label = arg_string(name, &args[0], focus, root, ctx)?;
    let logged = match args.get(1) {
        Some(projection) => eval_arg(projection, focus, root, ctx)?,
        None => focus.to_vec(),
    };
    log::info!(
        "trace[{label}]: {}",
        serde_json::to_string(&logged).unwrap_or_default()
    );
    Ok(focus.to_vec())
}

/// Bind a per-evaluation variable, visible downstream as `%name`. The value
/// defaults to the current focus.
pub fn define_variable(
    name: &str,
    args: &[CompiledNode],
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let variable = arg_string(name, &args[0], focus, root, ctx)?;
    let value = match args.get(1) {
        Some(expr) => eval_arg(expr, focus, root, ctx)?,
        None => focus.to_vec(),
    };
    ctx.define(variable, value);
    Ok(focus.to_vec())
}

/// Filter each element's `extension` array by url.
pub fn extension(
    url: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let url = arg_string("extension", url, focus, root, ctx)?;
    let mut out = Vec::new();
    for item in focus {
        let Some(extensions) = item.get("extension").and_then(Value::as_array) else {
            continue;
        };
        for ext in extensions {
            if ext.get("url").and_then(Value::as_str) == Some(url.as_str()) {
                out.push(ext.clone());
            }
        }
    }
    Ok(out)
}
