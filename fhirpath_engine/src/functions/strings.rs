//! String built-ins
//!
//! Every function here takes a singleton string focus: empty input
//! propagates as empty, a non-string input is a function error. Regex
//! functions compile their pattern per call; codec functions cover the
//! base64/hex encodings and HTML/JSON escaping.

use crate::compile::CompiledNode;
use crate::context::EvaluationContext;
use crate::error::EvalError;
use crate::functions::{arg_integer, arg_string};
use crate::model::{Sequence, Value};
use base64::Engine;

/// The singleton-string focus contract shared by all string functions.
fn string_focus<'a>(name: &str, focus: &'a [Value]) -> Result<Option<&'a str>, EvalError> {
    match focus {
        [] => Ok(None),
        [Value::String(s)] => Ok(Some(s)),
        _ => Err(EvalError::function(name, "requires a singleton string input")),
    }
}

pub fn length(name: &str, focus: &[Value]) -> Result<Sequence, EvalError> {
    Ok(match string_focus(name, focus)? {
        Some(s) => vec![Value::from(s.chars().count() as i64)],
        None => vec![],
    })
}

pub fn starts_with(
    name: &str,
    prefix: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let Some(s) = string_focus(name, focus)? else {
        return Ok(vec![]);
    };
    let prefix = arg_string(name, prefix, focus, root, ctx)?;
    Ok(vec![Value::Bool(s.starts_with(&prefix))])
}

pub fn ends_with(
    name: &str,
    suffix: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let Some(s) = string_focus(name, focus)? else {
        return Ok(vec![]);
    };
    let suffix = arg_string(name, suffix, focus, root, ctx)?;
    Ok(vec![Value::Bool(s.ends_with(&suffix))])
}

pub fn contains(
    name: &str,
    needle: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let Some(s) = string_focus(name, focus)? else {
        return Ok(vec![]);
    };
    let needle = arg_string(name, needle, focus, root, ctx)?;
    Ok(vec![Value::Bool(s.contains(&needle))])
}

pub fn substring(
    name: &str,
    args: &[CompiledNode],
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let Some(s) = string_focus(name, focus)? else {
        return Ok(vec![]);
    };
    let chars: Vec<char> = s.chars().collect();
    let start = arg_integer(name, &args[0], focus, root, ctx)?;
    if start < 0 || start as usize >= chars.len() {
        return Ok(vec![]);
    }
    let start = start as usize;
    let end = match args.get(1) {
        Some(len_arg) => {
            let len = arg_integer(name, len_arg, focus, root, ctx)?.max(0) as usize;
            (start + len).min(chars.len())
        }
        None => chars.len(),
    };
    Ok(vec![Value::String(chars[start..end].iter().collect())])
}

pub fn upper(name: &str, focus: &[Value]) -> Result<Sequence, EvalError> {
    Ok(match string_focus(name, focus)? {
        Some(s) => vec![Value::String(s.to_uppercase())],
        None => vec![],
    })
}

pub fn lower(name: &str, focus: &[Value]) -> Result<Sequence, EvalError> {
    Ok(match string_focus(name, focus)? {
        Some(s) => vec![Value::String(s.to_lowercase())],
        None => vec![],
    })
}

pub fn replace(
    name: &str,
    args: &[CompiledNode],
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let Some(s) = string_focus(name, focus)? else {
        return Ok(vec![]);
    };
    let find = arg_string(name, &args[0], focus, root, ctx)?;
    let substitute = arg_string(name, &args[1], focus, root, ctx)?;
    Ok(vec![Value::String(s.replace(&find, &substitute))])
}

pub fn trim(name: &str, focus: &[Value]) -> Result<Sequence, EvalError> {
    Ok(match string_focus(name, focus)? {
        Some(s) => vec![Value::String(s.trim().to_string())],
        None => vec![],
    })
}

pub fn split(
    name: &str,
    separator: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let Some(s) = string_focus(name, focus)? else {
        return Ok(vec![]);
    };
    let separator = arg_string(name, separator, focus, root, ctx)?;
    Ok(s.split(separator.as_str())
        .map(|piece| Value::String(piece.to_string()))
        .collect())
}

/// Join a collection of strings; separator defaults to the empty string.
pub fn join(
    name: &str,
    args: &[CompiledNode],
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let separator = match args.first() {
        Some(arg) => arg_string(name, arg, focus, root, ctx)?,
        None => String::new(),
    };
    let mut pieces = Vec::with_capacity(focus.len());
    for item in focus {
        match item {
            Value::String(s) => pieces.push(s.clone()),
            _ => return Err(EvalError::function(name, "requires a collection of strings")),
        }
    }
    Ok(vec![Value::String(pieces.join(&separator))])
}

pub fn to_chars(name: &str, focus: &[Value]) -> Result<Sequence, EvalError> {
    Ok(match string_focus(name, focus)? {
        Some(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
        None => vec![],
    })
}

/// 0-based character index of the first occurrence, `-1` when absent.
pub fn index_of(
    name: &str,
    needle: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let Some(s) = string_focus(name, focus)? else {
        return Ok(vec![]);
    };
    let needle = arg_string(name, needle, focus, root, ctx)?;
    let index = match s.find(&needle) {
        Some(byte_index) => s[..byte_index].chars().count() as i64,
        None => -1,
    };
    Ok(vec![Value::from(index)])
}

pub fn last_index_of(
    name: &str,
    needle: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let Some(s) = string_focus(name, focus)? else {
        return Ok(vec![]);
    };
    let needle = arg_string(name, needle, focus, root, ctx)?;
    let index = match s.rfind(&needle) {
        Some(byte_index) => s[..byte_index].chars().count() as i64,
        None => -1,
    };
    Ok(vec![Value::from(index)])
}

fn compile_regex(name: &str, pattern: &str) -> Result<regex::Regex, EvalError> {
    regex::Regex::new(pattern)
        .map_err(|e| EvalError::function(name, format!("invalid regular expression: {e}")))
}

pub fn matches(
    name: &str,
    pattern: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let Some(s) = string_focus(name, focus)? else {
        return Ok(vec![]);
    };
    let pattern = arg_string(name, pattern, focus, root, ctx)?;
    let re = compile_regex(name, &pattern)?;
    Ok(vec![Value::Bool(re.is_match(s))])
}

pub fn replace_matches(
    name: &str,
    args: &[CompiledNode],
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let Some(s) = string_focus(name, focus)? else {
        return Ok(vec![]);
    };
    let pattern = arg_string(name, &args[0], focus, root, ctx)?;
    let substitute = arg_string(name, &args[1], focus, root, ctx)?;
    let re = compile_regex(name, &pattern)?;
    Ok(vec![Value::String(
        re.replace_all(s, substitute.as_str()).into_owned(),
    )])
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

fn hex_decode(name: &str, s: &str) -> Result<Vec<u8>, EvalError> {
    if s.len() % 2 != 0 {
        return Err(EvalError::function(name, "invalid hex input"));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|_| EvalError::function(name, "invalid hex input"))
        })
        .collect()
}

pub fn encode(
    name: &str,
    format: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let Some(s) = string_focus(name, focus)? else {
        return Ok(vec![]);
    };
    let format = arg_string(name, format, focus, root, ctx)?;
    let encoded = match format.as_str() {
        "base64" => base64::engine::general_purpose::STANDARD.encode(s.as_bytes()),
        "urlbase64" => base64::engine::general_purpose::URL_SAFE.encode(s.as_bytes()),
        "hex" => hex_encode(s.as_bytes()),
        other => {
            return Err(EvalError::function(
                name,
                format!("unsupported encoding '{other}'"),
            ))
        }
    };
    Ok(vec![Value::String(encoded)])
}

pub fn decode(
    name: &str,
    format: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let Some(s) = string_focus(name, focus)? else {
        return Ok(vec![]);
    };
    let format = arg_string(name, format, focus, root, ctx)?;
    let bytes = match format.as_str() {
        "base64" => base64::engine::general_purpose::STANDARD
            .decode(s.as_bytes())
            .map_err(|e| EvalError::function(name, format!("invalid base64 input: {e}")))?,
        "urlbase64" => base64::engine::general_purpose::URL_SAFE
            .decode(s.as_bytes())
            .map_err(|e| EvalError::function(name, format!("invalid base64 input: {e}")))?,
        "hex" => hex_decode(name, s)?,
        other => {
            return Err(EvalError::function(
                name,
                format!("unsupported encoding '{other}'"),
            ))
        }
    };
    let decoded = String::from_utf8(bytes)
        .map_err(|_| EvalError::function(name, "decoded bytes are not valid UTF-8"))?;
    Ok(vec![Value::String(decoded)])
}

pub fn escape(
    name: &str,
    target: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let Some(s) = string_focus(name, focus)? else {
        return Ok(vec![]);
    };
    let target = arg_string(name, target, focus, root, ctx)?;
    let escaped = match target.as_str() {
        "html" => s
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;"),
        "json" => {
            let quoted = serde_json::to_string(s).unwrap_or_default();
            quoted[1..quoted.len() - 1].to_string()
        }
        other => {
            return Err(EvalError::function(
                name,
                format!("unsupported escape target '{other}'"),
            ))
        }
    };
    Ok(vec![Value::String(escaped)])
}

pub fn unescape(
    name: &str,
    target: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let Some(s) = string_focus(name, focus)? else {
        return Ok(vec![]);
    };
    let target = arg_string(name, target, focus, root, ctx)?;
    let unescaped = match target.as_str() {
        "html" => s
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&amp;", "&"),
        "json" => {
            let quoted = format!("\"{s}\"");
            serde_json::from_str::<String>(&quoted)
                .map_err(|_| EvalError::function(name, "invalid JSON escape sequence"))?
        }
        other => {
            return Err(EvalError::function(
                name,
                format!("unsupported escape target '{other}'"),
            ))
        }
    };
    Ok(vec![Value::String(unescaped)])
}
