//! Built-in function registry and dispatch
//!
//! Function names resolve at compile time against a signature registry
//! (min/max arity); unresolved names fall through to the context's custom
//! function map at evaluation time. Dispatch hands each call to its
//! implementation module with the unevaluated argument nodes, so predicates
//! and `iif` branches stay lazy.

pub mod collections;
pub mod conversion;
pub mod math;
pub mod strings;

use crate::compile::error::ExpectedArity;
use crate::compile::CompiledNode;
use crate::context::EvaluationContext;
use crate::error::EvalError;
use crate::model::{Sequence, Value};

/// The closed set of built-in functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    // Collections
    Where,
    Select,
    Exists,
    Empty,
    Count,
    First,
    Last,
    Tail,
    Skip,
    Take,
    Distinct,
    IsDistinct,
    All,
    Any,
    Single,
    Combine,
    Intersect,
    Exclude,
    Repeat,
    Children,
    Descendants,

    // Strings
    Length,
    StartsWith,
    EndsWith,
    ContainsString,
    Substring,
    Upper,
    Lower,
    Replace,
    Trim,
    Split,
    Join,
    ToChars,
    IndexOf,
    LastIndexOf,
    Matches,
    ReplaceMatches,
    Encode,
    Decode,
    EscapeFn,
    UnescapeFn,

    // Math
    Sum,
    Min,
    Max,
    Avg,
    Abs,
    Ceiling,
    Floor,
    Round,
    Sqrt,
    Truncate,
    DivFn,
    ModFn,

    // Conversion and utility
    ToString,
    ToInteger,
    ToDecimal,
    ToDateTime,
    Now,
    Today,
    TimeOfDay,
    Not,
    Iif,
    TypeFn,
    ValueFn,
    HasValue,
    Trace,
    DefineVariable,
    Extension,
}

/// Arity bounds checked at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub min: usize,
    pub max: Option<usize>,
}

impl Signature {
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.map(|m| count <= m).unwrap_or(true)
    }

    pub fn expected(&self) -> ExpectedArity {
        ExpectedArity {
            min: self.min,
            max: self.max,
        }
    }
}

/// Resolve a function name to its builtin and signature.
pub fn lookup(name: &str) -> Option<(Builtin, Signature)> {
    use Builtin::*;
    let (builtin, min, max) = match name {
        "where" => (Where, 1, Some(1)),
        "select" => (Select, 1, Some(1)),
        "exists" => (Exists, 0, Some(1)),
        "empty" => (Empty, 0, Some(0)),
        "count" => (Count, 0, Some(0)),
        "first" => (First, 0, Some(0)),
        "last" => (Last, 0, Some(0)),
        "tail" => (Tail, 0, Some(0)),
        "skip" => (Skip, 1, Some(1)),
        "take" => (Take, 1, Some(1)),
        "distinct" => (Distinct, 0, Some(0)),
        "isDistinct" => (IsDistinct, 0, Some(0)),
        "all" => (All, 1, Some(1)),
        "any" => (Any, 1, Some(1)),
        "single" => (Single, 0, Some(0)),
        "combine" => (Combine, 1, Some(1)),
        "intersect" => (Intersect, 1, Some(1)),
        "exclude" => (Exclude, 1, Some(1)),
        "repeat" => (Repeat, 1, Some(1)),
        "children" => (Children, 0, Some(0)),
        "descendants" => (Descendants, 0, Some(0)),

        "length" => (Length, 0, Some(0)),
        "startsWith" => (StartsWith, 1, Some(1)),
        "endsWith" => (EndsWith, 1, Some(1)),
        "contains" => (ContainsString, 1, Some(1)),
        "substring" => (Substring, 1, Some(2)),
        "upper" => (Upper, 0, Some(0)),
        "lower" => (Lower, 0, Some(0)),
        "replace" => (Replace, 2, Some(2)),
        "trim" => (Trim, 0, Some(0)),
        "split" => (Split, 1, Some(1)),
        "join" => (Join, 0, Some(1)),
        "toChars" => (ToChars, 0, Some(0)),
        "indexOf" => (IndexOf, 1, Some(1)),
        "lastIndexOf" => (LastIndexOf, 1, Some(1)),
        "matches" => (Matches, 1, Some(1)),
        "replaceMatches" => (ReplaceMatches, 2, Some(2)),
        "encode" => (Encode, 1, Some(1)),
        "decode" => (Decode, 1, Some(1)),
        "escape" => (EscapeFn, 1, Some(1)),
        "unescape" => (UnescapeFn, 1, Some(1)),

        "sum" => (Sum, 0, Some(0)),
        "min" => (Min, 0, Some(0)),
        "max" => (Max, 0, Some(0)),
        "avg" => (Avg, 0, Some(0)),
        "abs" => (Abs, 0, Some(0)),
        "ceiling" => (Ceiling, 0, Some(0)),
        "floor" => (Floor, 0, Some(0)),
        "round" => (Round, 0, Some(1)),
        "sqrt" => (Sqrt, 0, Some(0)),
        "truncate" => (Truncate, 0, Some(0)),
        "div" => (DivFn, 1, Some(1)),
        "mod" => (ModFn, 1, Some(1)),

        "toString" => (ToString, 0, Some(0)),
        "toInteger" => (ToInteger, 0, Some(0)),
        "toDecimal" => (ToDecimal, 0, Some(0)),
        "toDateTime" => (ToDateTime, 0, Some(0)),
        "now" => (Now, 0, Some(0)),
        "today" => (Today, 0, Some(0)),
        "timeOfDay" => (TimeOfDay, 0, Some(0)),
        "not" => (Not, 0, Some(0)),
        "iif" => (Iif, 3, Some(3)),
        "type" => (TypeFn, 0, Some(0)),
        "value" => (ValueFn, 0, Some(0)),
        "hasValue" => (HasValue, 0, Some(0)),
        "trace" => (Trace, 1, Some(2)),
        "defineVariable" => (DefineVariable, 1, Some(2)),
        "extension" => (Extension, 1, Some(1)),
        _ => return None,
    };
    Some((builtin, Signature { min, max }))
}

/// Evaluate a built-in call against the focus.
pub fn dispatch(
    builtin: Builtin,
    name: &str,
    args: &[CompiledNode],
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    use Builtin::*;
    match builtin {
        Where => collections::where_fn(&args[0], focus, root, ctx),
        Select => collections::select(&args[0], focus, root, ctx),
        Exists => collections::exists(args, focus, root, ctx),
        Empty => Ok(vec![Value::Bool(focus.is_empty())]),
        Count => Ok(vec![Value::from(focus.len() as i64)]),
        First => Ok(focus.first().cloned().into_iter().collect()),
        Last => Ok(focus.last().cloned().into_iter().collect()),
        Tail => Ok(focus.iter().skip(1).cloned().collect()),
        Skip => collections::skip(name, &args[0], focus, root, ctx),
        Take => collections::take(name, &args[0], focus, root, ctx),
        Distinct => Ok(crate::model::dedup_values(focus.to_vec())),
        IsDistinct => collections::is_distinct(focus),
        All => collections::all(&args[0], focus, root, ctx),
        Any => collections::any(&args[0], focus, root, ctx),
        Single => collections::single(name, focus),
        Combine => collections::combine(&args[0], focus, root, ctx),
        Intersect => collections::intersect(&args[0], focus, root, ctx),
        Exclude => collections::exclude(&args[0], focus, root, ctx),
        Repeat => collections::repeat(&args[0], focus, root, ctx),
        Children => Ok(collections::children_of(focus)),
        Descendants => Ok(collections::descendants(focus)),

        Length => strings::length(name, focus),
        StartsWith => strings::starts_with(name, &args[0], focus, root, ctx),
        EndsWith => strings::ends_with(name, &args[0], focus, root, ctx),
        ContainsString => strings::contains(name, &args[0], focus, root, ctx),
        Substring => strings::substring(name, args, focus, root, ctx),
        Upper => strings::upper(name, focus),
        Lower => strings::lower(name, focus),
        Replace => strings::replace(name, args, focus, root, ctx),
        Trim => strings::trim(name, focus),
        Split => strings::split(name, &args[0], focus, root, ctx),
        Join => strings::join(name, args, focus, root, ctx),
        ToChars => strings::to_chars(name, focus),
        IndexOf => strings::index_of(name, &args[0], focus, root, ctx),
        LastIndexOf => strings::last_index_of(name, &args[0], focus, root, ctx),
        Matches => strings::matches(name, &args[0], focus, root, ctx),
        ReplaceMatches => strings::replace_matches(name, args, focus, root, ctx),
        Encode => strings::encode(name, &args[0], focus, root, ctx),
        Decode => strings::decode(name, &args[0], focus, root, ctx),
        EscapeFn => strings::escape(name, &args[0], focus, root, ctx),
        UnescapeFn => strings::unescape(name, &args[0], focus, root, ctx),

        Sum => math::sum(name, focus),
        Min => math::min(name, focus),
        Max => math::max(name, focus),
        Avg => math::avg(name, focus),
        Abs => math::map_numeric(name, focus, f64::abs),
        Ceiling => math::map_numeric(name, focus, f64::ceil),
        Floor => math::map_numeric(name, focus, f64::floor),
        Round => math::round(name, args, focus, root, ctx),
        Sqrt => math::sqrt(name, focus),
        Truncate => math::map_numeric(name, focus, f64::trunc),
        DivFn => math::div_fn(name, &args[0], focus, root, ctx),
        ModFn => math::mod_fn(name, &args[0], focus, root, ctx),

        ToString => conversion::to_string(name, focus),
        ToInteger => conversion::to_integer(name, focus),
        ToDecimal => conversion::to_decimal(name, focus),
        ToDateTime => conversion::to_date_time(name, focus),
        Now => Ok(vec![ctx.now_value()]),
        Today => Ok(vec![ctx.today_value()]),
        TimeOfDay => Ok(vec![ctx.time_of_day_value()]),
        Not => conversion::not_fn(focus),
        Iif => conversion::iif(args, focus, root, ctx),
        TypeFn => Ok(conversion::type_fn(focus)),
        ValueFn => Ok(conversion::value_fn(focus)),
        HasValue => Ok(conversion::has_value(focus)),
        Trace => conversion::trace(name, args, focus, root, ctx),
        DefineVariable => conversion::define_variable(name, args, focus, root, ctx),
        Extension => conversion::extension(&args[0], focus, root, ctx),
    }
}

// === shared argument helpers ===

/// Evaluate an argument expression against the current focus.
pub(crate) fn eval_arg(
    arg: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    arg.eval(focus, root, ctx)
}

/// An argument that must evaluate to a single integer.
pub(crate) fn arg_integer(
    name: &str,
    arg: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<i64, EvalError> {
    let values = arg.eval(focus, root, ctx)?;
    match values.as_slice() {
        [v] => crate::model::as_integer(v)
            .ok_or_else(|| EvalError::function(name, "expects an integer argument")),
        _ => Err(EvalError::function(name, "expects an integer argument")),
    }
}

/// An argument that must evaluate to a single string.
pub(crate) fn arg_string(
    name: &str,
    arg: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<String, EvalError> {
    let values = arg.eval(focus, root, ctx)?;
    match values.as_slice() {
        [Value::String(s)] => Ok(s.clone()),
        _ => Err(EvalError::function(name, "expects a string argument")),
    }
}
