//! Operator semantics over the collection model
//!
//! Arithmetic and comparison operate on singleton operands and broadcast
//! over collections where the language says so; absence propagates as the
//! empty sequence. The logical connectives implement three-valued logic with
//! the required short-circuiting. The truth tables live here and nowhere
//! else.

use crate::compile::CompiledNode;
use crate::context::EvaluationContext;
use crate::error::EvalError;
use crate::model::{
    as_number, canonical_key, dedup_values, display_value, is_quantity, number_value,
    quantity_parts, temporal, Sequence, Value,
};
use fhirpath_compiler::{BinaryOp, UnaryOp};
use serde_json::json;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Evaluate a binary node. Logic operators get the unevaluated operand nodes
/// so they can short-circuit; everything else is eager.
pub fn eval_binary(
    op: BinaryOp,
    left: &CompiledNode,
    right: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    match op {
        BinaryOp::And => eval_and(left, right, focus, root, ctx),
        BinaryOp::Or => eval_or(left, right, focus, root, ctx),
        BinaryOp::Implies => eval_implies(left, right, focus, root, ctx),
        BinaryOp::Xor => {
            let l = singleton_bool(&left.eval(focus, root, ctx)?)?;
            let r = singleton_bool(&right.eval(focus, root, ctx)?)?;
            Ok(match (l, r) {
                (Some(a), Some(b)) => vec![Value::Bool(a != b)],
                _ => vec![],
            })
        }
        BinaryOp::Union => {
            let mut l = left.eval(focus, root, ctx)?;
            let r = right.eval(focus, root, ctx)?;
            l.extend(r);
            Ok(dedup_values(l))
        }
        _ => {
            let l = left.eval(focus, root, ctx)?;
            let r = right.eval(focus, root, ctx)?;
            apply_binary(op, &l, &r)
        }
    }
}

/// The eager operators, split out for direct table-driven testing.
pub fn apply_binary(op: BinaryOp, l: &[Value], r: &[Value]) -> Result<Sequence, EvalError> {
    match op {
        BinaryOp::Add
        | BinaryOp::Subtract
        | BinaryOp::Multiply
        | BinaryOp::Divide
        | BinaryOp::IntDivide
        | BinaryOp::Modulo => arithmetic(op, l, r),
        BinaryOp::Concat => concat(l, r),
        BinaryOp::Equals => equality(l, r, false),
        BinaryOp::NotEquals => equality(l, r, true),
        BinaryOp::Equivalent => Ok(vec![Value::Bool(equivalent(l, r))]),
        BinaryOp::NotEquivalent => Ok(vec![Value::Bool(!equivalent(l, r))]),
        BinaryOp::LessThan
        | BinaryOp::GreaterThan
        | BinaryOp::LessThanOrEqual
        | BinaryOp::GreaterThanOrEqual => ordering(op, l, r),
        BinaryOp::In => membership(l, r),
        BinaryOp::Contains => containment(l, r),
        // Logic and union are handled by eval_binary.
        BinaryOp::And
        | BinaryOp::Or
        | BinaryOp::Xor
        | BinaryOp::Implies
        | BinaryOp::Union => Err(EvalError::message(format!(
            "operator '{}' requires operand expressions",
            op.as_str()
        ))),
    }
}

pub fn eval_unary(op: UnaryOp, operand: &[Value]) -> Result<Sequence, EvalError> {
    match op {
        UnaryOp::Plus | UnaryOp::Minus => {
            if operand.len() != 1 {
                return Ok(vec![]);
            }
            match as_number(&operand[0]) {
                Some(n) => {
                    let n = if op == UnaryOp::Minus { -n } else { n };
                    Ok(vec![number_value(n)])
                }
                None => Ok(vec![]),
            }
        }
        UnaryOp::Not => match operand {
            [] => Ok(vec![]),
            [Value::Bool(b)] => Ok(vec![Value::Bool(!b)]),
            _ => Err(EvalError::NonBooleanOperand),
        },
    }
}

// === three-valued logic ===

/// A logic operand: a singleton boolean or empty. Anything else fails.
pub fn singleton_bool(seq: &[Value]) -> Result<Option<bool>, EvalError> {
    match seq {
        [] => Ok(None),
        [Value::Bool(b)] => Ok(Some(*b)),
        _ => Err(EvalError::NonBooleanOperand),
    }
}

fn eval_and(
    left: &CompiledNode,
    right: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let l = singleton_bool(&left.eval(focus, root, ctx)?)?;
    if l == Some(false) {
        return Ok(vec![Value::Bool(false)]);
    }
    let r = singleton_bool(&right.eval(focus, root, ctx)?)?;
    Ok(match (l, r) {
        (_, Some(false)) => vec![Value::Bool(false)],
        (Some(true), Some(true)) => vec![Value::Bool(true)],
        _ => vec![],
    })
}

fn eval_or(
    left: &CompiledNode,
    right: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    let l = singleton_bool(&left.eval(focus, root, ctx)?)?;
    if l == Some(true) {
        return Ok(vec![Value::Bool(true)]);
    }
    let r = singleton_bool(&right.eval(focus, root, ctx)?)?;
    Ok(match (l, r) {
        (_, Some(true)) => vec![Value::Bool(true)],
        (Some(false), Some(false)) => vec![Value::Bool(false)],
        _ => vec![],
    })
}

fn eval_implies(
    left: &CompiledNode,
    right: &CompiledNode,
    focus: &[Value],
    root: &Value,
    ctx: &mut EvaluationContext,
) -> Result<Sequence, EvalError> {
    match singleton_bool(&left.eval(focus, root, ctx)?)? {
        // An empty antecedent never concludes anything.
        None => Ok(vec![]),
        Some(false) => Ok(vec![Value::Bool(true)]),
        Some(true) => {
            let r = singleton_bool(&right.eval(focus, root, ctx)?)?;
            Ok(r.map(Value::Bool).into_iter().collect())
        }
    }
}

// === arithmetic ===

fn arithmetic(op: BinaryOp, l: &[Value], r: &[Value]) -> Result<Sequence, EvalError> {
    if l.len() != 1 || r.len() != 1 {
        return Ok(vec![]);
    }
    let (a, b) = (&l[0], &r[0]);

    // String-fallback addition: either side a string concatenates.
    if op == BinaryOp::Add && (a.is_string() || b.is_string()) {
        return Ok(match (display_value(a), display_value(b)) {
            (Some(sa), Some(sb)) => vec![Value::String(sa + &sb)],
            _ => vec![],
        });
    }

    // Subtracting temporal strings yields a day-count quantity, whatever the
    // precision of the operands.
    if op == BinaryOp::Subtract {
        if let (Value::String(sa), Value::String(sb)) = (a, b) {
            return Ok(match temporal::days_between(sa, sb) {
                Some(days) => vec![json!({
                    "value": number_value(days as f64),
                    "unit": "days",
                })],
                None => vec![],
            });
        }
    }

    let (Some(x), Some(y)) = (as_number(a), as_number(b)) else {
        return Ok(vec![]);
    };

    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Subtract => x - y,
        BinaryOp::Multiply => x * y,
        BinaryOp::Divide => {
            if y == 0.0 {
                return Ok(vec![]);
            }
            x / y
        }
        BinaryOp::IntDivide => {
            if y == 0.0 {
                return Ok(vec![]);
            }
            (x / y).floor()
        }
        BinaryOp::Modulo => {
            if y == 0.0 {
                return Ok(vec![]);
            }
            x % y
        }
        _ => return Ok(vec![]),
    };
    Ok(vec![number_value(result)])
}

fn concat(l: &[Value], r: &[Value]) -> Result<Sequence, EvalError> {
    let side = |seq: &[Value]| -> Result<String, EvalError> {
        match seq {
            [] => Ok(String::new()),
            [v] => display_value(v)
                .ok_or_else(|| EvalError::message("'&' requires string operands")),
            _ => Err(EvalError::message("'&' requires singleton operands")),
        }
    };
    Ok(vec![Value::String(side(l)? + &side(r)?)])
}

// === equality and ordering ===

fn eq_single(a: &Value, b: &Value) -> Result<bool, EvalError> {
    match (a, b) {
        (Value::Null, Value::Null) => Ok(true),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (Value::Number(_), Value::Number(_)) => {
            Ok(as_number(a) == as_number(b))
        }
        (Value::String(x), Value::String(y)) => {
            if temporal::is_temporal(x) && temporal::is_temporal(y) {
                match temporal::compare(x, y) {
                    Some(ord) => Ok(ord == Ordering::Equal),
                    None => Err(EvalError::TypeMismatch),
                }
            } else {
                Ok(x == y)
            }
        }
        (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_)) => {
            Ok(canonical_key(a) == canonical_key(b))
        }
        _ => Err(EvalError::TypeMismatch),
    }
}

fn equality(l: &[Value], r: &[Value], negate: bool) -> Result<Sequence, EvalError> {
    let finish = |b: bool| Value::Bool(b != negate);

    match (l.is_empty(), r.is_empty()) {
        (true, true) => return Ok(vec![finish(true)]),
        (true, false) | (false, true) => return Ok(vec![]),
        _ => {}
    }

    if l.len() == 1 && r.len() == 1 {
        return Ok(vec![finish(eq_single(&l[0], &r[0])?)]);
    }
    if l.len() == 1 {
        return r
            .iter()
            .map(|x| eq_single(&l[0], x).map(finish))
            .collect();
    }
    if r.len() == 1 {
        return l
            .iter()
            .map(|x| eq_single(x, &r[0]).map(finish))
            .collect();
    }
    // Collection against collection is decided wholesale.
    Ok(vec![finish(false)])
}

fn equiv_key(v: &Value) -> String {
    canonical_key(v).to_lowercase()
}

/// Equivalence (`~`): empty matches empty, collections match as multisets,
/// strings compare case-insensitively, and nothing raises.
fn equivalent(l: &[Value], r: &[Value]) -> bool {
    if l.len() != r.len() {
        return false;
    }
    let mut lk: Vec<String> = l.iter().map(equiv_key).collect();
    let mut rk: Vec<String> = r.iter().map(equiv_key).collect();
    lk.sort();
    rk.sort();
    lk == rk
}

fn cmp_single(a: &Value, b: &Value) -> Result<Ordering, EvalError> {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y).ok_or(EvalError::TypeMismatch);
    }
    if let (Value::String(x), Value::String(y)) = (a, b) {
        if temporal::is_temporal(x) && temporal::is_temporal(y) {
            return temporal::compare(x, y).ok_or(EvalError::TypeMismatch);
        }
        return Ok(x.cmp(y));
    }
    if is_quantity(a) && is_quantity(b) {
        if let (Some((x, ux)), Some((y, uy))) = (quantity_parts(a), quantity_parts(b)) {
            if ux == uy {
                return x.partial_cmp(&y).ok_or(EvalError::TypeMismatch);
            }
        }
        return Err(EvalError::TypeMismatch);
    }
    Err(EvalError::TypeMismatch)
}

fn ordering_holds(op: BinaryOp, ord: Ordering) -> bool {
    match op {
        BinaryOp::LessThan => ord == Ordering::Less,
        BinaryOp::GreaterThan => ord == Ordering::Greater,
        BinaryOp::LessThanOrEqual => ord != Ordering::Greater,
        BinaryOp::GreaterThanOrEqual => ord != Ordering::Less,
        _ => false,
    }
}

fn ordering(op: BinaryOp, l: &[Value], r: &[Value]) -> Result<Sequence, EvalError> {
    if l.is_empty() || r.is_empty() {
        return Ok(vec![]);
    }
    if l.len() == 1 && r.len() == 1 {
        let ord = cmp_single(&l[0], &r[0])?;
        return Ok(vec![Value::Bool(ordering_holds(op, ord))]);
    }
    if l.len() == 1 {
        return r
            .iter()
            .map(|x| cmp_single(&l[0], x).map(|ord| Value::Bool(ordering_holds(op, ord))))
            .collect();
    }
    if r.len() == 1 {
        return l
            .iter()
            .map(|x| cmp_single(x, &r[0]).map(|ord| Value::Bool(ordering_holds(op, ord))))
            .collect();
    }
    Ok(vec![])
}

// === membership ===

fn key_set(values: &[Value]) -> HashSet<String> {
    values.iter().map(canonical_key).collect()
}

/// `x in C`
fn membership(l: &[Value], r: &[Value]) -> Result<Sequence, EvalError> {
    if l.is_empty() {
        return Ok(vec![]);
    }
    if r.is_empty() {
        return Ok(vec![Value::Bool(false)]);
    }
    let keys = key_set(r);
    if l.len() == 1 {
        return Ok(vec![Value::Bool(keys.contains(&canonical_key(&l[0])))]);
    }
    Ok(l.iter()
        .map(|x| Value::Bool(keys.contains(&canonical_key(x))))
        .collect())
}

/// `C contains x`; a collection contains a collection when every right-hand
/// element is present.
fn containment(l: &[Value], r: &[Value]) -> Result<Sequence, EvalError> {
    if r.is_empty() {
        return Ok(vec![]);
    }
    if l.is_empty() {
        return Ok(vec![Value::Bool(false)]);
    }
    let keys = key_set(l);
    if r.len() == 1 {
        return Ok(vec![Value::Bool(keys.contains(&canonical_key(&r[0])))]);
    }
    let all_present = r.iter().all(|x| keys.contains(&canonical_key(x)));
    Ok(vec![Value::Bool(all_present)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn b(v: bool) -> Sequence {
        vec![Value::Bool(v)]
    }

    #[test]
    fn arithmetic_singletons() {
        assert_eq!(
            apply_binary(BinaryOp::Add, &[json!(2)], &[json!(3)]).unwrap(),
            vec![json!(5)]
        );
        assert_eq!(
            apply_binary(BinaryOp::Multiply, &[json!(2.5)], &[json!(2)]).unwrap(),
            vec![json!(5)]
        );
        // Empty or plural operands give empty.
        assert_eq!(apply_binary(BinaryOp::Add, &[], &[json!(3)]).unwrap(), Vec::<Value>::new());
        assert_eq!(
            apply_binary(BinaryOp::Add, &[json!(1), json!(2)], &[json!(3)]).unwrap(),
            Vec::<Value>::new()
        );
    }

    #[test]
    fn string_fallback_addition() {
        assert_eq!(
            apply_binary(BinaryOp::Add, &[json!("hello")], &[json!(2)]).unwrap(),
            vec![json!("hello2")]
        );
        assert_eq!(
            apply_binary(BinaryOp::Add, &[json!(1)], &[json!("st")]).unwrap(),
            vec![json!("1st")]
        );
    }

    #[test]
    fn division_by_zero_is_empty_in_operator_form() {
        assert_eq!(
            apply_binary(BinaryOp::Divide, &[json!(1)], &[json!(0)]).unwrap(),
            Vec::<Value>::new()
        );
        assert_eq!(
            apply_binary(BinaryOp::IntDivide, &[json!(1)], &[json!(0)]).unwrap(),
            Vec::<Value>::new()
        );
        assert_eq!(
            apply_binary(BinaryOp::Modulo, &[json!(1)], &[json!(0)]).unwrap(),
            Vec::<Value>::new()
        );
    }

    #[test]
    fn int_divide_floors_and_modulo_keeps_dividend_sign() {
        assert_eq!(
            apply_binary(BinaryOp::IntDivide, &[json!(7)], &[json!(2)]).unwrap(),
            vec![json!(3)]
        );
        assert_eq!(
            apply_binary(BinaryOp::IntDivide, &[json!(-7)], &[json!(2)]).unwrap(),
            vec![json!(-4)]
        );
        assert_eq!(
            apply_binary(BinaryOp::Modulo, &[json!(-7)], &[json!(2)]).unwrap(),
            vec![json!(-1)]
        );
    }

    #[test]
    fn temporal_subtraction_yields_day_quantity() {
        let out =
            apply_binary(BinaryOp::Subtract, &[json!("2023-05-10")], &[json!("2023-05-01")])
                .unwrap();
        assert_eq!(out, vec![json!({"value": 9, "unit": "days"})]);
    }

    #[test]
    fn equality_empty_rules() {
        assert_eq!(apply_binary(BinaryOp::Equals, &[], &[]).unwrap(), b(true));
        assert_eq!(apply_binary(BinaryOp::NotEquals, &[], &[]).unwrap(), b(false));
        assert_eq!(
            apply_binary(BinaryOp::Equals, &[], &[json!(1)]).unwrap(),
            Vec::<Value>::new()
        );
    }

    #[test]
    fn equality_broadcasts_and_collections_compare_false() {
        let out = apply_binary(
            BinaryOp::Equals,
            &[json!(1)],
            &[json!(1), json!(2), json!(1)],
        )
        .unwrap();
        assert_eq!(out, vec![json!(true), json!(false), json!(true)]);

        // Many against many is a single false (true for !=).
        let l = [json!(1), json!(2)];
        let r = [json!(1), json!(2)];
        assert_eq!(apply_binary(BinaryOp::Equals, &l, &r).unwrap(), b(false));
        assert_eq!(apply_binary(BinaryOp::NotEquals, &l, &r).unwrap(), b(true));
    }

    #[test]
    fn equality_type_mismatch_fails() {
        let err = apply_binary(BinaryOp::Equals, &[json!("a")], &[json!(true)]).unwrap_err();
        assert_eq!(err, EvalError::TypeMismatch);
        assert_eq!(err.to_string(), "Cannot compare different types");
    }

    #[test]
    fn equality_is_structural_for_objects() {
        let a = json!({"x": 1, "y": [1, 2]});
        let c = json!({"y": [1, 2], "x": 1.0});
        assert_eq!(
            apply_binary(BinaryOp::Equals, &[a.clone()], &[c]).unwrap(),
            b(true)
        );
    }

    #[test]
    fn temporal_equality_with_partial_precision() {
        assert_eq!(
            apply_binary(BinaryOp::Equals, &[json!("2023")], &[json!("2023-05-01")]).unwrap(),
            b(true)
        );
        assert_eq!(
            apply_binary(
                BinaryOp::LessThanOrEqual,
                &[json!("2023")],
                &[json!("2023-05-01")]
            )
            .unwrap(),
            b(true)
        );
        assert_eq!(
            apply_binary(
                BinaryOp::GreaterThanOrEqual,
                &[json!("2023")],
                &[json!("2023-05-01")]
            )
            .unwrap(),
            b(true)
        );
        assert_eq!(
            apply_binary(BinaryOp::LessThan, &[json!("2023")], &[json!("2023-05-01")]).unwrap(),
            b(false)
        );
    }

    #[test]
    fn ordering_rules() {
        assert_eq!(
            apply_binary(BinaryOp::LessThan, &[json!(1)], &[json!(2)]).unwrap(),
            b(true)
        );
        assert_eq!(apply_binary(BinaryOp::LessThan, &[], &[json!(2)]).unwrap(), Vec::<Value>::new());
        // Broadcast.
        let out = apply_binary(
            BinaryOp::GreaterThan,
            &[json!(5)],
            &[json!(1), json!(9)],
        )
        .unwrap();
        assert_eq!(out, vec![json!(true), json!(false)]);
        // Collection vs collection is empty.
        assert_eq!(
            apply_binary(
                BinaryOp::LessThan,
                &[json!(1), json!(2)],
                &[json!(3), json!(4)]
            )
            .unwrap(),
            Vec::<Value>::new()
        );
        // Strings order lexicographically.
        assert_eq!(
            apply_binary(BinaryOp::LessThan, &[json!("abc")], &[json!("abd")]).unwrap(),
            b(true)
        );
        // Mixed scalar types fail.
        assert!(apply_binary(BinaryOp::LessThan, &[json!("a")], &[json!(1)]).is_err());
    }

    #[test]
    fn quantity_ordering_requires_matching_units() {
        let mg5 = json!({"value": 5, "unit": "mg"});
        let mg9 = json!({"value": 9, "unit": "mg"});
        let ml9 = json!({"value": 9, "unit": "mL"});
        assert_eq!(
            apply_binary(BinaryOp::LessThan, &[mg5.clone()], &[mg9]).unwrap(),
            b(true)
        );
        assert!(apply_binary(BinaryOp::LessThan, &[mg5], &[ml9]).is_err());
    }

    #[test]
    fn equivalence_never_raises() {
        assert_eq!(apply_binary(BinaryOp::Equivalent, &[], &[]).unwrap(), b(true));
        assert_eq!(
            apply_binary(BinaryOp::Equivalent, &[json!("ABC")], &[json!("abc")]).unwrap(),
            b(true)
        );
        assert_eq!(
            apply_binary(BinaryOp::Equivalent, &[json!("a")], &[json!(1)]).unwrap(),
            b(false)
        );
        assert_eq!(
            apply_binary(BinaryOp::NotEquivalent, &[json!(1)], &[]).unwrap(),
            b(true)
        );
        // Multisets: order does not matter.
        assert_eq!(
            apply_binary(
                BinaryOp::Equivalent,
                &[json!(1), json!(2)],
                &[json!(2), json!(1)]
            )
            .unwrap(),
            b(true)
        );
    }

    #[test]
    fn membership_in() {
        let coll = [json!(1), json!(2), json!(3)];
        assert_eq!(apply_binary(BinaryOp::In, &[json!(2)], &coll).unwrap(), b(true));
        assert_eq!(apply_binary(BinaryOp::In, &[json!(9)], &coll).unwrap(), b(false));
        assert_eq!(apply_binary(BinaryOp::In, &[], &coll).unwrap(), Vec::<Value>::new());
        assert_eq!(apply_binary(BinaryOp::In, &[json!(1)], &[]).unwrap(), b(false));
        // Element-wise for a plural left side.
        let out = apply_binary(BinaryOp::In, &[json!(1), json!(9)], &coll).unwrap();
        assert_eq!(out, vec![json!(true), json!(false)]);
    }

    #[test]
    fn containment_contains() {
        let coll = [json!(1), json!(2), json!(3)];
        assert_eq!(
            apply_binary(BinaryOp::Contains, &coll, &[json!(2)]).unwrap(),
            b(true)
        );
        assert_eq!(
            apply_binary(BinaryOp::Contains, &coll, &[]).unwrap(),
            Vec::<Value>::new()
        );
        assert_eq!(
            apply_binary(BinaryOp::Contains, &[], &[json!(1)]).unwrap(),
            b(false)
        );
        // Collection contains collection iff all present.
        assert_eq!(
            apply_binary(BinaryOp::Contains, &coll, &[json!(1), json!(3)]).unwrap(),
            b(true)
        );
        assert_eq!(
            apply_binary(BinaryOp::Contains, &coll, &[json!(1), json!(9)]).unwrap(),
            b(false)
        );
    }

    #[test]
    fn concat_treats_empty_as_blank() {
        assert_eq!(apply_binary(BinaryOp::Concat, &[json!("a")], &[]).unwrap(), vec![json!("a")]);
        assert_eq!(
            apply_binary(BinaryOp::Concat, &[json!("a")], &[json!("b")]).unwrap(),
            vec![json!("ab")]
        );
    }

    #[test]
    fn unary_operators() {
        assert_eq!(eval_unary(UnaryOp::Minus, &[json!(5)]).unwrap(), vec![json!(-5)]);
        assert_eq!(eval_unary(UnaryOp::Plus, &[json!(5)]).unwrap(), vec![json!(5)]);
        assert_eq!(eval_unary(UnaryOp::Minus, &[json!("x")]).unwrap(), Vec::<Value>::new());
        assert_eq!(eval_unary(UnaryOp::Minus, &[]).unwrap(), Vec::<Value>::new());
        assert_eq!(eval_unary(UnaryOp::Not, &[json!(true)]).unwrap(), b(false));
        assert_eq!(eval_unary(UnaryOp::Not, &[]).unwrap(), Vec::<Value>::new());
        assert!(eval_unary(UnaryOp::Not, &[json!(1)]).is_err());
        assert!(eval_unary(UnaryOp::Not, &[json!(true), json!(false)]).is_err());
    }

    // The full truth tables, cell by cell, via the public evaluator.
    mod truth_tables {
        use crate::context::EvaluationContext;
        use crate::evaluate;
        use serde_json::{json, Value};

        fn logic(expr: &str) -> Vec<Value> {
            let mut ctx = EvaluationContext::new();
            evaluate(&mut ctx, expr, &Value::Null).unwrap()
        }

        #[test]
        fn and_table() {
            assert_eq!(logic("true and true"), vec![json!(true)]);
            assert_eq!(logic("true and false"), vec![json!(false)]);
            assert_eq!(logic("true and {}"), Vec::<Value>::new());
            assert_eq!(logic("false and true"), vec![json!(false)]);
            assert_eq!(logic("false and false"), vec![json!(false)]);
            assert_eq!(logic("false and {}"), vec![json!(false)]);
            assert_eq!(logic("{} and true"), Vec::<Value>::new());
            assert_eq!(logic("{} and false"), vec![json!(false)]);
            assert_eq!(logic("{} and {}"), Vec::<Value>::new());
        }

        #[test]
        fn or_table() {
            assert_eq!(logic("true or true"), vec![json!(true)]);
            assert_eq!(logic("true or false"), vec![json!(true)]);
            assert_eq!(logic("true or {}"), vec![json!(true)]);
            assert_eq!(logic("false or true"), vec![json!(true)]);
            assert_eq!(logic("false or false"), vec![json!(false)]);
            assert_eq!(logic("false or {}"), Vec::<Value>::new());
            assert_eq!(logic("{} or true"), vec![json!(true)]);
            assert_eq!(logic("{} or false"), Vec::<Value>::new());
            assert_eq!(logic("{} or {}"), Vec::<Value>::new());
        }

        #[test]
        fn xor_table() {
            assert_eq!(logic("true xor true"), vec![json!(false)]);
            assert_eq!(logic("true xor false"), vec![json!(true)]);
            assert_eq!(logic("false xor true"), vec![json!(true)]);
            assert_eq!(logic("false xor false"), vec![json!(false)]);
            assert_eq!(logic("true xor {}"), Vec::<Value>::new());
            assert_eq!(logic("{} xor false"), Vec::<Value>::new());
            assert_eq!(logic("{} xor {}"), Vec::<Value>::new());
        }

        #[test]
        fn implies_table() {
            assert_eq!(logic("true implies true"), vec![json!(true)]);
            assert_eq!(logic("true implies false"), vec![json!(false)]);
            assert_eq!(logic("true implies {}"), Vec::<Value>::new());
            assert_eq!(logic("false implies true"), vec![json!(true)]);
            assert_eq!(logic("false implies false"), vec![json!(true)]);
            assert_eq!(logic("false implies {}"), vec![json!(true)]);
            assert_eq!(logic("{} implies true"), Vec::<Value>::new());
            assert_eq!(logic("{} implies false"), Vec::<Value>::new());
            assert_eq!(logic("{} implies {}"), Vec::<Value>::new());
        }

        #[test]
        fn short_circuit_skips_erroring_side() {
            // The right side would raise if evaluated.
            assert_eq!(logic("false and (1 and 2)"), vec![json!(false)]);
            assert_eq!(logic("true or (1 and 2)"), vec![json!(true)]);
            assert_eq!(logic("false implies (1 and 2)"), vec![json!(true)]);
        }

        #[test]
        fn non_boolean_operands_fail() {
            let mut ctx = EvaluationContext::new();
            let err = evaluate(&mut ctx, "1 and true", &Value::Null).unwrap_err();
            assert!(err
                .to_string()
                .contains("Logical operators require boolean operands"));
        }
    }
}
