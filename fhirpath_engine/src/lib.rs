//! FHIRPath expression engine
//!
//! The complete pipeline from expression text to result sequence: the
//! `fhirpath_compiler` crate tokenizes and parses, this crate compiles the
//! tree into an executable form and evaluates it against JSON documents
//! with collection semantics, three-valued logic, and temporal comparison.
//!
//! ```
//! use fhirpath_engine::{evaluate, EvaluationContext};
//! use serde_json::json;
//!
//! let mut ctx = EvaluationContext::new();
//! let patient = json!({
//!     "resourceType": "Patient",
//!     "name": [{"use": "official", "given": ["John", "Q"]}],
//! });
//! let given = evaluate(&mut ctx, "name.where(use = 'official').given", &patient).unwrap();
//! assert_eq!(given, vec![json!("John"), json!("Q")]);
//! ```

// Internal modules
pub mod compile;
pub mod context;
pub mod error;
pub mod eval;
pub mod functions;
pub mod model;

// Re-export key types for library consumers
pub use compile::{compile, CompiledNode};
pub use compile::error::CompileError;
pub use context::{CacheStats, ContextBuilder, CustomFunction, EvaluationContext};
pub use error::{EngineError, EvalError};
pub use eval::{evaluate, precompile};
pub use fhirpath_compiler::{parse, Expr, ParseError};
pub use model::{Sequence, Value};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(expr: &str, data: &Value) -> Sequence {
        let mut ctx = EvaluationContext::new();
        evaluate(&mut ctx, expr, data).unwrap_or_else(|e| panic!("{expr}: {e}"))
    }

    // The six end-to-end scenarios.

    #[test]
    fn scenario_where_then_navigate() {
        let doc = json!({"name": [
            {"use": "official", "family": "Doe", "given": ["John", "Q"]},
            {"use": "nickname", "given": ["Johnny"]},
        ]});
        assert_eq!(
            eval("name.where(use = 'official').given", &doc),
            vec![json!("John"), json!("Q")]
        );
    }

    #[test]
    fn scenario_first_over_flattened() {
        let doc = json!({"name": [{"given": ["John", "W"]}, {"given": ["Jane"]}]});
        assert_eq!(eval("name.given.first()", &doc), vec![json!("John")]);
    }

    #[test]
    fn scenario_union_sum() {
        assert_eq!(eval("(1 | 2 | 3).sum()", &Value::Null), vec![json!(6)]);
    }

    #[test]
    fn scenario_string_fallback_addition() {
        assert_eq!(eval("'hello' + 2", &Value::Null), vec![json!("hello2")]);
    }

    #[test]
    fn scenario_three_valued_logic_on_missing_field() {
        let doc = json!({"age": 25, "active": true});
        assert_eq!(eval("age > 18 and active", &doc), vec![json!(true)]);
        let doc = json!({"age": 25});
        assert_eq!(eval("age > 18 and active", &doc), Vec::<Value>::new());
    }

    #[test]
    fn scenario_chained_indexers() {
        let doc = json!({"name": [
            {"use": "official", "family": "Doe", "given": ["John", "Q"]},
            {"use": "nickname", "given": ["Johnny"]},
        ]});
        assert_eq!(eval("name[0].given[0]", &doc), vec![json!("John")]);
    }

    // Universal invariants.

    #[test]
    fn evaluation_always_yields_a_sequence() {
        for expr in ["{}", "missing", "1", "'s'", "1 = 1", "{} = {}"] {
            let mut ctx = EvaluationContext::new();
            // The call type is Vec; what matters is it never panics and
            // empties are sequences, not nulls.
            let out = evaluate(&mut ctx, expr, &json!({})).unwrap();
            drop(out);
        }
    }

    #[test]
    fn literal_expressions_are_deterministic() {
        let mut ctx = EvaluationContext::new();
        let doc = json!({"x": [3, 1, 2]});
        for expr in ["1 + 2 * 3", "x.distinct().sum()", "('a' | 'b').count()"] {
            let a = evaluate(&mut ctx, expr, &doc).unwrap();
            let b = evaluate(&mut ctx, expr, &doc).unwrap();
            assert_eq!(a, b, "{expr}");
        }
    }

    #[test]
    fn union_is_commutative_up_to_order() {
        let doc = json!({"a": [1, 2], "b": [2, 3]});
        let mut ab = eval("a | b", &doc);
        let mut ba = eval("b | a", &doc);
        ab.sort_by_key(model::canonical_key);
        ba.sort_by_key(model::canonical_key);
        assert_eq!(ab, ba);
    }

    #[test]
    fn parse_compile_evaluate_are_separable() {
        let ast = parse("name.given.count()").unwrap();
        let compiled = compile(&ast).unwrap();
        let mut ctx = EvaluationContext::new();
        let doc = json!({"name": [{"given": ["a", "b"]}]});
        let out = compiled.eval(&[doc.clone()], &doc, &mut ctx).unwrap();
        assert_eq!(out, vec![json!(2)]);
    }

    #[test]
    fn parse_errors_surface_with_positions() {
        let mut ctx = EvaluationContext::new();
        let err = evaluate(&mut ctx, "name.", &json!({})).unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("line 1"), "{rendered}");

        let err = evaluate(&mut ctx, "", &json!({})).unwrap_err();
        assert!(err.to_string().contains("Empty expression"));
    }

    #[test]
    fn compile_errors_surface_through_evaluate() {
        let mut ctx = EvaluationContext::new();
        let err = evaluate(&mut ctx, "iif(true, 1)", &json!({})).unwrap_err();
        assert!(err.to_string().contains("iif"));
        // Failed expressions are not cached.
        assert_eq!(ctx.cache_stats().size, 0);
    }

    #[test]
    fn quantity_literals_evaluate_to_records() {
        assert_eq!(
            eval("4 days", &Value::Null),
            vec![json!({"value": 4, "unit": "days"})]
        );
        assert_eq!(
            eval("5.5 'mg'", &Value::Null),
            vec![json!({"value": 5.5, "unit": "mg"})]
        );
    }

    #[test]
    fn temporal_literals_and_comparison_end_to_end() {
        let doc = json!({"birthDate": "1990-06-15"});
        assert_eq!(eval("birthDate < @2000", &doc), vec![json!(true)]);
        assert_eq!(eval("birthDate > @1990", &doc), vec![json!(false)]);
        assert_eq!(
            eval("@2023-05-10 - @2023-05-01", &Value::Null),
            vec![json!({"value": 9, "unit": "days"})]
        );
    }
}
