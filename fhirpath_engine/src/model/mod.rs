//! Runtime value model
//!
//! Values are dynamically typed JSON (`serde_json::Value`); every expression
//! evaluates to an ordered sequence of them. There is no null result: an
//! absent value is an empty sequence. A quantity is an object with a numeric
//! `value` field, which is what distinguishes it from a plain object.

pub mod temporal;

pub use serde_json::Value;

/// The sole result shape of every expression.
pub type Sequence = Vec<Value>;

/// Root resource type names that act as type filters in identifier position
/// (`Patient.name` keeps the focus only when the document says it is a
/// Patient).
pub const RESOURCE_TYPES: &[&str] = &[
    "Account",
    "AllergyIntolerance",
    "Appointment",
    "Bundle",
    "CarePlan",
    "CareTeam",
    "Claim",
    "ClaimResponse",
    "CodeSystem",
    "Communication",
    "Composition",
    "Condition",
    "Consent",
    "Coverage",
    "Device",
    "DiagnosticReport",
    "DocumentReference",
    "Encounter",
    "Endpoint",
    "EpisodeOfCare",
    "ExplanationOfBenefit",
    "FamilyMemberHistory",
    "Flag",
    "Goal",
    "Group",
    "HealthcareService",
    "ImagingStudy",
    "Immunization",
    "Library",
    "List",
    "Location",
    "Measure",
    "MeasureReport",
    "Medication",
    "MedicationAdministration",
    "MedicationDispense",
    "MedicationRequest",
    "MedicationStatement",
    "Observation",
    "Organization",
    "Patient",
    "Practitioner",
    "PractitionerRole",
    "Procedure",
    "Provenance",
    "Questionnaire",
    "QuestionnaireResponse",
    "RelatedPerson",
    "RiskAssessment",
    "Schedule",
    "ServiceRequest",
    "Slot",
    "Specimen",
    "StructureDefinition",
    "Task",
    "ValueSet",
];

pub fn is_resource_type(name: &str) -> bool {
    RESOURCE_TYPES.binary_search(&name).is_ok()
}

/// Build a JSON number, collapsing integral floats to integers so results
/// print as `6` rather than `6.0`.
pub fn number_value(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

pub fn as_number(v: &Value) -> Option<f64> {
    v.as_f64()
}

/// An integer-valued number (used by indexers, `skip`, `take`).
pub fn as_integer(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            }
        }
        _ => None,
    }
}

/// Quantity records are objects with a numeric `value` field.
pub fn is_quantity(v: &Value) -> bool {
    matches!(v, Value::Object(map) if map.get("value").map(|f| f.is_number()).unwrap_or(false))
}

pub fn quantity_parts(v: &Value) -> Option<(f64, Option<&str>)> {
    let map = v.as_object()?;
    let value = map.get("value")?.as_f64()?;
    let unit = map.get("unit").and_then(Value::as_str);
    Some((value, unit))
}

/// Classify an element the way `type()` reports it.
pub fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "Null",
        Value::Bool(_) => "Boolean",
        Value::Number(n) => {
            if n.as_i64().is_some() || n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false) {
                "Integer"
            } else {
                "Decimal"
            }
        }
        Value::String(s) => match temporal::parse_temporal(s) {
            Some(t) => match t.kind {
                temporal::TemporalKind::Date => "Date",
                temporal::TemporalKind::Time => "Time",
                temporal::TemporalKind::DateTime => "DateTime",
            },
            None => "String",
        },
        Value::Array(_) => "List",
        Value::Object(_) => {
            if is_quantity(v) {
                "Quantity"
            } else {
                "Object"
            }
        }
    }
}

/// A stable structural key: canonical JSON with sorted object keys and
/// normalized numbers. Used for union dedup, `distinct`, and membership.
pub fn canonical_key(v: &Value) -> String {
    let mut out = String::new();
    write_canonical(v, &mut out);
    out
}

fn write_canonical(v: &Value, out: &mut String) {
    match v {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 {
                    out.push_str(&(f as i64).to_string());
                } else {
                    out.push_str(&f.to_string());
                }
            } else {
                out.push_str(&n.to_string());
            }
        }
        Value::String(s) => {
            out.push_str(&serde_json::to_string(s).unwrap_or_default());
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).unwrap_or_default());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
    }
}

/// The string rendering used by `toString()` and string-fallback `+`.
/// Complex values other than quantities have no string form.
pub fn display_value(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 {
                    return Some((f as i64).to_string());
                }
            }
            Some(n.to_string())
        }
        Value::Object(_) => quantity_parts(v).map(|(value, unit)| match unit {
            Some(unit) => format!("{} '{}'", number_value(value), unit),
            None => number_value(value).to_string(),
        }),
        _ => None,
    }
}

/// Deduplicate by structural key, keeping first occurrences in order.
pub fn dedup_values(values: Vec<Value>) -> Vec<Value> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(values.len());
    for v in values {
        if seen.insert(canonical_key(&v)) {
            out.push(v);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resource_type_list_is_sorted_for_binary_search() {
        let mut sorted = RESOURCE_TYPES.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, RESOURCE_TYPES);
        assert!(is_resource_type("Patient"));
        assert!(is_resource_type("Observation"));
        assert!(!is_resource_type("name"));
    }

    #[test]
    fn number_value_collapses_integral_floats() {
        assert_eq!(number_value(6.0), json!(6));
        assert_eq!(number_value(2.5), json!(2.5));
        assert_eq!(serde_json::to_string(&number_value(6.0)).unwrap(), "6");
    }

    #[test]
    fn integer_extraction() {
        assert_eq!(as_integer(&json!(3)), Some(3));
        assert_eq!(as_integer(&json!(3.0)), Some(3));
        assert_eq!(as_integer(&json!(3.5)), None);
        assert_eq!(as_integer(&json!("3")), None);
    }

    #[test]
    fn quantity_detection() {
        assert!(is_quantity(&json!({"value": 5, "unit": "mg"})));
        assert!(is_quantity(&json!({"value": 5.5})));
        assert!(!is_quantity(&json!({"value": "high"})));
        assert!(!is_quantity(&json!({"unit": "mg"})));
        assert_eq!(
            quantity_parts(&json!({"value": 5, "unit": "mg"})),
            Some((5.0, Some("mg")))
        );
    }

    #[test]
    fn type_classification() {
        assert_eq!(type_name(&json!(true)), "Boolean");
        assert_eq!(type_name(&json!(3)), "Integer");
        assert_eq!(type_name(&json!(3.5)), "Decimal");
        assert_eq!(type_name(&json!("text")), "String");
        assert_eq!(type_name(&json!("2023-05-01")), "Date");
        assert_eq!(type_name(&json!("T14:30:00")), "Time");
        assert_eq!(type_name(&json!("2023-05-01T14:30:00Z")), "DateTime");
        assert_eq!(type_name(&json!([1])), "List");
        assert_eq!(type_name(&json!({"a": 1})), "Object");
        assert_eq!(type_name(&json!({"value": 1})), "Quantity");
        assert_eq!(type_name(&Value::Null), "Null");
    }

    #[test]
    fn canonical_key_sorts_object_keys_and_normalizes_numbers() {
        let a = json!({"b": 1, "a": 2.0});
        let b = json!({"a": 2, "b": 1.0});
        assert_eq!(canonical_key(&a), canonical_key(&b));
        assert_ne!(canonical_key(&json!(1)), canonical_key(&json!("1")));
    }

    #[test]
    fn display_renders_scalars_and_quantities() {
        assert_eq!(display_value(&json!("x")), Some("x".into()));
        assert_eq!(display_value(&json!(2)), Some("2".into()));
        assert_eq!(display_value(&json!(2.0)), Some("2".into()));
        assert_eq!(display_value(&json!(true)), Some("true".into()));
        assert_eq!(
            display_value(&json!({"value": 5, "unit": "mg"})),
            Some("5 'mg'".into())
        );
        assert_eq!(display_value(&json!({"a": 1})), None);
        assert_eq!(display_value(&json!([1])), None);
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let out = dedup_values(vec![json!(2), json!(1), json!(2.0), json!(1)]);
        assert_eq!(out, vec![json!(2), json!(1)]);
    }
}
