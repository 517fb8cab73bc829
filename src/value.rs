//! Helpers over `serde_json::Value` used throughout the engine.
//!
//! The engine works directly on `serde_json::Value` (built with
//! `preserve_order`, so object keys keep insertion order). This module
//! collects the cross-cutting value operations: truthiness, display
//! formatting for interpolation, shallow merging, and the "fully resolved"
//! check that `#concat` and multi-pass callers rely on.

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde_json::{Map, Number, Value};

/// Ordered JSON object, re-exported for signatures.
pub type Object = Map<String, Value>;

/// Returns a human-readable type name for a value.
pub fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Script-style truthiness: `null`, `false`, `0`, and `""` are falsy,
/// everything else (including empty arrays and objects) is truthy.
pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Default display formatting for values embedded in strings.
///
/// Numbers drop a trailing `.0`, arrays join their elements with commas,
/// `null` renders as the empty string, and objects fall back to compact
/// JSON. This is the function threaded through [`crate::context::Context`]
/// as the default formatter.
pub fn display(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => display_number(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display).collect::<Vec<_>>().join(","),
        Value::Object(_) => serde_json::to_string(v).unwrap_or_default(),
    }
}

fn display_number(n: &Number) -> String {
    if n.as_i64().is_none()
        && n.as_u64().is_none()
        && let Some(f) = n.as_f64()
        && f.is_finite()
        && f.fract() == 0.0
        && f.abs() < 9.0e15
    {
        return format!("{}", f as i64);
    }
    n.to_string()
}

/// Shallow-merges `overlay` into `base`, later keys overriding earlier ones.
pub fn shallow_merge(base: &mut Object, overlay: &Object) {
    for (k, v) in overlay {
        base.insert(k.clone(), v.clone());
    }
}

/// True when the tree contains no interpolation tokens and no
/// directive-shaped keys, i.e. it has reached a fixed point.
pub fn is_fully_resolved(v: &Value) -> bool {
    match v {
        Value::String(s) => !contains_token(s),
        Value::Array(items) => items.iter().all(is_fully_resolved),
        Value::Object(map) => map.iter().all(|(k, v)| {
            !contains_token(k) && crate::directive::tokenize(k).is_err() && is_fully_resolved(v)
        }),
        _ => true,
    }
}

fn contains_token(s: &str) -> bool {
    s.contains("{{") && s.contains("}}")
}

/// Numeric equality that ignores the integer/float representation split,
/// falling back to structural equality for everything else.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(fx), Some(fy)) => fx == fy,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| loose_eq(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| loose_eq(v, w)))
        }
        _ => a == b,
    }
}

/// Converts a JSON number to a `Decimal` for exact mixed arithmetic.
pub fn as_decimal(n: &Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        Decimal::from_i64(i)
    } else if let Some(u) = n.as_u64() {
        Decimal::from_u64(u)
    } else {
        n.as_f64().and_then(Decimal::from_f64)
    }
}

/// Converts a `Decimal` back to a JSON number, preserving integers.
pub fn number_from_decimal(d: Decimal) -> Option<Number> {
    if d.is_integer()
        && let Some(i) = d.to_i64()
    {
        return Some(Number::from(i));
    }
    d.to_f64().and_then(Number::from_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_joins_arrays_with_commas() {
        assert_eq!(display(&json!([1, 2, 3])), "1,2,3");
        assert_eq!(display(&json!(["a", null, "b"])), "a,,b");
    }

    #[test]
    fn display_drops_trailing_zero() {
        assert_eq!(display(&json!(3.0)), "3");
        assert_eq!(display(&json!(3.5)), "3.5");
    }

    #[test]
    fn truthiness_follows_script_rules() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!("x")));
    }

    #[test]
    fn fully_resolved_spots_directives_and_tokens() {
        assert!(is_fully_resolved(&json!({"a": [1, "b"]})));
        assert!(!is_fully_resolved(&json!({"a": "{{name}}"})));
        assert!(!is_fully_resolved(&json!({"{{#each items}}": {"x": 1}})));
    }
}
