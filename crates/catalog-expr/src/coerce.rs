//! Conversion of script results into typed values.
//!
//! Script results are first converted into a [`Value`], then coerced into the
//! type requested by the caller through [`FromScript`]. Null never reaches
//! these conversions: the sandbox maps it to "absent" beforehand.

use crate::error::{EvalError, EvalResult};
use catalog_core::Value;
use rhai::Dynamic;
use std::collections::BTreeMap;

/// Types a script result can be coerced into.
pub trait FromScript: Sized {
    fn from_script(value: Value) -> EvalResult<Self>;
}

impl FromScript for Value {
    fn from_script(value: Value) -> EvalResult<Self> {
        Ok(value)
    }
}

impl FromScript for String {
    fn from_script(value: Value) -> EvalResult<Self> {
        match value {
            Value::List(_) => Err(EvalError::coercion("string", "list")),
            Value::Map(_) => Err(EvalError::coercion("string", "map")),
            other => Ok(other.to_display_string()),
        }
    }
}

impl FromScript for bool {
    fn from_script(value: Value) -> EvalResult<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::String(s) => parse_bool(&s).ok_or_else(|| EvalError::coercion("bool", s)),
            other => Err(EvalError::coercion("bool", type_label(&other))),
        }
    }
}

impl FromScript for f64 {
    fn from_script(value: Value) -> EvalResult<Self> {
        match value {
            Value::Float(f) => Ok(f),
            #[allow(clippy::cast_precision_loss)]
            Value::Integer(i) => Ok(i as f64),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| EvalError::coercion("number", s)),
            other => Err(EvalError::coercion("number", type_label(&other))),
        }
    }
}

impl FromScript for i64 {
    fn from_script(value: Value) -> EvalResult<Self> {
        match value {
            Value::Integer(i) => Ok(i),
            Value::Float(f) => float_to_int(f).ok_or_else(|| EvalError::coercion("integer", f.to_string())),
            Value::String(s) => {
                let trimmed = s.trim();
                // Floats first, so "3.0" is accepted as 3.
                match trimmed.parse::<f64>() {
                    Ok(f) => float_to_int(f),
                    Err(_) => trimmed.parse::<i64>().ok(),
                }
                .ok_or_else(|| EvalError::coercion("integer", s))
            }
            other => Err(EvalError::coercion("integer", type_label(&other))),
        }
    }
}

/// Declared type of an attribute literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Bool,
    Number,
    String,
}

impl LiteralKind {
    /// Map a catalog attribute type name to the literal kind used to render it.
    #[must_use]
    pub fn for_type_name(type_name: &str) -> Self {
        match type_name {
            "Bool" => LiteralKind::Bool,
            "Number" => LiteralKind::Number,
            _ => LiteralKind::String,
        }
    }
}

/// Render a value as an attribute literal of the given kind.
///
/// Bool and number kinds try a direct coercion and fall back to the string
/// representation when it fails. Composite values are rejected.
pub fn coerce_literal(value: Value, kind: LiteralKind) -> EvalResult<String> {
    if matches!(value, Value::List(_) | Value::Map(_)) {
        return Err(EvalError::coercion("literal", type_label(&value)));
    }

    let direct = match kind {
        LiteralKind::Bool => bool::from_script(value.clone()).ok().map(|b| b.to_string()),
        LiteralKind::Number => f64::from_script(value.clone()).ok().map(|f| f.to_string()),
        LiteralKind::String => None,
    };

    match direct {
        Some(literal) => Ok(literal),
        None => String::from_script(value),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_int(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn type_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Integer(_) => "integer",
        Value::Float(_) => "float",
        Value::String(_) => "string",
        Value::List(_) => "list",
        Value::Map(_) => "map",
    }
}

/// Convert an engine value into a [`Value`].
pub(crate) fn from_dynamic(value: Dynamic) -> EvalResult<Value> {
    if value.is_unit() {
        return Ok(Value::Null);
    }
    if let Ok(b) = value.as_bool() {
        return Ok(Value::Bool(b));
    }
    if let Ok(i) = value.as_int() {
        return Ok(Value::Integer(i));
    }
    if let Ok(f) = value.as_float() {
        return Ok(Value::Float(f));
    }
    if let Ok(c) = value.as_char() {
        return Ok(Value::String(c.to_string()));
    }
    if value.is_string() {
        return value
            .into_string()
            .map(Value::String)
            .map_err(|found| EvalError::coercion("string", found));
    }
    if value.is_array() {
        let items = value
            .into_array()
            .map_err(|found| EvalError::coercion("array", found))?;
        return items
            .into_iter()
            .map(from_dynamic)
            .collect::<EvalResult<Vec<_>>>()
            .map(Value::List);
    }
    if value.is_map() {
        let type_name = value.type_name();
        let map = value
            .try_cast::<rhai::Map>()
            .ok_or_else(|| EvalError::coercion("map", type_name))?;
        return map
            .into_iter()
            .map(|(key, item)| Ok((key.to_string(), from_dynamic(item)?)))
            .collect::<EvalResult<BTreeMap<_, _>>>()
            .map(Value::Map);
    }

    Err(EvalError::coercion("value", value.type_name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_from_scalars() {
        assert_eq!(String::from_script(Value::from("x")).unwrap(), "x");
        assert_eq!(String::from_script(Value::Integer(5)).unwrap(), "5");
        assert_eq!(String::from_script(Value::Bool(true)).unwrap(), "true");
        assert!(String::from_script(Value::List(vec![])).is_err());
    }

    #[test]
    fn test_bool_coercion() {
        assert!(bool::from_script(Value::Bool(true)).unwrap());
        assert!(!bool::from_script(Value::from("False")).unwrap());
        assert!(bool::from_script(Value::from("yes")).is_err());
        assert!(bool::from_script(Value::Integer(1)).is_err());
    }

    #[test]
    fn test_integer_tries_float_first() {
        assert_eq!(i64::from_script(Value::from("3.0")).unwrap(), 3);
        assert_eq!(i64::from_script(Value::from(" 12 ")).unwrap(), 12);
        assert_eq!(i64::from_script(Value::Float(4.0)).unwrap(), 4);
        assert!(i64::from_script(Value::from("3.5")).is_err());
        assert!(i64::from_script(Value::from("abc")).is_err());
    }

    #[test]
    fn test_literal_number_falls_back_to_string() {
        assert_eq!(coerce_literal(Value::Integer(7), LiteralKind::Number).unwrap(), "7");
        assert_eq!(coerce_literal(Value::from("2.50"), LiteralKind::Number).unwrap(), "2.5");
        assert_eq!(coerce_literal(Value::from("n/a"), LiteralKind::Number).unwrap(), "n/a");
    }

    #[test]
    fn test_literal_bool_falls_back_to_string() {
        assert_eq!(coerce_literal(Value::from("TRUE"), LiteralKind::Bool).unwrap(), "true");
        assert_eq!(coerce_literal(Value::Integer(1), LiteralKind::Bool).unwrap(), "1");
    }

    #[test]
    fn test_literal_string_uses_representation() {
        assert_eq!(coerce_literal(Value::Float(1.5), LiteralKind::String).unwrap(), "1.5");
        assert_eq!(coerce_literal(Value::from("3.0"), LiteralKind::String).unwrap(), "3.0");
    }

    #[test]
    fn test_literal_rejects_composites() {
        let err = coerce_literal(Value::Map(BTreeMap::new()), LiteralKind::String).unwrap_err();
        assert_eq!(err.to_string(), "cannot convert map to literal");
    }

    #[test]
    fn test_literal_kind_for_type_name() {
        assert_eq!(LiteralKind::for_type_name("Bool"), LiteralKind::Bool);
        assert_eq!(LiteralKind::for_type_name("Number"), LiteralKind::Number);
        assert_eq!(LiteralKind::for_type_name("Text"), LiteralKind::String);
        assert_eq!(LiteralKind::for_type_name(r#"Custom["Team"]"#), LiteralKind::String);
    }

    #[test]
    fn test_from_dynamic() {
        let mut map = rhai::Map::new();
        map.insert("a".into(), Dynamic::from(1_i64));
        map.insert("b".into(), Dynamic::from_array(vec![Dynamic::from("x"), Dynamic::UNIT]));
        let value = from_dynamic(Dynamic::from_map(map)).unwrap();
        assert_eq!(value.get("a"), Some(&Value::Integer(1)));
        assert_eq!(
            value.get("b"),
            Some(&Value::List(vec![Value::from("x"), Value::Null]))
        );
        assert_eq!(from_dynamic(Dynamic::UNIT).unwrap(), Value::Null);
        assert_eq!(from_dynamic(Dynamic::from('c')).unwrap(), Value::from("c"));
    }
}
