//! Operations on [`Value`] shared by the evaluator, filters and
//! builtin functions.
use crate::log::{Error, INCOMPATIBLE_TYPES};
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Return a short name for the type of a [`Value`].
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "none",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

/// Return the truth of a [`Value`].
///
/// None and false are false, numbers are false when zero, and
/// strings, lists and mappings are false when empty.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(boolean) => *boolean,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(string) => !string.is_empty(),
        Value::Array(array) => !array.is_empty(),
        Value::Object(object) => !object.is_empty(),
    }
}

/// Compare two values for equality.
///
/// Numbers compare by numeric value, so `1` equals `1.0`.
pub fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left.as_f64() == right.as_f64(),
        _ => left == right,
    }
}

/// Order two values, when they are of an orderable type.
///
/// Numbers order numerically and strings lexicographically, any other
/// combination has no order.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => {
            left.as_f64().partial_cmp(&right.as_f64())
        }
        (Value::String(left), Value::String(right)) => Some(left.cmp(right)),
        _ => None,
    }
}

/// Test membership of `item` within `collection`.
///
/// Lists test element membership, strings test substring containment
/// and mappings test key presence.
pub fn contains(collection: &Value, item: &Value) -> Result<bool, Error> {
    match collection {
        Value::Array(array) => Ok(array.iter().any(|element| equals(element, item))),
        Value::String(string) => match item {
            Value::String(needle) => Ok(string.contains(needle.as_str())),
            _ => Err(Error::incompatible(INCOMPATIBLE_TYPES).with_help(format!(
                "`in` on a string expects a string, found {}",
                type_name(item)
            ))),
        },
        Value::Object(object) => match item {
            Value::String(key) => Ok(object.contains_key(key)),
            _ => Err(Error::incompatible(INCOMPATIBLE_TYPES).with_help(format!(
                "`in` on a mapping expects a string key, found {}",
                type_name(item)
            ))),
        },
        _ => Err(Error::incompatible(INCOMPATIBLE_TYPES).with_help(format!(
            "`in` expects a list, string or mapping, found {}",
            type_name(collection)
        ))),
    }
}

/// Add two values.
///
/// Numbers add, strings and lists concatenate.
pub fn add(left: &Value, right: &Value) -> Result<Value, Error> {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => arithmetic(left, right, "+", i64::checked_add, |a, b| a + b),
        (Value::String(left), Value::String(right)) => {
            Ok(Value::String(format!("{left}{right}")))
        }
        (Value::Array(left), Value::Array(right)) => {
            let mut joined = left.clone();
            joined.extend(right.iter().cloned());
            Ok(Value::Array(joined))
        }
        _ => Err(incompatible("+", left, right)),
    }
}

/// Subtract `right` from `left`.
pub fn subtract(left: &Value, right: &Value) -> Result<Value, Error> {
    arithmetic(left, right, "-", i64::checked_sub, |a, b| a - b)
}

/// Multiply two values.
///
/// A string multiplied by a non-negative integer repeats.
pub fn multiply(left: &Value, right: &Value) -> Result<Value, Error> {
    match (left, right) {
        (Value::String(string), Value::Number(count))
        | (Value::Number(count), Value::String(string)) => match count.as_i64() {
            Some(count) if count >= 0 => Ok(Value::String(string.repeat(count as usize))),
            _ => Err(incompatible("*", left, right)),
        },
        _ => arithmetic(left, right, "*", i64::checked_mul, |a, b| a * b),
    }
}

/// Divide `left` by `right`. Division always produces a float.
pub fn divide(left: &Value, right: &Value) -> Result<Value, Error> {
    match (as_f64(left), as_f64(right)) {
        (Some(_), Some(divisor)) if divisor == 0.0 => {
            Err(Error::incompatible("division by zero"))
        }
        (Some(left), Some(right)) => float(left / right),
        _ => Err(incompatible("/", left, right)),
    }
}

/// Return the remainder of `left` divided by `right`.
///
/// The result takes the sign of the divisor, so `7 % -3` is `-2` and
/// `-7 % 3` is `2`.
pub fn remainder(left: &Value, right: &Value) -> Result<Value, Error> {
    match (left.as_i64(), right.as_i64()) {
        (Some(_), Some(0)) => Err(Error::incompatible("division by zero")),
        (Some(left), Some(right)) => {
            Ok(Value::from(((left % right) + right) % right))
        }
        _ => match (as_f64(left), as_f64(right)) {
            (Some(_), Some(divisor)) if divisor == 0.0 => {
                Err(Error::incompatible("division by zero"))
            }
            (Some(left), Some(right)) => float(((left % right) + right) % right),
            _ => Err(incompatible("%", left, right)),
        },
    }
}

/// Negate a numeric value.
pub fn negate(value: &Value) -> Result<Value, Error> {
    match value {
        Value::Number(number) => match number.as_i64() {
            Some(integer) => Ok(Value::from(-integer)),
            None => float(-number.as_f64().unwrap_or(0.0)),
        },
        _ => Err(Error::incompatible(INCOMPATIBLE_TYPES)
            .with_help(format!("cannot negate {}", type_name(value)))),
    }
}

/// Render a value as display text.
///
/// None renders as nothing and strings render without quotes, other
/// values use their JSON form.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(string) => string.clone(),
        Value::Bool(boolean) => boolean.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        _ => None,
    }
}

/// Apply a numeric operator, keeping integers when both sides are
/// integers and the result does not overflow.
fn arithmetic(
    left: &Value,
    right: &Value,
    operator: &str,
    integer: fn(i64, i64) -> Option<i64>,
    floating: fn(f64, f64) -> f64,
) -> Result<Value, Error> {
    if let (Some(left), Some(right)) = (left.as_i64(), right.as_i64()) {
        if let Some(result) = integer(left, right) {
            return Ok(Value::from(result));
        }
    }
    match (as_f64(left), as_f64(right)) {
        (Some(left), Some(right)) => float(floating(left, right)),
        _ => Err(incompatible(operator, left, right)),
    }
}

fn float(value: f64) -> Result<Value, Error> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| Error::incompatible("result is not a representable number"))
}

fn incompatible(operator: &str, left: &Value, right: &Value) -> Error {
    Error::incompatible(INCOMPATIBLE_TYPES).with_help(format!(
        "`{operator}` is not supported between {} and {}",
        type_name(left),
        type_name(right)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!(0.5)));
        assert!(is_truthy(&json!("no")));
        assert!(is_truthy(&json!({"a": 1})));
    }

    #[test]
    fn test_numeric_equality() {
        assert!(equals(&json!(1), &json!(1.0)));
        assert!(!equals(&json!(1), &json!("1")));
    }

    #[test]
    fn test_contains() {
        assert!(contains(&json!([1, 2, 3]), &json!(2)).unwrap());
        assert!(contains(&json!("carpet"), &json!("arp")).unwrap());
        assert!(contains(&json!({"a": 1}), &json!("a")).unwrap());
        assert!(contains(&json!(10), &json!(1)).is_err());
    }

    #[test]
    fn test_add() {
        assert_eq!(add(&json!(2), &json!(3)).unwrap(), json!(5));
        assert_eq!(add(&json!("a"), &json!("b")).unwrap(), json!("ab"));
        assert_eq!(add(&json!([1]), &json!([2])).unwrap(), json!([1, 2]));
        assert!(add(&json!(1), &json!("b")).is_err());
    }

    #[test]
    fn test_divide_is_float() {
        assert_eq!(divide(&json!(7), &json!(2)).unwrap(), json!(3.5));
        assert!(divide(&json!(7), &json!(0)).is_err());
    }

    #[test]
    fn test_remainder_takes_divisor_sign() {
        assert_eq!(remainder(&json!(7), &json!(3)).unwrap(), json!(1));
        assert_eq!(remainder(&json!(7), &json!(-3)).unwrap(), json!(-2));
        assert_eq!(remainder(&json!(-7), &json!(3)).unwrap(), json!(2));
        assert!(remainder(&json!(7), &json!(0)).is_err());
    }

    #[test]
    fn test_multiply_repeats_strings() {
        assert_eq!(multiply(&json!("ab"), &json!(3)).unwrap(), json!("ababab"));
        assert!(multiply(&json!("ab"), &json!(-1)).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(display(&json!(null)), "");
        assert_eq!(display(&json!("text")), "text");
        assert_eq!(display(&json!([1, 2])), "[1,2]");
    }
}
