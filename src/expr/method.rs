//! Whitelisted methods.
//!
//! A small fixed table of methods that expressions may call on
//! values. Anything not listed here resolves as a filter instead, or
//! fails, so context data can never reach arbitrary behavior.
use super::value::{equals, type_name};
use crate::log::{Error, INCOMPATIBLE_TYPES};
use serde_json::Value;

pub type Method = fn(&Value, &[Value]) -> Result<Value, Error>;

/// Look up a method by receiver type and name.
pub fn lookup(receiver: &Value, name: &str) -> Option<Method> {
    let entry = match (receiver, name) {
        (Value::String(_), "upper") => upper as Method,
        (Value::String(_), "lower") => lower,
        (Value::String(_), "title") => title,
        (Value::String(_), "capitalize") => capitalize,
        (Value::String(_), "strip") => strip,
        (Value::String(_), "lstrip") => lstrip,
        (Value::String(_), "rstrip") => rstrip,
        (Value::String(_), "startswith") => startswith,
        (Value::String(_), "endswith") => endswith,
        (Value::Array(_), "count") => count,
        (Value::Array(_), "index") => index,
        (Value::Array(_), "get") => list_get,
        (Value::Object(_), "count") => count,
        (Value::Object(_), "get") => mapping_get,
        (Value::Object(_), "keys") => keys,
        (Value::Object(_), "values") => values,
        (Value::Object(_), "items") => items,
        _ => return None,
    };

    Some(entry)
}

fn text(receiver: &Value) -> &str {
    match receiver {
        Value::String(string) => string,
        _ => unreachable!("method is only registered for strings"),
    }
}

fn no_arguments(name: &str, arguments: &[Value]) -> Result<(), Error> {
    if arguments.is_empty() {
        return Ok(());
    }

    Err(Error::incompatible(format!("`{name}` takes no arguments")))
}

fn string_argument<'a>(name: &str, arguments: &'a [Value]) -> Result<&'a str, Error> {
    match arguments {
        [Value::String(argument)] => Ok(argument),
        [other] => Err(Error::incompatible(INCOMPATIBLE_TYPES)
            .with_help(format!("`{name}` expects a string, found {}", type_name(other)))),
        _ => Err(Error::incompatible(format!("`{name}` takes one argument"))),
    }
}

fn upper(receiver: &Value, arguments: &[Value]) -> Result<Value, Error> {
    no_arguments("upper", arguments)?;
    Ok(Value::String(text(receiver).to_uppercase()))
}

fn lower(receiver: &Value, arguments: &[Value]) -> Result<Value, Error> {
    no_arguments("lower", arguments)?;
    Ok(Value::String(text(receiver).to_lowercase()))
}

fn title(receiver: &Value, arguments: &[Value]) -> Result<Value, Error> {
    no_arguments("title", arguments)?;
    Ok(Value::String(title_case(text(receiver))))
}

/// Uppercase the first letter of every word, lowercase the rest.
pub(crate) fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut boundary = true;
    for char in text.chars() {
        if char.is_alphanumeric() {
            if boundary {
                result.extend(char.to_uppercase());
            } else {
                result.extend(char.to_lowercase());
            }
            boundary = false;
        } else {
            result.push(char);
            boundary = true;
        }
    }

    result
}

fn capitalize(receiver: &Value, arguments: &[Value]) -> Result<Value, Error> {
    no_arguments("capitalize", arguments)?;
    let mut chars = text(receiver).chars();
    Ok(Value::String(match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }))
}

fn strip(receiver: &Value, arguments: &[Value]) -> Result<Value, Error> {
    no_arguments("strip", arguments)?;
    Ok(Value::String(text(receiver).trim().to_string()))
}

fn lstrip(receiver: &Value, arguments: &[Value]) -> Result<Value, Error> {
    no_arguments("lstrip", arguments)?;
    Ok(Value::String(text(receiver).trim_start().to_string()))
}

fn rstrip(receiver: &Value, arguments: &[Value]) -> Result<Value, Error> {
    no_arguments("rstrip", arguments)?;
    Ok(Value::String(text(receiver).trim_end().to_string()))
}

fn startswith(receiver: &Value, arguments: &[Value]) -> Result<Value, Error> {
    let prefix = string_argument("startswith", arguments)?;
    Ok(Value::Bool(text(receiver).starts_with(prefix)))
}

fn endswith(receiver: &Value, arguments: &[Value]) -> Result<Value, Error> {
    let suffix = string_argument("endswith", arguments)?;
    Ok(Value::Bool(text(receiver).ends_with(suffix)))
}

fn count(receiver: &Value, arguments: &[Value]) -> Result<Value, Error> {
    no_arguments("count", arguments)?;
    let count = match receiver {
        Value::Array(array) => array.len(),
        Value::Object(object) => object.len(),
        _ => unreachable!("method is only registered for lists and mappings"),
    };

    Ok(Value::from(count))
}

fn index(receiver: &Value, arguments: &[Value]) -> Result<Value, Error> {
    let [needle] = arguments else {
        return Err(Error::incompatible("`index` takes one argument"));
    };
    let Value::Array(array) = receiver else {
        unreachable!("method is only registered for lists");
    };
    match array.iter().position(|element| equals(element, needle)) {
        Some(position) => Ok(Value::from(position)),
        None => Err(Error::incompatible("value is not in the list")),
    }
}

fn list_get(receiver: &Value, arguments: &[Value]) -> Result<Value, Error> {
    let (index, fallback) = match arguments {
        [index] => (index, None),
        [index, fallback] => (index, Some(fallback)),
        _ => return Err(Error::incompatible("`get` takes one or two arguments")),
    };
    let Value::Array(array) = receiver else {
        unreachable!("method is only registered for lists");
    };
    let Some(index) = index.as_i64() else {
        return Err(Error::incompatible(INCOMPATIBLE_TYPES)
            .with_help(format!("`get` expects a number, found {}", type_name(index))));
    };
    let position = if index < 0 {
        array.len().checked_sub(index.unsigned_abs() as usize)
    } else {
        Some(index as usize)
    };

    Ok(position
        .and_then(|position| array.get(position))
        .or(fallback)
        .cloned()
        .unwrap_or(Value::Null))
}

fn mapping_get(receiver: &Value, arguments: &[Value]) -> Result<Value, Error> {
    let (key, fallback) = match arguments {
        [key] => (key, None),
        [key, fallback] => (key, Some(fallback)),
        _ => return Err(Error::incompatible("`get` takes one or two arguments")),
    };
    let Value::Object(object) = receiver else {
        unreachable!("method is only registered for mappings");
    };
    let Value::String(key) = key else {
        return Err(Error::incompatible(INCOMPATIBLE_TYPES)
            .with_help(format!("`get` expects a string key, found {}", type_name(key))));
    };

    Ok(object.get(key).or(fallback).cloned().unwrap_or(Value::Null))
}

fn keys(receiver: &Value, arguments: &[Value]) -> Result<Value, Error> {
    no_arguments("keys", arguments)?;
    let Value::Object(object) = receiver else {
        unreachable!("method is only registered for mappings");
    };

    Ok(Value::Array(
        object.keys().map(|key| Value::String(key.clone())).collect(),
    ))
}

fn values(receiver: &Value, arguments: &[Value]) -> Result<Value, Error> {
    no_arguments("values", arguments)?;
    let Value::Object(object) = receiver else {
        unreachable!("method is only registered for mappings");
    };

    Ok(Value::Array(object.values().cloned().collect()))
}

fn items(receiver: &Value, arguments: &[Value]) -> Result<Value, Error> {
    no_arguments("items", arguments)?;
    let Value::Object(object) = receiver else {
        unreachable!("method is only registered for mappings");
    };

    Ok(Value::Array(
        object
            .iter()
            .map(|(key, value)| Value::Array(vec![Value::String(key.clone()), value.clone()]))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::lookup;
    use serde_json::{json, Value};

    fn call(receiver: Value, name: &str, arguments: &[Value]) -> Value {
        lookup(&receiver, name).unwrap()(&receiver, arguments).unwrap()
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(call(json!("hi there"), "title", &[]), json!("Hi There"));
        assert_eq!(call(json!("  pad  "), "strip", &[]), json!("pad"));
        assert_eq!(
            call(json!("report.pdf"), "endswith", &[json!(".pdf")]),
            json!(true)
        );
    }

    #[test]
    fn test_mapping_get_fallback() {
        let mapping = json!({"a": 1});
        assert_eq!(call(mapping.clone(), "get", &[json!("a")]), json!(1));
        assert_eq!(
            call(mapping, "get", &[json!("b"), json!("gone")]),
            json!("gone")
        );
    }

    #[test]
    fn test_list_get_negative() {
        let list = json!([1, 2, 3]);
        assert_eq!(call(list.clone(), "get", &[json!(-1)]), json!(3));
        assert_eq!(call(list, "get", &[json!(9)]), json!(null));
    }

    #[test]
    fn test_unknown_method() {
        assert!(lookup(&json!("text"), "reverse").is_none());
        assert!(lookup(&json!(10), "upper").is_none());
    }
}
