//! Filters registered on every new [`Engine`][`crate::Engine`].
use super::Filter;
use crate::{
    expr::value::{self, display, type_name},
    log::Error,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Return the default filter set.
pub fn defaults() -> HashMap<String, Box<dyn Filter>> {
    let mut filters: HashMap<String, Box<dyn Filter>> = HashMap::new();
    filters.insert("upper".into(), Box::new(upper));
    filters.insert("lower".into(), Box::new(lower));
    filters.insert("title".into(), Box::new(title));
    filters.insert("capitalize".into(), Box::new(capitalize));
    filters.insert("strip".into(), Box::new(strip));
    filters.insert("truncate".into(), Box::new(truncate));
    filters.insert("excerpt".into(), Box::new(excerpt));
    filters.insert("limit".into(), Box::new(truncate));
    filters.insert("slugify".into(), Box::new(slugify));
    filters.insert("add".into(), Box::new(add));
    filters.insert("subtract".into(), Box::new(subtract));
    filters.insert("multiply".into(), Box::new(multiply));
    filters.insert("divide".into(), Box::new(divide));
    filters.insert("currency".into(), Box::new(currency));
    filters.insert("percentage".into(), Box::new(percentage));
    filters.insert("length".into(), Box::new(length));
    filters.insert("count".into(), Box::new(length));
    filters.insert("first".into(), Box::new(first));
    filters.insert("last".into(), Box::new(last));
    filters.insert("join".into(), Box::new(join));
    filters.insert("regroup".into(), Box::new(regroup));

    filters
}

/// Fetch an argument by name, or by anonymous position.
fn argument<'a>(
    args: &'a HashMap<String, Value>,
    position: usize,
    name: &str,
) -> Option<&'a Value> {
    args.get(name).or_else(|| args.get(&position.to_string()))
}

fn integer_argument(
    filter: &str,
    args: &HashMap<String, Value>,
    position: usize,
    name: &str,
) -> Result<Option<i64>, Error> {
    match argument(args, position, name) {
        None => Ok(None),
        Some(value) => value.as_i64().map(Some).ok_or_else(|| {
            Error::render(format!(
                "filter `{filter}` expects a whole number for `{name}`, found {}",
                type_name(value)
            ))
        }),
    }
}

fn upper(value: &Value, _: &HashMap<String, Value>) -> Result<Value, Error> {
    Ok(Value::String(display(value).to_uppercase()))
}

fn lower(value: &Value, _: &HashMap<String, Value>) -> Result<Value, Error> {
    Ok(Value::String(display(value).to_lowercase()))
}

fn title(value: &Value, _: &HashMap<String, Value>) -> Result<Value, Error> {
    Ok(Value::String(crate::expr::method::title_case(&display(
        value,
    ))))
}

fn capitalize(value: &Value, _: &HashMap<String, Value>) -> Result<Value, Error> {
    let text = display(value);
    let mut chars = text.chars();
    let capitalized = match chars.next() {
        Some(head) => head
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    };

    Ok(Value::String(capitalized))
}

fn strip(value: &Value, _: &HashMap<String, Value>) -> Result<Value, Error> {
    Ok(Value::String(display(value).trim().to_string()))
}

/// Cut text down to at most `length` characters.
fn truncate(value: &Value, args: &HashMap<String, Value>) -> Result<Value, Error> {
    let length = integer_argument("truncate", args, 1, "length")?
        .ok_or_else(|| Error::render("filter `truncate` expects a length argument"))?;
    let text: String = display(value)
        .chars()
        .take(length.max(0) as usize)
        .collect();

    Ok(Value::String(text))
}

/// Cut text down to at most `length` characters without splitting the
/// final word, appending a suffix when anything was removed.
fn excerpt(value: &Value, args: &HashMap<String, Value>) -> Result<Value, Error> {
    let length = integer_argument("excerpt", args, 1, "length")?
        .ok_or_else(|| Error::render("filter `excerpt` expects a length argument"))?;
    let suffix = match argument(args, 2, "suffix") {
        Some(suffix) => display(suffix),
        None => "...".to_string(),
    };

    let text = display(value);
    if text.chars().count() <= length.max(0) as usize {
        return Ok(Value::String(text));
    }

    let cut: String = text.chars().take(length.max(0) as usize).collect();
    let kept = match cut.rfind(' ') {
        Some(space) => &cut[..space],
        None => cut.as_str(),
    };

    Ok(Value::String(format!("{kept}{suffix}")))
}

/// Reduce text to a lowercase hyphenated slug.
fn slugify(value: &Value, _: &HashMap<String, Value>) -> Result<Value, Error> {
    let mut slug = String::new();
    let mut gap = false;
    for char in display(value).to_lowercase().chars() {
        if char.is_alphanumeric() || char == '_' {
            if gap && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(char);
            gap = false;
        } else if char.is_whitespace() || char == '-' {
            gap = true;
        }
    }

    Ok(Value::String(slug))
}

fn amount<'a>(filter: &str, args: &'a HashMap<String, Value>) -> Result<&'a Value, Error> {
    argument(args, 1, "amount")
        .ok_or_else(|| Error::render(format!("filter `{filter}` expects an amount argument")))
}

fn add(value: &Value, args: &HashMap<String, Value>) -> Result<Value, Error> {
    value::add(value, amount("add", args)?)
}

fn subtract(value: &Value, args: &HashMap<String, Value>) -> Result<Value, Error> {
    value::subtract(value, amount("subtract", args)?)
}

fn multiply(value: &Value, args: &HashMap<String, Value>) -> Result<Value, Error> {
    value::multiply(value, amount("multiply", args)?)
}

fn divide(value: &Value, args: &HashMap<String, Value>) -> Result<Value, Error> {
    value::divide(value, amount("divide", args)?)
}

fn number(filter: &str, value: &Value) -> Result<f64, Error> {
    match value {
        Value::Number(number) => Ok(number.as_f64().unwrap_or(0.0)),
        _ => Err(Error::render(format!(
            "filter `{filter}` expects a number, found {}",
            type_name(value)
        ))),
    }
}

/// Group the digits of the whole part with commas.
fn group_thousands(whole: &str) -> String {
    let (sign, digits) = match whole.strip_prefix('-') {
        Some(digits) => ("-", digits),
        None => ("", whole),
    };
    let mut grouped = String::new();
    for (position, digit) in digits.chars().enumerate() {
        let remaining = digits.len() - position;
        if position > 0 && remaining % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{sign}{grouped}")
}

fn currency(value: &Value, args: &HashMap<String, Value>) -> Result<Value, Error> {
    let amount = number("currency", value)?;
    let symbol = match argument(args, 1, "symbol") {
        Some(symbol) => display(symbol),
        None => "$".to_string(),
    };
    let decimals = integer_argument("currency", args, 2, "decimals")?.unwrap_or(2).max(0) as usize;

    let fixed = format!("{amount:.decimals$}");
    let (whole, fraction) = match fixed.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (fixed.as_str(), None),
    };
    let grouped = group_thousands(whole);
    let text = match fraction {
        Some(fraction) => format!("{symbol} {grouped}.{fraction}"),
        None => format!("{symbol} {grouped}"),
    };

    Ok(Value::String(text))
}

fn percentage(value: &Value, args: &HashMap<String, Value>) -> Result<Value, Error> {
    let amount = number("percentage", value)?;
    let decimals = integer_argument("percentage", args, 1, "decimals")?.unwrap_or(1).max(0) as usize;

    Ok(Value::String(format!("{amount:.decimals$} %")))
}

fn length(value: &Value, _: &HashMap<String, Value>) -> Result<Value, Error> {
    let length = match value {
        Value::String(string) => string.chars().count(),
        Value::Array(array) => array.len(),
        Value::Object(object) => object.len(),
        _ => {
            return Err(Error::render(format!(
                "filter `length` expects a string, list or mapping, found {}",
                type_name(value)
            )))
        }
    };

    Ok(Value::from(length))
}

fn first(value: &Value, _: &HashMap<String, Value>) -> Result<Value, Error> {
    let first = match value {
        Value::Array(array) => array.first().cloned(),
        Value::String(string) => string.chars().next().map(|c| Value::String(c.to_string())),
        _ => {
            return Err(Error::render(format!(
                "filter `first` expects a list or string, found {}",
                type_name(value)
            )))
        }
    };

    Ok(first.unwrap_or(Value::Null))
}

fn last(value: &Value, _: &HashMap<String, Value>) -> Result<Value, Error> {
    let last = match value {
        Value::Array(array) => array.last().cloned(),
        Value::String(string) => string.chars().last().map(|c| Value::String(c.to_string())),
        _ => {
            return Err(Error::render(format!(
                "filter `last` expects a list or string, found {}",
                type_name(value)
            )))
        }
    };

    Ok(last.unwrap_or(Value::Null))
}

fn join(value: &Value, args: &HashMap<String, Value>) -> Result<Value, Error> {
    let Value::Array(array) = value else {
        return Err(Error::render(format!(
            "filter `join` expects a list, found {}",
            type_name(value)
        )));
    };
    let separator = match argument(args, 1, "sep") {
        Some(separator) => display(separator),
        None => ",".to_string(),
    };
    let joined = array
        .iter()
        .map(display)
        .collect::<Vec<String>>()
        .join(&separator);

    Ok(Value::String(joined))
}

/// Group a list of mappings by a shared key.
///
/// Produces a list of `{grouper, list}` mappings, one per distinct
/// key value in first seen order.
fn regroup(value: &Value, args: &HashMap<String, Value>) -> Result<Value, Error> {
    let Value::Array(array) = value else {
        return Err(Error::render(format!(
            "filter `regroup` expects a list, found {}",
            type_name(value)
        )));
    };
    let key = match argument(args, 1, "by") {
        Some(Value::String(key)) => key.clone(),
        Some(other) => {
            return Err(Error::render(format!(
                "filter `regroup` expects a string key, found {}",
                type_name(other)
            )))
        }
        None => return Err(Error::render("filter `regroup` expects a key argument")),
    };

    let mut groups: Vec<(Value, Vec<Value>)> = vec![];
    for item in array {
        let grouper = item.get(&key).cloned().unwrap_or(Value::Null);
        match groups.iter_mut().find(|(value, _)| value == &grouper) {
            Some((_, members)) => members.push(item.clone()),
            None => groups.push((grouper, vec![item.clone()])),
        }
    }

    let grouped = groups
        .into_iter()
        .map(|(grouper, members)| {
            let mut group = Map::new();
            group.insert("grouper".into(), grouper);
            group.insert("list".into(), Value::Array(members));
            Value::Object(group)
        })
        .collect();

    Ok(Value::Array(grouped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_args() -> HashMap<String, Value> {
        HashMap::new()
    }

    fn one_arg(value: Value) -> HashMap<String, Value> {
        HashMap::from([("1".to_string(), value)])
    }

    #[test]
    fn test_slugify() {
        assert_eq!(
            slugify(&json!("Hello, World! 2024"), &no_args()).unwrap(),
            json!("hello-world-2024")
        );
        assert_eq!(slugify(&json!("--a--"), &no_args()).unwrap(), json!("a"));
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(
            excerpt(&json!("the quick brown fox"), &one_arg(json!(12))).unwrap(),
            json!("the quick...")
        );
        assert_eq!(
            excerpt(&json!("short"), &one_arg(json!(12))).unwrap(),
            json!("short")
        );
    }

    #[test]
    fn test_currency() {
        assert_eq!(
            currency(&json!(1234567.891), &no_args()).unwrap(),
            json!("$ 1,234,567.89")
        );
        assert_eq!(
            currency(&json!(5), &HashMap::from([("symbol".to_string(), json!("€"))])).unwrap(),
            json!("€ 5.00")
        );
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(&json!(42.25), &no_args()).unwrap(), json!("42.2 %"));
        assert_eq!(
            percentage(&json!(42.25), &one_arg(json!(2))).unwrap(),
            json!("42.25 %")
        );
    }

    #[test]
    fn test_join() {
        assert_eq!(
            join(&json!([1, "a", true]), &one_arg(json!(" | "))).unwrap(),
            json!("1 | a | true")
        );
    }

    #[test]
    fn test_regroup_keeps_first_seen_order() {
        let cities = json!([
            {"name": "Oslo", "country": "NO"},
            {"name": "Lyon", "country": "FR"},
            {"name": "Bergen", "country": "NO"},
        ]);
        let grouped = regroup(&cities, &one_arg(json!("country"))).unwrap();
        assert_eq!(grouped[0]["grouper"], json!("NO"));
        assert_eq!(grouped[0]["list"].as_array().unwrap().len(), 2);
        assert_eq!(grouped[1]["grouper"], json!("FR"));
    }

    #[test]
    fn test_defaults_complete() {
        let filters = defaults();
        for name in ["upper", "slugify", "excerpt", "regroup", "count", "limit"] {
            assert!(filters.contains_key(name), "missing `{name}`");
        }
    }
}
