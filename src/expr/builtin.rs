//! Whitelisted builtin functions.
use super::value::{compare, is_truthy, type_name};
use crate::log::{Error, INCOMPATIBLE_TYPES};
use serde_json::Value;

/// The largest sequence `range` will produce.
const MAX_RANGE: i64 = 1_000_000;

pub type Builtin = fn(&[Value]) -> Result<Value, Error>;

/// Look up a builtin function by name.
///
/// Only these names are callable as bare functions, every other call
/// target is rejected by the evaluator.
pub fn lookup(name: &str) -> Option<Builtin> {
    let entry = match name {
        "length" => length as Builtin,
        "min" => min,
        "max" => max,
        "range" => range,
        "enumerate" => enumerate,
        "bool" => bool,
        "abs" => abs,
        "sum" => sum,
        _ => return None,
    };

    Some(entry)
}

fn one_argument<'a>(name: &str, arguments: &'a [Value]) -> Result<&'a Value, Error> {
    match arguments {
        [argument] => Ok(argument),
        _ => Err(Error::incompatible(format!("`{name}` takes one argument"))),
    }
}

fn length(arguments: &[Value]) -> Result<Value, Error> {
    let argument = one_argument("length", arguments)?;
    let length = match argument {
        Value::String(string) => string.chars().count(),
        Value::Array(array) => array.len(),
        Value::Object(object) => object.len(),
        _ => {
            return Err(Error::incompatible(INCOMPATIBLE_TYPES).with_help(format!(
                "`length` expects a string, list or mapping, found {}",
                type_name(argument)
            )))
        }
    };

    Ok(Value::from(length))
}

/// Resolve the items an extremum runs over.
///
/// One list argument spreads to its items, otherwise the arguments
/// themselves compete.
fn extremum_items<'a>(name: &str, arguments: &'a [Value]) -> Result<&'a [Value], Error> {
    let items = match arguments {
        [Value::Array(array)] => array.as_slice(),
        [] => return Err(Error::incompatible(format!("`{name}` takes at least one argument"))),
        _ => arguments,
    };
    if items.is_empty() {
        return Err(Error::incompatible(format!("`{name}` of an empty list")));
    }

    Ok(items)
}

fn extremum(name: &str, arguments: &[Value], keep_left: std::cmp::Ordering) -> Result<Value, Error> {
    let items = extremum_items(name, arguments)?;
    let mut winner = &items[0];
    for item in &items[1..] {
        match compare(winner, item) {
            Some(ordering) if ordering == keep_left => {}
            Some(_) => winner = item,
            None => {
                return Err(Error::incompatible(INCOMPATIBLE_TYPES).with_help(format!(
                    "`{name}` cannot order {} and {}",
                    type_name(winner),
                    type_name(item)
                )))
            }
        }
    }

    Ok(winner.clone())
}

fn min(arguments: &[Value]) -> Result<Value, Error> {
    extremum("min", arguments, std::cmp::Ordering::Less)
}

fn max(arguments: &[Value]) -> Result<Value, Error> {
    extremum("max", arguments, std::cmp::Ordering::Greater)
}

fn range_bound(name: &str, value: &Value) -> Result<i64, Error> {
    value.as_i64().ok_or_else(|| {
        Error::incompatible(INCOMPATIBLE_TYPES)
            .with_help(format!("`{name}` expects whole numbers, found {}", type_name(value)))
    })
}

/// Produce a list of integers, following the usual start, stop, step
/// calling forms.
fn range(arguments: &[Value]) -> Result<Value, Error> {
    let (start, stop, step) = match arguments {
        [stop] => (0, range_bound("range", stop)?, 1),
        [start, stop] => (range_bound("range", start)?, range_bound("range", stop)?, 1),
        [start, stop, step] => (
            range_bound("range", start)?,
            range_bound("range", stop)?,
            range_bound("range", step)?,
        ),
        _ => return Err(Error::incompatible("`range` takes one to three arguments")),
    };
    if step == 0 {
        return Err(Error::incompatible("`range` step cannot be zero"));
    }

    let mut items = vec![];
    let mut current = start;
    while (step > 0 && current < stop) || (step < 0 && current > stop) {
        items.push(Value::from(current));
        if items.len() as i64 > MAX_RANGE {
            return Err(Error::incompatible(format!(
                "`range` is longer than {MAX_RANGE} items"
            )));
        }
        current += step;
    }

    Ok(Value::Array(items))
}

/// Pair every item of a list with its zero based position.
fn enumerate(arguments: &[Value]) -> Result<Value, Error> {
    let argument = one_argument("enumerate", arguments)?;
    let Value::Array(array) = argument else {
        return Err(Error::incompatible(INCOMPATIBLE_TYPES).with_help(format!(
            "`enumerate` expects a list, found {}",
            type_name(argument)
        )));
    };

    Ok(Value::Array(
        array
            .iter()
            .enumerate()
            .map(|(position, item)| Value::Array(vec![Value::from(position), item.clone()]))
            .collect(),
    ))
}

fn bool(arguments: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(is_truthy(one_argument("bool", arguments)?)))
}

fn abs(arguments: &[Value]) -> Result<Value, Error> {
    let argument = one_argument("abs", arguments)?;
    let Value::Number(number) = argument else {
        return Err(Error::incompatible(INCOMPATIBLE_TYPES)
            .with_help(format!("`abs` expects a number, found {}", type_name(argument))));
    };
    let value = match number.as_i64() {
        Some(integer) => Value::from(integer.saturating_abs()),
        None => {
            let float = number.as_f64().unwrap_or(0.0).abs();
            serde_json::Number::from_f64(float)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }
    };

    Ok(value)
}

fn sum(arguments: &[Value]) -> Result<Value, Error> {
    let argument = one_argument("sum", arguments)?;
    let Value::Array(array) = argument else {
        return Err(Error::incompatible(INCOMPATIBLE_TYPES)
            .with_help(format!("`sum` expects a list, found {}", type_name(argument))));
    };

    let mut total = Value::from(0);
    for item in array {
        total = super::value::add(&total, item).map_err(|error| {
            error.with_reason("`sum` expects a list of numbers")
        })?;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::lookup;
    use serde_json::{json, Value};

    fn call(name: &str, arguments: &[Value]) -> Value {
        lookup(name).unwrap()(arguments).unwrap()
    }

    #[test]
    fn test_length() {
        assert_eq!(call("length", &[json!("håll")]), json!(4));
        assert_eq!(call("length", &[json!([1, 2])]), json!(2));
        assert!(lookup("length").unwrap()(&[json!(3)]).is_err());
    }

    #[test]
    fn test_extrema() {
        assert_eq!(call("min", &[json!([3, 1, 2])]), json!(1));
        assert_eq!(call("max", &[json!(3), json!(8)]), json!(8));
        assert!(lookup("min").unwrap()(&[json!([])]).is_err());
        assert!(lookup("max").unwrap()(&[json!([1, "a"])]).is_err());
    }

    #[test]
    fn test_range() {
        assert_eq!(call("range", &[json!(3)]), json!([0, 1, 2]));
        assert_eq!(call("range", &[json!(2), json!(5)]), json!([2, 3, 4]));
        assert_eq!(
            call("range", &[json!(5), json!(0), json!(-2)]),
            json!([5, 3, 1])
        );
        assert!(lookup("range").unwrap()(&[json!(1), json!(9), json!(0)]).is_err());
    }

    #[test]
    fn test_enumerate() {
        assert_eq!(
            call("enumerate", &[json!(["a", "b"])]),
            json!([[0, "a"], [1, "b"]])
        );
    }

    #[test]
    fn test_sum_and_bool() {
        assert_eq!(call("sum", &[json!([1, 2, 3.5])]), json!(6.5));
        assert_eq!(call("bool", &[json!("")]), json!(false));
        assert!(lookup("sum").unwrap()(&[json!([1, "a"])]).is_err());
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(lookup("open").is_none());
        assert!(lookup("eval").is_none());
    }
}
