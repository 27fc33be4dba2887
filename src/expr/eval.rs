//! Expression evaluation.
//!
//! The evaluator walks a parsed [`Expression`] against a [`Context`].
//! It is the sandbox boundary: names resolve only against the
//! context, the only callables are whitelisted builtin functions and
//! methods, and underscore prefixed attributes are rejected.
use super::{
    builtin, method,
    parse::{parse, parse_arguments},
    tree::{Arguments, CompareOperator, Expression, LogicalOperator, UnaryOperator},
    value,
};
use crate::{
    context::Context,
    filter::Filter,
    log::{Error, NOT_ALLOWED},
    region::Region,
};
use serde_json::{Map, Value};
use std::{cmp::Ordering, collections::HashMap};

pub struct Evaluator<'render> {
    source: &'render str,
    context: &'render Context,
    filters: &'render HashMap<String, Box<dyn Filter>>,
}

impl<'render> Evaluator<'render> {
    pub fn new(
        source: &'render str,
        context: &'render Context,
        filters: &'render HashMap<String, Box<dyn Filter>>,
    ) -> Self {
        Self {
            source,
            context,
            filters,
        }
    }

    /// Evaluate the text within the region as an expression.
    pub fn evaluate(&self, region: Region) -> Result<Value, Error> {
        let expression = parse(self.source, region)?;

        self.eval(&expression)
            .map_err(|error| error.with_pointer_if_missing(self.source, region))
    }

    /// Evaluate the text within the region and return its truth.
    pub fn evaluate_truthy(&self, region: Region) -> Result<bool, Error> {
        Ok(value::is_truthy(&self.evaluate(region)?))
    }

    /// Evaluate the text within the region as a directive argument
    /// list, returning the positional and named values.
    pub fn evaluate_arguments(
        &self,
        region: Region,
    ) -> Result<(Vec<Value>, HashMap<String, Value>), Error> {
        let arguments = parse_arguments(self.source, region)?;

        self.collect(&arguments)
            .map_err(|error| error.with_pointer_if_missing(self.source, region))
    }

    /// Evaluate an already parsed expression.
    pub fn eval_expression(&self, expression: &Expression) -> Result<Value, Error> {
        self.eval(expression)
            .map_err(|error| error.with_pointer_if_missing(self.source, expression.region()))
    }

    fn collect(
        &self,
        arguments: &Arguments,
    ) -> Result<(Vec<Value>, HashMap<String, Value>), Error> {
        let mut positional = vec![];
        for argument in &arguments.positional {
            positional.push(self.eval(argument)?);
        }
        let mut named = HashMap::new();
        for (name, argument) in &arguments.named {
            named.insert(name.clone(), self.eval(argument)?);
        }

        Ok((positional, named))
    }

    fn eval(&self, expression: &Expression) -> Result<Value, Error> {
        match expression {
            Expression::Literal(literal) => Ok(literal.value.clone()),
            Expression::Variable(variable) => self.variable(variable.name),
            Expression::Attribute(attribute) => {
                let owner = self.eval(&attribute.base)?;
                self.access(&owner, attribute.name, None)
            }
            Expression::Subscript(subscript) => {
                let base = self.eval(&subscript.base)?;
                let index = self.eval(&subscript.index)?;
                self.subscript(&base, &index, subscript.region)
            }
            Expression::Call(call) => self.call(call),
            Expression::Unary(unary) => {
                let operand = self.eval(&unary.operand)?;
                match unary.operator {
                    UnaryOperator::Not => Ok(Value::Bool(!value::is_truthy(&operand))),
                    UnaryOperator::Negative => value::negate(&operand)
                        .map_err(|error| error.with_pointer_if_missing(self.source, unary.region)),
                }
            }
            Expression::Binary(binary) => {
                let left = self.eval(&binary.left)?;
                let right = self.eval(&binary.right)?;
                let operation = match binary.operator {
                    super::tree::BinaryOperator::Add => value::add,
                    super::tree::BinaryOperator::Subtract => value::subtract,
                    super::tree::BinaryOperator::Multiply => value::multiply,
                    super::tree::BinaryOperator::Divide => value::divide,
                    super::tree::BinaryOperator::Remainder => value::remainder,
                };
                operation(&left, &right).map_err(|error| {
                    error.with_pointer_if_missing(self.source, expression.region())
                })
            }
            Expression::Logical(logical) => {
                let left = self.eval(&logical.left)?;
                let short = match logical.operator {
                    LogicalOperator::And => !value::is_truthy(&left),
                    LogicalOperator::Or => value::is_truthy(&left),
                };
                if short {
                    return Ok(left);
                }
                self.eval(&logical.right)
            }
            Expression::Comparison(comparison) => {
                // Every link is evaluated, even after one fails.
                let mut previous = self.eval(&comparison.first)?;
                let mut holds = true;
                for (operator, right) in &comparison.links {
                    let next = self.eval(right)?;
                    holds &= self
                        .compare(*operator, &previous, &next)
                        .map_err(|error| {
                            error.with_pointer_if_missing(self.source, right.region())
                        })?;
                    previous = next;
                }
                Ok(Value::Bool(holds))
            }
            Expression::List(list) => {
                let mut items = vec![];
                for item in &list.items {
                    items.push(self.eval(item)?);
                }
                Ok(Value::Array(items))
            }
            Expression::Map(map) => {
                let mut entries = Map::new();
                for (key, entry) in &map.entries {
                    let key_value = self.eval(key)?;
                    let Value::String(key_text) = key_value else {
                        return Err(Error::incompatible("mapping keys must be strings")
                            .with_pointer(self.source, key.region())
                            .with_help(format!("found {}", value::type_name(&key_value))));
                    };
                    entries.insert(key_text, self.eval(entry)?);
                }
                Ok(Value::Object(entries))
            }
        }
    }

    fn variable(&self, name: Region) -> Result<Value, Error> {
        let text = name.literal(self.source);
        if text.starts_with('_') {
            return Err(Error::permission(NOT_ALLOWED)
                .with_pointer(self.source, name)
                .with_help("names beginning with `_` are not accessible"));
        }

        match self.context.lookup(text) {
            Some(value) => Ok(value.clone()),
            None => Err(Error::undefined(format!("`{text}` is not defined"))
                .with_pointer(self.source, name)
                .with_help("the name is not present in the render context")),
        }
    }

    fn call(&self, call: &super::tree::Call) -> Result<Value, Error> {
        match call.base.as_ref() {
            Expression::Variable(variable) => {
                let name = variable.name.literal(self.source);
                let Some(function) = builtin::lookup(name) else {
                    return Err(Error::permission(NOT_ALLOWED)
                        .with_pointer(self.source, variable.name)
                        .with_help(format!(
                            "`{name}` is not a builtin function, only builtin \
                            functions may be called by name"
                        )));
                };
                if !call.arguments.named.is_empty() {
                    return Err(Error::incompatible(
                        "builtin functions take positional arguments only",
                    )
                    .with_pointer(self.source, call.region));
                }
                let (positional, _) = self.collect(&call.arguments)?;
                function(&positional)
                    .map_err(|error| error.with_pointer_if_missing(self.source, call.region))
            }
            Expression::Attribute(attribute) => {
                let owner = self.eval(&attribute.base)?;
                self.access(&owner, attribute.name, Some(&call.arguments))
            }
            _ => Err(Error::permission(NOT_ALLOWED)
                .with_pointer(self.source, call.region)
                .with_help("this expression is not callable")),
        }
    }

    /// Resolve an attribute of a value, in fixed order.
    ///
    /// A leading underscore is rejected first. In attribute position
    /// a mapping key wins next, then a whitelisted method is invoked
    /// with no arguments, then a filter with the value as input. In
    /// call position the mapping key step is skipped, since a looked
    /// up value is never callable. An unresolved name is undefined.
    fn access(
        &self,
        owner: &Value,
        name: Region,
        call: Option<&Arguments>,
    ) -> Result<Value, Error> {
        let text = name.literal(self.source);
        if text.starts_with('_') {
            return Err(Error::permission(NOT_ALLOWED)
                .with_pointer(self.source, name)
                .with_help("names beginning with `_` are not accessible"));
        }

        if call.is_none() {
            if let Value::Object(object) = owner {
                if let Some(value) = object.get(text) {
                    return Ok(value.clone());
                }
            }
        }

        if let Some(function) = method::lookup(owner, text) {
            let positional = match call {
                Some(arguments) => {
                    if !arguments.named.is_empty() {
                        return Err(Error::incompatible(
                            "methods take positional arguments only",
                        )
                        .with_pointer(self.source, name));
                    }
                    self.collect(arguments)?.0
                }
                None => vec![],
            };
            return function(owner, &positional)
                .map_err(|error| error.with_pointer_if_missing(self.source, name));
        }

        if let Some(filter) = self.filters.get(text) {
            let arguments = match call {
                Some(arguments) => self.filter_arguments(arguments)?,
                None => HashMap::new(),
            };
            return filter
                .apply(owner, &arguments)
                .map_err(|error| error.with_pointer_if_missing(self.source, name));
        }

        // In call position an unknown name is a sandbox refusal, not
        // a missing variable.
        let error = match call {
            Some(_) => Error::permission(NOT_ALLOWED).with_help(format!(
                "`{text}` is not a whitelisted method or registered filter"
            )),
            None => Error::undefined(format!("`{text}` is undefined")).with_help(format!(
                "{} has no attribute, method or filter named `{text}`",
                value::type_name(owner)
            )),
        };
        Err(error.with_pointer(self.source, name))
    }

    fn compare(
        &self,
        operator: CompareOperator,
        left: &Value,
        right: &Value,
    ) -> Result<bool, Error> {
        let holds = match operator {
            CompareOperator::Equal => value::equals(left, right),
            CompareOperator::NotEqual => !value::equals(left, right),
            CompareOperator::In => value::contains(right, left)?,
            CompareOperator::NotIn => !value::contains(right, left)?,
            ordered => {
                let Some(ordering) = value::compare(left, right) else {
                    return Err(Error::incompatible(format!(
                        "cannot order {} and {}",
                        value::type_name(left),
                        value::type_name(right)
                    )));
                };
                match ordered {
                    CompareOperator::Greater => ordering == Ordering::Greater,
                    CompareOperator::GreaterEqual => ordering != Ordering::Less,
                    CompareOperator::Less => ordering == Ordering::Less,
                    CompareOperator::LessEqual => ordering != Ordering::Greater,
                    _ => unreachable!(),
                }
            }
        };

        Ok(holds)
    }

    /// Evaluate a filter argument list into the map form filters
    /// receive, anonymous arguments named by position from "1".
    fn filter_arguments(&self, arguments: &Arguments) -> Result<HashMap<String, Value>, Error> {
        let (positional, named) = self.collect(arguments)?;
        let mut map = HashMap::new();
        for (position, argument) in positional.into_iter().enumerate() {
            map.insert((position + 1).to_string(), argument);
        }
        map.extend(named);

        Ok(map)
    }

    fn subscript(&self, base: &Value, index: &Value, region: Region) -> Result<Value, Error> {
        match base {
            Value::Array(array) => {
                let position = index.as_i64().ok_or_else(|| {
                    Error::incompatible("list indexes must be whole numbers")
                        .with_pointer(self.source, region)
                        .with_help(format!("found {}", value::type_name(index)))
                })?;
                let resolved = if position < 0 {
                    array.len().checked_sub(position.unsigned_abs() as usize)
                } else {
                    Some(position as usize)
                };
                resolved.and_then(|resolved| array.get(resolved)).cloned().ok_or_else(|| {
                    Error::undefined("list index out of range")
                        .with_pointer(self.source, region)
                        .with_help(format!("the list has {} items", array.len()))
                })
            }
            Value::Object(object) => {
                let Value::String(key) = index else {
                    return Err(Error::incompatible("mapping keys must be strings")
                        .with_pointer(self.source, region)
                        .with_help(format!("found {}", value::type_name(index))));
                };
                object.get(key).cloned().ok_or_else(|| {
                    Error::undefined(format!("mapping has no key `{key}`"))
                        .with_pointer(self.source, region)
                })
            }
            Value::String(string) => {
                let position = index.as_i64().ok_or_else(|| {
                    Error::incompatible("string indexes must be whole numbers")
                        .with_pointer(self.source, region)
                })?;
                let count = string.chars().count();
                let resolved = if position < 0 {
                    count.checked_sub(position.unsigned_abs() as usize)
                } else {
                    Some(position as usize)
                };
                resolved
                    .and_then(|resolved| string.chars().nth(resolved))
                    .map(|char| Value::String(char.to_string()))
                    .ok_or_else(|| {
                        Error::undefined("string index out of range")
                            .with_pointer(self.source, region)
                    })
            }
            _ => Err(Error::incompatible(format!(
                "{} is not subscriptable",
                value::type_name(base)
            ))
            .with_pointer(self.source, region)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Evaluator;
    use crate::{context::Context, filter::Filter, log::ErrorKind, region::Region};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn context() -> Context {
        let Value::Object(data) = json!({
            "name": "Taylor",
            "count": 3,
            "items": [10, 20, 30],
            "user": {"email": "t@example.com", "upper": "shadowed"},
            "_secret": "hidden",
        }) else {
            unreachable!()
        };

        Context::new(data)
    }

    fn evaluate(text: &str) -> Result<Value, crate::log::Error> {
        let context = context();
        let filters = crate::filter::defaults();
        let evaluator = Evaluator::new(text, &context, &filters);

        evaluator.evaluate(Region::new(0, text.len()))
    }

    #[test]
    fn test_variable_and_literal() {
        assert_eq!(evaluate("name").unwrap(), json!("Taylor"));
        assert_eq!(evaluate("'fixed'").unwrap(), json!("fixed"));
    }

    #[test]
    fn test_undefined_variable() {
        let error = evaluate("missing").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::UndefinedVariable);
    }

    #[test]
    fn test_mapping_key_wins_over_method() {
        assert_eq!(evaluate("user.upper").unwrap(), json!("shadowed"));
        assert_eq!(evaluate("user.email").unwrap(), json!("t@example.com"));
    }

    #[test]
    fn test_method_auto_invoked_as_attribute() {
        assert_eq!(evaluate("name.upper").unwrap(), json!("TAYLOR"));
        assert_eq!(evaluate("name.upper()").unwrap(), json!("TAYLOR"));
    }

    #[test]
    fn test_filter_fallback() {
        assert_eq!(evaluate("name.slugify").unwrap(), json!("taylor"));
        assert_eq!(
            evaluate("'a long phrase'.excerpt(8)").unwrap(),
            json!("a long...")
        );
    }

    #[test]
    fn test_underscore_is_rejected() {
        assert_eq!(evaluate("_secret").unwrap_err().kind(), ErrorKind::Permission);
        assert_eq!(
            evaluate("user._private").unwrap_err().kind(),
            ErrorKind::Permission
        );
    }

    #[test]
    fn test_only_builtins_are_callable() {
        assert_eq!(evaluate("length(items)").unwrap(), json!(3));
        assert_eq!(evaluate("print(name)").unwrap_err().kind(), ErrorKind::Permission);
    }

    #[test]
    fn test_unknown_method_call_is_refused() {
        // Calling a name that is neither whitelisted nor a filter is
        // a sandbox refusal, while plain attribute access on the same
        // name stays an undefined lookup.
        assert_eq!(
            evaluate("items.append(3)").unwrap_err().kind(),
            ErrorKind::Permission
        );
        assert_eq!(
            evaluate("items.append").unwrap_err().kind(),
            ErrorKind::UndefinedVariable
        );
    }

    #[test]
    fn test_chained_comparison() {
        assert_eq!(evaluate("1 < count <= 3").unwrap(), json!(true));
        assert_eq!(evaluate("1 < count < 2").unwrap(), json!(false));
    }

    #[test]
    fn test_chained_comparison_evaluates_every_link() {
        // The failing first link does not stop the undefined name in
        // the second link from being noticed.
        assert_eq!(
            evaluate("9 < count < missing").unwrap_err().kind(),
            ErrorKind::UndefinedVariable
        );
    }

    #[test]
    fn test_membership() {
        assert_eq!(evaluate("20 in items").unwrap(), json!(true));
        assert_eq!(evaluate("5 not in items").unwrap(), json!(true));
        assert_eq!(evaluate("'ay' in name").unwrap(), json!(true));
    }

    #[test]
    fn test_logical_returns_operand() {
        assert_eq!(evaluate("'' or name").unwrap(), json!("Taylor"));
        assert_eq!(evaluate("name and count").unwrap(), json!(3));
    }

    #[test]
    fn test_subscript() {
        assert_eq!(evaluate("items[0]").unwrap(), json!(10));
        assert_eq!(evaluate("items[-1]").unwrap(), json!(30));
        assert_eq!(evaluate("user['email']").unwrap(), json!("t@example.com"));
        assert_eq!(
            evaluate("items[9]").unwrap_err().kind(),
            ErrorKind::UndefinedVariable
        );
    }

    #[test]
    fn test_arithmetic_and_containers() {
        assert_eq!(evaluate("count * 2 + 1").unwrap(), json!(7));
        assert_eq!(evaluate("[count, 'x'][1]").unwrap(), json!("x"));
        assert_eq!(evaluate("{'a': count}['a']").unwrap(), json!(3));
    }

    #[test]
    fn test_custom_filter_receives_named_arguments() {
        fn tail(value: &Value, args: &HashMap<String, Value>) -> Result<Value, crate::log::Error> {
            let suffix = args.get("suffix").and_then(Value::as_str).unwrap_or("?");
            Ok(json!(format!("{}{suffix}", value.as_str().unwrap_or(""))))
        }
        let mut filters: HashMap<String, Box<dyn Filter>> = HashMap::new();
        filters.insert("tail".into(), Box::new(tail));

        let context = context();
        let text = "name.tail(suffix='!')";
        let evaluator = Evaluator::new(text, &context, &filters);
        assert_eq!(
            evaluator.evaluate(Region::new(0, text.len())).unwrap(),
            json!("Taylor!")
        );
    }
}
