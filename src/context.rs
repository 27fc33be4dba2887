//! Render time variable scopes.
use serde_json::{Map, Value};

/// A stack of variable scopes searched innermost first.
///
/// The bottom scope holds the data the render was called with, and
/// blocks that bind names push a scope for the span of their body.
#[derive(Debug, Clone)]
pub struct Context {
    scopes: Vec<Map<String, Value>>,
}

impl Context {
    /// Create a new [`Context`] over the given data.
    pub fn new(data: Map<String, Value>) -> Self {
        Self { scopes: vec![data] }
    }

    /// Push an empty scope.
    pub fn push(&mut self) {
        self.scopes.push(Map::new());
    }

    /// Pop the innermost scope.
    ///
    /// The bottom scope is never popped.
    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Assign a name in the innermost scope.
    pub fn set<T>(&mut self, name: T, value: Value)
    where
        T: Into<String>,
    {
        self.scopes
            .last_mut()
            .expect("context always has a scope")
            .insert(name.into(), value);
    }

    /// Resolve a name, searching scopes innermost first.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Collapse the scope stack into a single mapping, inner names
    /// shadowing outer ones.
    pub fn flatten(&self) -> Map<String, Value> {
        let mut flat = Map::new();
        for scope in &self.scopes {
            for (name, value) in scope {
                flat.insert(name.clone(), value.clone());
            }
        }

        flat
    }
}

/// The state of one iteration, projected into the template as `loop`.
#[derive(Debug, Clone)]
pub struct LoopState {
    /// Zero based position of the current item.
    pub index: usize,
    /// Total number of items.
    pub total: usize,
    /// The projected state of the enclosing loop, when nested.
    pub parent: Option<Value>,
}

impl LoopState {
    pub fn new(total: usize, parent: Option<Value>) -> Self {
        Self {
            index: 0,
            total,
            parent,
        }
    }

    /// Build the `loop` mapping for the current iteration.
    pub fn project(&self) -> Value {
        let iteration = self.index + 1;
        let mut state = Map::new();
        state.insert("index".into(), Value::from(self.index));
        state.insert("iteration".into(), Value::from(iteration));
        state.insert("remaining".into(), Value::from(self.total - iteration));
        state.insert("count".into(), Value::from(self.total));
        state.insert("first".into(), Value::Bool(self.index == 0));
        state.insert("last".into(), Value::Bool(iteration == self.total));
        state.insert("even".into(), Value::Bool(iteration % 2 == 0));
        state.insert("odd".into(), Value::Bool(iteration % 2 == 1));
        state.insert(
            "parent".into(),
            self.parent.clone().unwrap_or(Value::Null),
        );

        Value::Object(state)
    }
}

#[cfg(test)]
mod tests {
    use super::{Context, LoopState};
    use serde_json::{json, Map, Value};

    fn context_with(name: &str, value: Value) -> Context {
        let mut data = Map::new();
        data.insert(name.to_string(), value);
        Context::new(data)
    }

    #[test]
    fn test_inner_scope_shadows() {
        let mut context = context_with("name", json!("outer"));
        context.push();
        context.set("name", json!("inner"));
        assert_eq!(context.lookup("name"), Some(&json!("inner")));

        context.pop();
        assert_eq!(context.lookup("name"), Some(&json!("outer")));
    }

    #[test]
    fn test_bottom_scope_stays() {
        let mut context = context_with("name", json!("kept"));
        context.pop();
        assert_eq!(context.lookup("name"), Some(&json!("kept")));
    }

    #[test]
    fn test_flatten_prefers_inner() {
        let mut context = context_with("a", json!(1));
        context.push();
        context.set("a", json!(2));
        context.set("b", json!(3));

        let flat = context.flatten();
        assert_eq!(flat.get("a"), Some(&json!(2)));
        assert_eq!(flat.get("b"), Some(&json!(3)));
    }

    #[test]
    fn test_loop_projection() {
        let mut state = LoopState::new(3, None);
        state.index = 2;
        let projected = state.project();
        assert_eq!(projected["iteration"], json!(3));
        assert_eq!(projected["remaining"], json!(0));
        assert_eq!(projected["last"], json!(true));
        assert_eq!(projected["odd"], json!(true));
        assert_eq!(projected["parent"], json!(null));
    }
}
