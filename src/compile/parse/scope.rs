use super::tree::Node;

/// An ordered set of [`Node`] instances within a distinct area of
/// the source text, such as the body of an `@if` directive.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub data: Vec<Node>,
}

impl Scope {
    /// Create an empty Scope.
    pub fn new() -> Self {
        Self { data: vec![] }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}
