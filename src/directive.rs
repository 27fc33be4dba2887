//! Contains the `Directive` trait used to register custom directives.
use crate::log::Error;
use serde_json::Value;
use std::collections::HashMap;

/// Describes a type which renders a custom inline directive.
///
/// Register one with [`add_directive`][`crate::Engine::add_directive`]
/// and the parser will accept `@name` and `@name(arguments)` wherever
/// a node may appear. Arguments follow the same convention as filter
/// arguments, anonymous ones are named by position from "1".
pub trait Directive: Sync + Send {
    /// Render the directive with the given arguments.
    fn render(&self, args: &HashMap<String, Value>) -> Result<String, Error>;
}

/// Allows assignment of any function matching the signature of `render`
/// as a `Directive` to `Engine`, instead of requiring a struct be created.
impl<F> Directive for F
where
    F: Fn(&HashMap<String, Value>) -> Result<String, Error> + Sync + Send,
{
    fn render(&self, args: &HashMap<String, Value>) -> Result<String, Error> {
        self(args)
    }
}
