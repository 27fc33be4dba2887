//! Contains the `Filter` trait and other types useful for creating and using filters.
//!
//! A filter is any type which implements the [`Filter`][`crate::filter::Filter`] trait.
//! You can assign a filter to an [`Engine`][`crate::Engine`] with the
//! [`add_filter`][`crate::Engine::add_filter()`] method, and it will be available in any
//! template rendered by that engine.
//!
//! Filters are invoked with attribute syntax. Given this expression:
//!
//! ```html
//! {{ title.slugify }}
//! ```
//!
//! The "title" name is resolved against the render context, and because the
//! result has no mapping key or whitelisted method named "slugify", the engine
//! searches for a filter with that name and passes the value to it.
//!
//! A filter may also take arguments:
//!
//! ```html
//! {{ summary.excerpt(100, suffix="…") }}
//! ```
//!
//! Anonymous arguments have no explicitly assigned name, but they do still
//! receive an implicitly generated name. For each anonymous argument in a
//! filter call, the name is equal to (n + 1) where "n" is the number of
//! anonymous arguments that came before the argument, so "100" above is
//! passed with the name "1".
//!
//! # Examples
//!
//! You can either create a struct and implement the trait on that, or just
//! create a function matching the trait signature. Both are accepted. Here we
//! use a function:
//!
//! ```rust
//! use stylet::{
//!     filter::{
//!         serde::{json, Value},
//!         Error,
//!     },
//!     Engine, Store,
//! };
//! use std::collections::HashMap;
//!
//! fn shout(value: &Value, _: &HashMap<String, Value>) -> Result<Value, Error> {
//!     match value {
//!         Value::String(string) => Ok(json!(format!("{}!", string.to_uppercase()))),
//!         _ => Err(Error::render("filter `shout` expects string input")
//!             .with_help("use quotes to coerce data to string")),
//!     }
//! }
//!
//! let engine = Engine::new().with_filter_must("shout", shout);
//!
//! let result = engine.render(
//!     "{{ name.shout }}",
//!     &Store::new().with_must("name", "taylor"),
//! );
//!
//! assert_eq!(result.unwrap(), "TAYLOR!");
//! ```
//!
//! If you return an [`Error`][`crate::filter::Error`] in your filter without
//! setting your own visualization, one is generated automatically that points
//! to the expression the filter appears in.

pub mod serde {
    //! Contains types from `serde_json`.
    pub use serde_json::*;
}
pub mod visual {
    //! Contains the `Visual` trait and different types which implement `Visual`.
    pub use crate::log::{Pointer, Visual};
}

mod builtin;

pub(crate) use builtin::defaults;

pub use crate::{log::Error, region::Region};

use serde_json::Value;
use std::collections::HashMap;

/// Describes a type which can be used to transform input in an expression.
pub trait Filter: Sync + Send {
    /// Execute the filter with the given input and return a new Value as output.
    fn apply(&self, input: &Value, args: &HashMap<String, Value>) -> Result<Value, Error>;
}

/// Allows assignment of any function matching the signature of `apply` as a `Filter`
/// to `Engine`, instead of requiring a struct be created.
impl<F> Filter for F
where
    F: Fn(&Value, &HashMap<String, Value>) -> Result<Value, Error> + Sync + Send,
{
    fn apply(&self, value: &Value, args: &HashMap<String, Value>) -> Result<Value, Error> {
        self(value, args)
    }
}
