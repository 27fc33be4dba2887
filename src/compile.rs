pub mod lex;
pub mod parse;

mod template;

pub use crate::compile::{
    lex::token,
    parse::{scope::Scope, tree, Parser},
    template::Template,
};

use crate::log::Error;

/// Compile a [`Template`] from the given text.
///
/// Provides a shortcut to quickly compile a `Template` without creating
/// an `Engine`.
///
/// # Examples
///
/// ```
/// use stylet::compile;
///
/// let template = compile("{{ name }}");
/// assert!(template.is_ok())
/// ```
pub fn compile(text: &str) -> Result<Template, Error> {
    Parser::new(text).compile(None)
}
