//! Traits for the services an [`Engine`][`crate::Engine`] may be
//! wired to.
//!
//! Every service is optional. Without one the engine degrades to a
//! placeholder behavior instead of failing, so templates written for
//! a fully wired application still render in isolation.
use serde_json::Value;
use std::collections::HashMap;

/// Loads template source by name.
///
/// Consulted when a template is rendered, extended or included by a
/// name the engine has no registered source for.
pub trait TemplateResolver: Sync + Send {
    /// Return the source of the named template, if it exists.
    fn load(&self, name: &str) -> Option<String>;
}

impl<F> TemplateResolver for F
where
    F: Fn(&str) -> Option<String> + Sync + Send,
{
    fn load(&self, name: &str) -> Option<String> {
        self(name)
    }
}

/// Resolves route names and static asset paths to URLs.
///
/// Without one, `@url` renders `#` and `@static` prefixes the path
/// with `/static/`.
pub trait UrlResolver: Sync + Send {
    /// Resolve a named route with the given arguments.
    fn resolve_route(
        &self,
        name: &str,
        positional: &[Value],
        named: &HashMap<String, Value>,
    ) -> Option<String>;

    /// Resolve a static asset path.
    fn resolve_static(&self, _path: &str) -> Option<String> {
        None
    }
}

/// Translates display text.
///
/// Without one, `@trans` and `@blocktranslate` render their text
/// untranslated.
pub trait Translator: Sync + Send {
    /// Translate a message.
    fn translate(&self, text: &str) -> String;

    /// Translate a message with a plural form, selected by count.
    fn translate_plural(&self, singular: &str, plural: &str, count: i64) -> String {
        let text = if count == 1 { singular } else { plural };
        self.translate(text)
    }
}

impl<F> Translator for F
where
    F: Fn(&str) -> String + Sync + Send,
{
    fn translate(&self, text: &str) -> String {
        self(text)
    }
}

/// Produces tokens for the `@csrf` directive.
///
/// Without one, `@csrf` renders an input with an empty value.
pub trait CsrfProvider: Sync + Send {
    /// Return the token for the current request.
    fn token(&self) -> String;
}

impl<F> CsrfProvider for F
where
    F: Fn() -> String + Sync + Send,
{
    fn token(&self) -> String {
        self()
    }
}
