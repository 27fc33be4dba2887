use crate::{
    cache::Cache,
    compile::{Parser, Template},
    directive::Directive,
    filter::{self, Filter},
    log::{error_missing_template, Error, INVALID_FILTER},
    render::Renderer,
    service::{CsrfProvider, TemplateResolver, Translator, UrlResolver},
    Store,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Facilitates compiling and rendering templates, and provides storage
/// for filters, directives, named templates and services.
///
/// A new [`Engine`] starts in debug mode, where an evaluation failure
/// inside an interpolation renders as an inline comment describing the
/// problem. Switch it off with [`with_debug`][`Engine::with_debug`]
/// for production, where the same failure renders as nothing. Lex and
/// parse errors always surface, there is no template to render.
pub struct Engine {
    /// Template sources that this Engine is aware of.
    templates: HashMap<String, String>,
    /// Fallback loader for template names not registered directly.
    resolver: Option<Box<dyn TemplateResolver>>,
    /// Filters that this Engine is aware of.
    filters: HashMap<String, Box<dyn Filter>>,
    /// Custom directives that this Engine is aware of.
    directives: HashMap<String, Box<dyn Directive>>,
    urls: Option<Box<dyn UrlResolver>>,
    translator: Option<Box<dyn Translator>>,
    csrf: Option<Box<dyn CsrfProvider>>,
    /// Storage for rendered output, when enabled.
    cache: Option<Cache>,
    debug: bool,
}

impl Engine {
    /// Create a new instance of [`Engine`] carrying the default
    /// filters.
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
            resolver: None,
            filters: filter::defaults(),
            directives: HashMap::new(),
            urls: None,
            translator: None,
            csrf: None,
            cache: None,
            debug: true,
        }
    }

    /// Compile a new [`Template`].
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when compilation fails, which most likely means the source
    /// contains invalid syntax.
    ///
    /// # Examples
    ///
    /// ```
    /// use stylet::Engine;
    ///
    /// let engine = Engine::new();
    /// let template = engine.compile("hello, {{ name }}!");
    /// assert!(template.is_ok());
    /// ```
    #[inline]
    pub fn compile<'source>(&self, text: &'source str) -> Result<Template<'source>, Error> {
        self.parse(text, None)
    }

    /// Compile a new [`Template`].
    ///
    /// # Panics
    ///
    /// Panics when compilation fails, which most likely means the source
    /// contains invalid syntax.
    #[inline]
    pub fn compile_must<'source>(&self, text: &'source str) -> Template<'source> {
        self.compile(text).unwrap()
    }

    /// Render source text with the given [`Store`].
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when compilation fails, or when rendering fails
    /// for a reason that will be described by the `Error`.
    ///
    /// # Examples
    ///
    /// ```
    /// use stylet::{Engine, Store};
    ///
    /// let engine = Engine::new();
    /// let result = engine.render("hello, {{ name }}!", &Store::new().with_must("name", "taylor"));
    ///
    /// assert_eq!(result.unwrap(), "hello, taylor!")
    /// ```
    pub fn render(&self, text: &str, store: &Store) -> Result<String, Error> {
        let key = self
            .cache
            .as_ref()
            .map(|_| Cache::fingerprint(text, store.data()));
        if let (Some(cache), Some(key)) = (&self.cache, key) {
            if let Some(hit) = cache.get(key) {
                return Ok(hit);
            }
        }

        let output = Renderer::new(self, store.data().clone()).render(text, None)?;
        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.put(key, output.clone());
        }

        Ok(output)
    }

    /// Render the named template with the given [`Store`].
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when no template has the name and the
    /// resolver, if any, does not know it either, or when rendering
    /// fails.
    pub fn render_named(&self, name: &str, store: &Store) -> Result<String, Error> {
        let text = self.source(name)?;
        let key = self
            .cache
            .as_ref()
            .map(|_| Cache::fingerprint(&text, store.data()));
        if let (Some(cache), Some(key)) = (&self.cache, key) {
            if let Some(hit) = cache.get(key) {
                return Ok(hit);
            }
        }

        let output = Renderer::new(self, store.data().clone()).render(&text, Some(name))?;
        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.put(key, output.clone());
        }

        Ok(output)
    }

    /// Store a new template source with the given name.
    ///
    /// The source is compiled once here to reject invalid syntax
    /// early.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when a template with the given name already
    /// exists, or when compilation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use stylet::Engine;
    ///
    /// let mut engine = Engine::new();
    /// let result = engine.add_template("greeting", "hello, {{ name }}!");
    /// assert!(result.is_ok());
    ///
    /// let second = engine.add_template("greeting", "hello again");
    /// assert!(second.is_err());
    /// ```
    pub fn add_template(&mut self, name: &str, text: &str) -> Result<(), Error> {
        if self.templates.contains_key(name) {
            return Err(Error::render(format!(
                "template with name `{name}` already exists in engine, \
                overwrite it with `.add_template_must`"
            )));
        }

        self.add_template_must(name, text)
    }

    /// Store a new template source with the given name.
    ///
    /// If a template with the given name already exists in the
    /// [`Engine`], it is overwritten.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when compilation fails.
    pub fn add_template_must(&mut self, name: &str, text: &str) -> Result<(), Error> {
        self.parse(text, Some(name.to_string()))?;
        self.templates.insert(name.to_string(), text.to_string());

        Ok(())
    }

    /// Store a new template source with the given name.
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the name is taken or compilation fails.
    pub fn with_template(mut self, name: &str, text: &str) -> Result<Self, Error> {
        self.add_template(name, text)?;
        Ok(self)
    }

    /// Store a new template source with the given name, overwriting
    /// any existing one.
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    ///
    /// # Panics
    ///
    /// Panics when compilation fails.
    pub fn with_template_must(mut self, name: &str, text: &str) -> Self {
        self.add_template_must(name, text).unwrap();
        self
    }

    /// Set the [`TemplateResolver`] consulted for template names that
    /// are not registered directly.
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    pub fn with_resolver<T>(mut self, resolver: T) -> Self
    where
        T: TemplateResolver + 'static,
    {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Add a [`Filter`].
    ///
    /// # Errors
    ///
    /// If a `Filter` with the given name already exists in the engine, an [`Error`] is returned.
    pub fn add_filter<T>(&mut self, name: &str, filter: T) -> Result<(), Error>
    where
        T: Filter + 'static,
    {
        if self.filters.contains_key(name) {
            return Err(Error::render(INVALID_FILTER).with_help(format!(
                "filter with name `{name}` already exists in engine, \
                overwrite it with `.add_filter_must`"
            )));
        }
        self.filters.insert(name.to_string(), Box::new(filter));
        Ok(())
    }

    /// Add a [`Filter`].
    ///
    /// If a `Filter` with the given name already exists in the [`Engine`], it is overwritten.
    #[inline]
    pub fn add_filter_must<T>(&mut self, name: &str, filter: T)
    where
        T: Filter + 'static,
    {
        self.filters.insert(name.to_string(), Box::new(filter));
    }

    /// Add a [`Filter`].
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    ///
    /// # Errors
    ///
    /// If a `Filter` with the given name already exists in the engine, an [`Error`] is returned.
    #[inline]
    pub fn with_filter<T>(mut self, name: &str, filter: T) -> Result<Self, Error>
    where
        T: Filter + 'static,
    {
        self.add_filter(name, filter)?;
        Ok(self)
    }

    /// Add a [`Filter`].
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    ///
    /// If a `Filter` with the given name already exists in the engine, it is overwritten.
    #[inline]
    pub fn with_filter_must<T>(mut self, name: &str, filter: T) -> Self
    where
        T: Filter + 'static,
    {
        self.add_filter_must(name, filter);
        self
    }

    /// Return the filter with the given name, if it exists in Engine.
    #[inline]
    pub fn get_filter(&self, name: &str) -> Option<&dyn Filter> {
        self.filters.get(name).map(Box::as_ref)
    }

    /// Add a custom [`Directive`].
    ///
    /// The parser accepts `@name` in any template compiled by this
    /// engine afterwards.
    ///
    /// # Errors
    ///
    /// If a `Directive` with the given name already exists in the engine,
    /// an [`Error`] is returned.
    pub fn add_directive<T>(&mut self, name: &str, directive: T) -> Result<(), Error>
    where
        T: Directive + 'static,
    {
        if self.directives.contains_key(name) {
            return Err(Error::render(format!(
                "directive with name `{name}` already exists in engine, \
                overwrite it with `.add_directive_must`"
            )));
        }
        self.directives.insert(name.to_string(), Box::new(directive));
        Ok(())
    }

    /// Add a custom [`Directive`].
    ///
    /// If a `Directive` with the given name already exists in the
    /// [`Engine`], it is overwritten.
    #[inline]
    pub fn add_directive_must<T>(&mut self, name: &str, directive: T)
    where
        T: Directive + 'static,
    {
        self.directives.insert(name.to_string(), Box::new(directive));
    }

    /// Add a custom [`Directive`].
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    ///
    /// # Errors
    ///
    /// If a `Directive` with the given name already exists in the engine,
    /// an [`Error`] is returned.
    #[inline]
    pub fn with_directive<T>(mut self, name: &str, directive: T) -> Result<Self, Error>
    where
        T: Directive + 'static,
    {
        self.add_directive(name, directive)?;
        Ok(self)
    }

    /// Add a custom [`Directive`].
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    ///
    /// If a `Directive` with the given name already exists in the
    /// engine, it is overwritten.
    #[inline]
    pub fn with_directive_must<T>(mut self, name: &str, directive: T) -> Self
    where
        T: Directive + 'static,
    {
        self.add_directive_must(name, directive);
        self
    }

    /// Set the [`UrlResolver`] behind `@url` and `@static`.
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    pub fn with_url_resolver<T>(mut self, resolver: T) -> Self
    where
        T: UrlResolver + 'static,
    {
        self.urls = Some(Box::new(resolver));
        self
    }

    /// Set the [`Translator`] behind `@trans` and `@blocktranslate`.
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    pub fn with_translator<T>(mut self, translator: T) -> Self
    where
        T: Translator + 'static,
    {
        self.translator = Some(Box::new(translator));
        self
    }

    /// Set the [`CsrfProvider`] behind `@csrf`.
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    pub fn with_csrf_provider<T>(mut self, provider: T) -> Self
    where
        T: CsrfProvider + 'static,
    {
        self.csrf = Some(Box::new(provider));
        self
    }

    /// Enable output caching with the given [`Cache`].
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set debug mode.
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Drop every cached render.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Drop the cached render of the given source and data, if any.
    pub fn invalidate(&self, text: &str, store: &Store) {
        if let Some(cache) = &self.cache {
            cache.invalidate(Cache::fingerprint(text, store.data()));
        }
    }

    pub(crate) fn parse<'source>(
        &self,
        source: &'source str,
        name: Option<String>,
    ) -> Result<Template<'source>, Error> {
        let custom: HashSet<String> = self.directives.keys().cloned().collect();
        Parser::new(source).with_directives(custom).compile(name)
    }

    /// Return the source of the named template, from direct storage
    /// first and the resolver second.
    pub(crate) fn source(&self, name: &str) -> Result<String, Error> {
        if let Some(text) = self.templates.get(name) {
            return Ok(text.clone());
        }
        if let Some(resolver) = &self.resolver {
            if let Some(text) = resolver.load(name) {
                return Ok(text);
            }
        }

        Err(error_missing_template(name))
    }

    pub(crate) fn filters(&self) -> &HashMap<String, Box<dyn Filter>> {
        &self.filters
    }

    pub(crate) fn directive(&self, name: &str) -> Option<&dyn Directive> {
        self.directives.get(name).map(Box::as_ref)
    }

    pub(crate) fn is_debug(&self) -> bool {
        self.debug
    }

    pub(crate) fn csrf_token(&self) -> Option<String> {
        self.csrf.as_ref().map(|provider| provider.token())
    }

    pub(crate) fn resolve_route(
        &self,
        name: &str,
        positional: &[Value],
        named: &HashMap<String, Value>,
    ) -> Option<String> {
        self.urls
            .as_ref()
            .and_then(|urls| urls.resolve_route(name, positional, named))
    }

    pub(crate) fn resolve_static(&self, path: &str) -> Option<String> {
        self.urls.as_ref().and_then(|urls| urls.resolve_static(path))
    }

    pub(crate) fn translate(&self, text: &str) -> String {
        match &self.translator {
            Some(translator) => translator.translate(text),
            None => text.to_string(),
        }
    }

    pub(crate) fn translate_plural(&self, singular: &str, plural: &str, count: i64) -> String {
        match &self.translator {
            Some(translator) => translator.translate_plural(singular, plural, count),
            None if count == 1 => singular.to_string(),
            None => plural.to_string(),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::{engine::Engine, log::Error, Cache, Store};
    use serde_json::Value;
    use std::collections::HashMap;

    #[test]
    fn test_add() {
        let mut engine = Engine::new();
        engine.add_filter_must("faux", faux_filter_a);

        assert!(engine.get_filter("faux").is_some());
        assert!(engine.get_filter("ghost").is_none())
    }

    #[test]
    fn test_add_fluent() {
        assert!(Engine::new()
            .with_filter("faux", faux_filter_a)
            .unwrap()
            .get_filter("faux")
            .is_some());
        assert!(Engine::new().get_filter("ghost").is_none());
    }

    #[test]
    fn test_add_duplicate() {
        assert!(Engine::new()
            .with_filter_must("faux", faux_filter_a)
            .with_filter("faux", faux_filter_a)
            .is_err())
    }

    #[test]
    fn test_add_overwrite() {
        let value = Value::Null;
        let arguments = HashMap::new();

        let mut engine = Engine::new().with_filter_must("faux", faux_filter_a);
        assert!(engine.get_filter("faux").is_some_and(|f| f
            .apply(&value, &arguments)
            .is_ok_and(|v| v == Value::String("a".into()))));

        engine.add_filter_must("faux", faux_filter_b);
        assert!(engine.get_filter("faux").is_some_and(|f| f
            .apply(&value, &arguments)
            .is_ok_and(|v| v == Value::String("b".into()))));
    }

    #[test]
    fn test_add_template_duplicate() {
        let mut engine = Engine::new();
        assert!(engine.add_template("page", "one").is_ok());
        assert!(engine.add_template("page", "two").is_err());
        assert!(engine.add_template_must("page", "two").is_ok());
    }

    #[test]
    fn test_add_template_rejects_invalid() {
        let mut engine = Engine::new();
        assert!(engine.add_template("broken", "{{ name").is_err());
    }

    #[test]
    fn test_render_cached_matches_fresh() {
        let store = Store::new().with_must("name", "taylor");
        let cached = Engine::new().with_cache(Cache::new());
        let fresh = Engine::new();

        let first = cached.render("hello, {{ name }}!", &store).unwrap();
        let second = cached.render("hello, {{ name }}!", &store).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, fresh.render("hello, {{ name }}!", &store).unwrap());
    }

    #[test]
    fn test_invalidate_cached_render() {
        let store = Store::new();
        let engine = Engine::new().with_cache(Cache::new());
        assert_eq!(engine.render("x", &store).unwrap(), "x");
        engine.invalidate("x", &store);
        engine.clear_cache();
        assert_eq!(engine.render("x", &store).unwrap(), "x");
    }

    /// A Filter used to test Engine.
    fn faux_filter_a(_: &Value, _: &HashMap<String, Value>) -> Result<Value, Error> {
        Ok(Value::String("a".into()))
    }

    /// A Filter used to test Engine.
    fn faux_filter_b(_: &Value, _: &HashMap<String, Value>) -> Result<Value, Error> {
        Ok(Value::String("b".into()))
    }
}
