mod pipe;

pub(crate) use pipe::Pipe;

use crate::{
    compile::{
        tree::{self, Node},
        Scope,
    },
    context::{Context, LoopState},
    expr::{
        parse::parse_arguments,
        value::{display, is_truthy, type_name},
        Evaluator,
    },
    log::{error_max_depth, error_write, Error, ErrorKind},
    region::Region,
    Engine, Store,
};
use serde_json::{Map, Value};
use std::{collections::HashMap, fmt::Write};

/// The deepest chain of templates a render may load.
pub(crate) const MAX_DEPTH: usize = 64;

/// Render source text with the given [`Store`].
///
/// Provides a shortcut to quickly render a template when no advanced
/// features are needed. Create an [`Engine`][`crate::Engine`] to use
/// custom filters, directives, named templates or services.
///
/// # Examples
///
/// ```
/// use stylet::{render, Store};
///
/// let output = render("hello, {{ name }}!", &Store::new().with_must("name", "taylor"));
/// assert_eq!(output.unwrap(), "hello, taylor!");
/// ```
pub fn render(text: &str, store: &Store) -> Result<String, Error> {
    Engine::new().render(text, store)
}

/// The way a scope finished rendering.
#[derive(Debug, PartialEq, Clone, Copy)]
enum Interrupt {
    /// The scope ran to the end.
    Finished,
    /// A `@break` fired and the nearest loop should stop.
    Break,
    /// A `@continue` fired and the nearest loop should advance.
    Continue,
}

pub(crate) struct Renderer<'render> {
    /// The engine holding filters, directives and services.
    engine: &'render Engine,
    /// The live variable scopes.
    context: Context,
    /// Output recorded by `@section`, consumed by `@yield`.
    sections: HashMap<String, String>,
    /// Output recorded by `@block` in extending templates.
    overrides: HashMap<String, String>,
    /// The layout requested by the template being rendered, if any.
    extends: Option<String>,
    /// How many templates deep this renderer is.
    depth: usize,
}

impl<'render> Renderer<'render> {
    /// Create a new Renderer over the given data.
    pub fn new(engine: &'render Engine, data: Map<String, Value>) -> Self {
        Renderer {
            engine,
            context: Context::new(data),
            sections: HashMap::new(),
            overrides: HashMap::new(),
            extends: None,
            depth: 0,
        }
    }

    fn nested(engine: &'render Engine, data: Map<String, Value>, depth: usize) -> Self {
        let mut renderer = Self::new(engine, data);
        renderer.depth = depth;

        renderer
    }

    /// Render the given source text, following its inheritance chain.
    ///
    /// The template is rendered and, when it declares a layout with
    /// `@extends`, its own output is discarded and the layout renders
    /// next against the sections and blocks the child recorded.
    pub fn render(mut self, source: &str, name: Option<&str>) -> Result<String, Error> {
        let mut current = source.to_string();
        let mut name = name.map(str::to_string);

        loop {
            if self.depth >= MAX_DEPTH {
                return Err(error_max_depth(name.as_deref().unwrap_or("?")));
            }

            let mut buffer = String::with_capacity(current.len());
            let parent = {
                let template = self.engine.parse(&current, name.clone())?;
                let mut pipe = Pipe::new(&mut buffer);
                self.extends = None;
                let interrupt = self
                    .render_scope(&current, &template.scope, &mut pipe)
                    .map_err(|error| match name.as_deref() {
                        Some(name) if error.get_name().is_none() => error.with_name(name),
                        _ => error,
                    })?;
                match interrupt {
                    Interrupt::Finished => {}
                    Interrupt::Break => {
                        return Err(Error::render("`@break` used outside of a loop"))
                    }
                    Interrupt::Continue => {
                        return Err(Error::render("`@continue` used outside of a loop"))
                    }
                }
                self.extends.take()
            };

            match parent {
                Some(parent) => {
                    self.depth += 1;
                    current = self.engine.source(&parent)?;
                    name = Some(parent);
                }
                None => return Ok(buffer),
            }
        }
    }

    fn render_scope(
        &mut self,
        source: &str,
        scope: &Scope,
        pipe: &mut Pipe,
    ) -> Result<Interrupt, Error> {
        for node in &scope.data {
            let interrupt = self.render_node(source, node, pipe)?;
            if interrupt != Interrupt::Finished {
                return Ok(interrupt);
            }
        }

        Ok(Interrupt::Finished)
    }

    /// Reject a loop interrupt that would cross a capture boundary.
    ///
    /// Component and blocktranslate bodies render into detached text
    /// handed to another template, so a `@break` inside them has no
    /// loop to reach.
    fn require_finished(interrupt: Interrupt, place: &str) -> Result<(), Error> {
        match interrupt {
            Interrupt::Finished => Ok(()),
            Interrupt::Break => Err(Error::render(format!(
                "`@break` cannot escape {place}"
            ))),
            Interrupt::Continue => Err(Error::render(format!(
                "`@continue` cannot escape {place}"
            ))),
        }
    }

    fn render_node(
        &mut self,
        source: &str,
        node: &Node,
        pipe: &mut Pipe,
    ) -> Result<Interrupt, Error> {
        match node {
            Node::Text(region) => {
                pipe.write_str(region.literal(source))
                    .map_err(|_| error_write())?;
            }
            Node::Variable(output) => self.render_output(source, output, pipe)?,
            Node::If(node) => return self.render_if(source, node, pipe),
            Node::For(node) => return self.render_for(source, node, pipe),
            Node::Switch(node) => return self.render_switch(source, node, pipe),
            Node::Auth(node) => {
                let body = if self.authenticated() != node.guest {
                    Some(&node.body)
                } else {
                    node.otherwise.as_ref()
                };
                if let Some(body) = body {
                    return self.render_scope(source, body, pipe);
                }
            }
            Node::Extends(region) => {
                let layout = self.evaluate(source, *region)?;
                self.extends = Some(display(&layout));
            }
            Node::Section(node) => return self.render_section(source, node),
            Node::Yield(node) => {
                let (positional, _) = self.evaluate_arguments(source, node.arguments)?;
                let name = Self::name_argument(source, node.arguments, &positional, "yield")?;
                let text = match self.sections.get(&name) {
                    Some(text) => text.clone(),
                    None => positional.get(1).map(display).unwrap_or_default(),
                };
                pipe.write_str(&text).map_err(|_| error_write())?;
            }
            Node::Block(node) => return self.render_block(source, node, pipe),
            Node::Include(node) => {
                let text = self.render_include(source, node)?;
                pipe.write_str(&text).map_err(|_| error_write())?;
            }
            Node::Component(node) => {
                let text = self.render_component(source, node)?;
                pipe.write_str(&text).map_err(|_| error_write())?;
            }
            // Slots only mean something inside a component body.
            Node::Slot(_) => {}
            Node::Verbatim(region) => {
                pipe.write_str(region.literal(source))
                    .map_err(|_| error_write())?;
            }
            Node::Cycle(region) => {
                let (positional, _) = self.evaluate_arguments(source, *region)?;
                if positional.is_empty() {
                    return Err(Error::render("`@cycle` expects at least one argument")
                        .with_pointer(source, *region));
                }
                let index = self
                    .context
                    .lookup("loop")
                    .and_then(|state| state.get("index"))
                    .and_then(Value::as_u64)
                    .unwrap_or(0) as usize;
                pipe.write_value(&positional[index % positional.len()])
                    .map_err(|_| error_write())?;
            }
            Node::FirstOf(region) => self.render_firstof(source, *region, pipe)?,
            Node::Break(condition) => {
                if self.interrupt_fires(source, condition)? {
                    return Ok(Interrupt::Break);
                }
            }
            Node::Continue(condition) => {
                if self.interrupt_fires(source, condition)? {
                    return Ok(Interrupt::Continue);
                }
            }
            Node::With(node) => {
                let (positional, named) = self.evaluate_arguments(source, node.arguments)?;
                if !positional.is_empty() {
                    return Err(Error::incompatible(
                        "`@with` takes `name=expression` arguments only",
                    )
                    .with_pointer(source, node.arguments));
                }
                self.context.push();
                for (name, value) in named {
                    self.context.set(name, value);
                }
                let interrupt = self.render_scope(source, &node.body, pipe);
                self.context.pop();
                return interrupt;
            }
            Node::Csrf => {
                // Without a provider the context may still carry a token.
                let token = self.engine.csrf_token().unwrap_or_else(|| {
                    self.context
                        .lookup("csrf_token")
                        .map(display)
                        .unwrap_or_default()
                });
                write!(
                    pipe,
                    "<input type=\"hidden\" name=\"csrfmiddlewaretoken\" value=\"{token}\">"
                )
                .map_err(|_| error_write())?;
            }
            Node::Method(region) => {
                let method = self.evaluate(source, *region)?;
                pipe.write_str("<input type=\"hidden\" name=\"_method\" value=\"")
                    .and_then(|_| pipe.write_escaped(&display(&method)))
                    .and_then(|_| pipe.write_str("\">"))
                    .map_err(|_| error_write())?;
            }
            Node::Url(region) => {
                let (positional, named) = self.evaluate_arguments(source, *region)?;
                let name = Self::name_argument(source, *region, &positional, "url")?;
                let url = self
                    .engine
                    .resolve_route(&name, &positional[1..], &named)
                    .unwrap_or_else(|| "#".to_string());
                pipe.write_escaped(&url).map_err(|_| error_write())?;
            }
            Node::Static(region) => {
                let (positional, _) = self.evaluate_arguments(source, *region)?;
                let path = Self::name_argument(source, *region, &positional, "static")?;
                let url = self
                    .engine
                    .resolve_static(&path)
                    .unwrap_or_else(|| format!("/static/{path}"));
                pipe.write_escaped(&url).map_err(|_| error_write())?;
            }
            Node::Style(region) => {
                let pieces = self.attribute_pieces(source, *region)?;
                if !pieces.is_empty() {
                    pipe.write_str("style=\"")
                        .and_then(|_| pipe.write_escaped(&pieces.join("; ")))
                        .and_then(|_| pipe.write_str("\""))
                        .map_err(|_| error_write())?;
                }
            }
            Node::Class(region) => {
                let pieces = self.attribute_pieces(source, *region)?;
                if !pieces.is_empty() {
                    pipe.write_str("class=\"")
                        .and_then(|_| pipe.write_escaped(&pieces.join(" ")))
                        .and_then(|_| pipe.write_str("\""))
                        .map_err(|_| error_write())?;
                }
            }
            Node::Flag(node) => {
                if self.evaluate_truthy(source, node.condition)? {
                    pipe.write_str(node.name.literal(source))
                        .map_err(|_| error_write())?;
                }
            }
            Node::Error(node) => return self.render_error_block(source, node, pipe),
            Node::Trans(region) => {
                let text = display(&self.evaluate(source, *region)?);
                pipe.write_escaped(&self.engine.translate(&text))
                    .map_err(|_| error_write())?;
            }
            Node::BlockTranslate(node) => return self.render_blocktranslate(source, node, pipe),
            Node::Custom(node) => {
                let directive = self.engine.directive(&node.name).ok_or_else(|| {
                    Error::render(format!("no directive named `{}`", node.name))
                        .with_pointer(source, node.region)
                })?;
                let args = match node.arguments {
                    Some(region) => self.filter_style_arguments(source, region)?,
                    None => HashMap::new(),
                };
                let text = directive
                    .render(&args)
                    .map_err(|error| error.with_pointer_if_missing(source, node.region))?;
                pipe.write_str(&text).map_err(|_| error_write())?;
            }
        }

        Ok(Interrupt::Finished)
    }

    /// Render an interpolation.
    ///
    /// An evaluation failure that is not structural is contained at
    /// the node boundary: in debug mode it renders as an inline
    /// comment describing the problem, otherwise as nothing, so one
    /// bad expression does not take down the rest of the page.
    fn render_output(
        &mut self,
        source: &str,
        output: &tree::Output,
        pipe: &mut Pipe,
    ) -> Result<(), Error> {
        match self.evaluate(source, output.expression) {
            Ok(value) => {
                if output.escape {
                    pipe.write_value(&value).map_err(|_| error_write())?;
                } else {
                    pipe.write_value_raw(&value).map_err(|_| error_write())?;
                }
                Ok(())
            }
            Err(error) if error.kind().is_containable() => {
                if self.engine.is_debug() {
                    write!(pipe, "<!-- {} -->", error.reason()).map_err(|_| error_write())?;
                }
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    fn render_if(
        &mut self,
        source: &str,
        node: &tree::If,
        pipe: &mut Pipe,
    ) -> Result<Interrupt, Error> {
        if self.evaluate_truthy(source, node.condition)? != node.negate {
            return self.render_scope(source, &node.then, pipe);
        }
        for branch in &node.branches {
            if self.evaluate_truthy(source, branch.condition)? {
                return self.render_scope(source, &branch.body, pipe);
            }
        }
        if let Some(otherwise) = &node.otherwise {
            return self.render_scope(source, otherwise, pipe);
        }

        Ok(Interrupt::Finished)
    }

    fn render_for(
        &mut self,
        source: &str,
        node: &tree::For,
        pipe: &mut Pipe,
    ) -> Result<Interrupt, Error> {
        let collection = self.evaluate(source, node.collection)?;
        let rows = self.sequence(source, node, &collection)?;

        if rows.is_empty() {
            if let Some(empty) = &node.empty {
                return self.render_scope(source, empty, pipe);
            }
            return Ok(Interrupt::Finished);
        }

        let parent = self.context.lookup("loop").cloned();
        let mut state = LoopState::new(rows.len(), parent);
        self.context.push();
        let mut result = Ok(Interrupt::Finished);
        for (index, row) in rows.into_iter().enumerate() {
            state.index = index;
            self.context.set("loop", state.project());
            for (binding, value) in node.bindings.iter().zip(row) {
                self.context.set(binding.literal(source), value);
            }
            match self.render_scope(source, &node.body, pipe) {
                Ok(Interrupt::Break) => break,
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
        self.context.pop();

        result
    }

    /// Expand the collection into one row of bound values per
    /// iteration, shaped by the number of bindings.
    fn sequence(
        &self,
        source: &str,
        node: &tree::For,
        collection: &Value,
    ) -> Result<Vec<Vec<Value>>, Error> {
        let pair = node.bindings.len() == 2;
        let rows = match collection {
            Value::Array(array) if !pair => {
                array.iter().map(|item| vec![item.clone()]).collect()
            }
            Value::Array(array) => {
                let mut rows = Vec::with_capacity(array.len());
                for item in array {
                    match item {
                        Value::Array(parts) if parts.len() == 2 => {
                            rows.push(vec![parts[0].clone(), parts[1].clone()])
                        }
                        _ => {
                            return Err(Error::incompatible(format!(
                                "cannot unpack {} into two names",
                                type_name(item)
                            ))
                            .with_pointer(source, node.collection))
                        }
                    }
                }
                rows
            }
            Value::Object(object) if !pair => object
                .keys()
                .map(|key| vec![Value::String(key.clone())])
                .collect(),
            Value::Object(object) => object
                .iter()
                .map(|(key, value)| vec![Value::String(key.clone()), value.clone()])
                .collect(),
            Value::String(string) if !pair => string
                .chars()
                .map(|char| vec![Value::String(char.to_string())])
                .collect(),
            _ => {
                return Err(Error::incompatible(format!(
                    "{} is not iterable",
                    type_name(collection)
                ))
                .with_pointer(source, node.collection))
            }
        };

        Ok(rows)
    }

    fn render_switch(
        &mut self,
        source: &str,
        node: &tree::Switch,
        pipe: &mut Pipe,
    ) -> Result<Interrupt, Error> {
        let subject = self.evaluate(source, node.subject)?;
        for case in &node.cases {
            let value = self.evaluate(source, case.value)?;
            if crate::expr::value::equals(&subject, &value) {
                return self.render_scope(source, &case.body, pipe);
            }
        }
        if let Some(default) = &node.default {
            return self.render_scope(source, default, pipe);
        }

        Ok(Interrupt::Finished)
    }

    /// Record a section. Sections emit nothing where they appear, the
    /// first recording of a name wins so a child's section shadows
    /// the same name further up the inheritance chain.
    fn render_section(&mut self, source: &str, node: &tree::Section) -> Result<Interrupt, Error> {
        let (positional, _) = self.evaluate_arguments(source, node.arguments)?;
        let name = Self::name_argument(source, node.arguments, &positional, "section")?;

        let text = match &node.body {
            None => match positional.get(1) {
                Some(value) => display(value),
                None => {
                    return Err(Error::render(
                        "inline `@section` expects a name and a value",
                    )
                    .with_pointer(source, node.arguments))
                }
            },
            Some(body) => {
                let mut text = String::new();
                let mut inner = Pipe::new(&mut text);
                let interrupt = self.render_scope(source, body, &mut inner)?;
                self.sections.entry(name).or_insert(text);
                return Ok(interrupt);
            }
        };
        self.sections.entry(name).or_insert(text);

        Ok(Interrupt::Finished)
    }

    /// Render or record a block.
    ///
    /// In a template that extends a layout the body is recorded as an
    /// override and emits nothing. In the layout itself the block
    /// emits the recorded override, or its own body as the default.
    fn render_block(
        &mut self,
        source: &str,
        node: &tree::Block,
        pipe: &mut Pipe,
    ) -> Result<Interrupt, Error> {
        let name = display(&self.evaluate(source, node.name)?);

        if self.extends.is_some() {
            let mut text = String::new();
            let mut inner = Pipe::new(&mut text);
            let interrupt = self.render_scope(source, &node.body, &mut inner)?;
            self.overrides.entry(name).or_insert(text);
            return Ok(interrupt);
        }

        match self.overrides.get(&name) {
            Some(text) => {
                pipe.write_str(text).map_err(|_| error_write())?;
                Ok(Interrupt::Finished)
            }
            None => self.render_scope(source, &node.body, pipe),
        }
    }

    /// Render another template in isolation and return its output.
    ///
    /// The included template sees the flattened current data plus any
    /// named arguments, but shares no other render state.
    fn render_include(&mut self, source: &str, node: &tree::Include) -> Result<String, Error> {
        let (positional, named) = self.evaluate_arguments(source, node.arguments)?;
        let name = Self::name_argument(source, node.arguments, &positional, "include")?;
        let child = self.engine.source(&name).map_err(|error| {
            error.with_pointer_if_missing(source, node.arguments)
        })?;

        let mut data = self.context.flatten();
        for (key, value) in named {
            data.insert(key, value);
        }

        Renderer::nested(self.engine, data, self.depth + 1).render(&child, Some(&name))
    }

    /// Render a component template, binding its body to the `slot`
    /// name and any named `@slot` blocks to their own names.
    fn render_component(&mut self, source: &str, node: &tree::Component) -> Result<String, Error> {
        let (positional, named) = self.evaluate_arguments(source, node.arguments)?;
        let name = Self::name_argument(source, node.arguments, &positional, "component")?;
        let child = self.engine.source(&name).map_err(|error| {
            error.with_pointer_if_missing(source, node.arguments)
        })?;

        let mut slots: Vec<(String, String)> = vec![];
        let mut body = String::new();
        {
            let mut default = Pipe::new(&mut body);
            for inner in &node.body.data {
                if let Node::Slot(slot) = inner {
                    let (names, _) = self.evaluate_arguments(source, slot.arguments)?;
                    let slot_name =
                        Self::name_argument(source, slot.arguments, &names, "slot")?;
                    let mut text = String::new();
                    let mut inner_pipe = Pipe::new(&mut text);
                    let interrupt = self.render_scope(source, &slot.body, &mut inner_pipe)?;
                    Self::require_finished(interrupt, "a `@component` slot")?;
                    slots.push((slot_name, text));
                } else {
                    let interrupt = self.render_node(source, inner, &mut default)?;
                    Self::require_finished(interrupt, "a `@component` body")?;
                }
            }
        }

        let mut data = self.context.flatten();
        for (key, value) in named {
            data.insert(key, value);
        }
        data.insert("slot".into(), Value::String(body));
        for (slot_name, text) in slots {
            data.insert(slot_name, Value::String(text));
        }

        Renderer::nested(self.engine, data, self.depth + 1).render(&child, Some(&name))
    }

    fn render_firstof(
        &mut self,
        source: &str,
        region: Region,
        pipe: &mut Pipe,
    ) -> Result<(), Error> {
        let arguments = parse_arguments(source, region)?;
        let filters = self.engine.filters();
        let evaluator = Evaluator::new(source, &self.context, filters);
        for argument in &arguments.positional {
            // An undefined name counts as a falsy candidate.
            let value = match evaluator.eval_expression(argument) {
                Ok(value) => value,
                Err(error) if error.kind() == ErrorKind::UndefinedVariable => continue,
                Err(error) => return Err(error),
            };
            if is_truthy(&value) {
                return pipe.write_value(&value).map_err(|_| error_write());
            }
        }

        Ok(())
    }

    fn render_error_block(
        &mut self,
        source: &str,
        node: &tree::ErrorBlock,
        pipe: &mut Pipe,
    ) -> Result<Interrupt, Error> {
        let field = display(&self.evaluate(source, node.field)?);
        let message = self
            .context
            .lookup("errors")
            .and_then(|errors| errors.get(&field))
            .cloned();

        match message {
            Some(message) if is_truthy(&message) => {
                self.context.push();
                self.context.set("message", message);
                let interrupt = self.render_scope(source, &node.body, pipe);
                self.context.pop();
                interrupt
            }
            _ => Ok(Interrupt::Finished),
        }
    }

    fn render_blocktranslate(
        &mut self,
        source: &str,
        node: &tree::BlockTranslate,
        pipe: &mut Pipe,
    ) -> Result<Interrupt, Error> {
        let count = match node.arguments {
            Some(region) => {
                let (_, named) = self.evaluate_arguments(source, region)?;
                match named.get("count") {
                    Some(count) => Some(count.as_i64().ok_or_else(|| {
                        Error::incompatible("`count` must be a whole number")
                            .with_pointer(source, region)
                    })?),
                    None => None,
                }
            }
            None => None,
        };

        self.context.push();
        if let Some(count) = count {
            self.context.set("count", Value::from(count));
        }
        let result = self.blocktranslate_text(source, node, count);
        self.context.pop();

        pipe.write_str(&result?).map_err(|_| error_write())?;
        Ok(Interrupt::Finished)
    }

    fn blocktranslate_text(
        &mut self,
        source: &str,
        node: &tree::BlockTranslate,
        count: Option<i64>,
    ) -> Result<String, Error> {
        let mut singular = String::new();
        let mut inner = Pipe::new(&mut singular);
        let interrupt = self.render_scope(source, &node.body, &mut inner)?;
        Self::require_finished(interrupt, "a `@blocktranslate` body")?;

        match (&node.plural, count) {
            (Some(scope), Some(count)) => {
                let mut plural = String::new();
                let mut inner = Pipe::new(&mut plural);
                let interrupt = self.render_scope(source, scope, &mut inner)?;
                Self::require_finished(interrupt, "a `@blocktranslate` body")?;
                Ok(self.engine.translate_plural(&singular, &plural, count))
            }
            _ => Ok(self.engine.translate(&singular)),
        }
    }

    /// Collect the pieces of a conditional `class` or `style`
    /// attribute value.
    ///
    /// A string always contributes, a mapping contributes keys whose
    /// values are truthy, and a list mixes both forms.
    fn attribute_pieces(&mut self, source: &str, region: Region) -> Result<Vec<String>, Error> {
        fn collect(value: &Value, pieces: &mut Vec<String>) -> Result<(), Error> {
            match value {
                Value::String(text) if !text.is_empty() => pieces.push(text.clone()),
                Value::String(_) => {}
                Value::Object(entries) => {
                    for (key, condition) in entries {
                        if is_truthy(condition) {
                            pieces.push(key.clone());
                        }
                    }
                }
                Value::Array(items) => {
                    for item in items {
                        collect(item, pieces)?;
                    }
                }
                _ => {
                    return Err(Error::incompatible(format!(
                        "expected a string, list or mapping, found {}",
                        type_name(value)
                    )))
                }
            }
            Ok(())
        }

        let value = self.evaluate(source, region)?;
        let mut pieces = vec![];
        collect(&value, &mut pieces)
            .map_err(|error| error.with_pointer_if_missing(source, region))?;

        Ok(pieces)
    }

    fn interrupt_fires(&mut self, source: &str, condition: &Option<Region>) -> Result<bool, Error> {
        match condition {
            Some(region) => self.evaluate_truthy(source, *region),
            None => Ok(true),
        }
    }

    /// Whether the context carries an authenticated user.
    ///
    /// Checks `user`, then `request.user`, for a truthy
    /// `is_authenticated` entry.
    fn authenticated(&self) -> bool {
        let user = self.context.lookup("user").cloned().or_else(|| {
            self.context
                .lookup("request")
                .and_then(|request| request.get("user"))
                .cloned()
        });

        match user {
            Some(Value::Object(user)) => user
                .get("is_authenticated")
                .map(is_truthy)
                .unwrap_or(false),
            Some(user) => is_truthy(&user),
            None => false,
        }
    }

    fn evaluate(&self, source: &str, region: Region) -> Result<Value, Error> {
        Evaluator::new(source, &self.context, self.engine.filters()).evaluate(region)
    }

    fn evaluate_truthy(&self, source: &str, region: Region) -> Result<bool, Error> {
        Evaluator::new(source, &self.context, self.engine.filters()).evaluate_truthy(region)
    }

    fn evaluate_arguments(
        &self,
        source: &str,
        region: Region,
    ) -> Result<(Vec<Value>, HashMap<String, Value>), Error> {
        Evaluator::new(source, &self.context, self.engine.filters()).evaluate_arguments(region)
    }

    /// Evaluate a directive argument list into the map form filters
    /// and custom directives receive.
    fn filter_style_arguments(
        &self,
        source: &str,
        region: Region,
    ) -> Result<HashMap<String, Value>, Error> {
        let (positional, named) = self.evaluate_arguments(source, region)?;
        let mut map = HashMap::new();
        for (position, argument) in positional.into_iter().enumerate() {
            map.insert((position + 1).to_string(), argument);
        }
        map.extend(named);

        Ok(map)
    }

    /// Pull the leading name argument a directive requires.
    fn name_argument(
        source: &str,
        region: Region,
        positional: &[Value],
        directive: &str,
    ) -> Result<String, Error> {
        match positional.first() {
            Some(value) => Ok(display(value)),
            None => Err(
                Error::render(format!("`@{directive}` expects a name argument"))
                    .with_pointer(source, region),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{log::Error, Engine, ErrorKind, Store};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    #[test]
    fn test_render_text_and_escaping() {
        let store = Store::new().with_must("name", "<b>Taylor</b>");
        let result = Engine::new().render("hi {{ name }} / {!! name !!}", &store);
        assert_eq!(
            result.unwrap(),
            "hi &lt;b&gt;Taylor&lt;/b&gt; / <b>Taylor</b>"
        );
    }

    #[test]
    fn test_render_comment() {
        let result = Engine::new().render("a{# not here #}b", &Store::new());
        assert_eq!(result.unwrap(), "ab");
    }

    #[test]
    fn test_render_if_chain() {
        let source = "@if(left > 300)a@elif(name == \"taylor\")b@elif(not false)c@else d@endif";
        let store = Store::new().with_must("left", 101).with_must("name", "");
        let result = Engine::new().render(source, &store);
        assert_eq!(result.unwrap(), "c");
    }

    #[test]
    fn test_render_unless() {
        let store = Store::new().with_must("ready", false);
        let result = Engine::new().render("@unless(ready)wait@endunless", &store);
        assert_eq!(result.unwrap(), "wait");
    }

    #[test]
    fn test_render_for_loop_variable() {
        let source = "@for(item in items)({{ loop.index }} {{ item }} {{ loop.last }})@endfor";
        let store = Store::new().with_must("items", ["a", "b"]);
        let result = Engine::new().render(source, &store);
        assert_eq!(result.unwrap(), "(0 a false)(1 b true)");
    }

    #[test]
    fn test_render_for_unpacks_mappings() {
        let source = "@for(key, value in prices)[{{ key }}={{ value }}]@endfor";
        let store = Store::new().with_must("prices", json!({"tea": 3, "coffee": 5}));
        let result = Engine::new().render(source, &store);
        assert_eq!(result.unwrap(), "[tea=3][coffee=5]");
    }

    #[test]
    fn test_render_for_empty() {
        let source = "@for(item in items){{ item }}@empty nothing@endfor";
        let store = Store::new().with_must("items", Vec::<i64>::new());
        let result = Engine::new().render(source, &store);
        assert_eq!(result.unwrap(), " nothing");
    }

    #[test]
    fn test_render_for_restores_shadowed_name() {
        let source = "@for(name in names){{ name }}@endfor{{ name }}";
        let store = Store::new()
            .with_must("name", "outer")
            .with_must("names", ["a"]);
        let result = Engine::new().render(source, &store);
        assert_eq!(result.unwrap(), "aouter");
    }

    #[test]
    fn test_render_break_and_continue() {
        let engine = Engine::new();
        let result = engine.render(
            "@for(i in range(5))@if(i == 3)@break@endif{{ i }}@endfor",
            &Store::new(),
        );
        assert_eq!(result.unwrap(), "012");

        let result = engine.render(
            "@for(i in range(5))@continue(i == 2){{ i }}@endfor",
            &Store::new(),
        );
        assert_eq!(result.unwrap(), "0134");
    }

    #[test]
    fn test_render_switch() {
        let source = "@switch(status)@case(\"draft\")D@case(\"live\")L@default?@endswitch";
        let engine = Engine::new();
        let result = engine.render(source, &Store::new().with_must("status", "live"));
        assert_eq!(result.unwrap(), "L");
        let result = engine.render(source, &Store::new().with_must("status", "gone"));
        assert_eq!(result.unwrap(), "?");
    }

    #[test]
    fn test_render_auth_and_guest() {
        let source = "@auth yes@endauth@guest no@endguest";
        let engine = Engine::new();
        let result = engine.render(
            source,
            &Store::new().with_must("user", json!({"is_authenticated": true})),
        );
        assert_eq!(result.unwrap(), " yes");
        let result = engine.render(source, &Store::new());
        assert_eq!(result.unwrap(), " no");
    }

    #[test]
    fn test_render_inheritance_sections() {
        let engine = Engine::new()
            .with_template_must("layout", "<title>@yield('title', 'Home')</title>")
            .with_template_must(
                "about",
                "@extends('layout')@section('title', 'About')",
            );
        let result = engine.render_named("about", &Store::new());
        assert_eq!(result.unwrap(), "<title>About</title>");

        let result = engine.render_named("layout", &Store::new());
        assert_eq!(result.unwrap(), "<title>Home</title>");
    }

    #[test]
    fn test_render_inheritance_blocks() {
        let engine = Engine::new()
            .with_template_must("base", "[@block('side')default@endblock]")
            .with_template_must(
                "page",
                "@extends('base')@block('side')override@endblock",
            );
        let result = engine.render_named("page", &Store::new());
        assert_eq!(result.unwrap(), "[override]");

        let result = engine.render_named("base", &Store::new());
        assert_eq!(result.unwrap(), "[default]");
    }

    #[test]
    fn test_render_include_merges_named_data() {
        let engine = Engine::new().with_template_must("badge", "{{ label }}:{{ count }}");
        let store = Store::new().with_must("label", "new").with_must("count", 1);
        let result = engine.render("@include('badge', count=2)", &store);
        assert_eq!(result.unwrap(), "new:2");
    }

    #[test]
    fn test_render_component_slots() {
        let engine = Engine::new().with_template_must("card", "[{{ header }}|{{ slot }}]");
        let result = engine.render(
            "@component('card')body@slot('header')H@endslot@endcomponent",
            &Store::new(),
        );
        assert_eq!(result.unwrap(), "[H|body]");
    }

    #[test]
    fn test_render_verbatim() {
        let result = Engine::new().render("@verbatim{{ name }}@endverbatim", &Store::new());
        assert_eq!(result.unwrap(), "{{ name }}");
    }

    #[test]
    fn test_render_cycle() {
        let result = Engine::new().render(
            "@for(i in range(3))@cycle('odd', 'even')@endfor",
            &Store::new(),
        );
        assert_eq!(result.unwrap(), "oddevenodd");
    }

    #[test]
    fn test_render_firstof_skips_undefined() {
        let store = Store::new().with_must("fallback", "x");
        let result = Engine::new().render("@firstof(missing, \"\", fallback)", &store);
        assert_eq!(result.unwrap(), "x");
    }

    #[test]
    fn test_render_with() {
        let source = "@with(total=price * quantity){{ total }}@endwith";
        let store = Store::new().with_must("price", 3).with_must("quantity", 4);
        let result = Engine::new().render(source, &store);
        assert_eq!(result.unwrap(), "12");
    }

    #[test]
    fn test_render_csrf_and_method() {
        let engine = Engine::new().with_csrf_provider(|| "token123".to_string());
        let result = engine.render("@csrf", &Store::new());
        assert_eq!(
            result.unwrap(),
            "<input type=\"hidden\" name=\"csrfmiddlewaretoken\" value=\"token123\">"
        );
        let result = engine.render("@method('PUT')", &Store::new());
        assert_eq!(
            result.unwrap(),
            "<input type=\"hidden\" name=\"_method\" value=\"PUT\">"
        );
    }

    #[test]
    fn test_render_url_and_static() {
        struct Routes;
        impl crate::service::UrlResolver for Routes {
            fn resolve_route(
                &self,
                name: &str,
                positional: &[Value],
                _named: &HashMap<String, Value>,
            ) -> Option<String> {
                match name {
                    "post" => Some(format!("/posts/{}", positional[0])),
                    _ => None,
                }
            }
        }

        let engine = Engine::new().with_url_resolver(Routes);
        let result = engine.render("@url('post', 42)", &Store::new());
        assert_eq!(result.unwrap(), "/posts/42");
        let result = engine.render("@url('missing')", &Store::new());
        assert_eq!(result.unwrap(), "#");
        let result = engine.render("@static('app.css')", &Store::new());
        assert_eq!(result.unwrap(), "/static/app.css");
    }

    #[test]
    fn test_render_class_and_flag() {
        let source = "<a @class([\"btn\", {\"active\": current}]) @disabled(locked)>";
        let store = Store::new().with_must("current", true).with_must("locked", true);
        let result = Engine::new().render(source, &store);
        assert_eq!(result.unwrap(), "<a class=\"btn active\" disabled>");

        let store = Store::new().with_must("current", false).with_must("locked", false);
        let result = Engine::new().render(
            "<a @class([{\"active\": current}]) @disabled(locked)>",
            &store,
        );
        assert_eq!(result.unwrap(), "<a  >");
    }

    #[test]
    fn test_render_error_block() {
        let source = "@error('email')<p>{{ message }}</p>@enderror";
        let engine = Engine::new();
        let store = Store::new().with_must("errors", json!({"email": "taken"}));
        let result = engine.render(source, &store);
        assert_eq!(result.unwrap(), "<p>taken</p>");
        let result = engine.render(source, &Store::new());
        assert_eq!(result.unwrap(), "");
    }

    #[test]
    fn test_render_trans() {
        let engine = Engine::new().with_translator(|text: &str| text.to_uppercase());
        let result = engine.render("@trans('hello')", &Store::new());
        assert_eq!(result.unwrap(), "HELLO");
    }

    #[test]
    fn test_render_blocktranslate_plural() {
        let source = "@blocktranslate(count=n){{ count }} item@plural{{ count }} items\
            @endblocktranslate";
        let engine = Engine::new();
        let result = engine.render(source, &Store::new().with_must("n", 1));
        assert_eq!(result.unwrap(), "1 item");
        let result = engine.render(source, &Store::new().with_must("n", 3));
        assert_eq!(result.unwrap(), "3 items");
    }

    #[test]
    fn test_render_custom_directive() {
        let mut engine = Engine::new();
        engine.add_directive_must("repeat", |args: &HashMap<String, Value>| {
            let text = args.get("1").and_then(Value::as_str).unwrap_or_default();
            let times = args.get("2").and_then(Value::as_u64).unwrap_or(1);
            Ok::<_, Error>(text.repeat(times as usize))
        });
        let result = engine.render("@repeat('ha', 3)", &Store::new());
        assert_eq!(result.unwrap(), "hahaha");
    }

    #[test]
    fn test_render_debug_inlines_diagnostic() {
        let result = Engine::new().render("a{{ missing }}b", &Store::new());
        assert_eq!(result.unwrap(), "a<!-- `missing` is not defined -->b");
    }

    #[test]
    fn test_render_guard_errors_always_surface() {
        let result = Engine::new().render("@if(missing)x@endif", &Store::new());
        assert_eq!(result.unwrap_err().kind(), ErrorKind::UndefinedVariable);
    }

    #[test]
    fn test_render_interrupt_outside_loop() {
        let result = Engine::new().render("a@break", &Store::new());
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Render);
        let result = Engine::new().render("@continue", &Store::new());
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Render);
    }

    #[test]
    fn test_render_interrupt_escapes_section() {
        // A section body is still part of the surrounding control
        // flow, so an interrupt passes through the recording.
        let engine = Engine::new();
        let result = engine.render(
            "@for(i in range(3)){{ i }}@section('s')@break@endsection x@endfor",
            &Store::new(),
        );
        assert_eq!(result.unwrap(), "0");

        let result = engine.render(
            "@section('s')@break@endsection@yield('s')",
            &Store::new(),
        );
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Render);
    }

    #[test]
    fn test_render_interrupt_trapped_by_capture() {
        let result = Engine::new().render(
            "@for(i in range(3))@blocktranslate@break@endblocktranslate@endfor",
            &Store::new(),
        );
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Render);
    }

    #[test]
    fn test_render_csrf_from_context() {
        let store = Store::new().with_must("csrf_token", "abc");
        let result = Engine::new().render("@csrf", &store);
        assert_eq!(
            result.unwrap(),
            "<input type=\"hidden\" name=\"csrfmiddlewaretoken\" value=\"abc\">"
        );
    }

    #[test]
    fn test_render_contains_errors_outside_debug() {
        let engine = Engine::new().with_debug(false);
        let result = engine.render("a{{ missing }}b{{ 1 + \"x\" }}c", &Store::new());
        assert_eq!(result.unwrap(), "abc");
    }

    #[test]
    fn test_render_max_depth() {
        let engine = Engine::new().with_template_must("a", "@include('a')");
        let result = engine.render_named("a", &Store::new());
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Render);
    }

    #[test]
    fn test_render_filter_attribute() {
        let store = Store::new().with_must("price", 1234.5);
        let result = Engine::new().render("{{ price.currency(\"$\") }}", &store);
        assert_eq!(result.unwrap(), "$ 1,234.50");
    }
}
