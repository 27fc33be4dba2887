//! Types for the Abstract Syntax Tree.
//!
//! Nodes carry the raw, unevaluated text of their arguments as [`Region`]
//! instances pointing into the source. Expressions are evaluated at render
//! time against a live [`Context`][crate::Context], never at parse time.
use super::scope::Scope;
use crate::region::Region;

/// A single element of a compiled template.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Plain text, emitted verbatim.
    Text(Region),
    /// An interpolation such as `{{ user.name }}` or `{!! body !!}`.
    Variable(Output),
    /// An `@if` or `@unless` block.
    If(If),
    /// A `@for` block with an optional `@empty` branch.
    For(For),
    /// A `@switch` block.
    Switch(Switch),
    /// An `@auth` or `@guest` block.
    Auth(Auth),
    /// An `@extends` marker naming the layout of this template.
    Extends(Region),
    /// A `@section` block, or its inline two argument form.
    Section(Section),
    /// A `@yield` marker, replaced by a recorded section at render time.
    Yield(Yield),
    /// A `@block` that a child template may override.
    Block(Block),
    /// An `@include` of another template.
    Include(Include),
    /// A `@component` block with a default slot body.
    Component(Component),
    /// A named `@slot` inside of a component body.
    Slot(Slot),
    /// A `@verbatim` span, emitted without any processing.
    Verbatim(Region),
    /// A `@cycle` marker, alternating between values per loop iteration.
    Cycle(Region),
    /// A `@firstof` marker, emitting the first truthy argument.
    FirstOf(Region),
    /// A `@break`, stopping the nearest enclosing loop.
    Break(Option<Region>),
    /// A `@continue`, skipping to the next iteration of the nearest
    /// enclosing loop.
    Continue(Option<Region>),
    /// A `@with` block introducing scoped bindings.
    With(With),
    /// A `@csrf` marker, emitting a hidden form input.
    Csrf,
    /// A `@method` marker, emitting a hidden form input for HTTP verbs
    /// that HTML forms cannot express.
    Method(Region),
    /// A `@url` marker, resolved through the url service.
    Url(Region),
    /// A `@static` marker, resolved through the url service.
    Static(Region),
    /// A `@style` marker, emitting a conditional style attribute.
    Style(Region),
    /// A `@class` marker, emitting a conditional class attribute.
    Class(Region),
    /// A boolean form attribute such as `@checked` or `@selected`.
    Flag(Flag),
    /// An `@error` block, rendered when a validation message is present.
    Error(ErrorBlock),
    /// A `@trans` marker, resolved through the translation service.
    Trans(Region),
    /// A `@blocktranslate` block with an optional `@plural` branch.
    BlockTranslate(BlockTranslate),
    /// A directive registered on the engine by the host.
    Custom(Custom),
}

/// Arguments for a [`Node::Variable`].
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    /// Raw expression text.
    pub expression: Region,
    /// True when the rendered value is HTML escaped.
    pub escape: bool,
}

/// Arguments for a [`Node::If`].
#[derive(Debug, Clone, PartialEq)]
pub struct If {
    /// Raw guard expression text.
    pub condition: Region,
    /// True for `@unless`, which renders when the guard is falsy.
    pub negate: bool,
    /// Nodes rendered when the guard passes.
    pub then: Scope,
    /// Zero or more `@elif` branches.
    pub branches: Vec<Branch>,
    /// Nodes rendered when no branch passes.
    pub otherwise: Option<Scope>,
}

/// A single `@elif` branch of a [`Node::If`].
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: Region,
    pub body: Scope,
}

/// Arguments for a [`Node::For`].
#[derive(Debug, Clone, PartialEq)]
pub struct For {
    /// One identifier, or two for key/value unpacking.
    pub bindings: Vec<Region>,
    /// Raw expression text for the collection.
    pub collection: Region,
    /// Nodes rendered once per element.
    pub body: Scope,
    /// Nodes rendered instead when the collection is empty.
    pub empty: Option<Scope>,
}

/// Arguments for a [`Node::Switch`].
#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    /// Raw expression text for the compared value.
    pub subject: Region,
    /// The `@case` branches in source order.
    pub cases: Vec<Case>,
    /// Nodes rendered when no case matches.
    pub default: Option<Scope>,
}

/// A single `@case` branch of a [`Node::Switch`].
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub value: Region,
    pub body: Scope,
}

/// Arguments for a [`Node::Auth`].
#[derive(Debug, Clone, PartialEq)]
pub struct Auth {
    /// True for `@guest`, which renders for unauthenticated users.
    pub guest: bool,
    pub body: Scope,
    pub otherwise: Option<Scope>,
}

/// Arguments for a [`Node::Section`].
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Raw argument text, the name and an optional inline value.
    pub arguments: Region,
    /// The block body. None for the inline two argument form.
    pub body: Option<Scope>,
}

/// Arguments for a [`Node::Yield`].
#[derive(Debug, Clone, PartialEq)]
pub struct Yield {
    /// Raw argument text, the name and an optional default value.
    pub arguments: Region,
}

/// Arguments for a [`Node::Block`].
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Raw argument text for the block name.
    pub name: Region,
    pub body: Scope,
}

/// Arguments for a [`Node::Include`].
#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    /// Raw argument text, the target name and optional extra data.
    pub arguments: Region,
}

/// Arguments for a [`Node::Component`].
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Raw argument text, the target name and optional extra data.
    pub arguments: Region,
    /// The default slot body.
    pub body: Scope,
}

/// Arguments for a [`Node::Slot`].
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    /// Raw argument text for the slot name.
    pub arguments: Region,
    pub body: Scope,
}

/// Arguments for a [`Node::With`].
#[derive(Debug, Clone, PartialEq)]
pub struct With {
    /// Raw argument text, a list of `name=expression` bindings.
    pub arguments: Region,
    pub body: Scope,
}

/// Arguments for a [`Node::Flag`].
#[derive(Debug, Clone, PartialEq)]
pub struct Flag {
    /// The directive name, which is also the emitted attribute.
    pub name: Region,
    /// Raw guard expression text.
    pub condition: Region,
}

/// Arguments for a [`Node::Error`].
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorBlock {
    /// Raw expression text resolving to a validation message.
    pub field: Region,
    /// Nodes rendered when the message is truthy, with the message
    /// bound as `message`.
    pub body: Scope,
}

/// Arguments for a [`Node::BlockTranslate`].
#[derive(Debug, Clone, PartialEq)]
pub struct BlockTranslate {
    /// Raw argument text, an optional `count=expression` binding.
    pub arguments: Option<Region>,
    /// The singular body.
    pub body: Scope,
    /// The plural body, rendered when count is not one.
    pub plural: Option<Scope>,
}

/// Arguments for a [`Node::Custom`].
#[derive(Debug, Clone, PartialEq)]
pub struct Custom {
    /// The registered directive name.
    pub name: String,
    /// Raw argument text.
    pub arguments: Option<Region>,
    /// Location of the directive, for diagnostics.
    pub region: Region,
}
