//! Stylet - Template Engine
//!
//! A text templating language in the Blade style. Templates mix
//! plain text with `{{ expression }}` interpolations and `@directive`
//! blocks, and render against data you provide through a [`Store`].
//!
//! ```html
//! <ul>
//! @for(post in posts)
//!     <li><a href="{{ post.url }}">{{ post.title.upper }}</a></li>
//! @empty
//!     <li>Nothing here yet.</li>
//! @endfor
//! </ul>
//! ```
//!
//! Expressions run in a sandbox. Names resolve only against the
//! render data, underscore prefixed attributes are rejected, and the
//! only callables are a small whitelist of builtin functions and
//! methods. Anything else a template needs, the host hands it through
//! a [`Filter`], a [`Directive`], or one of the
//! [`service`][`crate::service`] traits.
//!
//! # Examples
//!
//! Render a one-off template:
//!
//! ```
//! use stylet::{render, Store};
//!
//! let result = render(
//!     "hello, {{ name }}!",
//!     &Store::new().with_must("name", "taylor"),
//! );
//! assert_eq!(result.unwrap(), "hello, taylor!");
//! ```
//!
//! Or build an [`Engine`] to register templates and extend the
//! language:
//!
//! ```
//! use stylet::{Engine, Store};
//!
//! let engine = Engine::new()
//!     .with_template_must("layout", "<title>@yield('title', 'Home')</title>")
//!     .with_template_must("page", "@extends('layout')@section('title', 'About')");
//!
//! let result = engine.render_named("page", &Store::new());
//! assert_eq!(result.unwrap(), "<title>About</title>");
//! ```
mod cache;
mod compile;
mod context;
mod engine;
mod expr;
mod log;
mod region;
mod render;
mod store;
mod syntax;

pub mod directive;
pub mod filter;
pub mod service;

pub use cache::{Cache, DEFAULT_CAPACITY, DEFAULT_TTL};
pub use compile::{compile, Template};
pub use directive::Directive;
pub use engine::Engine;
pub use filter::Filter;
pub use log::{Error, ErrorKind, Pointer, Visual};
pub use region::Region;
pub use render::render;
pub use store::Store;
pub use syntax::{Marker, SyntaxBuilder};
