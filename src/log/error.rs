use super::{Pointer, RED, RESET};
use crate::{log::Visual, region::Region};
use std::fmt::{Debug, Display, Formatter, Result};

/// Classifies an [`Error`] by the stage or rule that produced it.
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum ErrorKind {
    /// The source text could not be tokenized.
    Lex,
    /// The token stream does not form a valid template.
    Parse,
    /// An expression referred to a name that does not exist.
    UndefinedVariable,
    /// An expression attempted something the sandbox forbids.
    Permission,
    /// An operator or operation was applied to incompatible values.
    Type,
    /// Rendering failed for a reason outside expression evaluation.
    Render,
}

impl ErrorKind {
    /// Return true if an [`Error`] of this kind may be contained at an
    /// interpolation boundary instead of aborting the whole render.
    ///
    /// Lex and parse errors are structural and always propagate.
    pub fn is_containable(&self) -> bool {
        !matches!(self, ErrorKind::Lex | ErrorKind::Parse)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            ErrorKind::Lex => write!(f, "lex error"),
            ErrorKind::Parse => write!(f, "parse error"),
            ErrorKind::UndefinedVariable => write!(f, "undefined variable"),
            ErrorKind::Permission => write!(f, "permission error"),
            ErrorKind::Type => write!(f, "type error"),
            ErrorKind::Render => write!(f, "render error"),
        }
    }
}

/// Describes an error, and allows adding a contextual help text
/// and visualization.
///
/// # Examples
///
/// Creating an [`Error`] that includes a [`Visual`] of type [`Pointer`]:
///
/// ```
/// use stylet::{Error, ErrorKind, Region};
///
/// Error::build(ErrorKind::Parse, "unexpected directive")
///     .with_pointer("@endif", Region::new(0, 6))
///     .with_name("template.html")
///     .with_help("did you open the block with `@if`?");
/// ```
///
/// When printed with `println!("{:#}", error)` the [`Error`] produces
/// output in the form:
///
/// ```text
/// error: unexpected directive
///   --> template.html:1:1
///    |
///  1 | @endif
///    | ^^^^^^
///    |
///   = help: did you open the block with `@if`?
/// ```
pub struct Error {
    /// The classification of the [`Error`].
    kind: ErrorKind,
    /// Describes the cause of the [`Error`].
    reason: String,
    /// A visualization to help illustrate the [`Error`].
    visual: Option<Box<dyn Visual>>,
    /// Additional information to display with the [`Error`].
    help: Option<String>,
    /// The name of the Template that the [`Error`] comes from.
    name: Option<String>,
}

impl Error {
    /// Create a new [`Error`] with the given kind and reason text.
    ///
    /// The additional fields may be populated using the various methods
    /// defined on `Error`.
    pub fn build<T>(kind: ErrorKind, reason: T) -> Self
    where
        T: Into<String>,
    {
        Error {
            kind,
            reason: reason.into(),
            name: None,
            visual: None,
            help: None,
        }
    }

    /// Shortcut for a lex `Error`.
    pub fn lex<T: Into<String>>(reason: T) -> Self {
        Self::build(ErrorKind::Lex, reason)
    }

    /// Shortcut for a parse `Error`.
    pub fn parse<T: Into<String>>(reason: T) -> Self {
        Self::build(ErrorKind::Parse, reason)
    }

    /// Shortcut for a render `Error`.
    pub fn render<T: Into<String>>(reason: T) -> Self {
        Self::build(ErrorKind::Render, reason)
    }

    /// Shortcut for an undefined variable `Error`.
    pub fn undefined<T: Into<String>>(reason: T) -> Self {
        Self::build(ErrorKind::UndefinedVariable, reason)
    }

    /// Shortcut for a permission `Error`.
    pub fn permission<T: Into<String>>(reason: T) -> Self {
        Self::build(ErrorKind::Permission, reason)
    }

    /// Shortcut for a type `Error`.
    pub fn incompatible<T: Into<String>>(reason: T) -> Self {
        Self::build(ErrorKind::Type, reason)
    }

    /// Set the reason text, which is a short summary of the [`Error`].
    pub fn with_reason<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.reason = text.into();

        self
    }

    /// Set the name text, which is the name of the template that the
    /// [`Error`] is related to.
    pub fn with_name<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.name = Some(text.into());

        self
    }

    /// Set the [`Visual`], which is a visualization that helps illustrate
    /// the cause of the error.
    pub fn with_visual(mut self, visual: impl Visual + 'static) -> Self {
        self.visual = Some(Box::new(visual));

        self
    }

    /// Set the visualization to a new [`Pointer`] with the given source
    /// text and [`Region`].
    ///
    /// This is a shortcut for creating a `Pointer` yourself and passing
    /// it to [`with_visual`][`Error::with_visual`].
    pub fn with_pointer<T>(mut self, source: &str, region: T) -> Self
    where
        T: Into<Region>,
    {
        self.visual = Some(Box::new(Pointer::new(source, region.into())));

        self
    }

    /// Set the visualization to a new [`Pointer`], unless one is
    /// already present.
    ///
    /// Lets an outer caller attach location information to an [`Error`]
    /// raised by inner code that had no access to the source text,
    /// without clobbering a more precise existing pointer.
    pub fn with_pointer_if_missing<T>(self, source: &str, region: T) -> Self
    where
        T: Into<Region>,
    {
        if self.visual.is_some() {
            return self;
        }

        self.with_pointer(source, region)
    }

    /// Set the help text, which is contextual information to accompany
    /// the reason text.
    pub fn with_help<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.help = Some(text.into());

        self
    }

    /// Return the kind of the [`Error`].
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Return the reason text.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Return the name of the template that the error is related to.
    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Return the help text.
    pub fn get_help(&self) -> Option<&str> {
        self.help.as_deref()
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if !f.alternate() {
            writeln!(f, "{self:#}")?;
        }
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("reason", &self.reason)
            .field("name", &self.name)
            .field("visual", &self.visual)
            .field("help", &self.help)
            .finish()?;

        Ok(())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let header = format!("{RED}{}{RESET}", self.kind);
        write!(f, "{header}: {}", self.reason)?;

        if self.visual.is_some() && f.alternate() {
            return self.visual.as_ref().unwrap().display(
                f,
                self.name.as_deref(),
                self.help.as_deref(),
            );
        }

        Ok(())
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.reason == other.reason
            && self.help == other.help
            && self.name == other.name
    }
}
