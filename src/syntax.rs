use morel::Syntax;

/// Markers that identify tags within template text.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Marker {
    /// Beginning of an escaped interpolation, which renders an expression
    /// with HTML-special characters escaped.
    BeginEscaped = 0,
    /// End of an escaped interpolation.
    EndEscaped = 1,
    /// Beginning of a raw interpolation, which renders an expression
    /// without escaping.
    BeginRaw = 2,
    /// End of a raw interpolation.
    EndRaw = 3,
    /// Beginning of a comment, which is discarded during lexing.
    BeginComment = 4,
    /// End of a comment.
    EndComment = 5,
    /// The directive sigil, which introduces constructs such as `@if`
    /// and `@for` when followed by a letter.
    Sigil = 6,
}

impl From<usize> for Marker {
    fn from(value: usize) -> Self {
        match value {
            0 => Self::BeginEscaped,
            1 => Self::EndEscaped,
            2 => Self::BeginRaw,
            3 => Self::EndRaw,
            4 => Self::BeginComment,
            5 => Self::EndComment,
            6 => Self::Sigil,
            _ => unreachable!(),
        }
    }
}

impl From<Marker> for usize {
    fn from(k: Marker) -> Self {
        k as usize
    }
}

/// Provides methods to build a `Syntax`.
///
/// # Example
///
/// ```
/// use stylet::SyntaxBuilder;
///
/// let syntax = SyntaxBuilder::new()
///     .with_escaped("{{", "}}")
///     .with_raw("{!!", "!!}")
///     .to_syntax();
/// ```
pub struct SyntaxBuilder<'marker> {
    escaped: (&'marker str, &'marker str),
    raw: (&'marker str, &'marker str),
    comment: (&'marker str, &'marker str),
    sigil: &'marker str,
}

impl<'marker> SyntaxBuilder<'marker> {
    /// Create a new [`SyntaxBuilder`].
    ///
    /// The `SyntaxBuilder` has default markers:
    ///
    /// ```text
    /// Escaped interpolation: {{ name }}
    /// Raw interpolation: {!! name !!}
    /// Comment: {# ignored #}
    /// Directive sigil: @
    /// ```
    ///
    /// To proceed with these defaults, you may immediately call
    /// `to_syntax` to receive the `Syntax` instance.
    #[inline]
    pub fn new() -> Self {
        Self {
            escaped: ("{{", "}}"),
            raw: ("{!!", "!!}"),
            comment: ("{#", "#}"),
            sigil: "@",
        }
    }

    /// Set the escaped interpolation markers.
    ///
    /// Returns the [`SyntaxBuilder`], so additional methods may
    /// be chained.
    #[inline]
    pub fn with_escaped(mut self, begin: &'marker str, end: &'marker str) -> Self {
        self.escaped = (begin, end);

        self
    }

    /// Set the raw interpolation markers.
    ///
    /// Returns the [`SyntaxBuilder`], so additional methods may
    /// be chained.
    #[inline]
    pub fn with_raw(mut self, begin: &'marker str, end: &'marker str) -> Self {
        self.raw = (begin, end);

        self
    }

    /// Set the comment markers.
    ///
    /// Returns the [`SyntaxBuilder`], so additional methods may
    /// be chained.
    #[inline]
    pub fn with_comment(mut self, begin: &'marker str, end: &'marker str) -> Self {
        self.comment = (begin, end);

        self
    }

    /// Set the directive sigil.
    ///
    /// Returns the [`SyntaxBuilder`], so additional methods may
    /// be chained.
    #[inline]
    pub fn with_sigil(mut self, sigil: &'marker str) -> Self {
        self.sigil = sigil;

        self
    }

    /// Return a Syntax instance from the markers in this
    /// [`SyntaxBuilder`].
    pub fn to_syntax(self) -> Syntax {
        let mut markers = Vec::new();
        let (begin_escaped, end_escaped) = self.escaped;
        let (begin_raw, end_raw) = self.raw;
        let (begin_comment, end_comment) = self.comment;

        markers.push((Marker::BeginEscaped.into(), begin_escaped.into()));
        markers.push((Marker::EndEscaped.into(), end_escaped.into()));
        markers.push((Marker::BeginRaw.into(), begin_raw.into()));
        markers.push((Marker::EndRaw.into(), end_raw.into()));
        markers.push((Marker::BeginComment.into(), begin_comment.into()));
        markers.push((Marker::EndComment.into(), end_comment.into()));
        markers.push((Marker::Sigil.into(), self.sigil.into()));

        Syntax::new(markers)
    }
}

impl<'marker> Default for SyntaxBuilder<'marker> {
    fn default() -> Self {
        Self::new()
    }
}
