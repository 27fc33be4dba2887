use crate::region::Region;
use std::fmt::Display;

/// Types emitted by the Lexer.
///
/// An abstraction over raw text to make construction of Node types easier.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Token {
    /// Raw text.
    Raw,
    /// Beginning of an escaped interpolation - {{ by default.
    BeginEscaped,
    /// End of an escaped interpolation - }} by default.
    EndEscaped,
    /// Beginning of a raw interpolation - {!! by default.
    BeginRaw,
    /// End of a raw interpolation - !!} by default.
    EndRaw,
    /// The expression text between interpolation markers.
    ///
    /// The expression is not tokenized any further here; the
    /// expression language has its own lexer which runs against
    /// this span at evaluation time.
    Expression,
    /// A directive such as `@if(...)` or `@csrf`.
    ///
    /// The name region excludes the sigil. The arguments region, when
    /// present, excludes the surrounding parentheses.
    Directive {
        name: Region,
        arguments: Option<Region>,
    },
    /// A directive whose name begins with `end`, such as `@endif`.
    ///
    /// The name region includes the `end` prefix.
    EndDirective { name: Region },
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Raw => write!(f, "raw text"),
            Token::BeginEscaped => write!(f, "begin escaped interpolation"),
            Token::EndEscaped => write!(f, "end escaped interpolation"),
            Token::BeginRaw => write!(f, "begin raw interpolation"),
            Token::EndRaw => write!(f, "end raw interpolation"),
            Token::Expression => write!(f, "expression"),
            Token::Directive { .. } => write!(f, "directive"),
            Token::EndDirective { .. } => write!(f, "end directive"),
        }
    }
}
