//! Template lexer.
//!
//! Splits source text into raw text, interpolations and directives.
//! The text inside an interpolation is emitted as a single Expression
//! token, the expression language tokenizes it separately.
pub mod token;

use crate::{
    log::{Error, UNEXPECTED_TOKEN},
    region::Region,
    syntax::{Marker, SyntaxBuilder},
};
use morel::Finder;
use std::collections::VecDeque;
use token::Token;
use unicode_ident::{is_xid_continue, is_xid_start};

/// Result of a call to [`Lexer::next`].
pub type LexResult = Result<Option<(Token, Region)>, Error>;

/// Every block terminator in the language.
///
/// Only these names lex as end markers, so a custom directive may
/// begin with `end` without closing anything.
const END_DIRECTIVES: &[&str] = &[
    "endanonymous",
    "endauth",
    "endblock",
    "endblocktranslate",
    "endcomponent",
    "enderror",
    "endfor",
    "endguest",
    "endif",
    "endsection",
    "endslot",
    "endswitch",
    "endunless",
    "endverbatim",
    "endwith",
];

pub struct Lexer<'source> {
    /// Text being analyzed.
    pub source: &'source str,
    /// Compiled [`Finder`] used to search for markers.
    finder: Finder<&'source str>,
    /// Position within source.
    cursor: usize,
    /// Tokens ready to be returned.
    ///
    /// A single marker can produce several tokens at once, for example
    /// an interpolation yields the begin marker, the expression and the
    /// end marker together.
    buffer: VecDeque<(Token, Region)>,
    /// An error waiting to be surfaced once the buffer drains.
    ///
    /// A failed scan may still have buffered the raw text that
    /// preceded the bad marker, and those tokens come out first.
    failure: Option<Error>,
}

impl<'source> Lexer<'source> {
    /// Create a new Lexer from the given string.
    pub fn new(source: &'source str) -> Self {
        Self {
            source,
            finder: Finder::new(SyntaxBuilder::new().to_syntax()),
            cursor: 0,
            buffer: VecDeque::new(),
            failure: None,
        }
    }

    /// Return the next token, or None when the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when an interpolation, comment or argument
    /// list is left unclosed, or when a dangling end marker is found.
    pub fn next(&mut self) -> LexResult {
        loop {
            if let Some(next) = self.buffer.pop_front() {
                return Ok(Some(next));
            }
            if let Some(error) = self.failure.take() {
                return Err(error);
            }
            if self.cursor >= self.source.len() {
                return Ok(None);
            }
            if let Err(error) = self.advance() {
                self.failure = Some(error);
            }
        }
    }

    /// Scan forward from the cursor and push the tokens for the next
    /// marker, if any, onto the buffer.
    ///
    /// Comments push nothing, the cursor just moves beyond them.
    fn advance(&mut self) -> Result<(), Error> {
        let mut from = self.cursor;
        let found = loop {
            match self.finder.next(self.source, from) {
                Some((id, begin, end)) => {
                    let marker = Marker::from(id);
                    // A sigil not followed by an identifier is plain text,
                    // such as the "@" in an email address.
                    if marker == Marker::Sigil && !self.is_directive_start(end) {
                        from = end;
                        continue;
                    }
                    break Some((marker, begin, end));
                }
                None => break None,
            }
        };

        let Some((marker, begin, end)) = found else {
            let region = Region::new(self.cursor, self.source.len());
            self.cursor = self.source.len();
            self.buffer.push_back((Token::Raw, region));
            return Ok(());
        };

        if begin > self.cursor {
            self.buffer
                .push_back((Token::Raw, Region::new(self.cursor, begin)));
        }
        self.cursor = end;

        match marker {
            Marker::BeginEscaped => self.read_interpolation(begin, Marker::EndEscaped),
            Marker::BeginRaw => self.read_interpolation(begin, Marker::EndRaw),
            Marker::BeginComment => self.read_comment(begin),
            Marker::Sigil => self.read_directive(begin),
            Marker::EndEscaped | Marker::EndRaw | Marker::EndComment => {
                Err(Error::lex(UNEXPECTED_TOKEN)
                    .with_pointer(self.source, Region::new(begin, end))
                    .with_help("end marker has no matching begin marker"))
            }
        }
    }

    /// Read an interpolation beginning at the given marker.
    ///
    /// The cursor is expected to rest just beyond the begin marker.
    /// Pushes the begin token, the expression and the end token.
    ///
    /// The search for the end marker is quote aware, so an expression
    /// such as `{{ "}}" }}` does not close early.
    fn read_interpolation(&mut self, begin: usize, until: Marker) -> Result<(), Error> {
        let open = Region::new(begin, self.cursor);
        let (begin_token, end_token) = match until {
            Marker::EndEscaped => (Token::BeginEscaped, Token::EndEscaped),
            _ => (Token::BeginRaw, Token::EndRaw),
        };

        let expression = self.cursor;
        let mut quote: Option<char> = None;
        let mut escaped = false;
        for (index, char) in self.source[expression..].char_indices() {
            let at = expression + index;
            match quote {
                Some(open) => {
                    if escaped {
                        escaped = false;
                    } else if char == '\\' {
                        escaped = true;
                    } else if char == open {
                        quote = None;
                    }
                }
                None => match char {
                    '"' | '\'' => quote = Some(char),
                    _ => {
                        if let Some((id, end)) = self.finder.starts(self.source, at) {
                            if Marker::from(id) == until {
                                self.buffer.push_back((begin_token, open));
                                self.buffer
                                    .push_back((Token::Expression, Region::new(expression, at)));
                                self.buffer.push_back((end_token, Region::new(at, end)));
                                self.cursor = end;
                                return Ok(());
                            }
                        }
                    }
                },
            }
        }

        Err(Error::lex("unclosed interpolation")
            .with_pointer(self.source, open)
            .with_help("interpolation opened here is never closed"))
    }

    /// Skip past a comment beginning at the given marker.
    ///
    /// Comments produce no tokens. Other markers inside of a comment
    /// are ignored.
    fn read_comment(&mut self, begin: usize) -> Result<(), Error> {
        let mut from = self.cursor;
        loop {
            match self.finder.next(self.source, from) {
                Some((id, _, end)) if Marker::from(id) == Marker::EndComment => {
                    self.cursor = end;
                    return Ok(());
                }
                Some((_, _, end)) => from = end,
                None => {
                    return Err(Error::lex("unclosed comment")
                        .with_pointer(self.source, Region::new(begin, self.cursor))
                        .with_help("comment opened here is never closed"))
                }
            }
        }
    }

    /// Read a directive beginning at the given sigil.
    ///
    /// The cursor is expected to rest just beyond the sigil. An argument
    /// list may follow the name, separated by spaces or tabs.
    fn read_directive(&mut self, begin: usize) -> Result<(), Error> {
        let name_begin = self.cursor;
        let mut name_end = name_begin;
        for (index, char) in self.source[name_begin..].char_indices() {
            if index == 0 && !(is_xid_start(char) || char == '_') {
                break;
            }
            if index > 0 && !is_xid_continue(char) {
                break;
            }
            name_end = name_begin + index + char.len_utf8();
        }
        self.cursor = name_end;
        let name = Region::new(name_begin, name_end);

        let arguments = match self.peek_arguments() {
            Some(open) => Some(self.read_arguments(open)?),
            None => None,
        };

        let token = if END_DIRECTIVES.contains(&name.literal(self.source)) {
            Token::EndDirective { name }
        } else {
            Token::Directive { name, arguments }
        };
        self.buffer.push_back((token, Region::new(begin, self.cursor)));
        Ok(())
    }

    /// Return the offset of a `(` following the cursor, skipping spaces
    /// and tabs, or None when the directive has no argument list.
    fn peek_arguments(&self) -> Option<usize> {
        let mut probe = self.cursor;
        for char in self.source[self.cursor..].chars() {
            match char {
                ' ' | '\t' => probe += char.len_utf8(),
                '(' => return Some(probe),
                _ => return None,
            }
        }
        None
    }

    /// Read a parenthesized argument list beginning at the given `(`.
    ///
    /// Returns the region between the outer parentheses. Nested
    /// parentheses and quoted strings are balanced.
    fn read_arguments(&mut self, open: usize) -> Result<Region, Error> {
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut escaped = false;
        for (index, char) in self.source[open..].char_indices() {
            let at = open + index;
            if let Some(active) = quote {
                if escaped {
                    escaped = false;
                } else if char == '\\' {
                    escaped = true;
                } else if char == active {
                    quote = None;
                }
                continue;
            }
            match char {
                '"' | '\'' => quote = Some(char),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        self.cursor = at + 1;
                        return Ok(Region::new(open + 1, at));
                    }
                }
                _ => {}
            }
        }

        Err(Error::lex("unclosed argument list")
            .with_pointer(self.source, Region::new(open, open + 1))
            .with_help("argument list opened here is never closed"))
    }

    /// Return true if the character at the given offset can begin a
    /// directive name.
    fn is_directive_start(&self, offset: usize) -> bool {
        self.source[offset..]
            .chars()
            .next()
            .map(|char| is_xid_start(char) || char == '_')
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::{token::Token, Lexer};
    use crate::region::Region;

    #[test]
    fn test_lex_raw() {
        let mut lexer = Lexer::new("hello world");
        assert_next(&mut lexer, Token::Raw, 0..11);
        assert!(lexer.next().unwrap().is_none());
    }

    #[test]
    fn test_lex_escaped() {
        let mut lexer = Lexer::new("hello {{ name }}!");
        assert_next(&mut lexer, Token::Raw, 0..6);
        assert_next(&mut lexer, Token::BeginEscaped, 6..8);
        assert_next(&mut lexer, Token::Expression, 8..14);
        assert_next(&mut lexer, Token::EndEscaped, 14..16);
        assert_next(&mut lexer, Token::Raw, 16..17);
        assert!(lexer.next().unwrap().is_none());
    }

    #[test]
    fn test_lex_raw_interpolation() {
        let mut lexer = Lexer::new("{!! body !!}");
        assert_next(&mut lexer, Token::BeginRaw, 0..3);
        assert_next(&mut lexer, Token::Expression, 3..9);
        assert_next(&mut lexer, Token::EndRaw, 9..12);
        assert!(lexer.next().unwrap().is_none());
    }

    #[test]
    fn test_lex_quoted_end_marker() {
        let source = r#"{{ "}}" }}"#;
        let mut lexer = Lexer::new(source);
        assert_next(&mut lexer, Token::BeginEscaped, 0..2);
        let (token, region) = lexer.next().unwrap().unwrap();
        assert_eq!(token, Token::Expression);
        assert_eq!(region.literal(source), r#" "}}" "#);
    }

    #[test]
    fn test_lex_comment() {
        let mut lexer = Lexer::new("a{# {{ ignored }} #}b");
        assert_next(&mut lexer, Token::Raw, 0..1);
        assert_next(&mut lexer, Token::Raw, 20..21);
        assert!(lexer.next().unwrap().is_none());
    }

    #[test]
    fn test_lex_unclosed_comment() {
        // The raw text before the comment is yielded before the error.
        let mut lexer = Lexer::new("a{# nope");
        assert_next(&mut lexer, Token::Raw, 0..1);
        assert!(lexer.next().is_err());
    }

    #[test]
    fn test_lex_unclosed_interpolation() {
        let mut lexer = Lexer::new("{{ name");
        assert!(lexer.next().is_err());
    }

    #[test]
    fn test_lex_directive() {
        let source = "@if(user.active)yes@endif";
        let mut lexer = Lexer::new(source);
        let (token, region) = lexer.next().unwrap().unwrap();
        match token {
            Token::Directive { name, arguments } => {
                assert_eq!(name.literal(source), "if");
                assert_eq!(arguments.unwrap().literal(source), "user.active");
            }
            _ => panic!("expected directive"),
        }
        assert_eq!(region, Region::new(0, 16));
        assert_next(&mut lexer, Token::Raw, 16..19);
        let (token, _) = lexer.next().unwrap().unwrap();
        match token {
            Token::EndDirective { name } => assert_eq!(name.literal(source), "endif"),
            _ => panic!("expected end directive"),
        }
    }

    #[test]
    fn test_lex_end_prefix_is_not_terminator() {
        let source = "@endorse";
        let mut lexer = Lexer::new(source);
        let (token, _) = lexer.next().unwrap().unwrap();
        match token {
            Token::Directive { name, .. } => {
                assert_eq!(name.literal(source), "endorse");
            }
            _ => panic!("expected directive"),
        }
    }

    #[test]
    fn test_lex_directive_nested_parens() {
        let source = "@if(length(items) > 0)";
        let mut lexer = Lexer::new(source);
        let (token, _) = lexer.next().unwrap().unwrap();
        match token {
            Token::Directive { arguments, .. } => {
                assert_eq!(arguments.unwrap().literal(source), "length(items) > 0");
            }
            _ => panic!("expected directive"),
        }
    }

    #[test]
    fn test_lex_directive_no_arguments() {
        let source = "@csrf";
        let mut lexer = Lexer::new(source);
        let (token, _) = lexer.next().unwrap().unwrap();
        match token {
            Token::Directive { name, arguments } => {
                assert_eq!(name.literal(source), "csrf");
                assert!(arguments.is_none());
            }
            _ => panic!("expected directive"),
        }
    }

    #[test]
    fn test_lex_bare_sigil_is_text() {
        let mut lexer = Lexer::new("mail me @ home");
        assert_next(&mut lexer, Token::Raw, 0..14);
        assert!(lexer.next().unwrap().is_none());
    }

    #[test]
    fn test_lex_email_address() {
        // "@example" parses as a directive name, which the parser will
        // reject, but "@ " stays text.
        let mut lexer = Lexer::new("a @ b");
        assert_next(&mut lexer, Token::Raw, 0..5);
    }

    #[test]
    fn test_lex_unclosed_arguments() {
        let mut lexer = Lexer::new("@if(user");
        assert!(lexer.next().is_err());
    }

    fn assert_next(lexer: &mut Lexer, token: Token, range: std::ops::Range<usize>) {
        let (actual, region) = lexer.next().unwrap().unwrap();
        assert_eq!(actual, token);
        assert_eq!(region, Region::from(range));
    }
}
