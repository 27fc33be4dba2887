//! Template parser.
//!
//! Pulls tokens from a Lexer and assembles the Abstract Syntax Tree.
//! Block directives parse their bodies through a shared scope routine
//! that stops on a caller supplied set of terminator names, which is
//! what allows arbitrary nesting without a grammar per depth.
pub mod scope;
pub mod tree;

use crate::{
    compile::{
        lex::{token::Token, Lexer},
        template::Template,
    },
    log::{
        Error, INVALID_SYNTAX, UNEXPECTED_DIRECTIVE, UNEXPECTED_EOF,
        UNEXPECTED_TOKEN, UNKNOWN_DIRECTIVE,
    },
    region::Region,
};
use scope::Scope;
use std::collections::HashSet;
use tree::{
    Auth, BlockTranslate, Branch, Case, Component, Custom, ErrorBlock, Flag, For, If, Include,
    Node, Output, Section, Slot, Switch, With, Yield,
};
use unicode_ident::{is_xid_continue, is_xid_start};

/// A directive that terminated a scope, such as the `@endif` closing
/// an `@if` block, or the `@elif` beginning the next branch.
struct Stop {
    name: String,
    arguments: Option<Region>,
    region: Region,
}

pub struct Parser<'source> {
    /// Lexer used to pull from source as tokens instead of raw text.
    lexer: Lexer<'source>,
    /// Store peeked tokens.
    ///
    /// Double option is used to remember when the next token is None.
    buffer: Option<Option<(Token, Region)>>,
    /// Names of directives registered on the engine.
    custom: HashSet<String>,
    /// Nesting depth, zero at the top level of the template.
    depth: usize,
}

impl<'source> Parser<'source> {
    /// Create a new Parser from the given string.
    pub fn new(source: &'source str) -> Self {
        Self {
            lexer: Lexer::new(source),
            buffer: None,
            custom: HashSet::new(),
            depth: 0,
        }
    }

    /// Set the names of custom directives that the Parser accepts.
    ///
    /// Directive names that are neither built in nor in this set are
    /// rejected with a parse error.
    pub fn with_directives(mut self, names: HashSet<String>) -> Self {
        self.custom = names;

        self
    }

    /// Compile the template.
    ///
    /// Returns a new Template, which can be executed with some Store
    /// data to receive output.
    pub fn compile(mut self, name: Option<String>) -> Result<Template<'source>, Error> {
        let mut scope = Scope::new();
        while let Some((token, region)) = self.next()? {
            scope.data.push(self.parse_node(token, region)?);
        }
        self.validate_extends(&scope)?;

        Ok(Template {
            name,
            scope,
            source: self.lexer.source,
        })
    }

    /// Parse a single [`Node`] beginning at the given token.
    fn parse_node(&mut self, token: Token, region: Region) -> Result<Node, Error> {
        match token {
            Token::Raw => Ok(Node::Text(region)),
            Token::BeginEscaped => self.parse_output(true),
            Token::BeginRaw => self.parse_output(false),
            Token::Directive { name, arguments } => self.parse_directive(name, arguments, region),
            Token::EndDirective { name } => Err(Error::parse(UNEXPECTED_DIRECTIVE)
                .with_pointer(self.lexer.source, region)
                .with_help(format!(
                    "`@{}` does not close any open block",
                    name.literal(self.lexer.source)
                ))),
            _ => Err(Error::parse(UNEXPECTED_TOKEN)
                .with_pointer(self.lexer.source, region)),
        }
    }

    /// Parse an interpolation.
    ///
    /// The begin marker is already consumed, so the next tokens must be
    /// the expression and the end marker.
    fn parse_output(&mut self, escape: bool) -> Result<Node, Error> {
        let (token, expression) = self.next_must()?;
        if token != Token::Expression {
            return Err(Error::parse(UNEXPECTED_TOKEN)
                .with_pointer(self.lexer.source, expression));
        }
        if expression.literal(self.lexer.source).trim().is_empty() {
            return Err(Error::parse(INVALID_SYNTAX)
                .with_pointer(self.lexer.source, expression)
                .with_help("interpolation is empty"));
        }
        let (token, region) = self.next_must()?;
        if !matches!(token, Token::EndEscaped | Token::EndRaw) {
            return Err(Error::parse(UNEXPECTED_TOKEN)
                .with_pointer(self.lexer.source, region));
        }

        Ok(Node::Variable(Output { expression, escape }))
    }

    /// Dispatch a directive by name to its sub parser.
    fn parse_directive(
        &mut self,
        name: Region,
        arguments: Option<Region>,
        region: Region,
    ) -> Result<Node, Error> {
        let literal = name.literal(self.lexer.source).to_string();
        match literal.as_str() {
            "if" => {
                let condition = self.require_arguments(&literal, arguments, region)?;
                self.parse_if(condition)
            }
            "unless" => {
                let condition = self.require_arguments(&literal, arguments, region)?;
                let (body, stop) = self.parse_scope(&["else", "endunless"])?;
                let otherwise = if stop.name == "else" {
                    Some(self.parse_scope(&["endunless"])?.0)
                } else {
                    None
                };
                Ok(Node::If(If {
                    condition,
                    negate: true,
                    then: body,
                    branches: vec![],
                    otherwise,
                }))
            }
            "for" => {
                let arguments = self.require_arguments(&literal, arguments, region)?;
                self.parse_for(arguments)
            }
            "switch" => {
                let subject = self.require_arguments(&literal, arguments, region)?;
                self.parse_switch(subject)
            }
            "auth" => self.parse_auth(false, "endauth"),
            "guest" => self.parse_auth(true, "endguest"),
            "anonymous" => self.parse_auth(true, "endanonymous"),
            "extends" => {
                let target = self.require_arguments(&literal, arguments, region)?;
                if self.depth > 0 {
                    return Err(Error::parse(UNEXPECTED_DIRECTIVE)
                        .with_pointer(self.lexer.source, region)
                        .with_help("`@extends` must appear at the top level of a template"));
                }
                Ok(Node::Extends(target))
            }
            "section" => {
                let arguments = self.require_arguments(&literal, arguments, region)?;
                if has_top_level_comma(self.lexer.source, arguments) {
                    return Ok(Node::Section(Section {
                        arguments,
                        body: None,
                    }));
                }
                let (body, _) = self.parse_scope(&["endsection"])?;
                Ok(Node::Section(Section {
                    arguments,
                    body: Some(body),
                }))
            }
            "yield" => {
                let arguments = self.require_arguments(&literal, arguments, region)?;
                Ok(Node::Yield(Yield { arguments }))
            }
            "block" => {
                let name = self.require_arguments(&literal, arguments, region)?;
                let (body, _) = self.parse_scope(&["endblock"])?;
                Ok(Node::Block(tree::Block { name, body }))
            }
            "include" => {
                let arguments = self.require_arguments(&literal, arguments, region)?;
                Ok(Node::Include(Include { arguments }))
            }
            "component" => {
                let arguments = self.require_arguments(&literal, arguments, region)?;
                let (body, _) = self.parse_scope(&["endcomponent"])?;
                Ok(Node::Component(Component { arguments, body }))
            }
            "slot" => {
                let arguments = self.require_arguments(&literal, arguments, region)?;
                let (body, _) = self.parse_scope(&["endslot"])?;
                Ok(Node::Slot(Slot { arguments, body }))
            }
            "verbatim" => self.parse_verbatim(region),
            "cycle" => {
                let arguments = self.require_arguments(&literal, arguments, region)?;
                Ok(Node::Cycle(arguments))
            }
            "firstof" => {
                let arguments = self.require_arguments(&literal, arguments, region)?;
                Ok(Node::FirstOf(arguments))
            }
            "break" => Ok(Node::Break(arguments)),
            "continue" => Ok(Node::Continue(arguments)),
            "with" => {
                let arguments = self.require_arguments(&literal, arguments, region)?;
                let (body, _) = self.parse_scope(&["endwith"])?;
                Ok(Node::With(With { arguments, body }))
            }
            "csrf" => Ok(Node::Csrf),
            "method" => {
                let arguments = self.require_arguments(&literal, arguments, region)?;
                Ok(Node::Method(arguments))
            }
            "url" => {
                let arguments = self.require_arguments(&literal, arguments, region)?;
                Ok(Node::Url(arguments))
            }
            "static" => {
                let arguments = self.require_arguments(&literal, arguments, region)?;
                Ok(Node::Static(arguments))
            }
            "style" => {
                let arguments = self.require_arguments(&literal, arguments, region)?;
                Ok(Node::Style(arguments))
            }
            "class" => {
                let arguments = self.require_arguments(&literal, arguments, region)?;
                Ok(Node::Class(arguments))
            }
            "checked" | "selected" | "required" | "disabled" => {
                let condition = self.require_arguments(&literal, arguments, region)?;
                Ok(Node::Flag(Flag { name, condition }))
            }
            "error" => {
                let field = self.require_arguments(&literal, arguments, region)?;
                let (body, _) = self.parse_scope(&["enderror"])?;
                Ok(Node::Error(ErrorBlock { field, body }))
            }
            "trans" | "translate" => {
                let arguments = self.require_arguments(&literal, arguments, region)?;
                Ok(Node::Trans(arguments))
            }
            "blocktranslate" => {
                let (body, stop) = self.parse_scope(&["plural", "endblocktranslate"])?;
                let plural = if stop.name == "plural" {
                    Some(self.parse_scope(&["endblocktranslate"])?.0)
                } else {
                    None
                };
                Ok(Node::BlockTranslate(BlockTranslate {
                    arguments,
                    body,
                    plural,
                }))
            }
            "elif" | "elseif" | "else" | "empty" | "case" | "default" | "plural" => {
                Err(Error::parse(UNEXPECTED_DIRECTIVE)
                    .with_pointer(self.lexer.source, region)
                    .with_help(format!("`@{literal}` is only valid inside its parent block")))
            }
            _ if self.custom.contains(&literal) => Ok(Node::Custom(Custom {
                name: literal,
                arguments,
                region,
            })),
            _ => Err(Error::parse(UNKNOWN_DIRECTIVE)
                .with_pointer(self.lexer.source, region)
                .with_help(format!(
                    "`@{literal}` is not a known directive, register it on the \
                    engine with `.add_directive` if it is intentional"
                ))),
        }
    }

    /// Parse an `@if` block after its guard has been read.
    fn parse_if(&mut self, condition: Region) -> Result<Node, Error> {
        let (then, mut stop) = self.parse_scope(&["elif", "elseif", "else", "endif"])?;

        // `@elseif` is an accepted spelling of `@elif`.
        let mut branches = vec![];
        while matches!(stop.name.as_str(), "elif" | "elseif") {
            let condition = self.require_stop_arguments(&stop)?;
            let (body, next) = self.parse_scope(&["elif", "elseif", "else", "endif"])?;
            branches.push(Branch { condition, body });
            stop = next;
        }

        let otherwise = if stop.name == "else" {
            Some(self.parse_scope(&["endif"])?.0)
        } else {
            None
        };

        Ok(Node::If(If {
            condition,
            negate: false,
            then,
            branches,
            otherwise,
        }))
    }

    /// Parse a `@for` block after its arguments have been read.
    ///
    /// The argument text must match `<identifier> in <expression>`,
    /// where the identifier may also be a pair for key/value unpacking.
    fn parse_for(&mut self, arguments: Region) -> Result<Node, Error> {
        let source = self.lexer.source;
        let split = find_keyword_in(source, arguments).ok_or_else(|| {
            Error::parse(INVALID_SYNTAX)
                .with_pointer(source, arguments)
                .with_help("`@for` arguments must match `<identifier> in <expression>`")
        })?;

        let bindings_region = Region::new(arguments.begin, split);
        let collection = trim_region(source, Region::new(split + 2, arguments.end));
        if collection.is_empty() {
            return Err(Error::parse(INVALID_SYNTAX)
                .with_pointer(source, arguments)
                .with_help("`@for` is missing a collection expression"));
        }

        let mut bindings = vec![];
        for piece in split_top_level(source, bindings_region) {
            let piece = trim_region(source, piece);
            if !is_identifier(piece.literal(source)) {
                return Err(Error::parse(INVALID_SYNTAX)
                    .with_pointer(source, piece)
                    .with_help("`@for` bindings must be plain identifiers"));
            }
            bindings.push(piece);
        }
        if bindings.is_empty() || bindings.len() > 2 {
            return Err(Error::parse(INVALID_SYNTAX)
                .with_pointer(source, bindings_region)
                .with_help("`@for` accepts one binding, or two for key/value pairs"));
        }

        let (body, stop) = self.parse_scope(&["empty", "endfor"])?;
        let empty = if stop.name == "empty" {
            Some(self.parse_scope(&["endfor"])?.0)
        } else {
            None
        };

        Ok(Node::For(For {
            bindings,
            collection,
            body,
            empty,
        }))
    }

    /// Parse a `@switch` block after its subject has been read.
    fn parse_switch(&mut self, subject: Region) -> Result<Node, Error> {
        let (lead, mut stop) = self.parse_scope(&["case", "default", "endswitch"])?;
        for node in &lead.data {
            let whitespace = matches!(
                node,
                Node::Text(region) if region.literal(self.lexer.source).trim().is_empty()
            );
            if !whitespace {
                return Err(Error::parse(UNEXPECTED_TOKEN)
                    .with_pointer(self.lexer.source, stop.region)
                    .with_help("`@switch` allows no content before the first `@case`"));
            }
        }

        let mut cases = vec![];
        while stop.name == "case" {
            let value = self.require_stop_arguments(&stop)?;
            let (body, next) = self.parse_scope(&["case", "default", "endswitch"])?;
            cases.push(Case { value, body });
            stop = next;
        }

        let default = if stop.name == "default" {
            Some(self.parse_scope(&["endswitch"])?.0)
        } else {
            None
        };

        Ok(Node::Switch(Switch {
            subject,
            cases,
            default,
        }))
    }

    /// Parse an `@auth` or `@guest` block.
    fn parse_auth(&mut self, guest: bool, end: &'static str) -> Result<Node, Error> {
        let (body, stop) = self.parse_scope(&["else", end])?;
        let otherwise = if stop.name == "else" {
            Some(self.parse_scope(&[end])?.0)
        } else {
            None
        };

        Ok(Node::Auth(Auth {
            guest,
            body,
            otherwise,
        }))
    }

    /// Parse a `@verbatim` block.
    ///
    /// Consumes tokens until `@endverbatim` and stores the raw source
    /// span between the two directives, which is emitted unprocessed.
    fn parse_verbatim(&mut self, region: Region) -> Result<Node, Error> {
        let begin = region.end;
        loop {
            match self.next()? {
                Some((Token::EndDirective { name }, end_region))
                    if name.literal(self.lexer.source) == "endverbatim" =>
                {
                    return Ok(Node::Verbatim(Region::new(begin, end_region.begin)));
                }
                Some(_) => continue,
                None => {
                    return Err(Error::parse(UNEXPECTED_EOF)
                        .with_pointer(self.lexer.source, region)
                        .with_help("`@verbatim` is never closed, expected `@endverbatim`"))
                }
            }
        }
    }

    /// Parse nodes until a directive named in `until` is found.
    ///
    /// The terminating directive is consumed and returned beside the
    /// collected scope. Reaching the end of source first is an error.
    fn parse_scope(&mut self, until: &[&str]) -> Result<(Scope, Stop), Error> {
        self.depth += 1;
        let result = self.parse_scope_inner(until);
        self.depth -= 1;

        result
    }

    fn parse_scope_inner(&mut self, until: &[&str]) -> Result<(Scope, Stop), Error> {
        let mut scope = Scope::new();
        loop {
            match self.next()? {
                Some((token, region)) => {
                    if let Some(stop) = as_stop(self.lexer.source, &token, region, until) {
                        return Ok((scope, stop));
                    }
                    scope.data.push(self.parse_node(token, region)?);
                }
                None => {
                    let expected = until
                        .iter()
                        .map(|name| format!("`@{name}`"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    return Err(Error::parse(UNEXPECTED_EOF)
                        .with_pointer(
                            self.lexer.source,
                            Region::new(self.lexer.source.len(), self.lexer.source.len()),
                        )
                        .with_help(format!("expected one of {expected}")));
                }
            }
        }
    }

    /// Verify that `@extends`, if present, is the first content of the
    /// template and appears only once.
    fn validate_extends(&self, scope: &Scope) -> Result<(), Error> {
        let source = self.lexer.source;
        let mut content = false;
        let mut extends = false;
        for node in &scope.data {
            match node {
                Node::Extends(region) => {
                    if extends {
                        return Err(Error::parse(UNEXPECTED_DIRECTIVE)
                            .with_pointer(source, *region)
                            .with_help("`@extends` may only be declared once"));
                    }
                    if content {
                        return Err(Error::parse(UNEXPECTED_DIRECTIVE)
                            .with_pointer(source, *region)
                            .with_help(
                                "`@extends` must be the first content of the template",
                            ));
                    }
                    extends = true;
                }
                Node::Text(region) => {
                    if !region.literal(source).trim().is_empty() {
                        content = true;
                    }
                }
                _ => content = true,
            }
        }

        Ok(())
    }

    /// Return the argument region of a directive, or a parse error when
    /// it has none.
    fn require_arguments(
        &self,
        name: &str,
        arguments: Option<Region>,
        region: Region,
    ) -> Result<Region, Error> {
        arguments.ok_or_else(|| {
            Error::parse(INVALID_SYNTAX)
                .with_pointer(self.lexer.source, region)
                .with_help(format!("`@{name}` requires arguments"))
        })
    }

    fn require_stop_arguments(&self, stop: &Stop) -> Result<Region, Error> {
        self.require_arguments(&stop.name, stop.arguments, stop.region)
    }

    /// Return the next token, pulling from the buffer first.
    fn next(&mut self) -> Result<Option<(Token, Region)>, Error> {
        match self.buffer.take() {
            Some(next) => Ok(next),
            None => self.lexer.next(),
        }
    }

    /// Return the next token, failing when the source is exhausted.
    fn next_must(&mut self) -> Result<(Token, Region), Error> {
        match self.next()? {
            Some(next) => Ok(next),
            None => Err(Error::parse(UNEXPECTED_EOF).with_pointer(
                self.lexer.source,
                Region::new(self.lexer.source.len(), self.lexer.source.len()),
            )),
        }
    }
}

/// Return a [`Stop`] when the token is a directive named in `until`.
fn as_stop(source: &str, token: &Token, region: Region, until: &[&str]) -> Option<Stop> {
    let (name, arguments) = match token {
        Token::Directive { name, arguments } => (name, *arguments),
        Token::EndDirective { name } => (name, None),
        _ => return None,
    };
    let literal = name.literal(source);
    if until.contains(&literal) {
        return Some(Stop {
            name: literal.to_string(),
            arguments,
            region,
        });
    }

    None
}

/// Find the standalone `in` keyword at the top level of the region.
///
/// Returns the absolute offset of the keyword. Occurrences inside
/// quotes, brackets or larger words do not count.
fn find_keyword_in(source: &str, region: Region) -> Option<usize> {
    let text = region.literal(source);
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (index, char) in text.char_indices() {
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
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            'i' if depth == 0 => {
                let before = index == 0
                    || bytes[index - 1].is_ascii_whitespace();
                let word = text[index..].starts_with("in");
                let after = text[index + 2..]
                    .chars()
                    .next()
                    .map(|c| c.is_whitespace())
                    .unwrap_or(false);
                if before && word && after && index > 0 {
                    return Some(region.begin + index);
                }
            }
            _ => {}
        }
    }

    None
}

/// Split the region on top level commas, returning sub regions.
fn split_top_level(source: &str, region: Region) -> Vec<Region> {
    let text = region.literal(source);
    let mut pieces = vec![];
    let mut begin = region.begin;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (index, char) in text.char_indices() {
        let at = region.begin + index;
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
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                pieces.push(Region::new(begin, at));
                begin = at + 1;
            }
            _ => {}
        }
    }
    pieces.push(Region::new(begin, region.end));

    pieces
}

/// Return true when the region contains a comma outside of quotes
/// and brackets.
fn has_top_level_comma(source: &str, region: Region) -> bool {
    split_top_level(source, region).len() > 1
}

/// Shrink the region to exclude leading and trailing whitespace.
fn trim_region(source: &str, region: Region) -> Region {
    let text = region.literal(source);
    let trimmed = text.trim_start();
    let begin = region.begin + (text.len() - trimmed.len());
    let end = begin + trimmed.trim_end().len();

    Region::new(begin, end)
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(char) if is_xid_start(char) || char == '_' => {}
        _ => return false,
    }
    chars.all(|char| is_xid_continue(char))
}

#[cfg(test)]
mod tests {
    use super::{tree::Node, Parser};
    use std::collections::HashSet;

    #[test]
    fn test_parse_text_and_output() {
        let template = Parser::new("hello {{ name }}!").compile(None).unwrap();
        assert_eq!(template.scope.data.len(), 3);
        match &template.scope.data[1] {
            Node::Variable(output) => {
                assert!(output.escape);
                assert_eq!(output.expression.literal(template.source).trim(), "name");
            }
            other => panic!("expected variable, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_if_full() {
        let source = "@if(a)1@elif(b)2@elseif(c)3@else 4@endif";
        let template = Parser::new(source).compile(None).unwrap();
        match &template.scope.data[0] {
            Node::If(node) => {
                assert_eq!(node.branches.len(), 2);
                assert!(node.otherwise.is_some());
                assert!(!node.negate);
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_directive_name_is_greedy() {
        // `@else4` is one name, not `@else` followed by text.
        assert!(Parser::new("@if(a)1@else4@endif").compile(None).is_err());
    }

    #[test]
    fn test_parse_unless() {
        let source = "@unless(done)pending@endunless";
        let template = Parser::new(source).compile(None).unwrap();
        match &template.scope.data[0] {
            Node::If(node) => assert!(node.negate),
            other => panic!("expected unless, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_for_with_empty() {
        let source = "@for(item in items){{ item }}@empty-@endfor";
        let template = Parser::new(source).compile(None).unwrap();
        match &template.scope.data[0] {
            Node::For(node) => {
                assert_eq!(node.bindings.len(), 1);
                assert_eq!(node.bindings[0].literal(source), "item");
                assert_eq!(node.collection.literal(source), "items");
                assert!(node.empty.is_some());
            }
            other => panic!("expected for, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_for_pair() {
        let source = "@for(key, value in mapping)x@endfor";
        let template = Parser::new(source).compile(None).unwrap();
        match &template.scope.data[0] {
            Node::For(node) => {
                assert_eq!(node.bindings.len(), 2);
                assert_eq!(node.bindings[1].literal(source), "value");
            }
            other => panic!("expected for, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_for_requires_in() {
        assert!(Parser::new("@for(items)x@endfor").compile(None).is_err());
    }

    #[test]
    fn test_parse_switch() {
        let source = "@switch(value) @case(1)one@case(2)two@default other@endswitch";
        let template = Parser::new(source).compile(None).unwrap();
        match &template.scope.data[0] {
            Node::Switch(node) => {
                assert_eq!(node.cases.len(), 2);
                assert!(node.default.is_some());
            }
            other => panic!("expected switch, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_switch_rejects_leading_content() {
        let source = "@switch(value)stray@case(1)one@endswitch";
        assert!(Parser::new(source).compile(None).is_err());
    }

    #[test]
    fn test_parse_unclosed_block() {
        let result = Parser::new("@if(a)hello").compile(None);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_mismatched_end() {
        assert!(Parser::new("@if(a)hello@endfor").compile(None).is_err());
    }

    #[test]
    fn test_parse_nesting() {
        let source = "@for(i in items)@if(i)@for(j in i)x@endfor@endif@endfor";
        assert!(Parser::new(source).compile(None).is_ok());
    }

    #[test]
    fn test_parse_extends_first() {
        assert!(Parser::new("@extends('base')@section('a')x@endsection")
            .compile(None)
            .is_ok());
        assert!(Parser::new("hello @extends('base')").compile(None).is_err());
        assert!(Parser::new("  \n@extends('base')").compile(None).is_ok());
    }

    #[test]
    fn test_parse_extends_once() {
        assert!(Parser::new("@extends('a')@extends('b')")
            .compile(None)
            .is_err());
    }

    #[test]
    fn test_parse_extends_not_nested() {
        assert!(Parser::new("@if(a)@extends('base')@endif")
            .compile(None)
            .is_err());
    }

    #[test]
    fn test_parse_section_inline() {
        let source = "@section('title', 'Home')";
        let template = Parser::new(source).compile(None).unwrap();
        match &template.scope.data[0] {
            Node::Section(section) => assert!(section.body.is_none()),
            other => panic!("expected section, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_verbatim() {
        let source = "@verbatim {{ raw }} @endverbatim";
        let template = Parser::new(source).compile(None).unwrap();
        match &template.scope.data[0] {
            Node::Verbatim(region) => {
                assert_eq!(region.literal(source), " {{ raw }} ");
            }
            other => panic!("expected verbatim, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_unknown_directive() {
        assert!(Parser::new("@bogus(1)").compile(None).is_err());
    }

    #[test]
    fn test_parse_custom_directive() {
        let mut names = HashSet::new();
        names.insert("badge".to_string());
        let template = Parser::new("@badge('new')")
            .with_directives(names)
            .compile(None)
            .unwrap();
        match &template.scope.data[0] {
            Node::Custom(custom) => assert_eq!(custom.name, "badge"),
            other => panic!("expected custom, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_stray_else() {
        assert!(Parser::new("@else").compile(None).is_err());
    }

    #[test]
    fn test_parse_component_with_slot() {
        let source = "@component('alert')@slot('title')Hi@endslot body@endcomponent";
        let template = Parser::new(source).compile(None).unwrap();
        match &template.scope.data[0] {
            Node::Component(component) => {
                assert_eq!(component.body.data.len(), 2);
            }
            other => panic!("expected component, got {other:?}"),
        }
    }
}
