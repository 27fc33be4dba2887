//! Expression parser.
//!
//! A recursive descent grammar over the tokens produced by the
//! expression lexer. Restricted to literals, names, attribute and
//! subscript access, calls, operators and container literals. There
//! is no way to express a statement, an assignment or an import.
use super::{
    lex::{tokenize, Token},
    tree::{
        Arguments, Attribute, Binary, BinaryOperator, Call, CompareOperator, Comparison,
        Expression, List, Literal, Logical, LogicalOperator, Map, Subscript, Unary, UnaryOperator,
        Variable,
    },
};
use crate::{
    log::{Error, INVALID_SYNTAX, UNEXPECTED_EOF, UNEXPECTED_TOKEN},
    region::Region,
};
use serde_json::{Number, Value};

/// Parse the text within the region as a single expression.
pub fn parse(source: &str, region: Region) -> Result<Expression, Error> {
    let mut parser = Parser::new(source, region)?;
    let expression = parser.expression()?;
    parser.finished()?;

    Ok(expression)
}

/// Parse the text within the region as a directive argument list,
/// without surrounding parentheses.
pub fn parse_arguments(source: &str, region: Region) -> Result<Arguments, Error> {
    let mut parser = Parser::new(source, region)?;
    let arguments = parser.arguments(None)?;
    parser.finished()?;

    Ok(arguments)
}

struct Parser<'source> {
    source: &'source str,
    region: Region,
    tokens: Vec<(Token, Region)>,
    position: usize,
}

impl<'source> Parser<'source> {
    fn new(source: &'source str, region: Region) -> Result<Self, Error> {
        Ok(Self {
            source,
            region,
            tokens: tokenize(source, region)?,
            position: 0,
        })
    }

    fn peek(&self) -> Option<&(Token, Region)> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<(Token, Region)> {
        let next = self.tokens.get(self.position).cloned();
        if next.is_some() {
            self.position += 1;
        }
        next
    }

    fn next_must(&mut self) -> Result<(Token, Region), Error> {
        self.next().ok_or_else(|| {
            Error::parse(UNEXPECTED_EOF)
                .with_pointer(self.source, Region::new(self.region.end, self.region.end))
                .with_help("expression ends unexpectedly")
        })
    }

    /// Consume the next token, which must be equal to the given token.
    fn expect(&mut self, token: Token, description: &str) -> Result<Region, Error> {
        match self.next_must()? {
            (found, region) if found == token => Ok(region),
            (_, region) => Err(Error::parse(UNEXPECTED_TOKEN)
                .with_pointer(self.source, region)
                .with_help(format!("expected {description}"))),
        }
    }

    /// Consume the next token when it equals the given token.
    fn advance_if(&mut self, token: Token) -> bool {
        if self.peek().is_some_and(|(next, _)| *next == token) {
            self.position += 1;
            return true;
        }

        false
    }

    fn finished(&self) -> Result<(), Error> {
        match self.peek() {
            Some((_, region)) => Err(Error::parse(UNEXPECTED_TOKEN)
                .with_pointer(self.source, *region)
                .with_help("expected the expression to end here")),
            None => Ok(()),
        }
    }

    fn expression(&mut self) -> Result<Expression, Error> {
        self.or()
    }

    fn or(&mut self) -> Result<Expression, Error> {
        let mut left = self.and()?;
        while self.advance_if(Token::Or) {
            let right = self.and()?;
            left = Expression::Logical(Logical {
                left: Box::new(left),
                operator: LogicalOperator::Or,
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn and(&mut self) -> Result<Expression, Error> {
        let mut left = self.not()?;
        while self.advance_if(Token::And) {
            let right = self.not()?;
            left = Expression::Logical(Logical {
                left: Box::new(left),
                operator: LogicalOperator::And,
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn not(&mut self) -> Result<Expression, Error> {
        if let Some((Token::Not, region)) = self.peek() {
            let region = *region;
            self.position += 1;
            let operand = self.not()?;
            let region = region.combine(operand.region());
            return Ok(Expression::Unary(Unary {
                operator: UnaryOperator::Not,
                operand: Box::new(operand),
                region,
            }));
        }

        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expression, Error> {
        let first = self.additive()?;
        let mut links = vec![];
        while let Some(operator) = self.compare_operator()? {
            let right = self.additive()?;
            links.push((operator, right));
        }

        if links.is_empty() {
            return Ok(first);
        }

        Ok(Expression::Comparison(Comparison {
            first: Box::new(first),
            links,
        }))
    }

    /// Consume a comparison operator, including the `in` and `not in`
    /// membership forms.
    fn compare_operator(&mut self) -> Result<Option<CompareOperator>, Error> {
        let operator = match self.peek() {
            Some((Token::Equal, _)) => CompareOperator::Equal,
            Some((Token::NotEqual, _)) => CompareOperator::NotEqual,
            Some((Token::Greater, _)) => CompareOperator::Greater,
            Some((Token::GreaterEqual, _)) => CompareOperator::GreaterEqual,
            Some((Token::Less, _)) => CompareOperator::Less,
            Some((Token::LessEqual, _)) => CompareOperator::LessEqual,
            Some((Token::In, _)) => CompareOperator::In,
            Some((Token::Not, _)) => {
                let follows = self
                    .tokens
                    .get(self.position + 1)
                    .is_some_and(|(token, _)| *token == Token::In);
                if !follows {
                    return Ok(None);
                }
                self.position += 2;
                return Ok(Some(CompareOperator::NotIn));
            }
            _ => return Ok(None),
        };
        self.position += 1;

        Ok(Some(operator))
    }

    fn additive(&mut self) -> Result<Expression, Error> {
        let mut left = self.multiplicative()?;
        loop {
            let operator = match self.peek() {
                Some((Token::Plus, _)) => BinaryOperator::Add,
                Some((Token::Minus, _)) => BinaryOperator::Subtract,
                _ => break,
            };
            self.position += 1;
            let right = self.multiplicative()?;
            left = Expression::Binary(Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expression, Error> {
        let mut left = self.unary()?;
        loop {
            let operator = match self.peek() {
                Some((Token::Star, _)) => BinaryOperator::Multiply,
                Some((Token::Slash, _)) => BinaryOperator::Divide,
                Some((Token::Percent, _)) => BinaryOperator::Remainder,
                _ => break,
            };
            self.position += 1;
            let right = self.unary()?;
            left = Expression::Binary(Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn unary(&mut self) -> Result<Expression, Error> {
        if let Some((Token::Minus, region)) = self.peek() {
            let region = *region;
            self.position += 1;
            let operand = self.unary()?;
            let region = region.combine(operand.region());
            return Ok(Expression::Unary(Unary {
                operator: UnaryOperator::Negative,
                operand: Box::new(operand),
                region,
            }));
        }

        self.postfix()
    }

    /// Parse attribute access, subscripts and calls on a primary.
    fn postfix(&mut self) -> Result<Expression, Error> {
        let mut base = self.primary()?;
        loop {
            if self.advance_if(Token::Dot) {
                let (token, name) = self.next_must()?;
                if token != Token::Identifier {
                    return Err(Error::parse(UNEXPECTED_TOKEN)
                        .with_pointer(self.source, name)
                        .with_help("expected an attribute name after `.`"));
                }
                base = Expression::Attribute(Attribute {
                    base: Box::new(base),
                    name,
                });
            } else if let Some((Token::LeftBracket, begin)) = self.peek() {
                let begin = *begin;
                self.position += 1;
                let index = self.expression()?;
                let end = self.expect(Token::RightBracket, "a closing `]`")?;
                let region = base.region().combine(begin).combine(end);
                base = Expression::Subscript(Subscript {
                    base: Box::new(base),
                    index: Box::new(index),
                    region,
                });
            } else if let Some((Token::LeftParen, _)) = self.peek() {
                self.position += 1;
                let arguments = self.arguments(Some(Token::RightParen))?;
                let end = self.expect(Token::RightParen, "a closing `)`")?;
                let region = base.region().combine(end);
                base = Expression::Call(Call {
                    base: Box::new(base),
                    arguments,
                    region,
                });
            } else {
                break;
            }
        }

        Ok(base)
    }

    fn primary(&mut self) -> Result<Expression, Error> {
        let (token, region) = self.next_must()?;
        match token {
            Token::String(value) => Ok(Expression::Literal(Literal {
                value: Value::String(value),
                region,
            })),
            Token::Integer(value) => Ok(Expression::Literal(Literal {
                value: Value::Number(Number::from(value)),
                region,
            })),
            Token::Float(value) => {
                let number = Number::from_f64(value).ok_or_else(|| {
                    Error::parse(INVALID_SYNTAX).with_pointer(self.source, region)
                })?;
                Ok(Expression::Literal(Literal {
                    value: Value::Number(number),
                    region,
                }))
            }
            Token::Bool(value) => Ok(Expression::Literal(Literal {
                value: Value::Bool(value),
                region,
            })),
            Token::None => Ok(Expression::Literal(Literal {
                value: Value::Null,
                region,
            })),
            Token::Identifier => Ok(Expression::Variable(Variable { name: region })),
            Token::LeftParen => self.group(region),
            Token::LeftBracket => self.list(region),
            Token::LeftBrace => self.map(region),
            _ => Err(Error::parse(UNEXPECTED_TOKEN)
                .with_pointer(self.source, region)
                .with_help("expected a value here")),
        }
    }

    /// Parse a parenthesized expression, or a tuple literal when a
    /// comma follows the first element.
    fn group(&mut self, begin: Region) -> Result<Expression, Error> {
        let first = self.expression()?;
        if !self.peek().is_some_and(|(token, _)| *token == Token::Comma) {
            self.expect(Token::RightParen, "a closing `)`")?;
            return Ok(first);
        }

        let mut items = vec![first];
        while self.advance_if(Token::Comma) {
            if self.peek().is_some_and(|(token, _)| *token == Token::RightParen) {
                break;
            }
            items.push(self.expression()?);
        }
        let end = self.expect(Token::RightParen, "a closing `)`")?;

        Ok(Expression::List(List {
            items,
            region: begin.combine(end),
        }))
    }

    fn list(&mut self, begin: Region) -> Result<Expression, Error> {
        let mut items = vec![];
        loop {
            if self.peek().is_some_and(|(token, _)| *token == Token::RightBracket) {
                break;
            }
            items.push(self.expression()?);
            if !self.advance_if(Token::Comma) {
                break;
            }
        }
        let end = self.expect(Token::RightBracket, "a closing `]`")?;

        Ok(Expression::List(List {
            items,
            region: begin.combine(end),
        }))
    }

    fn map(&mut self, begin: Region) -> Result<Expression, Error> {
        let mut entries = vec![];
        loop {
            if self.peek().is_some_and(|(token, _)| *token == Token::RightBrace) {
                break;
            }
            let key = self.expression()?;
            self.expect(Token::Colon, "a `:` after the key")?;
            let value = self.expression()?;
            entries.push((key, value));
            if !self.advance_if(Token::Comma) {
                break;
            }
        }
        let end = self.expect(Token::RightBrace, "a closing `}`")?;

        Ok(Expression::Map(Map {
            entries,
            region: begin.combine(end),
        }))
    }

    /// Parse a comma separated argument list.
    ///
    /// Arguments may be positional or `name=value` pairs, and named
    /// arguments must come after positional ones. When `until` is
    /// given, the list ends before that token, otherwise it runs to
    /// the end of input.
    fn arguments(&mut self, until: Option<Token>) -> Result<Arguments, Error> {
        let mut arguments = Arguments::default();
        loop {
            let done = match (&until, self.peek()) {
                (_, None) => true,
                (Some(stop), Some((token, _))) => token == stop,
                (None, Some(_)) => false,
            };
            if done {
                break;
            }

            if let Some(name) = self.named_argument()? {
                let value = self.expression()?;
                arguments.named.push((name, value));
            } else {
                let value = self.expression()?;
                if !arguments.named.is_empty() {
                    return Err(Error::parse(INVALID_SYNTAX)
                        .with_pointer(self.source, value.region())
                        .with_help("positional arguments must come before named arguments"));
                }
                arguments.positional.push(value);
            }

            if !self.advance_if(Token::Comma) {
                break;
            }
        }

        Ok(arguments)
    }

    /// Consume `name =` when the next tokens begin a named argument.
    fn named_argument(&mut self) -> Result<Option<String>, Error> {
        let name = match (self.peek(), self.tokens.get(self.position + 1)) {
            (Some((Token::Identifier, region)), Some((Token::Assign, _))) => {
                region.literal(self.source).to_string()
            }
            _ => return Ok(None),
        };
        self.position += 2;

        Ok(Some(name))
    }
}

#[cfg(test)]
mod tests {
    use super::{parse, parse_arguments};
    use crate::region::Region;
    use crate::expr::tree::{CompareOperator, Expression};

    fn parse_text(text: &str) -> Expression {
        parse(text, Region::new(0, text.len())).unwrap()
    }

    #[test]
    fn test_parse_precedence() {
        // `a or b and not c == d + e * f` groups as
        // `a or (b and (not (c == (d + (e * f)))))`.
        match parse_text("a or b and not c == d + e * f") {
            Expression::Logical(logical) => match *logical.right {
                Expression::Logical(inner) => match *inner.right {
                    Expression::Unary(_) => {}
                    other => panic!("expected unary, got {other:?}"),
                },
                other => panic!("expected logical, got {other:?}"),
            },
            other => panic!("expected logical, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_comparison_chain() {
        match parse_text("1 < x <= 10") {
            Expression::Comparison(comparison) => {
                assert_eq!(comparison.links.len(), 2);
                assert_eq!(comparison.links[1].0, CompareOperator::LessEqual);
            }
            other => panic!("expected comparison, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_membership() {
        match parse_text("item not in items") {
            Expression::Comparison(comparison) => {
                assert_eq!(comparison.links[0].0, CompareOperator::NotIn);
            }
            other => panic!("expected comparison, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_postfix_chain() {
        match parse_text("user.posts[0].title.upper()") {
            Expression::Call(call) => match *call.base {
                Expression::Attribute(_) => {}
                other => panic!("expected attribute, got {other:?}"),
            },
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_containers() {
        match parse_text("{'a': [1, 2], 'b': (3, 4)}") {
            Expression::Map(map) => assert_eq!(map.entries.len(), 2),
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_arguments_mixed() {
        let text = "'home', id=3, size='large'";
        let arguments = parse_arguments(text, Region::new(0, text.len())).unwrap();
        assert_eq!(arguments.positional.len(), 1);
        assert_eq!(arguments.named.len(), 2);
        assert_eq!(arguments.named[0].0, "id");
    }

    #[test]
    fn test_parse_positional_after_named() {
        let text = "id=3, 'home'";
        assert!(parse_arguments(text, Region::new(0, text.len())).is_err());
    }

    #[test]
    fn test_parse_trailing_garbage() {
        assert!(parse("a b", Region::new(0, 3)).is_err());
    }

    #[test]
    fn test_parse_unclosed_paren() {
        assert!(parse("(a", Region::new(0, 2)).is_err());
    }
}
