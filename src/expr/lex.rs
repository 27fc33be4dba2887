//! Expression lexer.
//!
//! Runs against the span captured by the template lexer, so every
//! region is absolute within the template source and diagnostics can
//! point at the original text.
use crate::{
    log::{Error, INVALID_SYNTAX},
    region::Region,
};
use unicode_ident::{is_xid_continue, is_xid_start};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    None,
    /// A name, read from the token's region.
    Identifier,
    And,
    Or,
    Not,
    In,
    Dot,
    Comma,
    Colon,
    Assign,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
}

/// Tokenize the expression within the given region.
///
/// # Errors
///
/// Returns an [`Error`] for unterminated strings, malformed numbers
/// and characters that are not part of the expression language.
pub fn tokenize(source: &str, region: Region) -> Result<Vec<(Token, Region)>, Error> {
    let text = region.literal(source);
    let mut tokens = vec![];
    let mut chars = text.char_indices().peekable();

    while let Some(&(index, char)) = chars.peek() {
        let at = region.begin + index;
        match char {
            _ if char.is_whitespace() => {
                chars.next();
            }
            '"' | '\'' => {
                let (value, end) = read_string(source, at, char)?;
                tokens.push((Token::String(value), Region::new(at, end)));
                while chars.peek().is_some_and(|&(i, _)| region.begin + i < end) {
                    chars.next();
                }
            }
            _ if char.is_ascii_digit() => {
                let (token, end) = read_number(source, region, at)?;
                tokens.push((token, Region::new(at, end)));
                while chars.peek().is_some_and(|&(i, _)| region.begin + i < end) {
                    chars.next();
                }
            }
            _ if is_xid_start(char) || char == '_' => {
                let mut end = at;
                while let Some(&(i, c)) = chars.peek() {
                    if is_xid_continue(c) {
                        end = region.begin + i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let word = Region::new(at, end);
                tokens.push((keyword(word.literal(source)), word));
            }
            '&' | '|' => {
                chars.next();
                if !chars.peek().is_some_and(|&(_, c)| c == char) {
                    return Err(Error::parse(INVALID_SYNTAX)
                        .with_pointer(source, Region::new(at, at + 1))
                        .with_help(format!("`{char}` is only valid doubled, as `{char}{char}`")));
                }
                chars.next();
                let token = if char == '&' { Token::And } else { Token::Or };
                tokens.push((token, Region::new(at, at + 2)));
            }
            '=' | '!' | '<' | '>' => {
                chars.next();
                let double = chars.peek().is_some_and(|&(_, c)| c == '=');
                if double {
                    chars.next();
                }
                let token = match (char, double) {
                    ('=', true) => Token::Equal,
                    ('=', false) => Token::Assign,
                    ('!', true) => Token::NotEqual,
                    ('<', true) => Token::LessEqual,
                    ('<', false) => Token::Less,
                    ('>', true) => Token::GreaterEqual,
                    ('>', false) => Token::Greater,
                    ('!', false) => Token::Not,
                    _ => unreachable!(),
                };
                let length = if double { 2 } else { 1 };
                tokens.push((token, Region::new(at, at + length)));
            }
            _ => {
                let token = match char {
                    '.' => Token::Dot,
                    ',' => Token::Comma,
                    ':' => Token::Colon,
                    '(' => Token::LeftParen,
                    ')' => Token::RightParen,
                    '[' => Token::LeftBracket,
                    ']' => Token::RightBracket,
                    '{' => Token::LeftBrace,
                    '}' => Token::RightBrace,
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '%' => Token::Percent,
                    _ => {
                        return Err(Error::parse(INVALID_SYNTAX)
                            .with_pointer(source, Region::new(at, at + char.len_utf8()))
                            .with_help(format!("character `{char}` is not valid here")))
                    }
                };
                chars.next();
                tokens.push((token, Region::new(at, at + char.len_utf8())));
            }
        }
    }

    Ok(tokens)
}

/// Map a word to its keyword token, or an identifier.
fn keyword(word: &str) -> Token {
    match word {
        "true" | "True" => Token::Bool(true),
        "false" | "False" => Token::Bool(false),
        "none" | "None" | "null" => Token::None,
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "in" => Token::In,
        _ => Token::Identifier,
    }
}

/// Read a quoted string beginning at the given offset.
///
/// Returns the decoded value and the offset just beyond the closing
/// quote. Supports the `\n`, `\t` and `\r` escapes, and escaped quotes.
fn read_string(source: &str, begin: usize, quote: char) -> Result<(String, usize), Error> {
    let mut value = String::new();
    let mut chars = source[begin + 1..].char_indices();

    while let Some((index, char)) = chars.next() {
        match char {
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, other)) => value.push(other),
                None => break,
            },
            _ if char == quote => {
                return Ok((value, begin + 1 + index + char.len_utf8()));
            }
            _ => value.push(char),
        }
    }

    Err(Error::parse("unterminated string")
        .with_pointer(source, Region::new(begin, begin + 1))
        .with_help("string opened here is never closed"))
}

/// Read a numeric literal beginning at the given offset.
fn read_number(source: &str, region: Region, begin: usize) -> Result<(Token, usize), Error> {
    let mut end = begin;
    let mut float = false;
    for (index, char) in source[begin..region.end].char_indices() {
        match char {
            _ if char.is_ascii_digit() => end = begin + index + 1,
            '.' if !float => {
                // A trailing dot is attribute access, not a float.
                let digit_follows = source[begin + index + 1..region.end]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_digit());
                if !digit_follows {
                    break;
                }
                float = true;
                end = begin + index + 1;
            }
            _ => break,
        }
    }

    let text = &source[begin..end];
    let token = if float {
        text.parse::<f64>().ok().map(Token::Float)
    } else {
        text.parse::<i64>().ok().map(Token::Integer)
    };

    match token {
        Some(token) => Ok((token, end)),
        None => Err(Error::parse(INVALID_SYNTAX)
            .with_pointer(source, Region::new(begin, end))
            .with_help(format!("`{text}` is not a valid number"))),
    }
}

#[cfg(test)]
mod tests {
    use super::{tokenize, Token};
    use crate::region::Region;

    fn lex(text: &str) -> Vec<Token> {
        tokenize(text, Region::new(0, text.len()))
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn test_lex_literals() {
        assert_eq!(
            lex(r#"10 2.5 "a" 'b' true False none"#),
            vec![
                Token::Integer(10),
                Token::Float(2.5),
                Token::String("a".into()),
                Token::String("b".into()),
                Token::Bool(true),
                Token::Bool(false),
                Token::None,
            ]
        );
    }

    #[test]
    fn test_lex_operators() {
        assert_eq!(
            lex("a >= 1 and not b != c"),
            vec![
                Token::Identifier,
                Token::GreaterEqual,
                Token::Integer(1),
                Token::And,
                Token::Not,
                Token::Identifier,
                Token::NotEqual,
                Token::Identifier,
            ]
        );
    }

    #[test]
    fn test_lex_symbol_aliases() {
        assert_eq!(
            lex("a && !b || c"),
            vec![
                Token::Identifier,
                Token::And,
                Token::Not,
                Token::Identifier,
                Token::Or,
                Token::Identifier,
            ]
        );
        assert!(tokenize("a & b", Region::new(0, 5)).is_err());
    }

    #[test]
    fn test_lex_number_out_of_range() {
        assert!(tokenize("99999999999999999999", Region::new(0, 20)).is_err());
    }

    #[test]
    fn test_lex_attribute_not_float() {
        assert_eq!(
            lex("1.upper"),
            vec![Token::Integer(1), Token::Dot, Token::Identifier]
        );
    }

    #[test]
    fn test_lex_string_escapes() {
        assert_eq!(lex(r#""a\nb\"c""#), vec![Token::String("a\nb\"c".into())]);
    }

    #[test]
    fn test_lex_unterminated_string() {
        assert!(tokenize("\"open", Region::new(0, 5)).is_err());
    }

    #[test]
    fn test_lex_bad_character() {
        assert!(tokenize("a ; b", Region::new(0, 5)).is_err());
    }
}
