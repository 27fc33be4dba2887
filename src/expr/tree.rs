//! Types for the expression syntax tree.
use crate::region::Region;
use serde_json::Value;
use std::fmt::Display;

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A literal value such as `"text"`, `10.2` or `true`.
    Literal(Literal),
    /// A name resolved against the context.
    Variable(Variable),
    /// An attribute access such as `user.name`.
    Attribute(Attribute),
    /// A subscript such as `items[0]` or `mapping["key"]`.
    Subscript(Subscript),
    /// A call such as `length(items)` or `text.excerpt(100)`.
    Call(Call),
    /// A unary operation such as `not done` or `-offset`.
    Unary(Unary),
    /// An arithmetic operation such as `price * quantity`.
    Binary(Binary),
    /// A short circuiting `and` or `or`.
    Logical(Logical),
    /// A comparison chain such as `a < b < c`.
    Comparison(Comparison),
    /// A list literal such as `[1, 2, 3]`.
    List(List),
    /// A mapping literal such as `{"a": 1}`.
    Map(Map),
}

impl Expression {
    /// Return a [`Region`] spanning the whole expression.
    pub fn region(&self) -> Region {
        match self {
            Expression::Literal(literal) => literal.region,
            Expression::Variable(variable) => variable.name,
            Expression::Attribute(attribute) => attribute.base.region().combine(attribute.name),
            Expression::Subscript(subscript) => subscript.region,
            Expression::Call(call) => call.region,
            Expression::Unary(unary) => unary.region,
            Expression::Binary(binary) => binary.left.region().combine(binary.right.region()),
            Expression::Logical(logical) => logical.left.region().combine(logical.right.region()),
            Expression::Comparison(comparison) => {
                let mut region = comparison.first.region();
                if let Some((_, last)) = comparison.links.last() {
                    region = region.combine(last.region());
                }
                region
            }
            Expression::List(list) => list.region,
            Expression::Map(map) => map.region,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: Value,
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: Region,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub base: Box<Expression>,
    pub name: Region,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subscript {
    pub base: Box<Expression>,
    pub index: Box<Expression>,
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// The called target, a [`Variable`] for builtin functions or an
    /// [`Attribute`] for methods and filters.
    pub base: Box<Expression>,
    pub arguments: Arguments,
    pub region: Region,
}

/// The argument list of a [`Call`], or of a directive.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arguments {
    pub positional: Vec<Expression>,
    pub named: Vec<(String, Expression)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unary {
    pub operator: UnaryOperator,
    pub operand: Box<Expression>,
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binary {
    pub left: Box<Expression>,
    pub operator: BinaryOperator,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Logical {
    pub left: Box<Expression>,
    pub operator: LogicalOperator,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub first: Box<Expression>,
    pub links: Vec<(CompareOperator, Expression)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub items: Vec<Expression>,
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    pub entries: Vec<(Expression, Expression)>,
    pub region: Region,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOperator {
    Not,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Remainder => "%",
        };
        write!(f, "{text}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompareOperator {
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    In,
    NotIn,
}

impl Display for CompareOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            CompareOperator::Equal => "==",
            CompareOperator::NotEqual => "!=",
            CompareOperator::Greater => ">",
            CompareOperator::GreaterEqual => ">=",
            CompareOperator::Less => "<",
            CompareOperator::LessEqual => "<=",
            CompareOperator::In => "in",
            CompareOperator::NotIn => "not in",
        };
        write!(f, "{text}")
    }
}
