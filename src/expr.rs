//! The expression language embedded in interpolations and directive
//! arguments.
pub mod builtin;
pub mod eval;
pub mod lex;
pub mod method;
pub mod parse;
pub mod tree;
pub mod value;

pub use eval::Evaluator;
