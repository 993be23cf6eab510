//! Syntax layer for gqlbind.
//!
//! This crate provides:
//! - `token`: Token kinds and token structures
//! - `lexer`: Tokenization and string literal decoding
//! - `ast`: Syntax tree types for schema and executable documents
//! - `parser`: Recursive descent parser with error recovery

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::*;
pub use lexer::Lexer;
pub use parser::{parse, ParseResult};
pub use token::{DirectiveLocation, Token, TokenKind};
