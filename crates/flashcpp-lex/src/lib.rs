//! flashcpp-lex - turns a preprocessed byte range into a restartable token
//! stream (§4.1).
//!
//! The lexer itself never preprocesses: `#include`, macro expansion and the
//! preprocessed-line → (source file, source line) mapping are produced by
//! an external collaborator and recorded on the [`flashcpp_util::SourceMap`]
//! the caller passes in. This crate only turns already-preprocessed bytes
//! into [`Token`]s.

pub mod cursor;
mod lexer;
pub mod token;
pub mod unicode;

pub use cursor::{Cursor, CursorSnapshot};
pub use lexer::{Lexer, LexerPosition};
pub use token::{
    CharLiteral, Encoding, FloatSuffix, IntegerSuffix, Keyword, NumericBase, NumericLiteral,
    NumericValue, OperatorKind, PunctuatorKind, StringLiteral, Token, TokenKind,
};

#[cfg(test)]
mod edge_cases;
