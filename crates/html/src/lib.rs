//! HTML lexical layer for the streaming rewriter.
//!
//! - [`symbols`]: static element classification (void, raw text, implied closes).
//! - [`token`]: token kinds, tokens and the recycling [`TokenPool`].
//! - [`span`]: mutable [`TokenSpan`] views handed to rewrite actions.
//! - [`lexer`]: the pull-based [`HtmlLexer`] over any `std::io::Read`.

pub mod lexer;
pub mod span;
pub mod symbols;
pub mod token;

pub use lexer::{HtmlLexer, LexerConfig, LexerStats, encoding_for_label};
pub use span::TokenSpan;
pub use symbols::{ElementCategory, ElementSymbol, lookup};
pub use token::{PoolStats, Token, TokenId, TokenKind, TokenPool};
