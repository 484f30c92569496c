//! Lexical analysis: expression text to tokens

pub mod tokenizer;

pub use tokenizer::{LexerError, Tokenizer, TokenizerState};
