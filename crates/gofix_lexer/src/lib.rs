pub mod token;
pub mod tokenizer;

pub use token::{Comment, Token, TokenKind};
pub use tokenizer::{LexResult, LexerError, Lexed, tokenize};
