use gofix_span::Span;
use logos::Logos;
use thiserror::Error;

use crate::token::{Comment, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexerError {
    #[error("invalid token {text:?} at {span}")]
    InvalidToken { text: String, span: Span },
    #[error("unterminated comment at {span}")]
    UnterminatedComment { span: Span },
}

impl LexerError {
    pub fn span(&self) -> Span {
        match self {
            LexerError::InvalidToken { span, .. } | LexerError::UnterminatedComment { span } => {
                *span
            }
        }
    }
}

/// The output of [`tokenize`]: significant tokens (with inserted semicolons)
/// and the comments that were removed from the stream.
#[derive(Debug, Clone, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
}

impl Lexed {
    /// Token kinds paired with byte ranges, the shape expected by the parser.
    pub fn stream(&self) -> Vec<(TokenKind, core::ops::Range<usize>)> {
        self.tokens
            .iter()
            .map(|token| (token.kind, token.span.range()))
            .collect()
    }
}

pub type LexResult = Result<Lexed, LexerError>;

/// Tokenizes Go source text.
///
/// A semicolon is inserted whenever a line ends after a token that may end a
/// statement; a block comment spanning lines counts as a line end.
pub fn tokenize(source: &str) -> LexResult {
    let mut lexed = Lexed::default();
    let mut last: Option<TokenKind> = None;
    let mut lexer = TokenKind::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::from(lexer.span());
        let kind = match result {
            Ok(kind) => kind,
            Err(()) => {
                if lexer.slice().starts_with("/*") {
                    return Err(LexerError::UnterminatedComment { span });
                }
                return Err(LexerError::InvalidToken {
                    text: lexer.slice().to_string(),
                    span,
                });
            }
        };

        match kind {
            TokenKind::Newline => {
                let at = span.start as usize;
                insert_semicolon(&mut lexed.tokens, &mut last, Span::new(at, at + 1));
            }
            TokenKind::LineComment => {
                lexed.comments.push(Comment {
                    text: lexer.slice().to_string(),
                    span,
                });
            }
            TokenKind::BlockComment => {
                let text = lexer.slice();
                lexed.comments.push(Comment {
                    text: text.to_string(),
                    span,
                });
                if text.contains('\n') {
                    insert_semicolon(&mut lexed.tokens, &mut last, Span::point(span.start as usize));
                }
            }
            kind => {
                lexed.tokens.push(Token::new(kind, span));
                last = Some(kind);
            }
        }
    }

    insert_semicolon(&mut lexed.tokens, &mut last, Span::point(source.len()));
    Ok(lexed)
}

fn insert_semicolon(tokens: &mut Vec<Token>, last: &mut Option<TokenKind>, span: Span) {
    if last.is_some_and(TokenKind::ends_statement) {
        tokens.push(Token::new(TokenKind::Semicolon, span));
    }
    *last = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .tokens
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_semicolon_insertion() {
        let got = kinds("x := f(1)\nreturn\n");
        assert_eq!(
            got,
            vec![
                TokenKind::Ident,
                TokenKind::Define,
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::Int,
                TokenKind::RParen,
                TokenKind::Semicolon,
                TokenKind::Return,
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn test_no_semicolon_after_operator() {
        let got = kinds("a +\nb");
        assert_eq!(
            got,
            vec![
                TokenKind::Ident,
                TokenKind::Add,
                TokenKind::Ident,
                TokenKind::Semicolon
            ]
        );
    }

    #[test]
    fn test_comments_are_collected() {
        let lexed = tokenize("//go:fix inline\nfunc f() {} // trailing\n").unwrap();
        assert_eq!(lexed.comments.len(), 2);
        assert_eq!(lexed.comments[0].text, "//go:fix inline");
        assert_eq!(lexed.tokens[0].kind, TokenKind::Func);
        assert_eq!(lexed.tokens.last().unwrap().kind, TokenKind::Semicolon);
    }

    #[test]
    fn test_operators_and_literals() {
        let got = kinds("x &^= 0x1F + 1.5e3 - 2i; s := `raw` + \"q\\\"\" + 'a'");
        assert!(got.contains(&TokenKind::AndNotAssign));
        assert!(got.contains(&TokenKind::Int));
        assert!(got.contains(&TokenKind::Float));
        assert!(got.contains(&TokenKind::Imag));
        assert!(got.contains(&TokenKind::RawString));
        assert!(got.contains(&TokenKind::String));
        assert!(got.contains(&TokenKind::Char));
    }

    #[test]
    fn test_unterminated_block_comment() {
        assert!(matches!(
            tokenize("/* never closed"),
            Err(LexerError::UnterminatedComment { .. })
        ));
    }
}
