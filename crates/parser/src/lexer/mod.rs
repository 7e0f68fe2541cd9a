//! Lexer for the boson build DSL.
//!
//! Statements are newline terminated, so newlines are real tokens. Inside
//! parentheses, brackets, and braces they separate nothing and are dropped,
//! which lets argument lists span lines.

mod token;

pub use token::{Token, TokenKind};

use logos::Logos;
use text_size::{TextRange, TextSize};

/// Tokenize a whole source file.
///
/// Unlexable input becomes `TokenKind::Error` tokens rather than stopping the
/// lexer; the parser reports them with a span. The returned stream always
/// ends with a single `Eof` token.
pub fn lex(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut depth = 0u32;

    let mut lexer = TokenKind::lexer(source);
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let range = TextRange::new(
            TextSize::new(span.start as u32),
            TextSize::new(span.end as u32),
        );
        let kind = match result {
            Ok(kind) => kind,
            Err(()) => TokenKind::Error,
        };

        match kind {
            TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftBrace => depth += 1,
            TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => {
                depth = depth.saturating_sub(1)
            }
            TokenKind::Newline if depth > 0 => continue,
            // Blank lines collapse into the previous newline
            TokenKind::Newline if matches!(tokens.last(), Some(Token { kind: TokenKind::Newline, .. }) | None) => {
                continue
            }
            _ => {}
        }

        tokens.push(Token { kind, span: range });
    }

    let end = TextSize::new(source.len() as u32);
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: TextRange::new(end, end),
    });
    tokens
}

/// Decode the escapes of a string literal body (quotes already stripped).
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("if x endif"),
            vec![TokenKind::If, TokenKind::Ident, TokenKind::Endif, TokenKind::Eof]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("x # a comment\ny"),
            vec![
                TokenKind::Ident,
                TokenKind::Newline,
                TokenKind::Ident,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn newlines_inside_parens_are_dropped() {
        assert_eq!(
            kinds("f(\n  'a',\n  'b',\n)"),
            vec![
                TokenKind::Ident,
                TokenKind::LeftParen,
                TokenKind::String,
                TokenKind::Comma,
                TokenKind::String,
                TokenKind::Comma,
                TokenKind::RightParen,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn leading_blank_lines_are_collapsed() {
        assert_eq!(kinds("\n\n\nx"), vec![TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn string_escapes() {
        assert_eq!(unescape(r"a\'b\nc"), "a'b\nc");
    }

    #[test]
    fn compound_operators() {
        assert_eq!(
            kinds("x += 1"),
            vec![
                TokenKind::Ident,
                TokenKind::PlusEqual,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unknown_characters_become_error_tokens() {
        assert!(kinds("x $ y").contains(&TokenKind::Error));
    }
}
