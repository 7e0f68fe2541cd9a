//! Parser error types.

use text_size::TextRange;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("unexpected {found}, expected {expected} at {}", format_range(.span))]
    UnexpectedToken {
        expected: String,
        found: String,
        span: TextRange,
    },

    #[error("unlexable input at {}", format_range(.span))]
    InvalidToken { span: TextRange },

    #[error("integer literal out of range at {}", format_range(.span))]
    NumberOutOfRange { span: TextRange },
}

impl ParseError {
    pub fn span(&self) -> TextRange {
        match self {
            ParseError::UnexpectedToken { span, .. }
            | ParseError::InvalidToken { span }
            | ParseError::NumberOutOfRange { span } => *span,
        }
    }

    /// Render a `file:line:column: message` diagnostic line for the CLI.
    pub fn format_with_source(&self, filename: &str, source: &str) -> String {
        let offset = u32::from(self.span().start()) as usize;
        let prefix = &source[..offset.min(source.len())];
        let line = prefix.matches('\n').count() + 1;
        let column = offset - prefix.rfind('\n').map(|p| p + 1).unwrap_or(0) + 1;
        format!("{}:{}:{}: {}", filename, line, column, self)
    }
}

fn format_range(range: &TextRange) -> String {
    format!("{:?}..{:?}", range.start(), range.end())
}

pub type ParseResult<T> = Result<T, ParseError>;
