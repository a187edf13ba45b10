use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unterminated comment starting at {pos}")]
    UnterminatedComment { pos: usize },

    #[error("Unexpected end of input inside <{tag}> starting at {pos}")]
    UnterminatedTag { pos: usize, tag: String },

    #[error("Malformed tag at {pos}: {message}")]
    MalformedTag { pos: usize, message: String },

    #[error("Lexer error at {pos}")]
    LexerError { pos: usize },
}

impl ParseError {
    pub fn unterminated_comment(pos: usize) -> Self {
        Self::UnterminatedComment { pos }
    }

    pub fn unterminated_tag(pos: usize, tag: impl Into<String>) -> Self {
        Self::UnterminatedTag {
            pos,
            tag: tag.into(),
        }
    }

    pub fn malformed_tag(pos: usize, message: impl Into<String>) -> Self {
        Self::MalformedTag {
            pos,
            message: message.into(),
        }
    }

    pub fn lexer_error(pos: usize) -> Self {
        Self::LexerError { pos }
    }

    /// Byte offset into the source where the error was detected
    pub fn pos(&self) -> usize {
        match self {
            Self::UnterminatedComment { pos }
            | Self::UnterminatedTag { pos, .. }
            | Self::MalformedTag { pos, .. }
            | Self::LexerError { pos } => *pos,
        }
    }
}

/// Source-annotated error output for terminals
#[cfg(feature = "pretty-errors")]
pub mod pretty {
    use super::ParseError;
    use ariadne::{Color, Label, Report, ReportKind, Source};

    pub fn format_error(err: &ParseError, file_name: &str, source: &str) -> String {
        let start = err.pos().min(source.len());
        let end = next_boundary(source, start);

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, file_name, start)
            .with_message(err.to_string())
            .with_label(
                Label::new((file_name, start..end))
                    .with_message(label_for(err))
                    .with_color(Color::Red),
            )
            .finish()
            .write((file_name, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => err.to_string(),
        }
    }

    fn label_for(err: &ParseError) -> String {
        match err {
            ParseError::UnterminatedComment { .. } => "comment is never closed with `-->`".to_string(),
            ParseError::UnterminatedTag { tag, .. } => format!("<{}> is missing its closing `>`", tag),
            ParseError::MalformedTag { message, .. } => message.clone(),
            ParseError::LexerError { .. } => "unexpected character".to_string(),
        }
    }

    fn next_boundary(source: &str, start: usize) -> usize {
        source[start..]
            .char_indices()
            .nth(1)
            .map(|(offset, _)| start + offset)
            .unwrap_or(source.len())
    }
}
