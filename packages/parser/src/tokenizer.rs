use logos::Logos;
use std::fmt;

/// Tokens found between a tag name and the end of the tag.
///
/// Text content is scanned directly by the parser; only tag interiors go
/// through this lexer, since attribute syntax is context free.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r\f]+")]
pub enum TagToken<'src> {
    #[token(">")]
    End,

    #[token("/>")]
    SelfClosingEnd,

    #[token("=")]
    Equals,

    // Attribute values in double or single quotes, quotes stripped
    #[regex(r#""[^"]*""#, |lex| strip_quotes(lex.slice()))]
    #[regex(r"'[^']*'", |lex| strip_quotes(lex.slice()))]
    Quoted(&'src str),

    // Attribute names and unquoted values. A name glued to `/>` keeps its
    // trailing slash here; the parser strips it.
    #[regex(r#"[^\s"'<>=`]+"#, |lex| lex.slice())]
    Word(&'src str),
}

fn strip_quotes(slice: &str) -> &str {
    &slice[1..slice.len() - 1]
}

impl<'src> fmt::Display for TagToken<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagToken::End => write!(f, ">"),
            TagToken::SelfClosingEnd => write!(f, "/>"),
            TagToken::Equals => write!(f, "="),
            TagToken::Quoted(s) => write!(f, "\"{}\"", s),
            TagToken::Word(s) => write!(f, "{}", s),
        }
    }
}

/// Tokenize a tag interior, returning tokens with their byte ranges.
/// Lexing stops after the first `>` or `/>`.
pub fn tokenize_tag(source: &str) -> Vec<(Result<TagToken<'_>, ()>, std::ops::Range<usize>)> {
    let mut tokens = Vec::new();
    let mut lexer = TagToken::lexer(source);
    while let Some(token) = lexer.next() {
        let done = matches!(token, Ok(TagToken::End) | Ok(TagToken::SelfClosingEnd));
        tokens.push((token, lexer.span()));
        if done {
            break;
        }
    }
    tokens
}
