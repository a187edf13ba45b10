use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{tokenize_tag, TagToken};

/// Elements that never have children or a closing tag
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Elements whose content is kept verbatim as a single text node
pub fn is_raw_text_element(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "textarea" | "title")
}

/// Opening `tag` while `open` is the innermost element closes `open` first
fn closes_implicitly(tag: &str, open: &str) -> bool {
    tag == open && matches!(tag, "li" | "p" | "option" | "dt" | "dd" | "tr" | "td" | "th")
}

/// Lenient markup parser producing an arena [`Document`]
pub struct Parser<'src> {
    source: &'src str,
    pos: usize,
    document: Document,
    /// Open elements, innermost last
    stack: Vec<NodeId>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            document: Document::new(),
            stack: Vec::new(),
        }
    }

    /// Parse the whole input. Elements still open at the end are closed.
    pub fn parse_document(mut self) -> ParseResult<Document> {
        while !self.is_at_end() {
            self.parse_node()?;
        }
        Ok(self.document)
    }

    fn parse_node(&mut self) -> ParseResult<()> {
        let rest = self.rest();
        if rest.starts_with("<!--") {
            self.parse_comment()
        } else if rest.starts_with("<!") {
            self.parse_declaration()
        } else if rest.starts_with("</") && starts_with_tag_name(&rest[2..]) {
            self.parse_close_tag()
        } else if rest.starts_with('<') && starts_with_tag_name(&rest[1..]) {
            self.parse_open_tag()
        } else {
            self.parse_text();
            Ok(())
        }
    }

    /// Text up to the next thing that opens markup. A `<` that does not open
    /// a tag, comment or declaration stays in the text.
    fn parse_text(&mut self) {
        let start = self.pos;
        let bytes = self.source.as_bytes();
        let mut cursor = start + 1;
        while cursor < bytes.len() {
            if bytes[cursor] == b'<' && opens_markup(&self.source[cursor..]) {
                break;
            }
            cursor += 1;
        }
        self.pos = cursor;

        let id = self.document.create_text(&self.source[start..cursor]);
        self.append(id);
    }

    fn parse_comment(&mut self) -> ParseResult<()> {
        let start = self.pos;
        let body_start = start + "<!--".len();
        let Some(offset) = self.source[body_start..].find("-->") else {
            return Err(ParseError::unterminated_comment(start));
        };
        let body = &self.source[body_start..body_start + offset];
        self.pos = body_start + offset + "-->".len();

        let id = self.document.create(NodeKind::Comment(body.to_string()));
        self.append(id);
        Ok(())
    }

    /// `<!DOCTYPE html>` and any other `<!...>` declaration
    fn parse_declaration(&mut self) -> ParseResult<()> {
        let start = self.pos;
        let body_start = start + "<!".len();
        let Some(offset) = self.source[body_start..].find('>') else {
            return Err(ParseError::unterminated_tag(start, "!"));
        };
        let body = &self.source[body_start..body_start + offset];
        self.pos = body_start + offset + 1;

        let id = self.document.create(NodeKind::Doctype(body.to_string()));
        self.append(id);
        Ok(())
    }

    fn parse_close_tag(&mut self) -> ParseResult<()> {
        let start = self.pos;
        self.pos += "</".len();
        let name = self.read_tag_name();
        let Some(offset) = self.rest().find('>') else {
            return Err(ParseError::unterminated_tag(start, name));
        };
        self.pos += offset + 1;

        // Close everything above the matching element; stray close tags are dropped
        if let Some(index) = self
            .stack
            .iter()
            .rposition(|&open| self.document.tag(open) == Some(name.as_str()))
        {
            self.stack.truncate(index);
        }
        Ok(())
    }

    fn parse_open_tag(&mut self) -> ParseResult<()> {
        let start = self.pos;
        self.pos += 1;
        let name = self.read_tag_name();
        let (attributes, self_closing) = self.parse_attributes(start, &name)?;

        if let Some(&open) = self.stack.last() {
            if self
                .document
                .tag(open)
                .map(|open_tag| closes_implicitly(&name, open_tag))
                .unwrap_or(false)
            {
                self.stack.pop();
            }
        }

        let id = self.document.create(NodeKind::Element(Element {
            tag: name.clone(),
            attributes,
        }));
        self.append(id);

        if is_void_element(&name) || self_closing {
            return Ok(());
        }
        if is_raw_text_element(&name) {
            self.parse_raw_text(id, &name);
            return Ok(());
        }
        self.stack.push(id);
        Ok(())
    }

    /// Attributes up to and including the closing `>` or `/>`
    fn parse_attributes(&mut self, tag_start: usize, tag: &str) -> ParseResult<(Attributes, bool)> {
        let interior_start = self.pos;
        let tokens = tokenize_tag(self.rest());
        let mut attributes = Attributes::new();
        let mut pending: Option<String> = None;
        let mut self_closing = false;
        let mut closed_at = None;

        let mut iter = tokens.into_iter().peekable();
        while let Some((token, span)) = iter.next() {
            let token = token.map_err(|_| ParseError::lexer_error(interior_start + span.start))?;
            match token {
                TagToken::End | TagToken::SelfClosingEnd => {
                    if let Some(name) = pending.take() {
                        push_attribute(&mut attributes, name, String::new());
                    }
                    self_closing |= token == TagToken::SelfClosingEnd;
                    closed_at = Some(interior_start + span.end);
                }
                TagToken::Word(word) => {
                    if let Some(name) = pending.take() {
                        push_attribute(&mut attributes, name, String::new());
                    }
                    if word == "/" {
                        continue;
                    }
                    let name = match word.strip_suffix('/') {
                        Some(stripped) => {
                            if matches!(iter.peek(), Some((Ok(TagToken::End), _))) {
                                self_closing = true;
                            }
                            stripped
                        }
                        None => word,
                    };
                    pending = Some(name.to_ascii_lowercase());
                }
                TagToken::Equals => {
                    let Some(name) = pending.take() else {
                        return Err(ParseError::malformed_tag(
                            interior_start + span.start,
                            "`=` without an attribute name",
                        ));
                    };
                    let value = match iter.peek() {
                        Some((Ok(TagToken::Quoted(value)), _))
                        | Some((Ok(TagToken::Word(value)), _)) => {
                            let value = value.to_string();
                            iter.next();
                            value
                        }
                        _ => String::new(),
                    };
                    push_attribute(&mut attributes, name, value);
                }
                TagToken::Quoted(_) => {
                    return Err(ParseError::malformed_tag(
                        interior_start + span.start,
                        "quoted value without an attribute name",
                    ));
                }
            }
        }

        match closed_at {
            Some(end) => {
                self.pos = end;
                Ok((attributes, self_closing))
            }
            None => Err(ParseError::unterminated_tag(tag_start, tag)),
        }
    }

    /// Content of script-like elements up to the matching close tag, verbatim
    fn parse_raw_text(&mut self, element: NodeId, tag: &str) {
        let needle = format!("</{}", tag);
        let lowered = self.rest().to_ascii_lowercase();
        let (content_end, resume) = match lowered.find(&needle) {
            Some(offset) => {
                let close_start = self.pos + offset;
                let resume = self.source[close_start..]
                    .find('>')
                    .map(|gt| close_start + gt + 1)
                    .unwrap_or(self.source.len());
                (close_start, resume)
            }
            None => (self.source.len(), self.source.len()),
        };

        let content = &self.source[self.pos..content_end];
        if !content.is_empty() {
            let text = self.document.create_text(content);
            self.document.append_child(element, text);
        }
        self.pos = resume;
    }

    fn read_tag_name(&mut self) -> String {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
            .unwrap_or(rest.len());
        self.pos += end;
        rest[..end].to_ascii_lowercase()
    }

    fn current_parent(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(self.document.root())
    }

    fn append(&mut self, id: NodeId) {
        let parent = self.current_parent();
        self.document.append_child(parent, id);
    }

    fn rest(&self) -> &'src str {
        &self.source[self.pos..]
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }
}

// First occurrence wins for repeated attribute names
fn push_attribute(attributes: &mut Attributes, name: String, value: String) {
    if !name.is_empty() && !attributes.contains(&name) {
        attributes.set(name, value);
    }
}

fn starts_with_tag_name(s: &str) -> bool {
    s.chars().next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false)
}

fn opens_markup(s: &str) -> bool {
    s.starts_with("<!")
        || (s.starts_with("</") && starts_with_tag_name(&s[2..]))
        || starts_with_tag_name(&s[1..])
}

/// Parse a complete document
pub fn parse(source: &str) -> ParseResult<Document> {
    Parser::new(source).parse_document()
}

/// Parse a markup fragment. The result's root is a document node whose
/// children are the fragment's top-level nodes.
pub fn parse_fragment(source: &str) -> ParseResult<Document> {
    Parser::new(source).parse_document()
}
