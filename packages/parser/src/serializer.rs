use crate::ast::*;
use crate::parser::{is_raw_text_element, is_void_element};

/// Output settings for [`serialize_with`]
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Indent block content and drop whitespace-only text
    pub pretty: bool,
    pub indent: String,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            indent: "  ".to_string(),
        }
    }
}

/// Serializer converts a [`Document`] back to markup.
///
/// Compact output writes text exactly as parsed, so parsing and serializing
/// an input reproduces it up to attribute quoting. Pretty output reflows
/// element structure and is meant for build artifacts.
pub struct Serializer {
    indent_level: usize,
    indent_string: String,
    pretty: bool,
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            indent_string: "  ".to_string(),
            pretty: false,
        }
    }

    pub fn with_options(options: &SerializeOptions) -> Self {
        Self {
            indent_level: 0,
            indent_string: options.indent.clone(),
            pretty: options.pretty,
        }
    }

    /// Serialize the children of `id`
    pub fn serialize_children(&mut self, doc: &Document, id: NodeId) -> String {
        let mut output = String::new();
        if self.pretty {
            self.write_block_children(doc, id, &mut output);
            while output.ends_with('\n') {
                output.pop();
            }
            output.push('\n');
        } else {
            for &child in doc.children(id) {
                self.write_compact(doc, child, &mut output);
            }
        }
        output
    }

    /// Serialize `id` itself, including its own tag
    pub fn serialize_node(&mut self, doc: &Document, id: NodeId) -> String {
        let mut output = String::new();
        if self.pretty {
            self.write_pretty(doc, id, &mut output);
        } else {
            self.write_compact(doc, id, &mut output);
        }
        output
    }

    fn write_compact(&self, doc: &Document, id: NodeId, output: &mut String) {
        match doc.kind(id) {
            NodeKind::Document => {
                for &child in doc.children(id) {
                    self.write_compact(doc, child, output);
                }
            }
            NodeKind::Element(element) => {
                write_open_tag(element, output);
                if is_void_element(&element.tag) {
                    return;
                }
                for &child in doc.children(id) {
                    self.write_compact(doc, child, output);
                }
                write_close_tag(element, output);
            }
            NodeKind::Text(text) => output.push_str(text),
            NodeKind::Comment(body) => {
                output.push_str("<!--");
                output.push_str(body);
                output.push_str("-->");
            }
            NodeKind::Doctype(body) => {
                output.push_str("<!");
                output.push_str(body);
                output.push('>');
            }
        }
    }

    fn write_pretty(&mut self, doc: &Document, id: NodeId, output: &mut String) {
        match doc.kind(id) {
            NodeKind::Document => self.write_block_children(doc, id, output),
            NodeKind::Element(element) => {
                self.write_indent(output);
                write_open_tag(element, output);
                if is_void_element(&element.tag) {
                    output.push('\n');
                    return;
                }

                let verbatim = is_raw_text_element(&element.tag) || element.tag == "pre";
                let inline = doc
                    .children(id)
                    .iter()
                    .all(|&child| matches!(doc.kind(child), NodeKind::Text(_)));

                if verbatim || inline {
                    for &child in doc.children(id) {
                        self.write_compact(doc, child, output);
                    }
                } else {
                    output.push('\n');
                    self.indent_level += 1;
                    self.write_block_children(doc, id, output);
                    self.indent_level -= 1;
                    self.write_indent(output);
                }
                write_close_tag(element, output);
                output.push('\n');
            }
            NodeKind::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    self.write_indent(output);
                    output.push_str(trimmed);
                    output.push('\n');
                }
            }
            NodeKind::Comment(_) | NodeKind::Doctype(_) => {
                self.write_indent(output);
                self.write_compact(doc, id, output);
                output.push('\n');
            }
        }
    }

    fn write_block_children(&mut self, doc: &Document, id: NodeId, output: &mut String) {
        for &child in doc.children(id) {
            self.write_pretty(doc, child, output);
        }
    }

    fn write_indent(&self, output: &mut String) {
        for _ in 0..self.indent_level {
            output.push_str(&self.indent_string);
        }
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

fn write_open_tag(element: &Element, output: &mut String) {
    output.push('<');
    output.push_str(&element.tag);
    for attr in element.attributes.iter() {
        output.push(' ');
        output.push_str(&attr.name);
        if !attr.value.is_empty() {
            output.push_str("=\"");
            output.push_str(&attr.value.replace('"', "&quot;"));
            output.push('"');
        }
    }
    output.push('>');
}

fn write_close_tag(element: &Element, output: &mut String) {
    output.push_str("</");
    output.push_str(&element.tag);
    output.push('>');
}

/// Serialize a whole document compactly
pub fn serialize(doc: &Document) -> String {
    Serializer::new().serialize_children(doc, doc.root())
}

pub fn serialize_with(doc: &Document, options: &SerializeOptions) -> String {
    Serializer::with_options(options).serialize_children(doc, doc.root())
}

/// Markup of the children of `id`
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    Serializer::new().serialize_children(doc, id)
}

/// Markup of `id` including its own tag
pub fn outer_html(doc: &Document, id: NodeId) -> String {
    Serializer::new().serialize_node(doc, id)
}
