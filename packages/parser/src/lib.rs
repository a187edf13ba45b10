pub mod ast;
pub mod error;
pub mod parser;
pub mod serializer;
pub mod tokenizer;

#[cfg(test)]
mod tests_serializer;

pub use ast::{Attribute, Attributes, Document, Element, NodeData, NodeId, NodeKind};
pub use error::{ParseError, ParseResult};
pub use parser::{is_raw_text_element, is_void_element, parse, parse_fragment, Parser};
pub use serializer::{inner_html, outer_html, serialize, serialize_with, SerializeOptions, Serializer};
pub use tokenizer::{tokenize_tag, TagToken};
