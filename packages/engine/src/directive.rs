//! Directive attribute names and the phases that resolve them.
//!
//! Every directive is recognised under its bare name and under the HTML5
//! `data-` spelling. Resolving a directive strips all of its spellings.

use merge_parser::{Document, NodeId};
use std::fmt;

pub const IF: &[&str] = &["merge-if", "data-merge-if"];
pub const IF_EQUALS: &[&str] = &["merge-if-equals", "data-merge-if-equals", "data-merge-equals"];
pub const INCLUDE: &[&str] = &["merge-include", "data-merge-include"];
pub const INCLUDE_TYPE: &[&str] = &["merge-include-type", "data-merge-include-type"];
pub const INCLUDE_MARKDOWN: &[&str] = &["merge-include-markdown", "data-merge-include-markdown"];
pub const REPEAT: &[&str] = &["merge-repeat", "data-merge-repeat"];
pub const CONTENT: &[&str] = &["merge-content", "data-merge-content"];
pub const STATE: &[&str] = &["merge-state", "data-merge-state"];

/// Script type marking blocks that must never reach the output
pub const MERGE_SCRIPT: &str = "merge-script";

/// Resolution stages, in the order a pass runs them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Conditional,
    Include,
    Repeat,
    Content,
    Cleanup,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Conditional,
        Phase::Include,
        Phase::Repeat,
        Phase::Content,
        Phase::Cleanup,
    ];

    /// Attributes whose presence selects a node for this phase
    pub fn selectors(self) -> Vec<&'static str> {
        match self {
            Phase::Conditional => IF.to_vec(),
            Phase::Include => INCLUDE.iter().chain(INCLUDE_MARKDOWN).copied().collect(),
            Phase::Repeat => REPEAT.to_vec(),
            Phase::Content => CONTENT.to_vec(),
            Phase::Cleanup => Vec::new(),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Conditional => "conditional",
            Phase::Include => "include",
            Phase::Repeat => "repeat",
            Phase::Content => "content",
            Phase::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// Value of the first spelling present on the node
pub fn value<'a>(doc: &'a Document, id: NodeId, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|name| doc.attribute(id, name))
}

pub fn strip(doc: &mut Document, id: NodeId, names: &[&str]) {
    for name in names {
        doc.remove_attribute(id, name);
    }
}

/// What an include-phase node asks for, read before any fetch starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeRequest {
    pub locator: String,
    pub markdown: bool,
    pub append: bool,
}

impl IncludeRequest {
    /// `merge-include-markdown` wins when a node carries both include forms
    pub fn read(doc: &Document, id: NodeId) -> Option<Self> {
        let append = value(doc, id, INCLUDE_TYPE)
            .map(|mode| mode.trim().eq_ignore_ascii_case("append"))
            .unwrap_or(false);
        if let Some(locator) = value(doc, id, INCLUDE_MARKDOWN) {
            return Some(Self {
                locator: locator.trim().to_string(),
                markdown: true,
                append,
            });
        }
        value(doc, id, INCLUDE).map(|locator| Self {
            locator: locator.trim().to_string(),
            markdown: false,
            append,
        })
    }
}

/// `<script data-type="merge-script">` or `<script type="merge-script">`
pub fn is_merge_script(doc: &Document, id: NodeId) -> bool {
    doc.tag(id) == Some("script")
        && ["data-type", "type"]
            .iter()
            .any(|name| doc.attribute(id, name).map(str::trim) == Some(MERGE_SCRIPT))
}

/// Context locator a document declares for itself with
/// `<script type="merge-script" data-merge-state="...">`
pub fn declared_state(doc: &Document) -> Option<String> {
    doc.find_by_tag("script")
        .into_iter()
        .filter(|&id| is_merge_script(doc, id))
        .find_map(|id| value(doc, id, STATE))
        .map(|locator| locator.trim().to_string())
        .filter(|locator| !locator.is_empty())
}
