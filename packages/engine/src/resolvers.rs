//! Directive resolvers.
//!
//! Each resolver receives a detached copy of the matched node (see
//! [`Document::extract`]) and returns what should stand in its place. Only
//! [`apply`] touches the live tree. Markup generated here is stamped with the
//! current pass so the same pass never resolves it again.

use crate::directive::{self, CONTENT, IF, IF_EQUALS, INCLUDE, INCLUDE_MARKDOWN, INCLUDE_TYPE, REPEAT};
use crate::error::{MergeError, MergeResult};
use crate::interpolate::interpolate;
use crate::path;
use crate::value::{Mapping, Value};
use merge_parser::{outer_html, parse_fragment, Document, NodeId};
use tracing::debug;

/// Outcome of resolving one node
#[derive(Debug)]
pub enum Resolution {
    /// Splice this fragment in place of the node
    Replace(Document),
    /// Detach the node
    Remove,
}

/// What [`apply`] did to the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Replaced(NodeId),
    Removed,
    /// Removal of a parentless node is a no-op
    Unchanged,
}

/// Commit a resolution for `target`
pub fn apply(document: &mut Document, target: NodeId, resolution: Resolution) -> Applied {
    match resolution {
        Resolution::Replace(fragment) => Applied::Replaced(document.graft(target, &fragment)),
        Resolution::Remove => {
            if document.parent(target).is_none() {
                return Applied::Unchanged;
            }
            document.detach(target);
            Applied::Removed
        }
    }
}

/// Keep the node iff the path resolves to a truthy value, or to a value whose
/// string form equals the `merge-if-equals` literal. Unresolvable paths remove.
pub fn conditional(mut fragment: Document, context: &Value) -> Resolution {
    let root = fragment.root();
    let path = directive::value(&fragment, root, IF).unwrap_or_default();
    let expected = directive::value(&fragment, root, IF_EQUALS);

    let keep = match path::resolve(context, path) {
        Ok(value) => match expected {
            Some(literal) => value.to_string() == literal,
            None => value.is_truthy(),
        },
        Err(err) => {
            debug!(%err, "Conditional path unresolved, removing node");
            false
        }
    };

    if !keep {
        return Resolution::Remove;
    }
    directive::strip(&mut fragment, root, IF);
    directive::strip(&mut fragment, root, IF_EQUALS);
    Resolution::Replace(fragment)
}

/// Replace inner content with the resolved value. Unresolvable paths remove.
pub fn content(mut fragment: Document, context: &Value, stamp: u32) -> MergeResult<Resolution> {
    let root = fragment.root();
    let path = directive::value(&fragment, root, CONTENT).unwrap_or_default();

    let value = match path::resolve(context, path) {
        Ok(value) => value,
        Err(err) => {
            debug!(%err, "Content path unresolved, removing node");
            return Ok(Resolution::Remove);
        }
    };

    let parsed = parse_fragment(&value.to_string())?;
    fragment.replace_children(root, &parsed, stamp);
    directive::strip(&mut fragment, root, CONTENT);
    Ok(Resolution::Replace(fragment))
}

/// Instantiate the single template element once per sequence item.
///
/// Only element children count toward the template; text and comments stay
/// where they are and instances are appended after them. Items that are not
/// mappings interpolate with no bindings.
pub fn repeat(mut fragment: Document, context: &Value, stamp: u32) -> MergeResult<Resolution> {
    let root = fragment.root();
    let path = directive::value(&fragment, root, REPEAT)
        .unwrap_or_default()
        .to_string();

    let template = match fragment.child_elements(root).as_slice() {
        [only] => *only,
        elements => {
            return Err(MergeError::RepeaterShape {
                path,
                found: elements.len(),
            })
        }
    };

    let items = match path::resolve(context, &path)? {
        Value::Sequence(items) => items,
        other => {
            return Err(MergeError::NotIterable {
                path,
                found: other.type_name(),
            })
        }
    };

    let markup = outer_html(&fragment, template);
    let no_bindings = Mapping::new();
    for item in items {
        let bindings = item.as_mapping().unwrap_or(&no_bindings);
        let instance = interpolate(&markup, bindings)?;
        let parsed = parse_fragment(&instance)?;
        fragment.append_fragment(root, &parsed, stamp);
    }
    debug!(path = %path, count = items.len(), "Repeated template");

    fragment.detach(template);
    directive::strip(&mut fragment, root, REPEAT);
    Ok(Resolution::Replace(fragment))
}

/// Place fetched (and possibly rendered) markup as inner content, after the
/// existing content in append mode.
pub fn include(mut fragment: Document, markup: &str, append: bool, stamp: u32) -> MergeResult<Resolution> {
    let root = fragment.root();
    let parsed = parse_fragment(markup)?;
    if append {
        fragment.append_fragment(root, &parsed, stamp);
    } else {
        fragment.replace_children(root, &parsed, stamp);
    }
    directive::strip(&mut fragment, root, INCLUDE);
    directive::strip(&mut fragment, root, INCLUDE_MARKDOWN);
    directive::strip(&mut fragment, root, INCLUDE_TYPE);
    Ok(Resolution::Replace(fragment))
}

/// Reserved script blocks are always removed
pub fn cleanup() -> Resolution {
    Resolution::Remove
}
