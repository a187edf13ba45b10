use crate::error::{MergeError, MergeResult};
use crate::value::Value;

/// Walk a dot-separated property path through the context.
///
/// Mappings are indexed by key and sequences by numeric segment. Any missing
/// or untraversable step is a `PathResolution` error, including the last one.
pub fn resolve<'a>(context: &'a Value, path: &str) -> MergeResult<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return Err(MergeError::path(path, "empty path"));
    }

    let mut current = context;
    for segment in path.split('.') {
        if segment.is_empty() {
            return Err(MergeError::path(path, "empty path segment"));
        }
        current = match current {
            Value::Mapping(mapping) => mapping
                .get(segment)
                .ok_or_else(|| MergeError::path(path, format!("no property '{}'", segment)))?,
            Value::Sequence(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index))
                .ok_or_else(|| MergeError::path(path, format!("no item '{}'", segment)))?,
            other => {
                return Err(MergeError::path(
                    path,
                    format!("cannot read '{}' of {}", segment, other.type_name()),
                ))
            }
        };
    }
    Ok(current)
}
