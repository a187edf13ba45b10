use crate::error::{MergeError, MergeResult};
use crate::value::Mapping;

/// Replace every `${name}` marker in `template` with the string form of the
/// bound value. Whitespace inside the braces is ignored. A `$` that does not
/// open a marker is literal text.
pub fn interpolate(template: &str, bindings: &Mapping) -> MergeResult<String> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find('}') else {
            let offset = template.len() - rest.len() + start;
            return Err(MergeError::interpolation(format!(
                "unterminated marker at offset {}",
                offset
            )));
        };

        let name = after_open[..end].trim();
        match bindings.get(name) {
            Some(value) => output.push_str(&value.to_string()),
            None => {
                return Err(MergeError::interpolation(format!(
                    "'{}' is not bound",
                    name
                )))
            }
        }
        rest = &after_open[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}
