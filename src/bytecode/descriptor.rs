//! Type descriptor decoding and class-name normalization.
//!
//! Every class name that ends up as a graph vertex or comparison key goes
//! through one of the two entry points here:
//!
//! - [`normalize_descriptor`] for field, local-variable and parameter types
//!   (`Lcom/acme/Foo;`, `[[Lcom/acme/Foo;`, `I`, ...)
//! - [`normalize_internal_name`] for class, superclass and instruction-owner
//!   names (`com/acme/Foo`, or an array descriptor for calls such as
//!   `[Lcom/acme/Foo;.clone()`)
//!
//! Both produce the same canonical form: the slash-separated internal name
//! with array markers and the object prefix/terminator removed and the
//! nested-class separator `$` replaced by `_`. Primitive and void types
//! normalize to the empty string.

use super::ClassFormatError;

const NESTED_SEPARATOR: char = '$';
const NESTED_REPLACEMENT: &str = "_";

/// Normalizes a field/local/parameter type descriptor to a class name.
///
/// Returns an empty string for primitive, void and malformed descriptors.
pub fn normalize_descriptor(descriptor: &str) -> String {
    let element = descriptor.trim_start_matches('[');
    match element.strip_prefix('L') {
        Some(object) => collapse_nested(object.strip_suffix(';').unwrap_or(object)),
        None => String::new(),
    }
}

/// Normalizes an internal class name (which may be an array descriptor).
pub fn normalize_internal_name(name: &str) -> String {
    if name.starts_with('[') {
        normalize_descriptor(name)
    } else {
        collapse_nested(name)
    }
}

fn collapse_nested(name: &str) -> String {
    name.replace(NESTED_SEPARATOR, NESTED_REPLACEMENT)
}

/// Splits a method descriptor into one raw type descriptor per parameter.
///
/// `(ILjava/lang/String;[[J)V` yields `["I", "Ljava/lang/String;", "[[J"]`.
pub fn parameter_types(method_descriptor: &str) -> Result<Vec<String>, ClassFormatError> {
    let malformed = || ClassFormatError::InvalidDescriptor(method_descriptor.to_string());

    let params = method_descriptor
        .strip_prefix('(')
        .and_then(|rest| rest.split_once(')'))
        .map(|(params, _ret)| params)
        .ok_or_else(malformed)?;

    let bytes = params.as_bytes();
    let mut types = Vec::new();
    let mut start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'[' => {
                pos += 1;
                continue;
            }
            b'L' => {
                let end = params[pos..].find(';').ok_or_else(malformed)?;
                pos += end + 1;
            }
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => pos += 1,
            _ => return Err(malformed()),
        }
        types.push(params[start..pos].to_string());
        start = pos;
    }

    if start != pos {
        // dangling array marker
        return Err(malformed());
    }
    Ok(types)
}
