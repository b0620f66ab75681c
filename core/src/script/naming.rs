//! Identifier rewrites that keep generated scripts collision-free when the
//! same library geometry is instantiated under several parents.
//!
//! Matching uses a hand-rolled scanner rather than regular expressions: a
//! candidate occurrence is skipped when the following character would extend
//! the identifier, which is exactly what makes the rewrite idempotent. An
//! already-suffixed occurrence is always followed by `_<parent>` and never
//! matches again.

use crate::scene::Parameter;

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Suffix appended to symbols bound to a library instantiation.
pub fn library_suffix(parent_name: &str, lib_guid: &str) -> String {
    format!("_{}_{}", parent_name, lib_guid)
}

/// Rewrite whole-identifier occurrences of `target` to `replacement`.
///
/// The occurrence must not be followed by an identifier character. With
/// `left_boundary` the character before the occurrence must not be one
/// either, so a name never matches inside a longer one.
fn rewrite_occurrences(text: &str, target: &str, replacement: &str, left_boundary: bool) -> String {
    if target.is_empty() {
        return text.to_owned();
    }
    let mut out = String::with_capacity(text.len());
    let mut position = 0;
    while position < text.len() {
        let rest = &text[position..];
        if rest.starts_with(target) {
            let before_ok = !left_boundary
                || out.chars().next_back().map_or(true, |c| !is_ident_char(c));
            let after = &rest[target.len()..];
            let after_ok = !after.chars().next().map_or(false, is_ident_char);
            if before_ok && after_ok {
                out.push_str(replacement);
                position += target.len();
                continue;
            }
        }
        match rest.chars().next() {
            Some(c) => {
                out.push(c);
                position += c.len_utf8();
            }
            None => break,
        }
    }
    out
}

/// Append the library suffix to every whole-word occurrence of each
/// parameter id. Ids are processed longest first so one id never rewrites
/// inside another.
pub fn suffix_parameters(
    text: &str,
    parameters: &[Parameter],
    parent_name: &str,
    lib_guid: &str,
) -> String {
    let mut ids: Vec<&str> = parameters.iter().map(|p| p.id.as_str()).collect();
    ids.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut out = text.to_owned();
    for id in ids {
        let replacement = format!("{}{}", id, library_suffix(parent_name, lib_guid));
        out = rewrite_occurrences(&out, id, &replacement, false);
    }
    out
}

/// Append `_<parent_name>` to every whole-word occurrence of a sub-geometry
/// name. Both boundaries are checked so `shape` never matches inside
/// `shape2` or `my_shape`.
pub fn suffix_geometry_name(text: &str, geometry_name: &str, parent_name: &str) -> String {
    if geometry_name.is_empty() {
        return text.to_owned();
    }
    let replacement = format!("{}_{}", geometry_name, parent_name);
    rewrite_occurrences(text, geometry_name, &replacement, true)
}
