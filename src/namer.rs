//! # Naming utilities
//!
//! Fresh names for objects that must not collide with names already in use,
//! such as normalized bind parameter names.
//!

use std::collections::HashSet;

pub const PARAMETER: &str = "p";

/// Return `prefix` itself when free, else the first `prefix_i` not in `existing`
pub fn new_name_outside<S: Into<String>, T: Into<String>, H: IntoIterator<Item = T>>(
    prefix: S,
    existing: H,
) -> String {
    let prefix = prefix.into();
    let existing: HashSet<String> = existing.into_iter().map(|name| name.into()).collect();
    if !prefix.is_empty() && !existing.contains(&prefix) {
        return prefix;
    }
    (0u64..)
        .map(|i| {
            if prefix.is_empty() {
                format!("{}", i)
            } else {
                format!("{}_{}", prefix, i)
            }
        })
        .find(|name| !existing.contains(name))
        .unwrap_or(prefix)
}

/// Replace every character rejected by `is_valid` by `_`
/// and prefix the result when its first character is rejected by `is_valid_start`
pub fn sanitize<F: Fn(char) -> bool, G: Fn(char) -> bool>(
    name: &str,
    is_valid_start: F,
    is_valid: G,
) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| if is_valid(c) { c } else { '_' })
        .collect();
    match sanitized.chars().next() {
        Some(c) if is_valid_start(c) => sanitized,
        _ => {
            sanitized.insert_str(0, PARAMETER);
            sanitized
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outside_namer() {
        assert_eq!(new_name_outside("id", ["name", "other"]), "id");
        assert_eq!(new_name_outside("id", ["id", "id_0"]), "id_1");
        assert_eq!(new_name_outside("", ["0", "1", "other"]), "2");
    }

    #[test]
    fn test_sanitize() {
        let start = |c: char| c.is_ascii_alphabetic() || c == '_';
        let part = |c: char| c.is_ascii_alphanumeric() || c == '_';
        assert_eq!(sanitize("user-id", start, part), "user_id");
        assert_eq!(sanitize("1st", start, part), "p1st");
        assert_eq!(sanitize("", start, part), "p");
    }
}
