//! Name Resolution
//!
//! Turns arbitrary field labels into identifiers the canonical schema accepts
//! and settles collisions between them:
//! - `sanitize` maps any label onto `[A-Za-z_][A-Za-z0-9_]*`
//! - `resolve` appends `_1`, `_2`, ... until the candidate is free
//!
//! Both are pure. Collision suffixes always restart from 1 and skip names that
//! are already taken, so two identical insertion sequences produce identical
//! names.

use std::sync::LazyLock;

use regex::Regex;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex must compile"));

/// Check whether `name` is already a valid identifier (and so a fixed point of `sanitize`)
pub fn is_valid(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Sanitize a raw label into an identifier.
///
/// The first character is kept when it is an ASCII letter or `_`. Otherwise it
/// is dropped if a non-digit follows it (`"$oid"` becomes `"oid"`), or replaced
/// by `_` (`"70歳以上"` becomes `"_0___"`). Every other character outside
/// `[A-Za-z0-9_]` becomes `_`. The empty label becomes `"_"`.
pub fn sanitize(raw: &str) -> String {
    let mut chars = raw.chars();
    let Some(first) = chars.next() else {
        return "_".to_string();
    };
    if is_valid(raw) {
        return raw.to_string();
    }

    let mut sanitized = String::with_capacity(raw.len());
    let second = raw.chars().nth(1);
    if first.is_ascii_alphabetic() || first == '_' {
        sanitized.push(first);
    } else if !second.is_some_and(|c| !c.is_ascii_digit()) {
        sanitized.push('_');
    }

    for c in chars {
        if c.is_ascii_alphanumeric() || c == '_' {
            sanitized.push(c);
        } else {
            sanitized.push('_');
        }
    }
    sanitized
}

/// The `index`-th collision candidate for `base` (`base` itself for 0)
pub fn suffixed(base: &str, index: usize) -> String {
    if index == 0 {
        base.to_string()
    } else {
        format!("{}_{}", base, index)
    }
}

/// Resolve `candidate` against the names already in use.
///
/// Returns `candidate` when it is free, otherwise the first free
/// `candidate_N` for N = 1, 2, ...
pub fn resolve(candidate: &str, mut is_taken: impl FnMut(&str) -> bool) -> String {
    let mut index = 0;
    loop {
        let name = suffixed(candidate, index);
        if !is_taken(&name) {
            return name;
        }
        index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sanitize_keeps_identifiers() {
        assert_eq!(sanitize("field"), "field");
        assert_eq!(sanitize("_private"), "_private");
        assert_eq!(sanitize("Name_1"), "Name_1");
    }

    #[test]
    fn test_sanitize_first_character() {
        assert_eq!(sanitize("$oid"), "oid");
        assert_eq!(sanitize("1a"), "a");
        assert_eq!(sanitize("12"), "_2");
        assert_eq!(sanitize("9"), "_");
        assert_eq!(sanitize(""), "_");
    }

    #[test]
    fn test_sanitize_non_ascii() {
        assert_eq!(sanitize("70歳以上"), "_0___");
        assert_eq!(sanitize("60歳以上"), "_0___");
        assert_eq!(sanitize("first name"), "first_name");
        assert_eq!(sanitize("prix-€"), "prix__");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for raw in ["70歳以上", "$oid", "a b c", "é", "x.y.z", ""] {
            let once = sanitize(raw);
            assert!(is_valid(&once), "{:?} sanitized to invalid {:?}", raw, once);
            assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn test_resolve_free_name() {
        let taken: HashSet<&str> = ["a", "b"].into_iter().collect();
        assert_eq!(resolve("c", |n| taken.contains(n)), "c");
    }

    #[test]
    fn test_resolve_skips_occupied_suffixes() {
        let taken: HashSet<&str> = ["x", "x_1", "x_3"].into_iter().collect();
        assert_eq!(resolve("x", |n| taken.contains(n)), "x_2");
    }

    #[test]
    fn test_suffixed() {
        assert_eq!(suffixed("x", 0), "x");
        assert_eq!(suffixed("x", 4), "x_4");
    }
}
