//! Path normalization shared by registration and lookup.
//!
//! Every path that enters the router, whether it is a route pattern, a group
//! prefix or an incoming request path, goes through [`normalize_path`] first,
//! so the trie only ever sees one canonical spelling of each path.

use std::borrow::Cow;

/// Reduce a user-supplied path to its canonical absolute form.
///
/// Rules, applied in order:
///
/// 1. surrounding whitespace is trimmed
/// 2. runs of `/` collapse into a single `/`
/// 3. the result starts with exactly one `/`
/// 4. a trailing `/` is stripped unless the path is the root
///
/// The empty string and all-separator strings normalize to `/`. The function is
/// total and idempotent; an input that is already canonical is returned borrowed.
///
/// # Example
///
/// ```
/// use sol::router::normalize_path;
///
/// assert_eq!(normalize_path("  /api//v1/  "), "/api/v1");
/// assert_eq!(normalize_path("home"), "/home");
/// assert_eq!(normalize_path("////"), "/");
/// ```
#[must_use]
pub fn normalize_path(raw: &str) -> Cow<'_, str> {
    if is_normalized(raw) {
        return Cow::Borrowed(raw);
    }

    let mut out = collapse(raw);
    // Stripping a trailing separator can expose whitespace (`"/a /"`), which
    // would make a second pass trim it. Repeat until stable.
    while !is_normalized(&out) {
        out = collapse(&out);
    }
    Cow::Owned(out)
}

fn collapse(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut out = String::with_capacity(trimmed.len() + 1);
    for segment in trimmed.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Join a (group) prefix and a route path into one normalized path.
///
/// `join_paths("/api", "/users/")` is `/api/users`; joining with the root path
/// yields the prefix itself.
#[must_use]
pub fn join_paths(prefix: &str, path: &str) -> String {
    let path = normalize_path(path);
    if path == "/" {
        return normalize_path(prefix).into_owned();
    }
    let mut joined = String::with_capacity(prefix.len() + path.len() + 1);
    joined.push_str(prefix);
    joined.push('/');
    joined.push_str(&path);
    normalize_path(&joined).into_owned()
}

/// Split a normalized, non-root path into its segments.
pub(crate) fn segments(path: &str) -> std::str::Split<'_, char> {
    path[1..].split('/')
}

fn is_normalized(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    path.starts_with('/')
        && !path.ends_with('/')
        && !path.contains("//")
        && path.trim() == path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_table() {
        let cases = [
            ("", "/"),
            ("/", "/"),
            ("home", "/home"),
            ("/home", "/home"),
            ("/home/", "/home"),
            ("  /home/about/  ", "/home/about"),
            ("/home//about///contact", "/home/about/contact"),
            ("home//about///contact///////", "/home/about/contact"),
            ("////", "/"),
            ("  /api//v1/  ", "/api/v1"),
            ("/users/123", "/users/123"),
            ("//home//////////////", "/home"),
            ("/////////////////", "/"),
            ("   ", "/"),
        ];
        for (input, expected) in cases {
            assert_eq!(normalize_path(input), expected, "normalize_path({input:?})");
        }
    }

    #[test]
    fn test_normalized_input_is_borrowed() {
        assert!(matches!(normalize_path("/users/:id"), Cow::Borrowed(_)));
        assert!(matches!(normalize_path("/"), Cow::Borrowed(_)));
        assert!(matches!(normalize_path("/users/"), Cow::Owned(_)));
    }

    #[test]
    fn test_normalize_properties() {
        let inputs = [
            "", "/", "a", "a/", "/a//b/", " //x// ", "x y/z", "/:id/", "\t/tab/\n", "///a///b///",
            "/ /", "..", "/./a",
        ];
        for input in inputs {
            let once = normalize_path(input).into_owned();
            assert!(!once.is_empty());
            assert!(once.starts_with('/'), "{once:?}");
            assert!(!once.contains("//"), "{once:?}");
            if once != "/" {
                assert!(!once.ends_with('/'), "{once:?}");
            }
            assert_eq!(normalize_path(&once), once, "idempotent for {input:?}");
        }
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/api", "/users"), "/api/users");
        assert_eq!(join_paths("/api", "users/"), "/api/users");
        assert_eq!(join_paths("/api", "/"), "/api");
        assert_eq!(join_paths("/api", ""), "/api");
        assert_eq!(join_paths("/", "/users"), "/users");
        assert_eq!(join_paths("/", "/"), "/");
        assert_eq!(join_paths("/api/", "//v1//"), "/api/v1");
    }
}
