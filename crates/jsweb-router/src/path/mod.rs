/// Path utilities shared by the pattern compiler and the matcher
///
/// All functions are **pure**: given same input, always produce same output with no side effects.
use std::borrow::Cow;

/// Splits a path into its segments
///
/// Patterns and request paths go through this same function, so both sides
/// agree on what a segment is.
///
/// # Rules
///
/// - A single leading `/` is dropped
/// - `/` and the empty string have zero segments
/// - A trailing `/` produces a trailing empty segment (trailing slash is significant)
/// - `//` produces an empty segment in between
///
/// # Examples
///
/// ```
/// use jsweb_router::path::split_segments;
///
/// assert!(split_segments("/").is_empty());
/// assert_eq!(split_segments("/users/42"), vec!["users", "42"]);
/// assert_eq!(split_segments("/users/"), vec!["users", ""]);
/// ```
pub fn split_segments(path: &str) -> Vec<&str> {
    let rest = path.strip_prefix('/').unwrap_or(path);
    if rest.is_empty() {
        Vec::new()
    } else {
        rest.split('/').collect()
    }
}

/// Strips the query string and fragment from a request target
///
/// # Examples
///
/// ```
/// use jsweb_router::path::split_query;
///
/// assert_eq!(split_query("/search?q=rust"), ("/search", Some("q=rust")));
/// assert_eq!(split_query("/about#team"), ("/about", None));
/// ```
pub fn split_query(target: &str) -> (&str, Option<&str>) {
    let without_fragment = target.split_once('#').map_or(target, |(head, _)| head);
    match without_fragment.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (without_fragment, None),
    }
}

/// Percent-decodes a single path segment
///
/// Returns `Cow::Borrowed` when there is nothing to decode. `None` means the
/// escapes do not form valid UTF-8.
pub fn decode_segment(segment: &str) -> Option<Cow<'_, str>> {
    if !segment.contains('%') {
        return Some(Cow::Borrowed(segment));
    }
    urlencoding::decode(segment).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_root_and_empty() {
        assert!(split_segments("/").is_empty());
        assert!(split_segments("").is_empty());
    }

    #[test]
    fn test_split_trailing_slash_is_kept() {
        assert_eq!(split_segments("/about"), vec!["about"]);
        assert_eq!(split_segments("/about/"), vec!["about", ""]);
    }

    #[test]
    fn test_split_double_slash() {
        assert_eq!(split_segments("/a//b"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_split_without_leading_slash() {
        assert_eq!(split_segments("users/1"), vec!["users", "1"]);
    }

    #[test]
    fn test_split_query() {
        assert_eq!(split_query("/a/b"), ("/a/b", None));
        assert_eq!(split_query("/a?x=1&y=2"), ("/a", Some("x=1&y=2")));
        assert_eq!(split_query("/a?x=1#top"), ("/a", Some("x=1")));
    }

    #[test]
    fn test_decode_segment() {
        assert!(matches!(decode_segment("plain"), Some(Cow::Borrowed("plain"))));
        assert_eq!(decode_segment("hello%20world").as_deref(), Some("hello world"));
        assert_eq!(decode_segment("caf%C3%A9").as_deref(), Some("café"));
        assert_eq!(decode_segment("%FF"), None);
    }
}
