//! State path parsing.
//!
//! Paths are `.`-delimited. A backslash escapes the character that follows
//! it, so `foo\.bar` is the single segment `foo.bar`. A backslash at the very
//! end of the input has nothing to escape and is kept as a literal.

/// Path segment delimiter.
pub const DELIMITER: char = '.';

/// Escape character for literal delimiters inside a key or id.
pub const ESCAPE: char = '\\';

/// Prefix marking an absolute state id reference.
pub const ID_PREFIX: char = '#';

/// Prefix marking an ancestor hop in a target specifier.
pub const ANCESTOR_PREFIX: char = '^';

/// Split a path into its segments, honouring escapes.
///
/// # Example
///
/// ```rust
/// use statechart::core::to_state_path;
///
/// assert_eq!(to_state_path("a.b"), vec!["a", "b"]);
/// assert_eq!(to_state_path(r"foo\.bar.baz"), vec!["foo.bar", "baz"]);
/// ```
pub fn to_state_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut segment = String::new();
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ESCAPE => match chars.next() {
                Some(escaped) => segment.push(escaped),
                None => segment.push(ESCAPE),
            },
            DELIMITER => segments.push(std::mem::take(&mut segment)),
            other => segment.push(other),
        }
    }
    segments.push(segment);
    segments
}

/// Escape literal delimiters in a key so it survives [`to_state_path`].
pub fn escape_key(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    for c in key.chars() {
        if c == DELIMITER || c == ESCAPE {
            escaped.push(ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Join already-escaped segments into a path.
pub fn join_path<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .collect::<Vec<_>>()
        .join(&DELIMITER.to_string())
}
