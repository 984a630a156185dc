//! Blanking of comments and literal contents ahead of brace matching.
//!
//! Removed text is overwritten with spaces (newlines are kept) instead of
//! being deleted, so offsets into the cleaned text are offsets into the
//! original file as well.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

// One alternation so that whichever construct starts first wins: `//` inside
// a string is not a comment and `"` inside a comment is not a string.
static NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s:/\*.*?\*/)|(?://[^\n]*\n)|(?:"(?:[^"\\\n]|\\.)*")|(?:'(?:[^'\\\n]|\\.)*')"#,
    )
    .unwrap_or_else(|e| panic!("regex: {e}"))
});

/// Blank out block comments, line comments and the contents of string and
/// character literals.
///
/// A line comment on the last line of a file is only removed when a line
/// terminator follows it.
pub fn strip_noise(source: &str) -> String {
    NOISE
        .replace_all(source, |caps: &Captures<'_>| {
            let matched = &caps[0];
            if matched.starts_with('"') || matched.starts_with('\'') {
                let quote = &matched[..1];
                let inner = &matched[1..matched.len() - 1];
                format!("{quote}{}{quote}", blank(inner))
            } else {
                blank(matched)
            }
        })
        .into_owned()
}

fn blank(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '\n' {
            out.push('\n');
        } else {
            out.extend(std::iter::repeat_n(' ', c.len_utf8()));
        }
    }
    out
}
