//! Helpers for double-quoted fragments in signature descriptions.
//!
//! Matching is greedy and line-scoped: on each line, everything from the first
//! `"` to the last `"` is one quoted fragment. Printed strings lifted from a
//! target file may themselves contain quotes, so inner quotes are not treated
//! as delimiters. The flip side is that text between two separately quoted
//! fragments on one line is part of the fragment.

use memchr::{memchr, memrchr};

/// Returns `(open, close)` byte indices of the outermost quotes in `line`.
fn quote_span(line: &str) -> Option<(usize, usize)> {
    let bytes = line.as_bytes();
    let open = memchr(b'"', bytes)?;
    let close = memrchr(b'"', bytes)?;
    (close > open).then_some((open, close))
}

/// Removes every quoted fragment, including its quotes.
pub fn strip_quoted_strings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        match quote_span(line) {
            Some((open, close)) => {
                out.push_str(&line[..open]);
                out.push_str(&line[close + 1..]);
            }
            None => out.push_str(line),
        }
    }
    out
}

/// Returns the contents of the first quoted fragment, or an empty string.
pub fn get_quoted_strings(text: &str) -> &str {
    text.split('\n')
        .find_map(|line| quote_span(line).map(|(open, close)| &line[open + 1..close]))
        .unwrap_or("")
}
