//! Locates the first complete top-level JSON object in accumulated bytes.
//!
//! The scan is a two-state automaton (normal / in-string) with an escape
//! flag. It never allocates and never recurses, so it is safe to run on every
//! write against arbitrarily large buffers. Only ASCII delimiters matter, and
//! UTF-8 continuation bytes never collide with them, so scanning raw bytes is
//! equivalent to scanning decoded text.

use super::types::JsonSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InString { escaped: bool },
}

/// Returns the span of the first balanced `{ ... }` object, starting at the
/// leftmost `{`, or `None` when there is no `{` or the object is still open.
///
/// Bytes before the first `{` (typically HTTP headers) are skipped. Braces
/// inside quoted strings are not structural. A backslash escapes exactly the
/// next byte inside a string, so `\\"` closes the string.
pub fn find_json_span(buf: &[u8]) -> Option<JsonSpan> {
    let start = buf.iter().position(|&b| b == b'{')?;
    let mut depth: usize = 0;
    let mut state = ScanState::Normal;

    for (offset, &b) in buf[start..].iter().enumerate() {
        state = match state {
            ScanState::Normal => match b {
                b'{' => {
                    depth += 1;
                    ScanState::Normal
                }
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(JsonSpan {
                            start,
                            end: start + offset,
                        });
                    }
                    ScanState::Normal
                }
                b'"' => ScanState::InString { escaped: false },
                _ => ScanState::Normal,
            },
            ScanState::InString { escaped } => {
                if b == b'"' && !escaped {
                    ScanState::Normal
                } else {
                    ScanState::InString {
                        escaped: b == b'\\' && !escaped,
                    }
                }
            }
        };
    }

    None
}
