//! String literal escaping for the target script.

/// Escape text for embedding inside a single-quoted literal.
///
/// Rules, in application order: `\` -> `\\`, NUL -> `\0`, tab -> `\t`,
/// backspace -> `\b`, LF -> `\n`, CR -> `\r`, 0x1A -> `\Z`, `'` -> `''`.
/// A single pass over the characters yields the same text as applying the
/// replacements one after another with the backslash rule first, since no
/// replacement introduces a character handled by a later rule.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + raw.len() / 8);
    escape_into(raw, &mut out);
    out
}

/// Append the escaped form of `raw` to `out`.
pub fn escape_into(raw: &str, out: &mut String) {
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            '\'' => out.push_str("''"),
            _ => out.push(c),
        }
    }
}

/// Append `raw` as a complete quoted literal: `'<escaped>'`.
pub fn push_quoted(raw: &str, out: &mut String) {
    out.push('\'');
    escape_into(raw, out);
    out.push('\'');
}
