//! Identifier escaping helpers shared by all dialects.

/// Transliterates characters that would break a bracket-delimited
/// pseudo-expression such as `where[<name>]`.
///
/// The mapping is `:` -> `:1`, `]` -> `:2`, `[` -> `:3`, `"` -> `:4`. With
/// `reverse` set the sentinels are turned back into the original characters.
/// Both directions work in a single left-to-right pass, so the result does
/// not depend on substitution order.
#[must_use]
pub fn bracket_escape(value: &str, reverse: bool) -> String {
    let mut out = String::with_capacity(value.len());
    if reverse {
        let mut chars = value.chars().peekable();
        while let Some(c) = chars.next() {
            if c == ':' {
                let original = match chars.peek() {
                    Some('1') => Some(':'),
                    Some('2') => Some(']'),
                    Some('3') => Some('['),
                    Some('4') => Some('"'),
                    _ => None,
                };
                if let Some(original) = original {
                    chars.next();
                    out.push(original);
                    continue;
                }
            }
            out.push(c);
        }
    } else {
        for c in value.chars() {
            match c {
                ':' => out.push_str(":1"),
                ']' => out.push_str(":2"),
                '[' => out.push_str(":3"),
                '"' => out.push_str(":4"),
                _ => out.push(c),
            }
        }
    }
    out
}

/// Wraps `name` in `open`/`close`, doubling every `close` inside it.
#[must_use]
pub fn quote_with(name: &str, open: char, close: char) -> String {
    let mut doubled = String::with_capacity(close.len_utf8() * 2);
    doubled.push(close);
    doubled.push(close);
    format!("{open}{}{close}", name.replace(close, &doubled))
}

/// Strips a matching quote pair and collapses doubled closing quotes.
///
/// Recognized openers are `` ` ``, `"`, `'` and `[` (closed by `]`). Input
/// that is shorter than two characters, does not start with an opener, or
/// does not end with the matching closer is returned unchanged.
#[must_use]
pub fn unquote(quoted: &str) -> String {
    let mut chars = quoted.chars();
    let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
        return quoted.to_string();
    };
    let close = match first {
        '`' | '"' | '\'' => first,
        '[' => ']',
        _ => return quoted.to_string(),
    };
    if last != close {
        return quoted.to_string();
    }
    let inner = &quoted[first.len_utf8()..quoted.len() - last.len_utf8()];
    let mut doubled = String::with_capacity(2);
    doubled.push(close);
    doubled.push(close);
    inner.replace(&doubled, &close.to_string())
}
