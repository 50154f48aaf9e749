//! RFC 4514 attribute value escaping.

use super::DnError;

const SPECIAL: &[char] = &[',', '+', '"', '\\', '<', '>', ';'];

/// Escape a raw attribute value for use inside a DN string.
///
/// Special characters are backslash-escaped anywhere in the value, as are a
/// leading space or `#` and a trailing space. NUL becomes `\00`.
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 4);
    let last = value.chars().count().saturating_sub(1);

    for (index, c) in value.chars().enumerate() {
        match c {
            '\0' => escaped.push_str("\\00"),
            c if SPECIAL.contains(&c) => {
                escaped.push('\\');
                escaped.push(c);
            }
            ' ' | '#' if index == 0 => {
                escaped.push('\\');
                escaped.push(c);
            }
            ' ' if index == last => escaped.push_str("\\ "),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Reverse [`escape_value`], accepting both `\c` and `\hh` forms.
///
/// Unescaped leading and trailing spaces are insignificant and dropped.
pub fn unescape_value(value: &str) -> Result<String, DnError> {
    let bytes = value.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    // Length of `out` up to the last byte that must be kept at the end.
    let mut significant_end = 0;
    let mut leading = true;
    let mut index = 0;

    while index < bytes.len() {
        let byte = bytes[index];
        if byte == b'\\' {
            let next = *bytes
                .get(index + 1)
                .ok_or_else(|| DnError::new(value, "dangling escape at end of value"))?;
            if next.is_ascii_hexdigit() {
                let pair = bytes
                    .get(index + 1..index + 3)
                    .filter(|pair| pair.iter().all(u8::is_ascii_hexdigit))
                    .ok_or_else(|| DnError::new(value, "incomplete hex escape"))?;
                let hex = std::str::from_utf8(pair)
                    .map_err(|_| DnError::new(value, "incomplete hex escape"))?;
                let decoded = u8::from_str_radix(hex, 16)
                    .map_err(|_| DnError::new(value, "invalid hex escape"))?;
                out.push(decoded);
                index += 3;
            } else {
                out.push(next);
                index += 2;
            }
            significant_end = out.len();
            leading = false;
            continue;
        }

        if byte == b' ' && leading {
            index += 1;
            continue;
        }
        leading = false;
        out.push(byte);
        if byte != b' ' {
            significant_end = out.len();
        }
        index += 1;
    }

    out.truncate(significant_end);
    String::from_utf8(out).map_err(|_| DnError::new(value, "escaped bytes are not valid UTF-8"))
}
