//! Field extraction for the proxy's flat JSON replies.
//! This is a permissive scanner, not a validating parser: a missing or
//! malformed field yields an empty string (or -1 for numbers).

/// Extract the value of `field` from a flat JSON object.
///
/// Only a quoted token followed by `:` counts as a key, so a string value that
/// happens to spell `field` is skipped. Quoted values are unescaped. Bare values
/// (numbers, booleans, null) run up to the next `,`, `}` or newline. Nested
/// objects and arrays are not supported and come back truncated.
pub fn extract_field(body: &str, field: &str) -> String {
    let Some(value) = value_after_key(body, field) else {
        return String::new();
    };
    let value = value.trim_start_matches(WHITESPACE);
    if value.is_empty() {
        return String::new();
    }

    if let Some(quoted) = value.strip_prefix('"') {
        return unescape(raw_string_contents(quoted));
    }

    let end = value.find([',', '}', '\n']).unwrap_or(value.len());
    value[..end].trim_end_matches([' ', '\t', '\r']).to_string()
}

const WHITESPACE: [char; 4] = [' ', '\t', '\n', '\r'];

/// Text following the `:` of the first key named `field`.
fn value_after_key<'a>(body: &'a str, field: &str) -> Option<&'a str> {
    let mut rest = body;
    while let Some(open) = rest.find('"') {
        let after_open = &rest[open + 1..];
        let token = raw_string_contents(after_open);
        // Empty when the string is unterminated.
        let after_token = after_open.get(token.len() + 1..).unwrap_or("");
        if let Some(value) = after_token.trim_start_matches(WHITESPACE).strip_prefix(':') {
            if unescape(token) == field {
                return Some(value);
            }
        }
        rest = after_token;
    }
    None
}

/// Extract `field` as a number. Returns -1 when absent or not numeric.
pub fn extract_number(body: &str, field: &str) -> f64 {
    let value = extract_field(body, field);
    if value.is_empty() {
        return -1.0;
    }
    value.trim().parse::<f64>().unwrap_or(-1.0)
}

/// Slice up to the closing quote, stepping over escaped characters.
/// An unterminated string runs to the end of input.
fn raw_string_contents(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => return &s[..i],
            b'\\' => i += 2,
            _ => i += 1,
        }
    }
    s
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => match read_hex4(&mut chars) {
                Some(unit) => out.push(decode_utf16_unit(unit, &mut chars)),
                None => out.push_str("\\u"),
            },
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

type Chars<'a> = std::iter::Peekable<std::str::Chars<'a>>;

/// Consume four hex digits. On failure nothing is consumed.
fn read_hex4(chars: &mut Chars<'_>) -> Option<u16> {
    let lookahead: String = chars.clone().take(4).collect();
    if lookahead.len() != 4 || !lookahead.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let unit = u16::from_str_radix(&lookahead, 16).ok()?;
    for _ in 0..4 {
        chars.next();
    }
    Some(unit)
}

/// Turn one UTF-16 code unit into a char, pulling a following `\uXXXX` low
/// surrogate when `unit` is a high surrogate.
fn decode_utf16_unit(unit: u16, chars: &mut Chars<'_>) -> char {
    if (0xD800..0xDC00).contains(&unit) {
        let mut probe = chars.clone();
        if probe.next() == Some('\\') && probe.next() == Some('u') {
            if let Some(low) = read_hex4(&mut probe) {
                if (0xDC00..0xE000).contains(&low) {
                    *chars = probe;
                    let combined =
                        0x10000 + (((unit as u32) - 0xD800) << 10) + ((low as u32) - 0xDC00);
                    return char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER);
                }
            }
        }
        return char::REPLACEMENT_CHARACTER;
    }
    char::from_u32(unit as u32).unwrap_or(char::REPLACEMENT_CHARACTER)
}
