//! Entity Decoding
//!
//! Handles decoding of the entities a snapshot may carry:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! Uses Cow for zero-copy when no entities are present.

use memchr::memchr;
use std::borrow::Cow;

/// Decode text content, handling entity references
///
/// Returns Borrowed if no entities present (zero-copy),
/// returns Owned if entities were decoded. Unknown or malformed
/// references are kept verbatim.
#[inline]
pub fn decode_text(input: &str) -> Cow<'_, str> {
    // Fast path: check if there are any entities using SIMD
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_entities(input))
}

fn decode_entities(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp_pos) = memchr(b'&', rest.as_bytes()) {
        result.push_str(&rest[..amp_pos]);
        rest = &rest[amp_pos..];

        let decoded = memchr(b';', rest.as_bytes())
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));

        match decoded {
            Some((c, semi)) => {
                result.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                result.push('&');
                rest = &rest[1..];
            }
        }
    }
    result.push_str(rest);

    result
}

/// Decode a single entity (without & and ;)
fn decode_entity(entity: &str) -> Option<char> {
    if let Some(numeric) = entity.strip_prefix('#') {
        return decode_numeric_entity(numeric);
    }

    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

/// Decode a numeric character reference
fn decode_numeric_entity(entity: &str) -> Option<char> {
    let hex = entity.strip_prefix('x').or_else(|| entity.strip_prefix('X'));
    let codepoint = match hex {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => entity.parse::<u32>().ok()?,
    };
    char::from_u32(codepoint)
}

/// Decode the numeric code point carried by a single-character escape.
///
/// Any value that is not a valid Unicode scalar, including non-numeric
/// text, decodes to U+FFFD.
pub fn decode_code_point(value: &str) -> char {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_entities_is_borrowed() {
        assert!(matches!(decode_text("plain text"), Cow::Borrowed("plain text")));
    }

    #[test]
    fn test_builtin_entities() {
        assert_eq!(decode_text("a &lt;b&gt; &amp; &quot;c&quot; &apos;"), "a <b> & \"c\" '");
    }

    #[test]
    fn test_numeric_entities() {
        assert_eq!(decode_text("&#65;&#x42;&#X43;"), "ABC");
    }

    #[test]
    fn test_unknown_entity_kept() {
        assert_eq!(decode_text("&nbsp; & done"), "&nbsp; & done");
    }

    #[test]
    fn test_code_point() {
        assert_eq!(decode_code_point("233"), 'é');
        assert_eq!(decode_code_point("1114112"), '\u{FFFD}');
        assert_eq!(decode_code_point("55296"), '\u{FFFD}');
        assert_eq!(decode_code_point("abc"), '\u{FFFD}');
    }
}
