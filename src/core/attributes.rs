//! Attribute Parsing
//!
//! Parses the attribute list of a snapshot tag.

use super::entities::decode_text;
use super::scanner::{is_name_char, is_name_start_char, is_whitespace};
use std::borrow::Cow;

/// A parsed attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Attribute name, including any `prefix:` part
    pub name: &'a str,
    /// Attribute value (entities decoded)
    pub value: Cow<'a, str>,
}

impl<'a> Attribute<'a> {
    /// Create a new attribute
    pub fn new(name: &'a str, value: impl Into<Cow<'a, str>>) -> Self {
        Attribute {
            name,
            value: value.into(),
        }
    }
}

/// Look up an attribute value by name
pub fn find_attribute<'b>(attrs: &'b [Attribute<'_>], name: &str) -> Option<&'b str> {
    attrs.iter().find(|a| a.name == name).map(|a| a.value.as_ref())
}

/// Parse attributes from raw tag content (after the element name)
///
/// Input should be the content between element name and '>' or '/>'.
/// Values must be quoted; the first violation is reported as an error
/// message.
pub fn parse_attributes(input: &str) -> Result<Vec<Attribute<'_>>, &'static str> {
    let bytes = input.as_bytes();
    let mut attrs = Vec::new();
    let mut pos = 0;

    loop {
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }

        if !is_name_start_char(bytes[pos]) {
            return Err("attribute name must start with a letter, underscore, or colon");
        }
        let name_start = pos;
        while pos < bytes.len() && is_name_char(bytes[pos]) {
            pos += 1;
        }
        let name = &input[name_start..pos];

        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'=') {
            return Err("attribute value required");
        }
        pos += 1;
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }

        let quote = match bytes.get(pos) {
            Some(&q @ (b'"' | b'\'')) => q,
            _ => return Err("attribute value must be quoted"),
        };
        pos += 1;
        let value_start = pos;
        while pos < bytes.len() && bytes[pos] != quote {
            if bytes[pos] == b'<' {
                return Err("attribute value cannot contain '<'");
            }
            pos += 1;
        }
        if pos >= bytes.len() {
            return Err("attribute value has mismatched quotes");
        }

        attrs.push(Attribute::new(name, decode_text(&input[value_start..pos])));
        pos += 1; // Skip closing quote
    }

    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_attributes() {
        let attrs = parse_attributes(" role=\"link\" name='Home'").unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0], Attribute::new("role", "link"));
        assert_eq!(attrs[1], Attribute::new("name", "Home"));
    }

    #[test]
    fn test_prefixed_name() {
        let attrs = parse_attributes(" HTMLAttrib:class=\"nav main\"").unwrap();
        assert_eq!(find_attribute(&attrs, "HTMLAttrib:class"), Some("nav main"));
    }

    #[test]
    fn test_entity_in_value() {
        let attrs = parse_attributes(" name=\"&lt;b&gt; &amp; co\"").unwrap();
        assert_eq!(find_attribute(&attrs, "name"), Some("<b> & co"));
    }

    #[test]
    fn test_whitespace_handling() {
        let attrs = parse_attributes("  role  =  \"heading\"  ").unwrap();
        assert_eq!(attrs, vec![Attribute::new("role", "heading")]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_attributes("").unwrap().is_empty());
    }

    #[test]
    fn test_errors() {
        assert!(parse_attributes(" role=link").is_err());
        assert!(parse_attributes(" role").is_err());
        assert!(parse_attributes(" role=\"link").is_err());
        assert!(parse_attributes(" 9role=\"x\"").is_err());
    }
}
