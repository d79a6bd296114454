//! Markup Scanner with ScanHandler Trait
//!
//! Walks a snapshot once and dispatches element-open, element-close and
//! character-data events to a [`ScanHandler`]. The scanner only knows
//! markup syntax; what the elements mean is up to the handler.
//!
//! Comments, processing instructions, and DOCTYPE declarations are skipped.
//! CDATA sections are reported as character data.

use super::attributes::{parse_attributes, Attribute};
use super::entities::decode_text;
use super::scanner::{is_name_start_char, Scanner};
use crate::error::{BuildError, BuildResult};

/// Trait for handling scan events
///
/// Every callback receives the byte position of the construct in the input
/// so handlers can report errors against the snapshot. Returning an error
/// aborts the scan.
pub trait ScanHandler {
    /// Called when an element starts
    ///
    /// # Arguments
    /// * `position` - Byte offset of the `<`
    /// * `name` - Element name
    /// * `attrs` - Parsed attributes, values already entity-decoded
    /// * `is_empty` - True if this is a self-closing element (e.g., `<unich/>`)
    fn start_element(
        &mut self,
        position: usize,
        name: &str,
        attrs: &[Attribute<'_>],
        is_empty: bool,
    ) -> BuildResult<()>;

    /// Called when an element ends (also called right after
    /// `start_element` for self-closing elements)
    fn end_element(&mut self, position: usize, name: &str) -> BuildResult<()>;

    /// Called for character data, entity references already decoded
    fn characters(&mut self, position: usize, text: &str) -> BuildResult<()>;
}

/// Scanner that dispatches events to a ScanHandler
pub struct MarkupScanner<'a> {
    scanner: Scanner<'a>,
}

impl<'a> MarkupScanner<'a> {
    /// Create a new scanner for the input
    pub fn new(input: &'a str) -> Self {
        Self {
            scanner: Scanner::new(input),
        }
    }

    /// Scan the entire document, calling handler methods for each construct
    pub fn scan<H: ScanHandler>(&mut self, handler: &mut H) -> BuildResult<()> {
        while !self.scanner.is_eof() {
            match self.scanner.peek() {
                Some(b'<') => self.scan_markup(handler)?,
                Some(_) => self.scan_text(handler)?,
                None => break,
            }
        }
        Ok(())
    }

    /// Scan markup starting with '<'
    fn scan_markup<H: ScanHandler>(&mut self, handler: &mut H) -> BuildResult<()> {
        let start = self.scanner.position();

        match self.scanner.peek_at(1) {
            Some(b'/') => self.scan_end_tag(handler),
            Some(b'!') => {
                if self.scanner.starts_with(b"<!--") {
                    self.skip_past(start, b"-->", "unterminated comment")
                } else if self.scanner.starts_with(b"<![CDATA[") {
                    self.scan_cdata(handler)
                } else {
                    self.skip_tag(start, "unterminated declaration")
                }
            }
            Some(b'?') => self.skip_past(start, b"?>", "unterminated processing instruction"),
            Some(c) if is_name_start_char(c) => self.scan_start_tag(handler),
            _ => Err(BuildError::syntax(start, "'<' not followed by a tag name")),
        }
    }

    /// Scan a start tag
    fn scan_start_tag<H: ScanHandler>(&mut self, handler: &mut H) -> BuildResult<()> {
        let start = self.scanner.position();
        self.scanner.advance(1); // Skip '<'

        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| BuildError::syntax(start, "missing element name"))?;
        let attr_start = self.scanner.position();

        let end = self
            .scanner
            .find_tag_end_quoted()
            .ok_or_else(|| BuildError::syntax(start, "unterminated start tag"))?;

        let is_empty = end > attr_start && self.scanner.byte_at(end - 1) == Some(b'/');
        let attr_end = if is_empty { end - 1 } else { end };
        let attrs = parse_attributes(self.scanner.slice(attr_start, attr_end))
            .map_err(|message| BuildError::syntax(attr_start, message))?;

        self.scanner.set_position(end + 1);

        handler.start_element(start, name, &attrs, is_empty)?;
        if is_empty {
            handler.end_element(start, name)?;
        }
        Ok(())
    }

    /// Scan an end tag
    fn scan_end_tag<H: ScanHandler>(&mut self, handler: &mut H) -> BuildResult<()> {
        let start = self.scanner.position();
        self.scanner.advance(2); // Skip '</'

        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| BuildError::syntax(start, "missing end tag name"))?;
        self.scanner.skip_whitespace();

        if self.scanner.peek() != Some(b'>') {
            return Err(BuildError::syntax(start, "unterminated end tag"));
        }
        self.scanner.advance(1);

        handler.end_element(start, name)
    }

    /// Scan text content up to the next '<'
    fn scan_text<H: ScanHandler>(&mut self, handler: &mut H) -> BuildResult<()> {
        let start = self.scanner.position();
        let end = self.scanner.find_tag_start().unwrap_or(self.scanner.len());

        let raw = self.scanner.slice(start, end);
        self.scanner.set_position(end);
        handler.characters(start, &decode_text(raw))
    }

    /// Scan a CDATA section, reporting its content verbatim
    fn scan_cdata<H: ScanHandler>(&mut self, handler: &mut H) -> BuildResult<()> {
        let start = self.scanner.position();
        self.scanner.advance(9); // Skip '<![CDATA['
        let content_start = self.scanner.position();

        let content_end = self
            .scanner
            .find_sequence(b"]]>")
            .ok_or_else(|| BuildError::syntax(start, "unterminated CDATA section"))?;

        let content = self.scanner.slice(content_start, content_end);
        self.scanner.set_position(content_end + 3);
        if content.is_empty() {
            return Ok(());
        }
        handler.characters(start, content)
    }

    /// Skip a construct ending with `terminator`
    fn skip_past(&mut self, start: usize, terminator: &[u8], message: &'static str) -> BuildResult<()> {
        let end = self
            .scanner
            .find_sequence(terminator)
            .ok_or_else(|| BuildError::syntax(start, message))?;
        self.scanner.set_position(end + terminator.len());
        Ok(())
    }

    /// Skip a declaration such as `<!DOCTYPE ...>`
    fn skip_tag(&mut self, start: usize, message: &'static str) -> BuildResult<()> {
        let end = self
            .scanner
            .find_tag_end_quoted()
            .ok_or_else(|| BuildError::syntax(start, message))?;
        self.scanner.set_position(end + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ScanHandler for Recorder {
        fn start_element(
            &mut self,
            _position: usize,
            name: &str,
            attrs: &[Attribute<'_>],
            is_empty: bool,
        ) -> BuildResult<()> {
            let attrs: Vec<String> = attrs.iter().map(|a| format!("{}={}", a.name, a.value)).collect();
            self.events.push(format!("open {name} [{}] empty={is_empty}", attrs.join(",")));
            Ok(())
        }

        fn end_element(&mut self, _position: usize, name: &str) -> BuildResult<()> {
            self.events.push(format!("close {name}"));
            Ok(())
        }

        fn characters(&mut self, _position: usize, text: &str) -> BuildResult<()> {
            self.events.push(format!("text {text}"));
            Ok(())
        }
    }

    fn scan(input: &str) -> BuildResult<Vec<String>> {
        let mut recorder = Recorder::default();
        MarkupScanner::new(input).scan(&mut recorder)?;
        Ok(recorder.events)
    }

    #[test]
    fn test_nested_elements() {
        let events = scan("<control role=\"link\"><text>Go &amp; see</text></control>").unwrap();
        assert_eq!(
            events,
            vec![
                "open control [role=link] empty=false",
                "open text [] empty=false",
                "text Go & see",
                "close text",
                "close control",
            ]
        );
    }

    #[test]
    fn test_self_closing_element() {
        let events = scan("<unich value=\"65\"/>").unwrap();
        assert_eq!(events, vec!["open unich [value=65] empty=true", "close unich"]);
    }

    #[test]
    fn test_skips_comments_and_declarations() {
        let events = scan("<?xml version=\"1.0\"?><!-- note --><control></control>").unwrap();
        assert_eq!(events, vec!["open control [] empty=false", "close control"]);
    }

    #[test]
    fn test_cdata_is_character_data() {
        let events = scan("<text><![CDATA[a < b]]></text>").unwrap();
        assert_eq!(events[1], "text a < b");
    }

    #[test]
    fn test_unterminated_tag_is_error() {
        let err = scan("<control role=\"x\"").unwrap_err();
        assert!(matches!(err, BuildError::Syntax { position: 0, .. }));
    }

    #[test]
    fn test_bare_less_than_is_error() {
        assert!(scan("<text>a <= b</text>").is_err());
    }
}
