//! Snapshot Event Types
//!
//! Defines the element vocabulary of a snapshot and an owned event form
//! that can be replayed into a [`TreeBuilder`](super::builder::TreeBuilder)
//! without going through markup.

use crate::core::unified_scanner::ScanHandler;
use crate::core::Attribute;
use crate::error::BuildResult;

/// Recognized snapshot elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// `control` - an accessible UI element
    Control,
    /// `text` - a formatting run holding character data
    Format,
    /// `unich` - a single escaped code point
    Escape,
}

impl TagKind {
    /// Look up an element name; unknown names yield None
    #[inline]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "control" => Some(TagKind::Control),
            "text" => Some(TagKind::Format),
            "unich" => Some(TagKind::Escape),
            _ => None,
        }
    }

    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            TagKind::Control => "control",
            TagKind::Format => "text",
            TagKind::Escape => "unich",
        }
    }
}

/// An owned snapshot event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotEvent {
    /// Element open with its attributes
    Open {
        name: String,
        attributes: Vec<(String, String)>,
    },
    /// Element close
    Close { name: String },
    /// Character data, already decoded
    Characters(String),
}

impl SnapshotEvent {
    pub fn open(name: &str, attributes: &[(&str, &str)]) -> Self {
        SnapshotEvent::Open {
            name: name.to_owned(),
            attributes: attributes
                .iter()
                .map(|&(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
        }
    }

    pub fn close(name: &str) -> Self {
        SnapshotEvent::Close {
            name: name.to_owned(),
        }
    }

    pub fn characters(text: &str) -> Self {
        SnapshotEvent::Characters(text.to_owned())
    }

    /// Dispatch this event to a handler; `position` is the event index
    pub fn dispatch<H: ScanHandler>(&self, position: usize, handler: &mut H) -> BuildResult<()> {
        match self {
            SnapshotEvent::Open { name, attributes } => {
                let attrs: Vec<Attribute<'_>> = attributes
                    .iter()
                    .map(|(k, v)| Attribute::new(k.as_str(), v.as_str()))
                    .collect();
                handler.start_element(position, name, &attrs, false)
            }
            SnapshotEvent::Close { name } => handler.end_element(position, name),
            SnapshotEvent::Characters(text) => handler.characters(position, text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_names() {
        assert_eq!(TagKind::from_name("control"), Some(TagKind::Control));
        assert_eq!(TagKind::from_name("text"), Some(TagKind::Format));
        assert_eq!(TagKind::from_name("unich"), Some(TagKind::Escape));
        assert_eq!(TagKind::from_name("div"), None);
        assert_eq!(TagKind::Format.name(), "text");
    }
}
