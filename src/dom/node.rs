//! Node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references. Parent and
//! previous-text links are plain ids into the owning tree's arena, so they
//! can never keep a discarded subtree alive.

use super::attributes::Attributes;

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Type of node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Accessible UI element
    Control,
    /// Text-formatting run grouping character data
    Format,
    /// Literal character data
    Text,
}

/// Normalized fields of a control element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlField {
    pub attributes: Attributes,
    pub role: String,
    pub name: String,
    pub tag: String,
    pub id: String,
    pub class_name: String,
    pub src: String,
    pub control_identifier: i64,
}

impl ControlField {
    /// Normalize the raw attribute mapping of a `control` element.
    ///
    /// Each logical field takes the first non-empty value among its source
    /// keys and defaults to an empty string.
    pub fn from_attributes(attributes: Attributes) -> Self {
        let role = attributes.first_non_empty(&["role"]).to_owned();
        let name = attributes.first_non_empty(&["name"]).to_owned();
        let tag = attributes.first_non_empty(&["role-tag", "nodeName"]).to_owned();
        let id = attributes
            .first_non_empty(&["attribute_id", "HTMLAttrib:id"])
            .to_owned();
        let class_name = attributes
            .first_non_empty(&[
                "attribute_class",
                "HTMLAttrib:class",
                "HTMLAttrib:className",
            ])
            .to_owned();
        let src = attributes
            .first_non_empty(&["attribute_src", "HTMLAttrib:src"])
            .to_owned();
        let control_identifier = attributes
            .first_non_empty(&["controlIdentifier_ID", "controlIdentifier"])
            .trim()
            .parse()
            .unwrap_or(0);

        ControlField {
            attributes,
            role,
            name,
            tag,
            id,
            class_name,
            src,
            control_identifier,
        }
    }
}

/// Variant payload of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Control(ControlField),
    Format(Attributes),
    Text(String),
}

impl NodeData {
    #[inline]
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Control(_) => NodeKind::Control,
            NodeData::Format(_) => NodeKind::Format,
            NodeData::Text(_) => NodeKind::Text,
        }
    }
}

/// A node in the arena
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) data: NodeData,
    /// Parent node (None for the root)
    pub(crate) parent: Option<NodeId>,
    /// Text leaf immediately preceding this node in document order
    pub(crate) previous_text: Option<NodeId>,
    /// Owned children, in document order
    pub(crate) children: Vec<NodeId>,
    /// Absolute character offset of the node's first character
    pub(crate) offset: usize,
    /// Characters covered by the node and its subtree
    pub(crate) size: usize,
}

impl Node {
    /// Create a new control node
    pub fn control(
        field: ControlField,
        parent: Option<NodeId>,
        offset: usize,
        previous_text: Option<NodeId>,
    ) -> Self {
        Self::with_data(NodeData::Control(field), parent, offset, previous_text)
    }

    /// Create a new format node
    pub fn format(
        attributes: Attributes,
        parent: Option<NodeId>,
        offset: usize,
        previous_text: Option<NodeId>,
    ) -> Self {
        Self::with_data(NodeData::Format(attributes), parent, offset, previous_text)
    }

    /// Create a new, still empty, text leaf
    pub fn text(parent: NodeId, offset: usize, previous_text: Option<NodeId>) -> Self {
        Self::with_data(NodeData::Text(String::new()), Some(parent), offset, previous_text)
    }

    fn with_data(
        data: NodeData,
        parent: Option<NodeId>,
        offset: usize,
        previous_text: Option<NodeId>,
    ) -> Self {
        Node {
            data,
            parent,
            previous_text,
            children: Vec::new(),
            offset,
            size: 0,
        }
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    #[inline]
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn previous_text(&self) -> Option<NodeId> {
        self.previous_text
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Check if this node can hold character data
    #[inline]
    pub fn is_format(&self) -> bool {
        self.kind() == NodeKind::Format
    }

    /// Append character data to a text leaf, returning the characters added
    pub(crate) fn push_text(&mut self, text: &str) -> usize {
        let added = text.chars().count();
        if let NodeData::Text(content) = &mut self.data {
            content.push_str(text);
            self.size += added;
        }
        added
    }

    /// Drop every link and payload held by this node
    pub(crate) fn sever(&mut self) {
        self.parent = None;
        self.previous_text = None;
        self.children = Vec::new();
        self.data = match self.data.kind() {
            NodeKind::Control => NodeData::Control(ControlField::default()),
            NodeKind::Format => NodeData::Format(Attributes::default()),
            NodeKind::Text => NodeData::Text(String::new()),
        };
    }
}
