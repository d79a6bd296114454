//! Node tree - arena-based representation of one snapshot
//!
//! Nodes are stored in creation order, which is also document (pre-order)
//! order. [`NodeRef`] is the borrowed view handed to callers; it cannot
//! outlive the tree it points into.

use std::cmp::Ordering;
use std::fmt;

use super::attributes::Attributes;
use super::node::{ControlField, Node, NodeData, NodeId, NodeKind};
use crate::manager::ManagerId;

/// An accessible-content tree built from one snapshot
#[derive(Debug, Default)]
pub struct NodeTree {
    /// Arena of nodes
    nodes: Vec<Node>,
    /// Root node ID
    root: Option<NodeId>,
    /// Manager currently owning the tree
    owner: Option<ManagerId>,
}

impl NodeTree {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        NodeTree {
            nodes: Vec::with_capacity(capacity),
            root: None,
            owner: None,
        }
    }

    /// Append a node to the arena, linking it under its parent
    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len() as NodeId;
        match node.parent {
            Some(parent) => self.nodes[parent as usize].children.push(id),
            None => {
                if self.root.is_none() {
                    self.root = Some(id);
                }
            }
        }
        self.nodes.push(node);
        id
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id as usize)
    }

    pub(crate) fn set_owner(&mut self, owner: ManagerId) {
        self.owner = Some(owner);
    }

    /// Get a node by ID
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    /// Get a borrowed view of a node
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.get(id).map(|_| NodeRef { tree: self, id })
    }

    /// Root node, if the tree has one
    pub fn root(&self) -> Option<NodeRef<'_>> {
        self.root.and_then(|id| self.node(id))
    }

    /// Manager owning this tree
    pub fn owner(&self) -> Option<ManagerId> {
        self.owner
    }

    /// Get node count
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Raw arena access, in creation order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Every Text leaf in document order
    pub fn text_leaves(&self) -> impl Iterator<Item = NodeRef<'_>> {
        self.root()
            .into_iter()
            .flat_map(|root| root.descendants_inclusive())
            .filter(|node| node.is_text())
    }

    /// Sever every parent, child, previous-text and owner link.
    ///
    /// Returns the number of nodes released. The tree is unusable
    /// afterwards.
    pub fn teardown(&mut self) -> usize {
        for node in &mut self.nodes {
            node.sever();
        }
        self.root = None;
        self.owner = None;
        self.nodes.len()
    }

    pub fn is_torn_down(&self) -> bool {
        self.root.is_none() && self.owner.is_none()
    }

    /// Indented rendering of the tree, one node per line
    pub fn dump(&self) -> String {
        let mut out = String::new();
        if let Some(root) = self.root() {
            dump_node(root, 0, &mut out);
        }
        out
    }
}

fn dump_node(node: NodeRef<'_>, level: usize, out: &mut String) {
    for _ in 0..level {
        out.push_str("  ");
    }
    match node.data() {
        NodeData::Text(text) => out.push_str(text),
        NodeData::Control(field) => out.push_str(&field.tag),
        NodeData::Format(_) => out.push_str("format"),
    }
    out.push('\n');
    for child in node.children() {
        dump_node(child, level + 1, out);
    }
}

/// Borrowed view of a node inside a [`NodeTree`]
///
/// Two views compare equal when their offsets are equal, whatever their
/// identity; ordering is by offset too.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a NodeTree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    #[inline]
    fn node(&self) -> &'a Node {
        &self.tree.nodes[self.id as usize]
    }

    #[inline]
    fn at(&self, id: NodeId) -> NodeRef<'a> {
        NodeRef {
            tree: self.tree,
            id,
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn tree(&self) -> &'a NodeTree {
        self.tree
    }

    #[inline]
    pub fn data(&self) -> &'a NodeData {
        &self.node().data
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.node().kind()
    }

    #[inline]
    pub fn is_control(&self) -> bool {
        self.kind() == NodeKind::Control
    }

    #[inline]
    pub fn is_format(&self) -> bool {
        self.kind() == NodeKind::Format
    }

    #[inline]
    pub fn is_text(&self) -> bool {
        self.kind() == NodeKind::Text
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.node().offset
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.node().size
    }

    /// Offset one past the node's last character
    #[inline]
    pub fn end(&self) -> usize {
        self.offset() + self.size()
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node().parent.map(|id| self.at(id))
    }

    pub fn previous_text(&self) -> Option<NodeRef<'a>> {
        self.node().previous_text.map(|id| self.at(id))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        self.node()
            .children
            .iter()
            .map(move |&id| NodeRef { tree, id })
    }

    /// This node followed by all of its descendants, in document order
    pub fn descendants_inclusive(&self) -> Descendants<'a> {
        Descendants {
            tree: self.tree,
            stack: vec![self.id],
        }
    }

    /// Nearest Control at or above this node
    pub fn control_ancestor(&self) -> Option<NodeRef<'a>> {
        let mut current = Some(*self);
        while let Some(node) = current {
            if node.is_control() {
                return Some(node);
            }
            current = node.parent();
        }
        None
    }

    pub fn control(&self) -> Option<&'a ControlField> {
        match self.data() {
            NodeData::Control(field) => Some(field),
            _ => None,
        }
    }

    /// Literal content of a Text leaf
    pub fn text(&self) -> Option<&'a str> {
        match self.data() {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Raw attribute mapping of a Control or Format node
    pub fn attributes(&self) -> Option<&'a Attributes> {
        match self.data() {
            NodeData::Control(field) => Some(&field.attributes),
            NodeData::Format(attributes) => Some(attributes),
            NodeData::Text(_) => None,
        }
    }

    pub fn role(&self) -> &'a str {
        self.control().map_or("", |c| c.role.as_str())
    }

    pub fn name(&self) -> &'a str {
        self.control().map_or("", |c| c.name.as_str())
    }

    pub fn tag(&self) -> &'a str {
        self.control().map_or("", |c| c.tag.as_str())
    }

    /// Normalized `id` attribute of a Control
    pub fn html_id(&self) -> &'a str {
        self.control().map_or("", |c| c.id.as_str())
    }

    pub fn class_name(&self) -> &'a str {
        self.control().map_or("", |c| c.class_name.as_str())
    }

    pub fn src(&self) -> &'a str {
        self.control().map_or("", |c| c.src.as_str())
    }

    pub fn control_identifier(&self) -> i64 {
        self.control().map_or(0, |c| c.control_identifier)
    }

    /// True when `other` is this node or one of its immediate children
    /// (compared by offset)
    pub fn contains(&self, other: &NodeRef<'_>) -> bool {
        self.offset() == other.offset() || self.children().any(|child| child.offset() == other.offset())
    }

    /// Concatenated text of the subtree; every non-empty leaf is followed by
    /// a space unless it already ends with a newline
    pub fn inner_text(&self) -> String {
        let mut out = String::new();
        for leaf in self.descendants_inclusive().filter(|n| n.is_text()) {
            let text = leaf.text().unwrap_or("");
            if text.is_empty() {
                continue;
            }
            out.push_str(text);
            if !text.ends_with('\n') {
                out.push(' ');
            }
        }
        out
    }

    /// Template string for speech and braille presentation
    pub fn presentation_string(&self) -> String {
        match self.data() {
            NodeData::Text(text) => text.clone(),
            NodeData::Control(field) if field.role.eq_ignore_ascii_case("editabletext") => {
                "_name_ _role_".to_owned()
            }
            NodeData::Control(field) if field.role.eq_ignore_ascii_case("heading") => {
                let level = field.attributes.get("level").unwrap_or("");
                format!("_innerText_ _role_ level {level}")
            }
            _ => "_innerText_ _role_".to_owned(),
        }
    }

    /// Text leaf at this node's first character
    pub fn first_text_node(&self) -> Option<NodeRef<'a>> {
        crate::query::search_offset(*self, self.offset())
    }

    /// Text leaf starting right after this node, anywhere in the tree
    pub fn next_text_node(&self) -> Option<NodeRef<'a>> {
        self.tree
            .root()
            .and_then(|root| crate::query::search_offset(root, self.end()))
    }

    /// Text leaf in this subtree covering `offset`
    pub fn search_offset(&self, offset: usize) -> Option<NodeRef<'a>> {
        crate::query::search_offset(*self, offset)
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.offset() == other.offset()
    }
}

impl Eq for NodeRef<'_> {}

impl PartialOrd for NodeRef<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeRef<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.offset().cmp(&other.offset())
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data() {
            NodeData::Text(text) => write!(f, "Node text : {text}"),
            NodeData::Control(field) => write!(
                f,
                "Node {} : id={}, className={}",
                field.tag, field.id, field.class_name
            ),
            NodeData::Format(_) => write!(f, "Node format"),
        }
    }
}

/// Pre-order iterator over a subtree
pub struct Descendants<'a> {
    tree: &'a NodeTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        let node = self.tree.get(current)?;
        self.stack.extend(node.children.iter().rev());
        Some(NodeRef {
            tree: self.tree,
            id: current,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// root(control) > [format > "ab", link(control) > format > "cd"]
    fn sample() -> NodeTree {
        let mut tree = NodeTree::default();
        let mut root_attrs = Attributes::new();
        root_attrs.insert("role", "document");
        root_attrs.insert("nodeName", "BODY");
        let root = tree.push(Node::control(ControlField::from_attributes(root_attrs), None, 0, None));

        let f1 = tree.push(Node::format(Attributes::new(), Some(root), 0, None));
        let t1 = tree.push(Node::text(f1, 0, None));
        grow(&mut tree, t1, "ab", &[f1, root]);

        let mut link_attrs = Attributes::new();
        link_attrs.insert("role", "link");
        link_attrs.insert("nodeName", "A");
        let link = tree.push(Node::control(ControlField::from_attributes(link_attrs), Some(root), 2, Some(t1)));
        let f2 = tree.push(Node::format(Attributes::new(), Some(link), 2, Some(t1)));
        let t2 = tree.push(Node::text(f2, 2, Some(t1)));
        grow(&mut tree, t2, "cd", &[f2, link, root]);
        tree
    }

    fn grow(tree: &mut NodeTree, leaf: NodeId, text: &str, ancestors: &[NodeId]) {
        let added = tree.get_mut(leaf).unwrap().push_text(text);
        for &id in ancestors {
            tree.get_mut(id).unwrap().size += added;
        }
    }

    #[test]
    fn test_navigation_links() {
        let tree = sample();
        let root = tree.root().unwrap();
        assert_eq!(root.size(), 4);
        assert_eq!(root.children().count(), 2);

        let leaves: Vec<_> = tree.text_leaves().collect();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[1].previous_text().map(|n| n.id()), Some(leaves[0].id()));
        assert_eq!(leaves[1].control_ancestor().map(|n| n.role()), Some("link"));
    }

    #[test]
    fn test_equality_is_by_offset() {
        let tree = sample();
        let root = tree.root().unwrap();
        let first_format = root.children().next().unwrap();
        assert_eq!(root, first_format);
        assert_ne!(root.id(), first_format.id());
        assert!(root.contains(&first_format));
    }

    #[test]
    fn test_inner_text_and_presentation() {
        let tree = sample();
        let root = tree.root().unwrap();
        assert_eq!(root.inner_text(), "ab cd ");
        assert_eq!(root.presentation_string(), "_innerText_ _role_");
        let leaf = tree.text_leaves().next().unwrap();
        assert_eq!(leaf.presentation_string(), "ab");
    }

    #[test]
    fn test_dump() {
        let tree = sample();
        assert_eq!(tree.dump(), "BODY\n  format\n    ab\n  A\n    format\n      cd\n");
    }

    #[test]
    fn test_teardown_severs_links() {
        let mut tree = sample();
        assert_eq!(tree.teardown(), 6);
        assert!(tree.is_torn_down());
        assert!(tree.root().is_none());
        assert!(tree
            .nodes()
            .all(|n| n.parent().is_none() && n.previous_text().is_none() && n.children().is_empty()));
    }
}
