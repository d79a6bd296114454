//! Streaming Tree Builder
//!
//! Implements ScanHandler to turn snapshot events into a [`NodeTree`].
//! Offsets are assigned from a running character counter as nodes open;
//! sizes flow upward when elements close.

use std::time::Instant;

use tracing::{debug, trace};

use super::events::{SnapshotEvent, TagKind};
use crate::core::attributes::find_attribute;
use crate::core::entities::decode_code_point;
use crate::core::unified_scanner::{MarkupScanner, ScanHandler};
use crate::core::Attribute;
use crate::dom::{Attributes, ControlField, Node, NodeId, NodeTree};
use crate::error::{BuildError, BuildResult};

/// An element currently open in the snapshot
#[derive(Debug, Clone, Copy)]
struct OpenElement {
    kind: TagKind,
    /// Node created for the element (None for escapes)
    node: Option<NodeId>,
}

/// Builder that assembles a tree while scanning
pub struct TreeBuilder {
    tree: NodeTree,
    /// Open element stack, innermost last
    open: Vec<OpenElement>,
    /// Running character offset
    offset: usize,
    /// Most recently filled Text leaf
    last_text: Option<NodeId>,
    /// Format node and the leaf currently receiving its character data
    pending_leaf: Option<(NodeId, NodeId)>,
}

impl TreeBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    /// Create with an estimated node capacity
    pub fn with_capacity(nodes: usize) -> Self {
        TreeBuilder {
            tree: NodeTree::with_capacity(nodes),
            open: Vec::with_capacity(16),
            offset: 0,
            last_text: None,
            pending_leaf: None,
        }
    }

    /// Characters consumed so far
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Innermost open node
    fn current_parent(&self) -> Option<NodeId> {
        self.open.iter().rev().find_map(|e| e.node)
    }

    fn open_node(&mut self, position: usize, kind: TagKind, attrs: &[Attribute<'_>]) -> BuildResult<NodeId> {
        let parent = self.current_parent();
        if parent.is_none() && !self.tree.is_empty() {
            return Err(BuildError::structure(position, "second top-level element"));
        }

        let attributes = Attributes::from_parsed(attrs);
        let node = match kind {
            TagKind::Control => Node::control(
                ControlField::from_attributes(attributes),
                parent,
                self.offset,
                self.last_text,
            ),
            _ => Node::format(attributes, parent, self.offset, self.last_text),
        };
        Ok(self.tree.push(node))
    }

    fn close_node(&mut self, id: NodeId) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        let (parent, size) = (node.parent(), node.size());
        if let Some(parent) = parent.and_then(|p| self.tree.get_mut(p)) {
            parent.size += size;
        }
    }

    /// Replay owned events, as if they had been scanned
    pub fn replay<'e>(&mut self, events: impl IntoIterator<Item = &'e SnapshotEvent>) -> BuildResult<()> {
        for (position, event) in events.into_iter().enumerate() {
            event.dispatch(position, self)?;
        }
        Ok(())
    }

    /// Finish building
    ///
    /// Returns None when no node was created.
    pub fn finish(self) -> BuildResult<Option<NodeTree>> {
        if let Some(unclosed) = self.open.last() {
            return Err(BuildError::syntax(self.offset, match unclosed.kind {
                TagKind::Control => "unclosed control element",
                TagKind::Format => "unclosed text element",
                TagKind::Escape => "unclosed unich element",
            }));
        }
        if self.tree.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.tree))
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanHandler for TreeBuilder {
    fn start_element(
        &mut self,
        position: usize,
        name: &str,
        attrs: &[Attribute<'_>],
        _is_empty: bool,
    ) -> BuildResult<()> {
        let kind = TagKind::from_name(name).ok_or_else(|| BuildError::unknown_tag(position, name))?;

        let node = match kind {
            TagKind::Escape => {
                if let Some(value) = find_attribute(attrs, "value") {
                    let mut buf = [0u8; 4];
                    let ch = decode_code_point(value).encode_utf8(&mut buf);
                    self.characters(position, ch)?;
                }
                None
            }
            TagKind::Control | TagKind::Format => {
                self.pending_leaf = None;
                Some(self.open_node(position, kind, attrs)?)
            }
        };

        self.open.push(OpenElement { kind, node });
        Ok(())
    }

    fn end_element(&mut self, position: usize, name: &str) -> BuildResult<()> {
        let kind = TagKind::from_name(name).ok_or_else(|| BuildError::unknown_tag(position, name))?;
        let open = self
            .open
            .pop()
            .ok_or_else(|| BuildError::syntax(position, "end tag without open element"))?;
        if open.kind != kind {
            return Err(BuildError::syntax(position, "end tag does not match open element"));
        }

        if let Some(id) = open.node {
            self.pending_leaf = None;
            self.close_node(id);
        }
        Ok(())
    }

    fn characters(&mut self, position: usize, text: &str) -> BuildResult<()> {
        if text.is_empty() {
            return Ok(());
        }

        let parent = match self.current_parent() {
            Some(id) if self.tree.get(id).is_some_and(|n| n.is_format()) => id,
            _ if text.chars().all(char::is_whitespace) => return Ok(()),
            Some(_) => {
                return Err(BuildError::structure(position, "character data outside a text element"))
            }
            None => return Err(BuildError::structure(position, "character data outside any element")),
        };

        let leaf = match self.pending_leaf {
            Some((format, leaf)) if format == parent => leaf,
            _ => {
                let leaf = self.tree.push(Node::text(parent, self.offset, self.last_text));
                self.pending_leaf = Some((parent, leaf));
                leaf
            }
        };

        let added = self.tree.get_mut(leaf).map_or(0, |n| n.push_text(text));
        if let Some(format) = self.tree.get_mut(parent) {
            format.size += added;
        }
        self.offset += added;
        self.last_text = Some(leaf);
        Ok(())
    }
}

/// Build a tree from a markup snapshot
///
/// A snapshot that produces no node is reported as [`BuildError::Empty`].
pub fn build_tree(markup: &str) -> BuildResult<NodeTree> {
    let started = Instant::now();
    let mut builder = TreeBuilder::with_capacity(markup.len() / 32 + 1);
    MarkupScanner::new(markup).scan(&mut builder)?;
    let characters = builder.offset();
    let tree = builder.finish()?.ok_or(BuildError::Empty)?;

    debug!(
        nodes = tree.len(),
        characters,
        elapsed_us = started.elapsed().as_micros() as u64,
        "tree built"
    );
    trace!(dump = %tree.dump(), "tree contents");
    Ok(tree)
}
