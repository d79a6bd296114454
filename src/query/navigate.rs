//! Caret-relative navigation ordering

use super::search::search_offset;
use crate::dom::{NodeId, NodeRef};

/// Edge of the document reached while navigating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Boundary {
    Top,
    Bottom,
}

/// Result of one navigation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Land on this node
    Moved(NodeId),
    /// Nothing further in that direction
    Boundary(Boundary),
}

/// Item following `current` in document order
pub fn next<F>(current: NodeRef<'_>, is_stop_role: F) -> Navigation
where
    F: Fn(&str) -> bool,
{
    step(current, Some(current.end()), Boundary::Bottom, is_stop_role)
}

/// Item preceding `current` in document order
pub fn previous<F>(current: NodeRef<'_>, is_stop_role: F) -> Navigation
where
    F: Fn(&str) -> bool,
{
    step(current, current.offset().checked_sub(1), Boundary::Top, is_stop_role)
}

/// Node to land on for `leaf`: the leaf itself inside stop-worthy
/// containers, otherwise its containing Control
pub fn landing<'t, F>(leaf: NodeRef<'t>, is_stop_role: F) -> NodeRef<'t>
where
    F: Fn(&str) -> bool,
{
    match leaf.control_ancestor() {
        Some(container) if !is_stop_role(container.role()) => container,
        _ => leaf,
    }
}

fn step<F>(current: NodeRef<'_>, target: Option<usize>, edge: Boundary, is_stop_role: F) -> Navigation
where
    F: Fn(&str) -> bool,
{
    let found = target
        .zip(current.tree().root())
        .and_then(|(offset, root)| search_offset(root, offset));
    let Some(leaf) = found else {
        return Navigation::Boundary(edge);
    };

    let node = landing(leaf, is_stop_role);
    if node == current {
        Navigation::Boundary(edge)
    } else {
        Navigation::Moved(node.id())
    }
}
