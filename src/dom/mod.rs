//! DOM Module - Arena-based accessible-content tree
//!
//! Implements the tree representation using:
//! - Arena allocation for nodes
//! - NodeId (u32) indices for parent, child and previous-text links
//! - Normalized control fields computed once at build time

pub mod attributes;
pub mod node;
pub mod tree;

pub use attributes::Attributes;
pub use node::{ControlField, Node, NodeData, NodeId, NodeKind};
pub use tree::{Descendants, NodeRef, NodeTree};
