//! Streaming tree construction
//!
//! The markup scanner feeds a [`TreeBuilder`] handler:
//!
//! ```text
//! MarkupScanner ---> TreeBuilder ---> NodeTree
//!                        ^
//!                        |
//!               SnapshotEvent replay
//! ```
//!
//! Only three elements are recognized: `control`, `text` and `unich`.

pub mod builder;
pub mod events;

pub use builder::{build_tree, TreeBuilder};
pub use events::{SnapshotEvent, TagKind};
