//! a11y-tree - Navigable accessible-content trees from streamed markup
//!
//! Layers:
//! A: Markup scanner (core) - memchr-driven event dispatch
//! B: Tree builder (sax) - offsets, sizes and text links assigned while scanning
//! C: Node tree (dom) - arena of Control, Format and Text nodes
//! D: Query engine (query) - offset, text and criteria searches, navigation
//! E: Manager - staleness-aware rebuilds over a [`ContentSource`]
//!
//! ```ignore
//! let mut manager = Manager::new(source);
//! if let UpdateOutcome::Ready(_) = manager.update() {
//!     let links = manager.search_node(&Query::new().criterion("eq_role", ["link"]));
//! }
//! ```

pub mod config;
pub mod core;
pub mod dom;
pub mod error;
pub mod manager;
pub mod query;
pub mod sax;

pub use config::ManagerConfig;
pub use dom::{NodeId, NodeKind, NodeRef, NodeTree};
pub use error::{BuildError, BuildResult, ConfigError, MalformedCriterion, SourceError};
pub use manager::{
    BuildId, ContentSource, Manager, ManagerId, ManagerObserver, ManagerState, MoveReason,
    UpdateOutcome,
};
pub use query::{Boundary, Navigation, Query};
pub use sax::build_tree;
