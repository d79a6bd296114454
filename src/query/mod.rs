//! Query Engine
//!
//! Read-only lookups over a built tree:
//! - Offset search: the Text leaf covering a character offset
//! - Free-text search: Text leaves containing candidate substrings
//! - Structured search: criteria-driven Control matching
//! - Navigation: next/previous item relative to a node

pub mod criteria;
pub mod navigate;
pub mod search;

pub use criteria::{CompiledQuery, CriteriaCache, Criterion, CriterionKey, Property, Query, Test};
pub use navigate::{landing, Boundary, Navigation};
pub use search::{search_many, search_nodes, search_offset, search_text};
