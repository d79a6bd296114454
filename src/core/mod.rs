//! Core markup parsing primitives
//!
//! This module contains the building blocks for reading a snapshot:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Entities: entity and code point decoding with Cow (zero-copy when possible)
//! - Attributes: attribute list parsing
//! - UnifiedScanner: ScanHandler-based event dispatch

pub mod attributes;
pub mod entities;
pub mod scanner;
pub mod unified_scanner;

pub use attributes::Attribute;
pub use unified_scanner::{MarkupScanner, ScanHandler};
