//! Error types
//!
//! Every error here is recovered inside the crate: a failed build leaves the
//! manager not ready, an unavailable source reads as "no results", and a
//! malformed criterion is skipped with a warning.

use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

/// Why a snapshot could not be turned into a tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("unknown tag name `{name}` at byte {position}")]
    UnknownTag { name: String, position: usize },

    #[error("invalid structure at byte {position}: {message}")]
    Structure {
        position: usize,
        message: &'static str,
    },

    #[error("markup syntax error at byte {position}: {message}")]
    Syntax {
        position: usize,
        message: &'static str,
    },

    #[error("snapshot produced no nodes")]
    Empty,
}

impl BuildError {
    pub fn unknown_tag(position: usize, name: impl Into<String>) -> Self {
        Self::UnknownTag {
            name: name.into(),
            position,
        }
    }

    pub fn structure(position: usize, message: &'static str) -> Self {
        Self::Structure { position, message }
    }

    pub fn syntax(position: usize, message: &'static str) -> Self {
        Self::Syntax { position, message }
    }
}

/// Failure reported by a content source probe
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("content source is not ready")]
    NotReady,

    #[error("content source probe failed: {0}")]
    Probe(String),
}

/// A search criterion key that cannot be interpreted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedCriterion {
    #[error("criterion `{key}` has no `<test>_` prefix")]
    MissingSeparator { key: String },

    #[error("criterion `{key}` uses unknown test `{test}`")]
    UnknownTest { key: String, test: String },

    #[error("criterion `{key}` names no property")]
    EmptyProperty { key: String },

    #[error("criterion `{key}`: property `{property}` only supports the `in` test")]
    UnsupportedTest { key: String, property: String },
}

/// Invalid manager configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}
