//! Search criteria
//!
//! A criterion key reads `<test>_<property>[#index]`, e.g. `eq_role`,
//! `notIn_className#2`. The `#index` suffix only lets callers repeat a
//! key and carries no meaning. Parsed keys are memoized in an LRU cache
//! since the same handful of keys is reused by every search.

use std::cell::RefCell;
use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::warn;

use crate::dom::{NodeId, NodeRef};
use crate::error::MalformedCriterion;

/// Comparison applied between a node property and a criterion value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Test {
    /// Property equals the value
    Eq,
    /// Property equals the value anywhere -> the whole search is empty
    NotEq,
    /// Property contains the value (with `*` stripped)
    In,
    /// Property contains the value anywhere -> the whole search is empty
    NotIn,
}

impl Test {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "eq" => Some(Test::Eq),
            "notEq" => Some(Test::NotEq),
            "in" => Some(Test::In),
            "notIn" => Some(Test::NotIn),
            _ => None,
        }
    }

    /// Negated tests veto the whole search when they match
    #[inline]
    pub fn is_veto(self) -> bool {
        matches!(self, Test::NotEq | Test::NotIn)
    }

    /// Compare one property value against one criterion value
    pub fn compare(self, property: &str, value: &str) -> bool {
        match self {
            Test::Eq | Test::NotEq => property == value,
            Test::In | Test::NotIn => {
                if property.is_empty() {
                    return false;
                }
                let needle = value.replace('*', "");
                property.contains(needle.as_str())
            }
        }
    }
}

/// Node property a criterion looks at
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Property {
    Role,
    Name,
    Tag,
    Id,
    ClassName,
    Src,
    ControlIdentifier,
    /// Text inside the matched subtree
    Text,
    /// Text leaf immediately preceding the node
    PrevText,
    /// Any other raw control attribute
    Attribute(String),
}

impl Property {
    fn parse(name: &str) -> Self {
        match name {
            "role" => Property::Role,
            "name" => Property::Name,
            "tag" => Property::Tag,
            "id" => Property::Id,
            "className" => Property::ClassName,
            "src" => Property::Src,
            "controlIdentifier" => Property::ControlIdentifier,
            "text" => Property::Text,
            "prevText" => Property::PrevText,
            other => Property::Attribute(other.to_owned()),
        }
    }

    #[inline]
    fn is_textual(&self) -> bool {
        matches!(self, Property::Text | Property::PrevText)
    }

    /// Check whether any criterion value matches this property of `node`
    pub fn matches(&self, node: NodeRef<'_>, test: Test, values: &[String]) -> bool {
        match self {
            Property::ClassName => node
                .class_name()
                .split_whitespace()
                .any(|token| values.iter().any(|v| test.compare(token, v))),
            Property::ControlIdentifier => {
                let id = node.control_identifier().to_string();
                values.iter().any(|v| test.compare(&id, v))
            }
            // Plain substring test, no wildcard stripping
            Property::PrevText => node
                .previous_text()
                .and_then(|n| n.text())
                .is_some_and(|previous| values.iter().any(|v| previous.contains(v.as_str()))),
            // Resolved by a text search in the matched subtree
            Property::Text => true,
            _ => {
                let value = self.read(node);
                values.iter().any(|v| test.compare(value, v))
            }
        }
    }

    fn read<'a>(&self, node: NodeRef<'a>) -> &'a str {
        match self {
            Property::Role => node.role(),
            Property::Name => node.name(),
            Property::Tag => node.tag(),
            Property::Id => node.html_id(),
            Property::Src => node.src(),
            Property::Attribute(name) => node
                .attributes()
                .and_then(|attrs| attrs.get(name))
                .unwrap_or(""),
            Property::ClassName => node.class_name(),
            Property::ControlIdentifier | Property::Text | Property::PrevText => "",
        }
    }
}

/// A parsed criterion key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CriterionKey {
    pub test: Test,
    pub property: Property,
}

impl CriterionKey {
    /// Parse `<test>_<property>[#index]`
    pub fn parse(key: &str) -> Result<Self, MalformedCriterion> {
        let base = key.rsplit_once('#').map_or(key, |(base, _)| base);
        let (test, property_name) = base
            .split_once('_')
            .ok_or_else(|| MalformedCriterion::MissingSeparator { key: key.to_owned() })?;

        let test = Test::parse(test).ok_or_else(|| MalformedCriterion::UnknownTest {
            key: key.to_owned(),
            test: test.to_owned(),
        })?;
        if property_name.is_empty() {
            return Err(MalformedCriterion::EmptyProperty { key: key.to_owned() });
        }

        let property = Property::parse(property_name);
        if property.is_textual() && test != Test::In {
            return Err(MalformedCriterion::UnsupportedTest {
                key: key.to_owned(),
                property: property_name.to_owned(),
            });
        }
        Ok(CriterionKey { test, property })
    }
}

/// A criterion ready to evaluate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    pub key: CriterionKey,
    pub values: Vec<String>,
}

/// LRU memo of parsed criterion keys
pub struct CriteriaCache {
    keys: RefCell<LruCache<String, Result<CriterionKey, MalformedCriterion>>>,
}

impl CriteriaCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        CriteriaCache {
            keys: RefCell::new(LruCache::new(capacity)),
        }
    }

    /// Parse a key, reusing a cached result when present
    pub fn parse(&self, key: &str) -> Result<CriterionKey, MalformedCriterion> {
        let mut keys = self.keys.borrow_mut();
        if let Some(parsed) = keys.get(key) {
            return parsed.clone();
        }
        let parsed = CriterionKey::parse(key);
        keys.put(key.to_owned(), parsed.clone());
        parsed
    }

    pub fn len(&self) -> usize {
        self.keys.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Structured search request
///
/// ```ignore
/// let query = Query::new()
///     .criterion("eq_role", ["link"])
///     .criterion("in_text", ["Home"])
///     .max_results(5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Query {
    criteria: Vec<(String, Vec<String>)>,
    roots: Vec<NodeId>,
    exclude: Vec<NodeId>,
    max_results: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a criterion; values are OR-ed, criteria are AND-ed
    pub fn criterion<I, V>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.criteria
            .push((key.to_owned(), values.into_iter().map(Into::into).collect()));
        self
    }

    /// Start the walk from `root` instead of the tree root (repeatable)
    pub fn root(mut self, root: NodeId) -> Self {
        self.roots.push(root);
        self
    }

    /// Skip the subtree of `node`
    pub fn exclude(mut self, node: NodeId) -> Self {
        self.exclude.push(node);
        self
    }

    /// Cap the number of results across the whole search; 0 means no cap
    pub fn max_results(mut self, cap: usize) -> Self {
        self.max_results = (cap > 0).then_some(cap);
        self
    }

    /// Resolve every key, dropping malformed ones with a warning
    pub fn compile(&self, cache: &CriteriaCache) -> CompiledQuery {
        let mut criteria = Vec::with_capacity(self.criteria.len());
        let mut text: Option<Vec<String>> = None;
        let mut prev_text: Option<Vec<String>> = None;

        for (key, values) in &self.criteria {
            let parsed = match cache.parse(key) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(%key, error = %err, "ignoring malformed criterion");
                    continue;
                }
            };
            match parsed.property {
                Property::Text => text.get_or_insert_with(Vec::new).extend(values.iter().cloned()),
                Property::PrevText => prev_text
                    .get_or_insert_with(Vec::new)
                    .extend(values.iter().cloned()),
                _ => criteria.push(Criterion {
                    key: parsed,
                    values: values.clone(),
                }),
            }
        }

        if text.is_some() && prev_text.is_some() {
            warn!("text and prevText criteria are exclusive, ignoring prevText");
            prev_text = None;
        }
        CompiledQuery {
            criteria,
            text,
            prev_text,
            roots: self.roots.clone(),
            exclude: self.exclude.clone(),
            max_results: self.max_results,
        }
    }
}

/// A query with its keys resolved
#[derive(Debug, Clone, Default)]
pub struct CompiledQuery {
    pub criteria: Vec<Criterion>,
    /// `in_text` candidates, if any
    pub text: Option<Vec<String>>,
    /// `in_prevText` candidates, if any
    pub prev_text: Option<Vec<String>>,
    pub roots: Vec<NodeId>,
    pub exclude: Vec<NodeId>,
    pub max_results: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> CriteriaCache {
        CriteriaCache::new(NonZeroUsize::new(8).unwrap())
    }

    #[test]
    fn test_parse_keys() {
        let key = CriterionKey::parse("notIn_className#3").unwrap();
        assert_eq!(key.test, Test::NotIn);
        assert_eq!(key.property, Property::ClassName);

        let key = CriterionKey::parse("eq_aria_label").unwrap();
        assert_eq!(key.property, Property::Attribute("aria_label".to_owned()));

        let key = CriterionKey::parse("eq_data#x#2").unwrap();
        assert_eq!(key.property, Property::Attribute("data#x".to_owned()));
    }

    #[test]
    fn test_malformed_keys() {
        assert!(matches!(
            CriterionKey::parse("role"),
            Err(MalformedCriterion::MissingSeparator { .. })
        ));
        assert!(matches!(
            CriterionKey::parse("like_role"),
            Err(MalformedCriterion::UnknownTest { .. })
        ));
        assert!(matches!(
            CriterionKey::parse("eq_"),
            Err(MalformedCriterion::EmptyProperty { .. })
        ));
        assert_eq!(
            CriterionKey::parse("eq_text"),
            Err(MalformedCriterion::UnsupportedTest {
                key: "eq_text".to_owned(),
                property: "text".to_owned(),
            })
        );
    }

    #[test]
    fn test_compare() {
        assert!(Test::Eq.compare("link", "link"));
        assert!(!Test::Eq.compare("link", "lin"));
        assert!(Test::In.compare("navigation", "*vig*"));
        assert!(!Test::In.compare("", "x"));
    }

    #[test]
    fn test_cache_reuses_parsed_keys() {
        let cache = cache();
        assert!(cache.parse("eq_role").is_ok());
        assert!(cache.parse("eq_role").is_ok());
        assert!(cache.parse("bogus").is_err());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_compile_drops_malformed_and_resolves_text() {
        let query = Query::new()
            .criterion("eq_role", ["link"])
            .criterion("bogus", ["x"])
            .criterion("in_text", ["Home"])
            .criterion("in_prevText", ["Menu"])
            .max_results(3);
        let compiled = query.compile(&cache());

        assert_eq!(compiled.criteria.len(), 1);
        assert_eq!(compiled.text, Some(vec!["Home".to_owned()]));
        assert_eq!(compiled.prev_text, None);
        assert_eq!(compiled.max_results, Some(3));
    }

    #[test]
    fn test_compile_keeps_prev_text_apart() {
        let compiled = Query::new()
            .criterion("eq_role", ["section"])
            .criterion("in_prevText", ["Menu*"])
            .compile(&cache());
        assert_eq!(compiled.criteria.len(), 1);
        assert_eq!(compiled.prev_text, Some(vec!["Menu*".to_owned()]));
    }

    #[test]
    fn test_zero_cap_is_uncapped() {
        assert_eq!(Query::new().max_results(0).compile(&cache()).max_results, None);
        assert_eq!(Query::new().max_results(2).compile(&cache()).max_results, Some(2));
    }
}
