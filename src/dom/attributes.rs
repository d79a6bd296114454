//! Owned attribute mapping for control and format nodes

use crate::core::Attribute;

/// Attribute name/value pairs in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy parsed attributes into an owned mapping
    pub fn from_parsed(attrs: &[Attribute<'_>]) -> Self {
        attrs
            .iter()
            .map(|a| (a.name.to_owned(), a.value.clone().into_owned()))
            .collect()
    }

    /// Get attribute value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First non-empty value among `keys`, or the empty string
    pub fn first_non_empty(&self, keys: &[&str]) -> &str {
        keys.iter()
            .filter_map(|key| self.get(key))
            .find(|value| !value.is_empty())
            .unwrap_or("")
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (name, value) in iter {
            attributes.insert(name, value);
        }
        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_insert() {
        let mut attrs = Attributes::new();
        attrs.insert("role", "link");
        attrs.insert("role", "button");
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.get("role"), Some("button"));
        assert_eq!(attrs.get("name"), None);
    }

    #[test]
    fn test_first_non_empty_skips_blank_values() {
        let attrs: Attributes = [("a", ""), ("b", "x")]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        assert_eq!(attrs.first_non_empty(&["a", "b"]), "x");
        assert_eq!(attrs.first_non_empty(&["missing"]), "");
    }

    #[test]
    fn test_from_parsed() {
        let parsed = [Attribute::new("level", "2")];
        let attrs = Attributes::from_parsed(&parsed);
        assert_eq!(attrs.get("level"), Some("2"));
    }
}
