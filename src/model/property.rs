//! Named property values attached to resources and text containers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::LocaleId;

/// A named, possibly read-only property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// Property name (e.g. `href`, `encoding`)
    pub name: String,

    /// Current value
    pub value: String,

    /// Read-only properties are informative and must not be localized
    #[serde(default)]
    pub read_only: bool,
}

impl Property {
    /// Create a modifiable property.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            read_only: false,
        }
    }

    /// Create a read-only property.
    pub fn read_only(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            read_only: true,
            ..Self::new(name, value)
        }
    }
}

/// Where a property lives on a text unit.
///
/// Resource-level properties belong to the resource itself; source and
/// target properties belong to the corresponding text container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope", content = "locale")]
pub enum PropertyScope {
    /// The resource itself
    Resource,
    /// The source container of a text unit
    Source,
    /// The target container of a text unit for a locale
    Target(LocaleId),
}

/// An ordered set of properties keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, Property>);

impl Properties {
    /// Create an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a property by name.
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.0.get(name)
    }

    /// Get a mutable property by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.0.get_mut(name)
    }

    /// Get a property value by name.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|p| p.value.as_str())
    }

    /// Insert or replace a property, returning the previous one.
    pub fn set(&mut self, property: Property) -> Option<Property> {
        self.0.insert(property.name.clone(), property)
    }

    /// Remove a property by name.
    pub fn remove(&mut self, name: &str) -> Option<Property> {
        self.0.remove(name)
    }

    /// Check if a property exists.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterate over the property names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate over the properties.
    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.0.values()
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no properties.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_set_get() {
        let mut props = Properties::new();
        assert!(props.is_empty());

        props.set(Property::new("href", "a.html"));
        props.set(Property::read_only("lang", "en"));

        assert_eq!(props.len(), 2);
        assert_eq!(props.value("href"), Some("a.html"));
        assert!(props.get("lang").unwrap().read_only);
        assert_eq!(props.names().collect::<Vec<_>>(), vec!["href", "lang"]);

        let previous = props.set(Property::new("href", "b.html"));
        assert_eq!(previous.unwrap().value, "a.html");
        assert_eq!(props.value("href"), Some("b.html"));
    }

    #[test]
    fn test_scope_serde() {
        let scope = PropertyScope::Target(LocaleId::new("fr").unwrap());
        let json = serde_json::to_string(&scope).unwrap();
        assert_eq!(json, r#"{"scope":"target","locale":"fr"}"#);
    }
}
