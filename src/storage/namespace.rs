//! Namespace - (zone, base, name) collection identity

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::NAMESPACE_PLACEHOLDER;

/// Identifies a logical collection of entities.
///
/// Every component is optional; unset components render as `-` in the
/// canonical form `zone/base/name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Namespace {
    /// Top-level partition
    pub zone: Option<String>,
    /// Grouping within a zone
    pub base: Option<String>,
    /// Collection name
    pub name: Option<String>,
}

impl Namespace {
    /// Create a namespace from all three components.
    #[must_use]
    pub fn new(zone: Option<&str>, base: Option<&str>, name: Option<&str>) -> Self {
        Self {
            zone: zone.map(str::to_string),
            base: base.map(str::to_string),
            name: name.map(str::to_string),
        }
    }

    /// Namespace with only a collection name (`-/-/name`).
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self::new(None, None, Some(name))
    }

    /// Namespace with every component set (`zone/base/name`).
    #[must_use]
    pub fn qualified(zone: &str, base: &str, name: &str) -> Self {
        Self::new(Some(zone), Some(base), Some(name))
    }

    /// Canonical `zone/base/name` string.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.to_string()
    }

    /// The components that are set, outermost first.
    pub fn parts(&self) -> impl Iterator<Item = &str> {
        [&self.zone, &self.base, &self.name]
            .into_iter()
            .filter_map(|part| part.as_deref())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |p: &Option<String>| p.as_deref().unwrap_or(NAMESPACE_PLACEHOLDER).to_string();
        write!(f, "{}/{}/{}", part(&self.zone), part(&self.base), part(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_uses_placeholders() {
        assert_eq!(Namespace::named("product").canonical(), "-/-/product");
        assert_eq!(Namespace::qualified("zen", "moon", "bar").canonical(), "zen/moon/bar");
        assert_eq!(Namespace::default().canonical(), "-/-/-");
    }

    #[test]
    fn test_parts_skip_unset() {
        let ns = Namespace::new(Some("zen"), None, Some("bar"));
        assert_eq!(ns.parts().collect::<Vec<_>>(), vec!["zen", "bar"]);
    }

    #[test]
    fn test_equality_is_componentwise() {
        assert_eq!(Namespace::named("foo"), Namespace::new(None, None, Some("foo")));
        assert_ne!(Namespace::named("foo"), Namespace::qualified("zen", "moon", "foo"));
    }
}
