//! Entity - One record in one namespace
//!
//! TigerStyle: Explicit identity, typed directives, plain field bag.
//!
//! Control directives (`zone$`, `base$`, `name$`, `id$`) are parsed out of a
//! template when the entity is built and never live among the fields.

use std::collections::BTreeMap;
use std::fmt;

use super::error::{BackendError, BackendResult};
use super::is_reserved_key;
use super::namespace::Namespace;
use super::value::Value;
use crate::{DIRECTIVE_SUFFIX, ID_FIELD, ID_WILDCARD};

// =============================================================================
// Entity
// =============================================================================

/// A record: namespace, identity and fields.
///
/// Cloning is a deep copy; nothing is shared between an entity handed to a
/// store and the entity the store hands back.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Entity {
    namespace: Namespace,
    id: Option<String>,
    fields: BTreeMap<String, Value>,
    id_hint: Option<String>,
}

impl Entity {
    /// Create an empty, unsaved entity in `namespace`.
    #[must_use]
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            ..Self::default()
        }
    }

    /// Create an empty entity in the `-/-/name` namespace.
    #[must_use]
    pub fn make(name: &str) -> Self {
        Self::new(Namespace::named(name))
    }

    /// Build an entity from a template mapping.
    ///
    /// `zone$`, `base$` and `name$` override the namespace, `id$` becomes the
    /// id hint, `id` becomes the id, everything else is a field. Directives
    /// with non-string values and unknown directives are ignored.
    #[must_use]
    pub fn from_template(template: BTreeMap<String, Value>) -> Self {
        let mut entity = Self::default();

        for (key, value) in template {
            if key == ID_FIELD {
                entity.id = Some(value.to_text());
                continue;
            }
            let Some(directive) = key.strip_suffix(DIRECTIVE_SUFFIX) else {
                entity.fields.insert(key, value);
                continue;
            };

            let text = match value {
                Value::String(s) => s,
                other => {
                    tracing::debug!(directive, value = %other, "ignoring non-string directive");
                    continue;
                }
            };
            match directive {
                "zone" => entity.namespace.zone = Some(text),
                "base" => entity.namespace.base = Some(text),
                "name" => entity.namespace.name = Some(text),
                "id" => entity.id_hint = Some(text),
                _ => tracing::debug!(directive, "ignoring unknown entity directive"),
            }
        }

        entity
    }

    /// Build an entity from a JSON object template; non-objects yield an
    /// empty entity.
    #[must_use]
    pub fn from_json(template: serde_json::Value) -> Self {
        match Value::from(template) {
            Value::Map(map) => Self::from_template(map),
            other => {
                tracing::debug!(template = %other, "entity template is not an object");
                Self::default()
            }
        }
    }

    /// A new, unsaved entity in the same namespace.
    #[must_use]
    pub fn fresh(&self) -> Self {
        Self::new(self.namespace.clone())
    }

    // -------------------------------------------------------------------------
    // Identity
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Persisted id, unset until the first successful save.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Id a backend should use when creating this entity (`id$`).
    #[must_use]
    pub fn id_hint(&self) -> Option<&str> {
        self.id_hint.as_deref()
    }

    pub fn set_id_hint(&mut self, id: impl Into<String>) -> &mut Self {
        self.id_hint = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_id_hint(mut self, id: impl Into<String>) -> Self {
        self.set_id_hint(id);
        self
    }

    /// Attach a persisted id. Intended for backends building results.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// True when both entities address the same stored record.
    #[must_use]
    pub fn same_record(&self, other: &Self) -> bool {
        self.id.is_some() && self.namespace == other.namespace && self.id == other.id
    }

    // -------------------------------------------------------------------------
    // Fields
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.fields.get_mut(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Delete a field from this in-memory copy.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Replace the whole field set.
    #[must_use]
    pub fn with_fields(mut self, fields: BTreeMap<String, Value>) -> Self {
        self.fields = fields;
        self
    }

    /// Reject field names that collide with `id` or a directive.
    ///
    /// # Errors
    /// Returns `BackendError::InvalidEntity` naming the first reserved field.
    pub fn check_fields(&self) -> BackendResult<()> {
        match self.fields.keys().find(|key| is_reserved_key(key)) {
            Some(key) => Err(BackendError::invalid_entity(format!(
                "field name `{key}` is reserved in {}",
                self.namespace
            ))),
            None => Ok(()),
        }
    }

    // -------------------------------------------------------------------------
    // Canonical form
    // -------------------------------------------------------------------------

    /// `$zone/base/name:{id=..;field=value;...}` with sorted fields.
    #[must_use]
    pub fn to_canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${}:{{id={}",
            self.namespace,
            self.id.as_deref().unwrap_or(ID_WILDCARD)
        )?;
        for (key, value) in &self.fields {
            write!(f, ";{key}={value}")?;
        }
        f.write_str("}")
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_template_directives_are_parsed_out() {
        let entity = Entity::from_json(json!({
            "name$": "bar",
            "base$": "moon",
            "zone$": "zen",
            "id$": "fixed-id",
            "str": "aaa",
            "int": 11
        }));

        assert_eq!(entity.namespace(), &Namespace::qualified("zen", "moon", "bar"));
        assert_eq!(entity.id(), None);
        assert_eq!(entity.id_hint(), Some("fixed-id"));
        assert_eq!(entity.fields().len(), 2);
        assert!(entity.get("name$").is_none());
    }

    #[test]
    fn test_template_id_sets_identity() {
        let entity = Entity::from_json(json!({"name$": "foo", "id": "abc", "p1": "v1"}));
        assert_eq!(entity.id(), Some("abc"));
        assert!(entity.get("id").is_none());
    }

    #[test]
    fn test_non_object_template_never_fails() {
        let entity = Entity::from_json(json!("not an object"));
        assert_eq!(entity, Entity::default());
    }

    #[test]
    fn test_canonical_form() {
        let entity = Entity::make("product").with("price", 100).with("name", "apple");
        assert_eq!(entity.to_canonical(), "$-/-/product:{id=*;name=apple;price=100}");

        let saved = entity.with_id("p1");
        assert_eq!(saved.to_string(), "$-/-/product:{id=p1;name=apple;price=100}");
    }

    #[test]
    fn test_field_mutation_is_plain() {
        let mut entity = Entity::make("foo");
        entity.set("p1", "v1").set("p3", "v3");
        assert_eq!(entity.remove("p3"), Some(Value::from("v3")));
        assert!(entity.get("p3").is_none());
        assert_eq!(entity.get("p1"), Some(&Value::from("v1")));
    }

    #[test]
    fn test_id_hint_leaves_id_unset() {
        let mut entity = Entity::make("foo");
        entity.set_id_hint("first").set("p1", "v1");
        assert_eq!(entity.id_hint(), Some("first"));
        assert_eq!(entity.id(), None);

        let entity = entity.with_id_hint("second");
        assert_eq!(entity.id_hint(), Some("second"));
    }

    #[test]
    fn test_check_fields_rejects_reserved_names() {
        let mut entity = Entity::make("foo");
        entity.set("limit$", 3);
        assert!(matches!(
            entity.check_fields(),
            Err(BackendError::InvalidEntity { .. })
        ));

        let ok = Entity::make("foo").with("p1", "v1");
        assert!(ok.check_fields().is_ok());
    }

    #[test]
    fn test_clone_is_independent() {
        let original = Entity::make("foo").with("arr", Value::from_iter([2, 3]));
        let mut copy = original.clone();
        copy.get_mut("arr").and_then(Value::as_list_mut).unwrap().push(Value::from(4));

        assert_eq!(original.get("arr"), Some(&Value::from_iter([2, 3])));
        assert!(!original.same_record(&copy));
    }

    #[test]
    fn test_fresh_keeps_namespace_only() {
        let entity = Entity::make("product").with("name", "apple").with_id("x");
        let fresh = entity.fresh();
        assert_eq!(fresh.namespace(), entity.namespace());
        assert!(fresh.id().is_none());
        assert!(fresh.fields().is_empty());
    }
}
