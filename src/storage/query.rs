//! Query - Selectors, directives and raw queries
//!
//! TigerStyle: Directives parsed once into typed fields.
//!
//! A selector is an AND of exact field matches plus the `sort$`, `skip$`,
//! `limit$` and `all$` directives. Sorting happens before skipping, skipping
//! before limiting; ties keep the backend's natural storage order.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entity::Entity;
use super::error::{BackendError, BackendResult};
use super::value::Value;
use crate::{DIRECTIVE_SUFFIX, ID_FIELD};

// =============================================================================
// Sort Order
// =============================================================================

/// Direction for one `sort$` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// `1`
    Ascending,
    /// `-1`
    Descending,
}

impl SortOrder {
    /// Parse the numeric `sort$` convention: positive ascends, negative
    /// descends.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value.as_i64()? {
            n if n > 0 => Some(Self::Ascending),
            n if n < 0 => Some(Self::Descending),
            _ => None,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

// =============================================================================
// Selector
// =============================================================================

/// Field-name to exact-value filter with query directives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    fields: BTreeMap<String, Value>,
    sort: Vec<(String, SortOrder)>,
    limit: Option<usize>,
    skip: Option<usize>,
    all: bool,
}

impl Selector {
    /// Empty selector: matches every record in the namespace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Match every record and, for `remove`, remove them all (`all$: true`).
    #[must_use]
    pub fn everything() -> Self {
        Self::new().with_all(true)
    }

    /// Match a single record id.
    #[must_use]
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().matching(ID_FIELD, id.into())
    }

    /// Require `field` to equal `value`.
    #[must_use]
    pub fn matching(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Append a sort key; earlier keys take precedence.
    #[must_use]
    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push((field.into(), order));
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    #[must_use]
    pub fn with_all(mut self, all: bool) -> Self {
        self.all = all;
        self
    }

    /// Parse a JSON object selector, pulling out `sort$`, `limit$`, `skip$`
    /// and `all$`.
    ///
    /// Negative or fractional `limit$`/`skip$` values are ignored.
    ///
    /// # Errors
    /// `BackendError::InvalidQuery` if `json` is not an object or a `sort$`
    /// entry is not a non-zero number.
    pub fn from_json(json: &serde_json::Value) -> BackendResult<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| BackendError::invalid_query(format!("selector must be an object: {json}")))?;

        let mut selector = Self::new();
        for (key, raw) in object {
            let value = Value::from(raw.clone());
            let Some(directive) = key.strip_suffix(DIRECTIVE_SUFFIX) else {
                selector.fields.insert(key.clone(), value);
                continue;
            };

            match directive {
                "sort" => {
                    let keys = raw.as_object().ok_or_else(|| {
                        BackendError::invalid_query(format!("sort$ must be an object: {raw}"))
                    })?;
                    for (field, direction) in keys {
                        let order = SortOrder::from_value(&Value::from(direction.clone()))
                            .ok_or_else(|| {
                                BackendError::invalid_query(format!(
                                    "sort$ direction for `{field}` must be 1 or -1, got {direction}"
                                ))
                            })?;
                        selector.sort.push((field.clone(), order));
                    }
                }
                "limit" => selector.limit = count_directive(&value),
                "skip" => selector.skip = count_directive(&value),
                "all" => selector.all = value.as_bool().unwrap_or(false),
                _ => tracing::debug!(directive, "ignoring unknown query directive"),
            }
        }

        Ok(selector)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    #[must_use]
    pub fn sort(&self) -> &[(String, SortOrder)] {
        &self.sort
    }

    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    #[must_use]
    pub fn skip(&self) -> Option<usize> {
        self.skip
    }

    /// `all$`: remove every match instead of the first.
    #[must_use]
    pub fn all(&self) -> bool {
        self.all
    }

    // -------------------------------------------------------------------------
    // Evaluation
    // -------------------------------------------------------------------------

    /// True when `entity` satisfies every field match.
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        self.fields.iter().all(|(field, expected)| {
            if field == ID_FIELD {
                entity.id() == Some(expected.to_text().as_str())
            } else {
                entity.get(field) == Some(expected)
            }
        })
    }

    /// Apply `sort$`, then `skip$`, then `limit$` to `entities`, which must
    /// already be filtered and in natural storage order.
    #[must_use]
    pub fn paginate(&self, mut entities: Vec<Entity>) -> Vec<Entity> {
        if !self.sort.is_empty() {
            entities.sort_by(|a, b| {
                for (field, order) in &self.sort {
                    let ordering = compare_field(a, b, field);
                    if ordering != Ordering::Equal {
                        return order.apply(ordering);
                    }
                }
                Ordering::Equal
            });
        }

        entities
            .into_iter()
            .skip(self.skip.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

fn count_directive(value: &Value) -> Option<usize> {
    value.as_i64().and_then(|n| usize::try_from(n).ok())
}

fn compare_field(a: &Entity, b: &Entity, field: &str) -> Ordering {
    if field == ID_FIELD {
        return a.id().cmp(&b.id());
    }
    match (a.get(field), b.get(field)) {
        (Some(x), Some(y)) => x.sort_cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// =============================================================================
// Query
// =============================================================================

/// What `list` is asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Exact-match selector with directives
    Selector(Selector),
    /// Backend-native query text
    Raw(String),
    /// Backend-native query text with positional parameters
    Parameterized { sql: String, params: Vec<Value> },
}

impl Query {
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(sql.into())
    }

    #[must_use]
    pub fn parameterized(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self::Parameterized {
            sql: sql.into(),
            params,
        }
    }

    /// Interpret a JSON query: a string is raw, an array is
    /// `[sql, params...]` (a lone string in an array is raw), an object is a
    /// selector.
    ///
    /// # Errors
    /// `BackendError::InvalidQuery` for any other shape.
    pub fn from_json(json: &serde_json::Value) -> BackendResult<Self> {
        match json {
            serde_json::Value::String(sql) => Ok(Self::raw(sql.clone())),
            serde_json::Value::Array(items) => {
                let (head, rest) = items
                    .split_first()
                    .ok_or_else(|| BackendError::invalid_query("empty query array"))?;
                let sql = head.as_str().ok_or_else(|| {
                    BackendError::invalid_query(format!("query array must start with text: {head}"))
                })?;
                if rest.is_empty() {
                    return Ok(Self::raw(sql));
                }
                let params = rest.iter().cloned().map(Value::from).collect();
                Ok(Self::parameterized(sql, params))
            }
            serde_json::Value::Object(_) => Selector::from_json(json).map(Self::Selector),
            other => Err(BackendError::invalid_query(format!(
                "unsupported query shape: {other}"
            ))),
        }
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::Selector(Selector::new())
    }
}

impl From<Selector> for Query {
    fn from(selector: Selector) -> Self {
        Self::Selector(selector)
    }
}

// =============================================================================
// Load Criteria
// =============================================================================

/// What `load` looks for: an id or a selector.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadCriteria {
    Id(String),
    Selector(Selector),
}

impl LoadCriteria {
    /// True when `entity` is a hit for these criteria.
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        match self {
            Self::Id(id) => entity.id() == Some(id.as_str()),
            Self::Selector(selector) => selector.matches(entity),
        }
    }
}

impl From<&str> for LoadCriteria {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for LoadCriteria {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<Selector> for LoadCriteria {
    fn from(selector: Selector) -> Self {
        Self::Selector(selector)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn foos() -> Vec<Entity> {
        ["v2", "v1", "v3"]
            .iter()
            .enumerate()
            .map(|(i, p1)| Entity::make("foo").with("p1", *p1).with_id(format!("id{i}")))
            .collect()
    }

    fn p1s(entities: &[Entity]) -> Vec<String> {
        entities.iter().map(|e| e.get("p1").unwrap().to_text()).collect()
    }

    #[test]
    fn test_selector_from_json_parses_directives() {
        let selector = Selector::from_json(&json!({
            "p1": "v1",
            "sort$": {"p1": 1, "p2": -1},
            "limit$": 2,
            "skip$": 1,
            "all$": true
        }))
        .unwrap();

        assert_eq!(selector.fields().len(), 1);
        assert_eq!(
            selector.sort(),
            &[
                ("p1".to_string(), SortOrder::Ascending),
                ("p2".to_string(), SortOrder::Descending)
            ]
        );
        assert_eq!(selector.limit(), Some(2));
        assert_eq!(selector.skip(), Some(1));
        assert!(selector.all());
    }

    #[test]
    fn test_selector_ignores_negative_counts() {
        let selector = Selector::from_json(&json!({"limit$": -1, "skip$": 1.5})).unwrap();
        assert_eq!(selector.limit(), None);
        assert_eq!(selector.skip(), None);
    }

    #[test]
    fn test_selector_ignores_counts_beyond_i64() {
        let selector = Selector::from_json(&json!({"limit$": 1.0e30, "skip$": 2.0})).unwrap();
        assert_eq!(selector.limit(), None);
        assert_eq!(selector.skip(), Some(2));
    }

    #[test]
    fn test_selector_rejects_bad_sort() {
        let result = Selector::from_json(&json!({"sort$": {"p1": 0}}));
        assert!(matches!(result, Err(BackendError::InvalidQuery { .. })));
    }

    #[test]
    fn test_matches_is_conjunction() {
        let entity = Entity::make("foo").with("p1", "v1x").with("p2", "v2").with_id("a");

        assert!(Selector::new().matches(&entity));
        assert!(Selector::new().matching("p1", "v1x").matching("p2", "v2").matches(&entity));
        assert!(!Selector::new().matching("p1", "v1").matching("p2", "v2").matches(&entity));
        assert!(Selector::by_id("a").matches(&entity));
        assert!(!Selector::by_id("b").matches(&entity));
    }

    #[test]
    fn test_paginate_sorts_before_skip_and_limit() {
        let asc = Selector::new().with_sort("p1", SortOrder::Ascending);
        assert_eq!(p1s(&asc.paginate(foos())), vec!["v1", "v2", "v3"]);

        let desc = Selector::new().with_sort("p1", SortOrder::Descending);
        assert_eq!(p1s(&desc.paginate(foos())), vec!["v3", "v2", "v1"]);

        let window = asc.clone().with_limit(1).with_skip(1);
        assert_eq!(p1s(&window.paginate(foos())), vec!["v2"]);

        let past_end = Selector::new().with_limit(2).with_skip(3);
        assert!(past_end.paginate(foos()).is_empty());

        let short = asc.with_limit(5).with_skip(2);
        assert_eq!(p1s(&short.paginate(foos())), vec!["v3"]);
    }

    #[test]
    fn test_paginate_without_sort_keeps_natural_order() {
        let page = Selector::new().with_limit(2).paginate(foos());
        assert_eq!(p1s(&page), vec!["v2", "v1"]);
    }

    #[test]
    fn test_query_from_json_shapes() {
        assert_eq!(
            Query::from_json(&json!("SELECT * FROM product")).unwrap(),
            Query::raw("SELECT * FROM product")
        );
        assert_eq!(
            Query::from_json(&json!(["SELECT * FROM product WHERE price >= ?", 0])).unwrap(),
            Query::parameterized("SELECT * FROM product WHERE price >= ?", vec![Value::from(0)])
        );
        assert_eq!(
            Query::from_json(&json!(["SELECT 1"])).unwrap(),
            Query::raw("SELECT 1")
        );
        assert!(matches!(
            Query::from_json(&json!({"p1": "v1"})).unwrap(),
            Query::Selector(_)
        ));
        assert!(Query::from_json(&json!(42)).is_err());
        assert!(Query::from_json(&json!([])).is_err());
    }
}
