//! Property filter - conjunction of conditions over a property set

use glob::Pattern;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, WhiteboardError};
use crate::filter::{Predicate, Properties};

/// A single condition on one property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    /// Property is present and equal to `value`
    Equals { key: String, value: Value },
    /// Property is present, whatever its value
    Present { key: String },
    /// Property is not present
    Absent { key: String },
    /// Property equals one of `values`, or is an array containing one of them
    AnyOf { key: String, values: Vec<Value> },
    /// String property (or any string element of an array property) matches a glob
    Like { key: String, pattern: String },
    /// Nested filter does not match
    Not { filter: PropertyFilter },
}

impl Condition {
    fn evaluate(&self, properties: &Properties) -> Result<bool> {
        let matched = match self {
            Condition::Equals { key, value } => properties.get(key) == Some(value),
            Condition::Present { key } => properties.contains_key(key),
            Condition::Absent { key } => !properties.contains_key(key),
            Condition::AnyOf { key, values } => match properties.get(key) {
                Some(Value::Array(items)) => items.iter().any(|item| values.contains(item)),
                Some(value) => values.contains(value),
                None => false,
            },
            Condition::Like { key, pattern } => {
                let pattern = compile(pattern).map_err(|reason| {
                    WhiteboardError::PredicateFailed { reason }
                })?;
                match properties.get(key) {
                    Some(Value::String(s)) => pattern.matches(s),
                    Some(Value::Array(items)) => items
                        .iter()
                        .filter_map(Value::as_str)
                        .any(|s| pattern.matches(s)),
                    _ => false,
                }
            }
            Condition::Not { filter } => !filter.evaluate(properties)?,
        };
        Ok(matched)
    }

    fn validate(&self) -> Result<()> {
        match self {
            Condition::Like { pattern, .. } => compile(pattern)
                .map(|_| ())
                .map_err(|reason| WhiteboardError::InvalidFilter { reason }),
            Condition::Not { filter } => filter.validate(),
            _ => Ok(()),
        }
    }
}

fn compile(pattern: &str) -> std::result::Result<Pattern, String> {
    Pattern::new(pattern).map_err(|e| format!("bad pattern '{}': {}", pattern, e))
}

/// Conjunction of [`Condition`]s. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    conditions: Vec<Condition>,
}

impl PropertyFilter {
    /// Create a filter that matches everything
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equals(mut self, key: impl Into<String>, value: Value) -> Self {
        self.conditions.push(Condition::Equals { key: key.into(), value });
        self
    }

    pub fn present(mut self, key: impl Into<String>) -> Self {
        self.conditions.push(Condition::Present { key: key.into() });
        self
    }

    pub fn absent(mut self, key: impl Into<String>) -> Self {
        self.conditions.push(Condition::Absent { key: key.into() });
        self
    }

    pub fn any_of(mut self, key: impl Into<String>, values: Vec<Value>) -> Self {
        self.conditions.push(Condition::AnyOf { key: key.into(), values });
        self
    }

    pub fn like(mut self, key: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.conditions.push(Condition::Like {
            key: key.into(),
            pattern: pattern.into(),
        });
        self
    }

    pub fn not(mut self, filter: PropertyFilter) -> Self {
        self.conditions.push(Condition::Not { filter });
        self
    }

    /// Conditions in evaluation order
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Whether this filter has no conditions
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Check that every glob pattern compiles
    pub fn validate(&self) -> Result<()> {
        self.conditions.iter().try_for_each(Condition::validate)
    }

    /// Evaluate all conditions, stopping at the first that fails
    pub fn evaluate(&self, properties: &Properties) -> Result<bool> {
        for condition in &self.conditions {
            if !condition.evaluate(properties)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl Predicate for PropertyFilter {
    fn matches(&self, properties: &Properties) -> Result<bool> {
        self.evaluate(properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::to_properties;
    use serde_json::json;

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = PropertyFilter::new();
        assert!(filter.is_empty());
        assert!(filter.evaluate(&Properties::new()).unwrap());
        assert!(filter.evaluate(&to_properties(json!({"x": 1}))).unwrap());
    }

    #[test]
    fn test_equals_and_presence() {
        let filter = PropertyFilter::new()
            .equals("active", json!(true))
            .present("osgi.jaxrs.resource")
            .absent("osgi.jaxrs.extension");

        let props = to_properties(json!({"active": true, "osgi.jaxrs.resource": "true"}));
        assert!(filter.evaluate(&props).unwrap());

        let props = to_properties(json!({"active": "true", "osgi.jaxrs.resource": "true"}));
        assert!(!filter.evaluate(&props).unwrap());

        let props = to_properties(json!({
            "active": true,
            "osgi.jaxrs.resource": "true",
            "osgi.jaxrs.extension": "true"
        }));
        assert!(!filter.evaluate(&props).unwrap());
    }

    #[test]
    fn test_any_of_scalar_and_array() {
        let filter = PropertyFilter::new().any_of("objectClass", vec![json!("Feature"), json!("Filter")]);

        assert!(filter.evaluate(&to_properties(json!({"objectClass": "Filter"}))).unwrap());
        assert!(filter
            .evaluate(&to_properties(json!({"objectClass": ["Object", "Feature"]})))
            .unwrap());
        assert!(!filter.evaluate(&to_properties(json!({"objectClass": "Servlet"}))).unwrap());
        assert!(!filter.evaluate(&Properties::new()).unwrap());
    }

    #[test]
    fn test_like_glob() {
        let filter = PropertyFilter::new().like("osgi.jaxrs.name", "app.*");

        assert!(filter.evaluate(&to_properties(json!({"osgi.jaxrs.name": "app.users"}))).unwrap());
        assert!(filter
            .evaluate(&to_properties(json!({"osgi.jaxrs.name": ["other", "app.orders"]})))
            .unwrap());
        assert!(!filter.evaluate(&to_properties(json!({"osgi.jaxrs.name": "users"}))).unwrap());
        assert!(!filter.evaluate(&to_properties(json!({"osgi.jaxrs.name": 7}))).unwrap());
    }

    #[test]
    fn test_not() {
        let filter = PropertyFilter::new().not(PropertyFilter::new().equals("hidden", json!(true)));

        assert!(filter.evaluate(&Properties::new()).unwrap());
        assert!(!filter.evaluate(&to_properties(json!({"hidden": true}))).unwrap());
    }

    #[test]
    fn test_bad_pattern() {
        let filter = PropertyFilter::new().like("name", "[unclosed");

        let err = filter.validate().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_FILTER");

        let err = filter.evaluate(&to_properties(json!({"name": "x"}))).unwrap_err();
        assert_eq!(err.error_code(), "PREDICATE_FAILED");
    }

    #[test]
    fn test_serde_shape() {
        let filter = PropertyFilter::new()
            .equals("active", json!(true))
            .not(PropertyFilter::new().present("hidden"));

        let value = serde_json::to_value(&filter).unwrap();
        assert_eq!(
            value,
            json!({
                "conditions": [
                    {"op": "equals", "key": "active", "value": true},
                    {"op": "not", "filter": {"conditions": [{"op": "present", "key": "hidden"}]}}
                ]
            })
        );

        let parsed: PropertyFilter = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, filter);
    }
}
