//! Property filters - decide whether an entity gets published
//!
//! A [`Predicate`] is evaluated against the property set an entity was
//! announced with. Any `Fn(&Properties) -> bool` closure is a predicate;
//! [`PropertyFilter`] is a serialisable conjunction of conditions for the
//! common cases (equality, presence, glob matching).
//!
//! ```rust
//! use serde_json::json;
//! use whiteboard_core::filter::{to_properties, Predicate, PropertyFilter};
//!
//! let filter = PropertyFilter::new()
//!     .equals("active", json!(true))
//!     .like("osgi.jaxrs.name", "app*");
//!
//! let props = to_properties(json!({"active": true, "osgi.jaxrs.name": "app.users"}));
//! assert!(filter.matches(&props).unwrap());
//! ```

mod property_filter;

pub use property_filter::{Condition, PropertyFilter};

use std::collections::HashMap;

use serde_json::Value;

use crate::error::Result;

/// Properties an entity is announced with
pub type Properties = HashMap<String, Value>;

/// Boolean function over a property set
///
/// Implementations are expected to be fast and free of side effects; they
/// are called synchronously on the publishing thread.
pub trait Predicate: Send + Sync {
    /// Returns whether `properties` satisfy this predicate
    fn matches(&self, properties: &Properties) -> Result<bool>;
}

impl<F> Predicate for F
where
    F: Fn(&Properties) -> bool + Send + Sync,
{
    fn matches(&self, properties: &Properties) -> Result<bool> {
        Ok(self(properties))
    }
}

/// Convert a JSON object into a property set
///
/// Non-object values yield an empty set.
pub fn to_properties(value: Value) -> Properties {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => Properties::new(),
    }
}
