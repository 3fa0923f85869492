//! Identity key for tracked entities

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Map key comparing entities by allocation, not by value
///
/// The key keeps its `Arc` alive, so the address cannot be reused by another
/// entity while it is tracked. Two value-equal entities in separate
/// allocations are distinct keys.
pub struct EntityKey<T>(Arc<T>);

impl<T> EntityKey<T> {
    pub fn new(entity: &Arc<T>) -> Self {
        Self(Arc::clone(entity))
    }

    pub fn entity(&self) -> &Arc<T> {
        &self.0
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl<T> Clone for EntityKey<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> PartialEq for EntityKey<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Eq for EntityKey<T> {}

impl<T> Hash for EntityKey<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl<T> fmt::Debug for EntityKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityKey({:#x})", self.addr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_value_equal_entities_are_distinct() {
        let a = Arc::new("resource".to_string());
        let b = Arc::new("resource".to_string());
        assert_eq!(a, b);

        let mut keys = HashSet::new();
        keys.insert(EntityKey::new(&a));
        keys.insert(EntityKey::new(&b));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_clones_of_same_arc_are_equal() {
        let a = Arc::new(42u32);
        let alias = Arc::clone(&a);

        assert_eq!(EntityKey::new(&a), EntityKey::new(&alias));

        let mut keys = HashSet::new();
        keys.insert(EntityKey::new(&a));
        assert!(!keys.insert(EntityKey::new(&alias)));
    }
}
