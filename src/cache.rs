use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::types::Polyline;

/// Resolved routes keyed by bounding-box key.
///
/// `None` entries record that the area has no route. Clones share the same
/// entries; entries live until [`RouteCache::clear`].
#[derive(Debug, Clone, Default)]
pub struct RouteCache {
    entries: Rc<RefCell<HashMap<String, Option<Polyline>>>>,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outer `None` is a miss; `Some(None)` is a cached "no route".
    pub fn get(&self, key: &str) -> Option<Option<Polyline>> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn set(&self, key: String, route: Option<Polyline>) {
        self.entries.borrow_mut().insert(key, route);
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
