//! Interned object names.
//!
//! Each distinct name string is stored once and shared by every object that
//! carries it. Objects map to names by handle.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::handle::GameObjectHandle;

/// String interner plus the handle → name map.
#[derive(Default)]
pub(crate) struct NameTable {
    interned: HashSet<Arc<str>>,
    by_object: HashMap<GameObjectHandle, Arc<str>>,
}

impl NameTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, name: &str) -> Arc<str> {
        if let Some(existing) = self.interned.get(name) {
            return Arc::clone(existing);
        }
        let symbol: Arc<str> = Arc::from(name);
        self.interned.insert(Arc::clone(&symbol));
        symbol
    }

    /// Sets or replaces the name of `object`. An empty name clears it.
    pub(crate) fn set(&mut self, object: GameObjectHandle, name: &str) {
        if name.is_empty() {
            self.remove(object);
            return;
        }
        let symbol = self.intern(name);
        if let Some(previous) = self.by_object.insert(object, symbol) {
            self.release(&previous);
        }
    }

    pub(crate) fn get(&self, object: GameObjectHandle) -> Option<&str> {
        self.by_object.get(&object).map(|name| &**name)
    }

    pub(crate) fn remove(&mut self, object: GameObjectHandle) {
        if let Some(previous) = self.by_object.remove(&object) {
            self.release(&previous);
        }
    }

    /// Drops the interned string once only the interner still holds it.
    fn release(&mut self, symbol: &Arc<str>) {
        // One reference in `interned`, one held by the caller.
        if Arc::strong_count(symbol) <= 2 {
            self.interned.remove(&**symbol);
        }
    }

    /// Objects carrying `name`, in unspecified order.
    pub(crate) fn find(&self, name: &str) -> impl Iterator<Item = GameObjectHandle> + '_ {
        let symbol = self.interned.get(name).cloned();
        self.by_object
            .iter()
            .filter(move |(_, value)| symbol.as_ref().is_some_and(|s| Arc::ptr_eq(s, value)))
            .map(|(handle, _)| *handle)
    }
}
