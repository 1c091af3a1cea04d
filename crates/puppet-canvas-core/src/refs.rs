//! Per-root reference tables
//!
//! Every object the executor hands back to the controller lives in exactly one
//! reference table until the whole root is released. There is no per-entry
//! release; teardown is whole-root only.

use crate::object::ScriptObject;
use crate::wire::Reference;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps reference ids to the live objects they denote, for one root.
///
/// Ids come from a monotonic counter scoped to the table, so they are unique
/// for the table's lifetime by construction.
#[derive(Default)]
pub struct ReferenceTable {
    next_id: u64,
    entries: HashMap<String, Arc<dyn ScriptObject>>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retains `object` and mints the reference marker the controller gets
    /// instead of the object itself.
    pub fn export(&mut self, object: Arc<dyn ScriptObject>) -> Reference {
        self.next_id += 1;
        let id = format!("r{}", self.next_id);
        self.entries.insert(id.clone(), object);
        Reference::new(id)
    }

    /// Looks up a previously exported object. Absent ids (including ids
    /// minted under a different root) yield `None`, never an error.
    pub fn resolve(&self, id: &str) -> Option<Arc<dyn ScriptObject>> {
        self.entries.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ScriptValue;

    struct Dummy;

    impl ScriptObject for Dummy {
        fn get(&self, _prop: &str) -> Option<ScriptValue> {
            None
        }
    }

    #[test]
    fn test_ids_are_monotonic_and_distinct() {
        let mut table = ReferenceTable::new();
        let a = table.export(Arc::new(Dummy));
        let b = table.export(Arc::new(Dummy));
        let c = table.export(Arc::new(Dummy));

        assert_eq!(a.id, "r1");
        assert_eq!(b.id, "r2");
        assert_eq!(c.id, "r3");
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_resolve_returns_same_object() {
        let mut table = ReferenceTable::new();
        let object: Arc<dyn ScriptObject> = Arc::new(Dummy);
        let reference = table.export(Arc::clone(&object));

        let resolved = table.resolve(&reference.id).expect("present");
        assert!(Arc::ptr_eq(&resolved, &object));
    }

    #[test]
    fn test_absent_id_is_nothing() {
        let table = ReferenceTable::new();
        assert!(table.resolve("r1").is_none());
        assert!(table.resolve("garbage").is_none());
    }

    #[test]
    fn test_tables_do_not_share_ids() {
        let mut first = ReferenceTable::new();
        let mut second = ReferenceTable::new();

        let a = first.export(Arc::new(Dummy));
        let b = second.export(Arc::new(Dummy));

        // Same id text, disjoint tables
        assert_eq!(a.id, b.id);
        assert!(first.resolve(&a.id).is_some());
        assert!(second.resolve(&b.id).is_some());

        let mut third = ReferenceTable::new();
        assert!(third.resolve(&a.id).is_none());
        third.export(Arc::new(Dummy));
        assert_eq!(third.len(), 1);
    }
}
