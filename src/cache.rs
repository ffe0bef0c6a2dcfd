//! Process-wide cache of column bindings per record type.
//!
//! Descriptors are discovered lazily the first time a type is mapped and are
//! never evicted. Concurrent first use may discover the same type more than
//! once; only the first committed descriptor is kept and every caller ends up
//! holding that one.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::{
        Arc, OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
};

use log::debug;
use parking_lot::RwLock;

use crate::record::{FieldKind, FieldSet, FieldSetter, Record};

/// Bound field of a record type, as stored in the cache.
pub struct FieldHandle<T> {
    pub field: &'static str,
    pub column: &'static str,
    pub setter: FieldSetter<T>,
}

impl<T> FieldHandle<T> {
    pub fn kind(&self) -> Option<FieldKind> {
        self.setter.kind()
    }

    pub fn declared_type(&self) -> &'static str {
        self.setter.declared_type()
    }
}

impl<T> Clone for FieldHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FieldHandle<T> {}

impl<T> fmt::Debug for FieldHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldHandle")
            .field("field", &self.field)
            .field("column", &self.column)
            .field("declared", &self.declared_type())
            .finish()
    }
}

/// Column name to field handle mapping for one record type.
pub struct MappingDescriptor<T> {
    record: &'static str,
    handles: HashMap<&'static str, FieldHandle<T>>,
}

impl<T: Record> MappingDescriptor<T> {
    /// Runs the type's declarations and keeps every field bound to a column.
    /// When two fields claim the same column the later declaration wins.
    pub fn discover() -> Self {
        let mut fields = FieldSet::new();
        T::declare(&mut fields);
        let mut handles = HashMap::with_capacity(fields.len());
        for decl in fields.into_decls() {
            let Some(column) = decl.column else {
                continue;
            };
            handles.insert(
                column,
                FieldHandle {
                    field: decl.field,
                    column,
                    setter: decl.setter,
                },
            );
        }
        MappingDescriptor {
            record: T::type_name(),
            handles,
        }
    }
}

impl<T> MappingDescriptor<T> {
    pub fn record(&self) -> &'static str {
        self.record
    }

    pub fn lookup(&self, column: &str) -> Option<&FieldHandle<T>> {
        self.handles.get(column)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns: Vec<_> = self.handles.keys().copied().collect();
        columns.sort_unstable();
        columns
    }
}

impl<T> fmt::Debug for MappingDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingDescriptor")
            .field("record", &self.record)
            .field("columns", &self.columns())
            .finish()
    }
}

type Entry = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct MetadataCache {
    entries: RwLock<HashMap<TypeId, Entry>>,
    discoveries: AtomicUsize,
}

static GLOBAL_CACHE: OnceLock<MetadataCache> = OnceLock::new();

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache shared by every mapper in the process.
    pub fn global() -> &'static MetadataCache {
        GLOBAL_CACHE.get_or_init(MetadataCache::new)
    }

    /// Returns the committed descriptor for `T`, discovering it on first use.
    pub fn ensure_cached<T: Record>(&self) -> Arc<MappingDescriptor<T>> {
        if let Some(found) = self.get::<T>() {
            return found;
        }

        let candidate = Arc::new(MappingDescriptor::<T>::discover());
        self.discoveries.fetch_add(1, Ordering::Relaxed);

        let committed = {
            let mut entries = self.entries.write();
            let entry = entries
                .entry(TypeId::of::<T>())
                .or_insert_with(|| Arc::clone(&candidate) as Entry);
            Arc::clone(entry)
        };
        match committed.downcast::<MappingDescriptor<T>>() {
            Ok(winner) => {
                if Arc::ptr_eq(&winner, &candidate) {
                    debug!(
                        "Cached {} column binding(s) for {}",
                        winner.len(),
                        winner.record()
                    );
                }
                winner
            }
            // Entries are keyed by the TypeId of their own descriptor type.
            Err(_) => candidate,
        }
    }

    /// Committed descriptor for `T`, if any.
    pub fn get<T: Record>(&self) -> Option<Arc<MappingDescriptor<T>>> {
        let entry = self.entries.read().get(&TypeId::of::<T>()).cloned()?;
        entry.downcast::<MappingDescriptor<T>>().ok()
    }

    pub fn lookup<T: Record>(&self, column: &str) -> Option<FieldHandle<T>> {
        self.get::<T>()?.lookup(column).copied()
    }

    pub fn contains<T: Record>(&self) -> bool {
        self.entries.read().contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of descriptor discoveries run so far, including ones that lost
    /// a concurrent race.
    pub fn discoveries(&self) -> usize {
        self.discoveries.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataCache")
            .field("types", &self.len())
            .field("discoveries", &self.discoveries())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[derive(Default)]
    struct Sample {
        host: String,
        alias: String,
        value: f64,
    }

    impl Record for Sample {
        fn measurement() -> Option<&'static str> {
            Some("sample")
        }

        fn declare(fields: &mut FieldSet<Self>) {
            fields
                .text("host", "host", |r, v| r.host = v)
                .unbound("ignored", FieldSetter::Float(|r, v| r.value = v))
                .float("value", "value", |r, v| r.value = v)
                .text("alias", "host", |r, v| r.alias = v);
        }

        fn instantiate() -> Result<Self, String> {
            Ok(Self::default())
        }
    }

    #[test]
    fn discovery_keeps_only_bound_fields() {
        let descriptor = MappingDescriptor::<Sample>::discover();
        assert_eq!(descriptor.columns(), vec!["host", "value"]);
        assert!(descriptor.lookup("ignored").is_none());
        assert_eq!(descriptor.lookup("host").map(|h| h.field), Some("alias"));
        assert_eq!(
            descriptor.lookup("value").and_then(|h| h.kind()),
            Some(FieldKind::Float)
        );
    }

    #[test]
    fn ensure_cached_is_idempotent() {
        let cache = MetadataCache::new();
        assert!(cache.lookup::<Sample>("host").is_none());
        let first = cache.ensure_cached::<Sample>();
        let second = cache.ensure_cached::<Sample>();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.discoveries(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains::<Sample>());
        assert_eq!(cache.lookup::<Sample>("value").map(|h| h.field), Some("value"));
    }

    #[test]
    fn concurrent_first_use_converges_on_one_descriptor() {
        let cache = Arc::new(MetadataCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.ensure_cached::<Sample>())
            })
            .collect();
        let descriptors: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread join"))
            .collect();
        let committed = cache.get::<Sample>().expect("descriptor committed");
        for descriptor in &descriptors {
            assert!(Arc::ptr_eq(descriptor, &committed));
        }
        assert_eq!(cache.len(), 1);
        assert!(cache.discoveries() >= 1);
    }
}
