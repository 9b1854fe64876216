//! Process-wide cache of type descriptors.
//!
//! Schema-derived descriptors are built once per type identity and reused
//! for the process lifetime; the schema is fixed at build time, so entries
//! are never invalidated. This is the only shared mutable state in the
//! crate: population is synchronized, steady-state lookups only take a read
//! lock.

use crate::schema::TypeDescriptor;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

/// Memoizing store mapping a stable type identity to its descriptor.
#[derive(Debug, Default)]
pub struct DescriptorCache {
    inner: RwLock<HashMap<String, Arc<TypeDescriptor>>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        DescriptorCache::default()
    }

    /// Return the cached descriptor for `type_id`, building it on first use.
    ///
    /// `build` runs outside the write lock, so two threads racing on a cold
    /// entry may both build; the first insert wins and the loser's copy is
    /// dropped. Descriptors are immutable, so both copies are equivalent.
    pub fn descriptor_for<F>(&self, type_id: &str, build: F) -> Arc<TypeDescriptor>
    where
        F: FnOnce() -> Arc<TypeDescriptor>,
    {
        if let Some(found) = self.inner.read().expect("descriptor cache poisoned").get(type_id) {
            return Arc::clone(found);
        }
        let built = build();
        let mut map = self.inner.write().expect("descriptor cache poisoned");
        Arc::clone(map.entry(type_id.to_string()).or_insert(built))
    }

    /// Look up a descriptor that has already been registered.
    pub fn get(&self, type_id: &str) -> Option<Arc<TypeDescriptor>> {
        self.inner
            .read()
            .expect("descriptor cache poisoned")
            .get(type_id)
            .map(Arc::clone)
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("descriptor cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The process-wide cache. Bindings that mirror the classic static
/// descriptor-per-type pattern register here; callers that want isolated
/// lifetimes (tests, multiple schema versions in one process) construct
/// their own [`DescriptorCache`].
pub fn global() -> &'static DescriptorCache {
    static GLOBAL: OnceLock<DescriptorCache> = OnceLock::new();
    GLOBAL.get_or_init(DescriptorCache::new)
}
