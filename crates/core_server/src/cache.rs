//! Memoization of capability lookups.

use dashmap::DashMap;
use module_api::{CapabilityId, Module, ModuleList};
use std::sync::Arc;
use tracing::trace;

/// Maps a capability to the modules satisfying it.
///
/// Entries are a pure function of the module set. The set never changes once
/// discovery is over, so entries are never invalidated.
#[derive(Default)]
pub(crate) struct CapabilityCache {
    entries: DashMap<CapabilityId, ModuleList>,
}

impl CapabilityCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the cached lookup for `capability`, filtering `modules` on a miss.
    pub(crate) fn lookup(&self, capability: CapabilityId, modules: &[Arc<dyn Module>]) -> ModuleList {
        if let Some(hit) = self.entries.get(&capability) {
            return hit.clone();
        }

        trace!("Searching for modules compatible with {}", capability);
        // No shard lock may be held here: `satisfies` is module code and may look up again.
        let filtered = filter(capability, modules);
        let found = self.entries.entry(capability).or_insert(filtered).clone();
        trace!(
            "Found {} modules for {}, the result was cached. Cache size: {}",
            found.len(),
            capability,
            self.entries.len()
        );
        found
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Every module satisfying `capability`, keeping module-set order.
pub(crate) fn filter(capability: CapabilityId, modules: &[Arc<dyn Module>]) -> ModuleList {
    modules
        .iter()
        .filter(|module| module.satisfies(capability))
        .cloned()
        .collect()
}
