//! The pluggable enumeration of module loaders a server is built from.

use module_api::ModuleLoader;
use std::sync::Arc;
use tracing::warn;

/// Ordered list of module loaders handed to a [`CoreServer`](crate::CoreServer).
///
/// Discovery is a pure function of this list: loaders are asked for their
/// modules in registration order and nothing is looked up from ambient state.
#[derive(Default, Clone)]
pub struct LoaderRegistry {
    loaders: Vec<Arc<dyn ModuleLoader>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a loader.
    pub fn register(&mut self, loader: impl ModuleLoader) -> &mut Self {
        self.register_shared(Arc::new(loader))
    }

    /// Appends a loader that is already shared.
    pub fn register_shared(&mut self, loader: Arc<dyn ModuleLoader>) -> &mut Self {
        if self.loaders.iter().any(|l| l.name() == loader.name()) {
            warn!(
                "Registering a second module loader named {} ({})",
                loader.name(),
                loader.type_name()
            );
        }
        self.loaders.push(loader);
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, loader: impl ModuleLoader) -> Self {
        self.register(loader);
        self
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.loaders.iter().map(|l| l.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ModuleLoader>> {
        self.loaders.iter()
    }

    pub(crate) fn into_loaders(self) -> Vec<Arc<dyn ModuleLoader>> {
        self.loaders
    }
}

impl FromIterator<Arc<dyn ModuleLoader>> for LoaderRegistry {
    fn from_iter<I: IntoIterator<Item = Arc<dyn ModuleLoader>>>(iter: I) -> Self {
        let mut registry = LoaderRegistry::new();
        for loader in iter {
            registry.register_shared(loader);
        }
        registry
    }
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
