//! Name-to-constructor registry for measurement-algorithm families.
//!
//! One registry exists per capability family (centroid algorithms, shape
//! algorithms, PSF builders); all three use the same mechanism. Names map
//! to opaque tags allocated on first registration; tags map to the stored
//! factory. Registration is idempotent and first-write-wins, so concurrent
//! first use from several threads is safe; after startup the registry is
//! read-mostly.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::{Error, Result};

/// Opaque identifier for a registered algorithm name.
///
/// Stable for the lifetime of the registry that allocated it and never
/// reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlgorithmTag(u32);

struct Inner<F> {
    tags: HashMap<String, AlgorithmTag>,
    factories: Vec<F>,
}

/// Registry mapping algorithm names to tags and tags to constructors.
pub struct AlgorithmRegistry<F> {
    inner: RwLock<Inner<F>>,
}

impl<F: Clone> AlgorithmRegistry<F> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                tags: HashMap::new(),
                factories: Vec::new(),
            }),
        }
    }

    /// Registers `factory` under `name` and returns the allocated tag.
    ///
    /// If `name` is already registered the existing tag is returned and the
    /// stored factory is left untouched (first registration wins); the tag
    /// count does not grow.
    pub fn register(&self, name: &str, factory: F) -> AlgorithmTag {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(&tag) = inner.tags.get(name) {
            return tag;
        }
        let tag = AlgorithmTag(inner.factories.len() as u32);
        inner.factories.push(factory);
        inner.tags.insert(name.to_owned(), tag);
        tag
    }

    /// Returns the tag registered under `name`.
    ///
    /// # Errors
    /// [`Error::UnknownAlgorithm`] if `name` was never registered.
    pub fn lookup(&self, name: &str) -> Result<AlgorithmTag> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .tags
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownAlgorithm(name.to_owned()))
    }

    /// Returns the factory registered under `name`.
    ///
    /// # Errors
    /// [`Error::UnknownAlgorithm`] if `name` was never registered.
    pub fn factory(&self, name: &str) -> Result<F> {
        let tag = self.lookup(name)?;
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.factories[tag.0 as usize].clone())
    }

    /// Returns the factory for a tag previously allocated by this registry.
    #[must_use]
    pub fn factory_by_tag(&self, tag: AlgorithmTag) -> Option<F> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.factories.get(tag.0 as usize).cloned()
    }

    /// Returns the number of registered names.
    #[must_use]
    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.factories.len()
    }

    /// Returns true if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<F: Clone> Default for AlgorithmRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}
