//! Reference resolution.
//!
//! A [`Resolver`] maps a reference string (e.g. `registry.example.com/app:v1`)
//! to the canonical name and [`Descriptor`] of the object it names. Network
//! resolvers live outside this crate; [`StaticResolver`] serves a fixed table.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use blobpipe_core::Descriptor;
use parking_lot::RwLock;

use crate::error::{RemotesError, Result};

/// Outcome of resolving a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Canonical name of the resolved object.
    pub name: String,

    /// Descriptor of the resolved object.
    pub descriptor: Descriptor,
}

impl Resolved {
    /// Creates a resolution result.
    pub fn new(name: impl Into<String>, descriptor: Descriptor) -> Self {
        Self {
            name: name.into(),
            descriptor,
        }
    }
}

/// Trait for reference resolution.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolves `reference` to a canonical name and descriptor.
    async fn resolve(&self, reference: &str) -> Result<Resolved>;
}

#[async_trait]
impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    async fn resolve(&self, reference: &str) -> Result<Resolved> {
        (**self).resolve(reference).await
    }
}

#[async_trait]
impl<'a, R: Resolver + ?Sized> Resolver for &'a R {
    async fn resolve(&self, reference: &str) -> Result<Resolved> {
        (**self).resolve(reference).await
    }
}

/// Static reference resolution.
///
/// Serves descriptors from an in-memory table filled at configuration time.
/// Useful for copies whose descriptors are already known, and for testing.
#[derive(Debug, Default)]
pub struct StaticResolver {
    entries: RwLock<HashMap<String, Resolved>>,
}

impl StaticResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reference that resolves to itself as the canonical name.
    #[must_use]
    pub fn with_reference(self, reference: impl Into<String>, descriptor: Descriptor) -> Self {
        let reference = reference.into();
        self.insert(reference.clone(), Resolved::new(reference, descriptor));
        self
    }

    /// Adds or replaces the resolution for `reference`.
    pub fn insert(&self, reference: impl Into<String>, resolved: Resolved) {
        self.entries.write().insert(reference.into(), resolved);
    }

    /// Removes `reference`, returning its previous resolution.
    pub fn remove(&self, reference: &str) -> Option<Resolved> {
        self.entries.write().remove(reference)
    }

    /// Returns the number of known references.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if no references are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve(&self, reference: &str) -> Result<Resolved> {
        self.entries
            .read()
            .get(reference)
            .cloned()
            .ok_or_else(|| RemotesError::resolution(reference, "reference not found"))
    }
}
