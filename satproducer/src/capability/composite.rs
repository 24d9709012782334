//! Composite product registry.
//!
//! Product ids in the configuration resolve to [`Composite`] implementations
//! through an explicit registry, so unknown ids can be reported when the
//! configuration is loaded instead of when the product is drawn.

use super::scene::ProjectedScene;
use crate::artifact::Artifact;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Composite construction failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompositeError {
    /// No composite registered under this id.
    #[error("composite '{0}' is not available")]
    NotAvailable(String),

    /// A channel the composite needs is not loaded.
    #[error("missing channel {0}")]
    MissingChannel(String),

    #[error("{0}")]
    Failed(String),
}

/// A named derived rendering.
pub trait Composite: Send + Sync {
    /// Channels that must be loaded before [`Composite::build`].
    fn prerequisites(&self) -> BTreeSet<String>;

    fn build(&self, scene: &dyn ProjectedScene) -> Result<Box<dyn Artifact>, CompositeError>;
}

type BuildFn = dyn Fn(&dyn ProjectedScene) -> Result<Box<dyn Artifact>, CompositeError> + Send + Sync;

/// Composite backed by a closure.
pub struct FnComposite {
    prerequisites: BTreeSet<String>,
    build: Box<BuildFn>,
}

impl FnComposite {
    pub fn new<I, S, F>(prerequisites: I, build: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&dyn ProjectedScene) -> Result<Box<dyn Artifact>, CompositeError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            prerequisites: prerequisites.into_iter().map(Into::into).collect(),
            build: Box::new(build),
        }
    }
}

impl Composite for FnComposite {
    fn prerequisites(&self) -> BTreeSet<String> {
        self.prerequisites.clone()
    }

    fn build(&self, scene: &dyn ProjectedScene) -> Result<Box<dyn Artifact>, CompositeError> {
        (self.build)(scene)
    }
}

/// Product id → composite mapping.
#[derive(Default, Clone)]
pub struct CompositeRegistry {
    composites: HashMap<String, Arc<dyn Composite>>,
}

impl CompositeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, composite: Arc<dyn Composite>) {
        self.composites.insert(id.into(), composite);
    }

    /// Builder-style [`CompositeRegistry::register`].
    pub fn with(mut self, id: impl Into<String>, composite: impl Composite + 'static) -> Self {
        self.register(id, Arc::new(composite));
        self
    }

    pub fn get(&self, id: &str) -> Result<&Arc<dyn Composite>, CompositeError> {
        self.composites
            .get(id)
            .ok_or_else(|| CompositeError::NotAvailable(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.composites.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.composites.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl fmt::Debug for CompositeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let registry = CompositeRegistry::new().with(
            "overview",
            FnComposite::new(["1", "2", "4"], |_| {
                Err(CompositeError::Failed("not in this test".into()))
            }),
        );

        assert!(registry.contains("overview"));
        let composite = registry.get("overview").unwrap();
        assert_eq!(composite.prerequisites().len(), 3);
        assert_eq!(
            registry.get("green_snow").err(),
            Some(CompositeError::NotAvailable("green_snow".into()))
        );
        assert_eq!(registry.ids(), vec!["overview"]);
    }
}
