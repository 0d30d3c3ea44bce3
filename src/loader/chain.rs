//! Loader that delegates to an ordered list of loaders.

use super::{Loader, Source};
use crate::error::{Result, TemplateError};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::trace;

/// Ordered union of loaders; the first loader that has a template wins.
///
/// A loader is only asked for a template after its `exists` confirmed it.
/// When no loader can answer, the error carries every attempt.
///
/// Positive `exists` answers are cached until a loader is added; negative
/// answers are not, so templates that appear later in a member loader are
/// picked up.
#[derive(Default)]
pub struct ChainLoader {
    loaders: RwLock<Vec<Arc<dyn Loader>>>,
    known: RwLock<HashSet<String>>,
}

impl ChainLoader {
    /// Create a chain from loaders in precedence order.
    pub fn new(loaders: Vec<Arc<dyn Loader>>) -> Self {
        Self {
            loaders: RwLock::new(loaders),
            known: RwLock::new(HashSet::new()),
        }
    }

    /// Append a loader with the lowest precedence.
    pub fn add(&self, loader: Arc<dyn Loader>) -> &Self {
        self.loaders.write().push(loader);
        self.known.write().clear();
        self
    }

    /// Snapshot of the member loaders.
    pub fn loaders(&self) -> Vec<Arc<dyn Loader>> {
        self.loaders.read().clone()
    }

    /// Run `op` on the first loader that has `name`.
    fn first<T>(&self, name: &str, op: impl Fn(&dyn Loader) -> Result<T>) -> Result<T> {
        let mut attempts = Vec::new();

        for loader in self.loaders() {
            let label = loader.label().to_string();
            match loader.exists(name) {
                Ok(true) => {}
                Ok(false) => {
                    let missing = TemplateError::NotDefined {
                        name: name.to_string(),
                    };
                    attempts.push((label, missing));
                    continue;
                }
                Err(e) => {
                    attempts.push((label, e));
                    continue;
                }
            }

            match op(loader.as_ref()) {
                Ok(value) => {
                    trace!("Template '{}' served by {}", name, label);
                    return Ok(value);
                }
                Err(e) => attempts.push((label, e)),
            }
        }

        Err(TemplateError::Lookup {
            name: name.to_string(),
            attempts,
        })
    }
}

impl std::fmt::Debug for ChainLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let labels: Vec<&str> = self.loaders.read().iter().map(|l| l.label()).collect();
        f.debug_struct("ChainLoader")
            .field("loaders", &labels)
            .field("known", &self.known.read().len())
            .finish()
    }
}

impl Loader for ChainLoader {
    fn get(&self, name: &str) -> Result<Source> {
        self.first(name, |loader| loader.get(name))
    }

    fn exists(&self, name: &str) -> Result<bool> {
        if self.known.read().contains(name) {
            return Ok(true);
        }

        match self.first(name, |_| Ok(())) {
            Ok(()) => {
                self.known.write().insert(name.to_string());
                Ok(true)
            }
            Err(TemplateError::Lookup { attempts, .. })
                if attempts.iter().all(|(_, e)| e.is_not_found()) =>
            {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn is_fresh(&self, name: &str, at: DateTime<Utc>) -> Result<bool> {
        self.first(name, |loader| loader.is_fresh(name, at))
    }
}
