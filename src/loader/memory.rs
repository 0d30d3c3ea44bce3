//! In-memory template loader.

use super::{Loader, Source};
use crate::error::{Result, TemplateError};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Loader backed by a name → bytes map.
///
/// Static content never goes stale, so freshness is the same as existence.
///
/// # Example
///
/// ```
/// use stratum::loader::{Loader, MemoryLoader};
///
/// let loader = MemoryLoader::new();
/// loader.add("hello.html", "<p>Hello</p>");
///
/// let source = loader.get("hello.html").unwrap();
/// assert_eq!(&*source.code, b"<p>Hello</p>");
/// ```
#[derive(Debug, Default)]
pub struct MemoryLoader {
    templates: RwLock<HashMap<String, Arc<[u8]>>>,
}

impl MemoryLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader holding the given templates.
    pub fn from_templates<I, K, V>(templates: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<[u8]>,
    {
        let templates = templates
            .into_iter()
            .map(|(name, code)| (name.into(), Arc::from(code.as_ref())))
            .collect();
        Self {
            templates: RwLock::new(templates),
        }
    }

    /// Add or replace a template.
    pub fn add(&self, name: impl Into<String>, code: impl AsRef<[u8]>) -> &Self {
        self.templates
            .write()
            .insert(name.into(), Arc::from(code.as_ref()));
        self
    }

    /// Names of all stored templates.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Loader for MemoryLoader {
    fn get(&self, name: &str) -> Result<Source> {
        match self.templates.read().get(name) {
            Some(code) => Ok(Source::new(name, Arc::clone(code))),
            None => Err(TemplateError::NotDefined {
                name: name.to_string(),
            }),
        }
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.templates.read().contains_key(name))
    }

    fn is_fresh(&self, name: &str, _at: DateTime<Utc>) -> Result<bool> {
        if self.exists(name)? {
            Ok(true)
        } else {
            Err(TemplateError::NotDefined {
                name: name.to_string(),
            })
        }
    }
}
