//! Template source providers.
//!
//! A [`Loader`] supplies raw template bytes by name and answers existence and
//! freshness questions. Three providers are included:
//!
//! - [`MemoryLoader`] - a static, in-process map of templates
//! - [`FilesystemLoader`] - namespaced search directories on disk
//! - [`ChainLoader`] - an ordered union of other loaders (first match wins)
//!
//! # Naming
//!
//! `@namespace/relative/path` selects a namespace; a bare name lives in the
//! [`BASE_NAMESPACE`].

pub mod chain;
pub mod filesystem;
pub mod memory;

pub use chain::ChainLoader;
pub use filesystem::FilesystemLoader;
pub use memory::MemoryLoader;

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;

/// Namespace used for names without an `@namespace/` prefix.
pub const BASE_NAMESPACE: &str = "base";

/// Raw content of one template as returned by a loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Name the template was requested under.
    pub name: String,
    /// Template bytes.
    pub code: Arc<[u8]>,
    /// File the content was read from, if any.
    pub origin: Option<PathBuf>,
}

impl Source {
    /// Create a source without a backing file.
    pub fn new(name: impl Into<String>, code: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            origin: None,
        }
    }

    /// Attach the file this source was read from.
    pub fn with_origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

/// A provider of template sources.
///
/// Implementations must be safe to share between threads; every method may be
/// called concurrently.
pub trait Loader: Send + Sync {
    /// Fetch the source of a template.
    fn get(&self, name: &str) -> Result<Source>;

    /// Check whether a template exists.
    ///
    /// `Ok(false)` means "not here"; `Err` is reserved for failures that
    /// prevented answering.
    fn exists(&self, name: &str) -> Result<bool>;

    /// Check whether a template is unchanged since `at`.
    fn is_fresh(&self, name: &str, at: DateTime<Utc>) -> Result<bool>;

    /// Short label used in aggregated lookup errors.
    fn label(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

impl<L: Loader + ?Sized> Loader for Arc<L> {
    fn get(&self, name: &str) -> Result<Source> {
        (**self).get(name)
    }

    fn exists(&self, name: &str) -> Result<bool> {
        (**self).exists(name)
    }

    fn is_fresh(&self, name: &str, at: DateTime<Utc>) -> Result<bool> {
        (**self).is_fresh(name, at)
    }

    fn label(&self) -> &'static str {
        (**self).label()
    }
}

/// Split a template name into its namespace and the path inside it.
///
/// ```
/// use stratum::loader::split_namespace;
///
/// assert_eq!(split_namespace("@admin/users/list.html"), ("admin", "users/list.html"));
/// assert_eq!(split_namespace("users/list.html"), ("base", "users/list.html"));
/// ```
pub fn split_namespace(name: &str) -> (&str, &str) {
    if let Some(rest) = name.strip_prefix('@') {
        if let Some((namespace, path)) = rest.split_once('/') {
            return (namespace, path);
        }
    }
    (BASE_NAMESPACE, name)
}

/// The `@namespace/` prefix of a name, if it has one.
pub fn namespace_prefix(name: &str) -> Option<&str> {
    if !name.starts_with('@') {
        return None;
    }
    name.find('/').map(|idx| &name[..=idx])
}
