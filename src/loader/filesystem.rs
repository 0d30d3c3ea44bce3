//! Filesystem template loader with namespaced search paths.
//!
//! Each namespace maps to an ordered list of directories below a root
//! directory. A template name resolves to the first directory that contains
//! the relative path.
//!
//! # Example
//!
//! ```no_run
//! use stratum::loader::{FilesystemLoader, Loader};
//!
//! let loader = FilesystemLoader::new("templates");
//! loader.set_paths("admin", ["admin", "shared"]).unwrap();
//! loader.base_append("shared").unwrap();
//!
//! // templates/admin/users.html, falling back to templates/shared/users.html
//! let source = loader.get("@admin/users.html").unwrap();
//! // templates/shared/footer.html
//! let footer = loader.get("footer.html").unwrap();
//! ```

use super::{split_namespace, Loader, Source, BASE_NAMESPACE};
use crate::error::{Result, TemplateError};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Loader that reads templates from namespaced directories.
#[derive(Debug)]
pub struct FilesystemLoader {
    root: PathBuf,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    paths: HashMap<String, Vec<PathBuf>>,
    resolved: HashMap<String, PathBuf>,
    misses: HashMap<String, Miss>,
}

/// A cached resolution failure.
#[derive(Debug, Clone)]
enum Miss {
    NoPaths { namespace: String },
    Unresolved { looked_into: String },
}

impl Miss {
    fn into_error(self, name: &str) -> TemplateError {
        match self {
            Miss::NoPaths { namespace } => TemplateError::NoPaths { namespace },
            Miss::Unresolved { looked_into } => TemplateError::Unresolved {
                name: name.to_string(),
                looked_into,
            },
        }
    }
}

impl State {
    fn reset(&mut self) {
        self.resolved.clear();
        self.misses.clear();
    }
}

impl FilesystemLoader {
    /// Create a loader rooted at `root` with no namespaces registered.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            state: Mutex::new(State::default()),
        }
    }

    /// Create a loader where every top-level directory of `root` is a
    /// namespace that searches itself.
    pub fn with_namespaces(root: impl Into<PathBuf>) -> Result<Self> {
        let loader = Self::new(root);

        let mut dirs = Vec::new();
        for entry in fs::read_dir(&loader.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                dirs.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        dirs.sort();

        for dir in dirs {
            loader.set_paths(&dir, [dir.as_str()])?;
        }
        Ok(loader)
    }

    /// Root directory all search paths are relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Registered namespaces, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self.state.lock().paths.keys().cloned().collect();
        namespaces.sort();
        namespaces
    }

    /// Search paths of a namespace in precedence order.
    pub fn paths(&self, namespace: &str) -> Vec<PathBuf> {
        self.state
            .lock()
            .paths
            .get(namespace)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace the search paths of a namespace.
    ///
    /// Valid paths are kept even if some are rejected; the first invalid path
    /// is reported.
    pub fn set_paths<I, P>(&self, namespace: &str, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let mut valid = Vec::new();
        let mut first_err = None;
        for path in paths {
            match self.validate(path.as_ref()) {
                Ok(path) => valid.push(path),
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }

        let mut state = self.state.lock();
        state.reset();
        debug!("Search paths for namespace '{}': {:?}", namespace, valid);
        state.paths.insert(namespace.to_string(), valid);

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Add a search path with the highest precedence.
    pub fn prepend(&self, namespace: &str, path: &str) -> Result<()> {
        let path = self.validate(path)?;
        let mut state = self.state.lock();
        state.reset();
        state
            .paths
            .entry(namespace.to_string())
            .or_default()
            .insert(0, path);
        Ok(())
    }

    /// Add a search path with the lowest precedence.
    pub fn append(&self, namespace: &str, path: &str) -> Result<()> {
        let path = self.validate(path)?;
        let mut state = self.state.lock();
        state.reset();
        state
            .paths
            .entry(namespace.to_string())
            .or_default()
            .push(path);
        Ok(())
    }

    /// [`prepend`](Self::prepend) to the base namespace.
    pub fn base_prepend(&self, path: &str) -> Result<()> {
        self.prepend(BASE_NAMESPACE, path)
    }

    /// [`append`](Self::append) to the base namespace.
    pub fn base_append(&self, path: &str) -> Result<()> {
        self.append(BASE_NAMESPACE, path)
    }

    /// Resolve a name to a file path relative to the root.
    fn find(&self, name: &str) -> Result<PathBuf> {
        let mut state = self.state.lock();

        if let Some(file) = state.resolved.get(name) {
            return Ok(file.clone());
        }
        if let Some(miss) = state.misses.get(name) {
            return Err(miss.clone().into_error(name));
        }

        let (namespace, short) = split_namespace(name);
        let miss = match state.paths.get(namespace).cloned() {
            Some(paths) => {
                // Absolute names and `..` segments would leave the root.
                let found = if stays_below(short) {
                    paths
                        .iter()
                        .map(|dir| dir.join(short))
                        .find(|file| self.root.join(file).is_file())
                } else {
                    None
                };
                if let Some(file) = found {
                    state.resolved.insert(name.to_string(), file.clone());
                    return Ok(file);
                }
                Miss::Unresolved {
                    looked_into: paths
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                }
            }
            None => Miss::NoPaths {
                namespace: namespace.to_string(),
            },
        };

        debug!("Template '{}' not found, caching miss", name);
        state.misses.insert(name.to_string(), miss.clone());
        Err(miss.into_error(name))
    }

    fn validate(&self, path: &str) -> Result<PathBuf> {
        let trimmed = PathBuf::from(path.trim_matches('/'));
        if self.root.join(&trimmed).is_dir() {
            Ok(trimmed)
        } else {
            Err(TemplateError::DirectoryInvalid { path: trimmed })
        }
    }
}

/// Whether `path` is relative and never climbs above its base directory.
fn stays_below(path: &str) -> bool {
    Path::new(path)
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

impl Loader for FilesystemLoader {
    fn get(&self, name: &str) -> Result<Source> {
        let file = self.find(name)?;
        let code = fs::read(self.root.join(&file))?;
        Ok(Source::new(name, code).with_origin(file))
    }

    fn exists(&self, name: &str) -> Result<bool> {
        match self.find(name) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn is_fresh(&self, name: &str, at: DateTime<Utc>) -> Result<bool> {
        let file = self.find(name)?;
        let modified: DateTime<Utc> = fs::metadata(self.root.join(&file))?.modified()?.into();
        Ok(modified < at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("base").join("views")).unwrap();
        fs::create_dir_all(root.join("main").join("views")).unwrap();
        fs::write(root.join("base/views/home.html"), "base home").unwrap();
        fs::write(root.join("base/views/about.html"), "base about").unwrap();
        fs::write(root.join("main/views/home.html"), "main home").unwrap();
        fs::write(root.join("file.txt"), "not a directory").unwrap();
        temp
    }

    #[test]
    fn namespaces_start_empty() {
        let temp = fixture();
        let loader = FilesystemLoader::new(temp.path());
        assert!(loader.namespaces().is_empty());

        loader.base_append("base").unwrap();
        assert_eq!(loader.namespaces(), vec![BASE_NAMESPACE]);
    }

    #[test]
    fn prepend_takes_precedence() {
        let temp = fixture();
        let loader = FilesystemLoader::new(temp.path());
        loader.base_append("base").unwrap();
        loader.base_prepend("main").unwrap();

        assert_eq!(
            loader.paths(BASE_NAMESPACE),
            vec![PathBuf::from("main"), PathBuf::from("base")]
        );
        let source = loader.get("views/home.html").unwrap();
        assert_eq!(&*source.code, b"main home");
    }

    #[test]
    fn append_rejects_missing_directory() {
        let temp = fixture();
        let loader = FilesystemLoader::new(temp.path());
        let err = loader.base_append("no-path").unwrap_err();
        assert!(matches!(err, TemplateError::DirectoryInvalid { .. }));
        assert!(loader.paths(BASE_NAMESPACE).is_empty());
    }

    #[test]
    fn append_rejects_file() {
        let temp = fixture();
        let loader = FilesystemLoader::new(temp.path());
        assert!(matches!(
            loader.base_append("file.txt"),
            Err(TemplateError::DirectoryInvalid { .. })
        ));
    }

    #[test]
    fn set_paths_keeps_valid_entries() {
        let temp = fixture();
        let loader = FilesystemLoader::new(temp.path());
        let err = loader
            .set_paths(BASE_NAMESPACE, ["main", "missing", "/base/"])
            .unwrap_err();
        assert!(err.to_string().contains("missing"));
        assert_eq!(
            loader.paths(BASE_NAMESPACE),
            vec![PathBuf::from("main"), PathBuf::from("base")]
        );
    }

    #[test]
    fn get_falls_back_through_paths() {
        let temp = fixture();
        let loader = FilesystemLoader::new(temp.path());
        loader.set_paths("test_ns", ["main", "base"]).unwrap();

        let home = loader.get("@test_ns/views/home.html").unwrap();
        assert_eq!(home.name, "@test_ns/views/home.html");
        assert_eq!(&*home.code, b"main home");
        assert_eq!(home.origin, Some(PathBuf::from("main/views/home.html")));

        let about = loader.get("@test_ns/views/about.html").unwrap();
        assert_eq!(&*about.code, b"base about");
    }

    #[test]
    fn get_unknown_lists_looked_into() {
        let temp = fixture();
        let loader = FilesystemLoader::new(temp.path());
        loader.set_paths("test_ns", ["main", "base"]).unwrap();

        let err = loader.get("@test_ns/no-view.html").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("looked into: main, base"));
    }

    #[test]
    fn get_unknown_namespace() {
        let temp = fixture();
        let loader = FilesystemLoader::new(temp.path());
        let err = loader.get("@nowhere/views/home.html").unwrap_err();
        assert!(matches!(err, TemplateError::NoPaths { ref namespace } if namespace == "nowhere"));
    }

    #[test]
    fn path_change_clears_cached_misses() {
        let temp = fixture();
        let loader = FilesystemLoader::new(temp.path());
        loader.base_append("main").unwrap();

        assert!(!loader.exists("views/about.html").unwrap());

        loader.base_append("base").unwrap();
        assert!(loader.exists("views/about.html").unwrap());
    }

    #[test]
    fn path_change_clears_resolved_files() {
        let temp = fixture();
        let loader = FilesystemLoader::new(temp.path());
        loader.base_append("base").unwrap();
        assert_eq!(&*loader.get("views/home.html").unwrap().code, b"base home");

        loader.base_prepend("main").unwrap();
        assert_eq!(&*loader.get("views/home.html").unwrap().code, b"main home");
    }

    #[test]
    fn is_fresh_compares_modification_time() {
        let temp = fixture();
        let loader = FilesystemLoader::new(temp.path());
        loader.base_append("base").unwrap();

        assert!(!loader
            .is_fresh("views/home.html", DateTime::<Utc>::UNIX_EPOCH)
            .unwrap());
        assert!(loader
            .is_fresh("views/home.html", Utc::now() + chrono::Duration::hours(1))
            .unwrap());
        assert!(loader.is_fresh("views/no-home.html", Utc::now()).is_err());
    }

    #[test]
    fn absolute_name_is_not_resolved() {
        let temp = fixture();
        let outside = TempDir::new().unwrap();
        let secret = outside.path().join("secret.txt");
        fs::write(&secret, "secret").unwrap();

        let loader = FilesystemLoader::new(temp.path());
        loader.base_append("base").unwrap();

        let name = secret.to_string_lossy().into_owned();
        let err = loader.get(&name).unwrap_err();
        assert!(matches!(err, TemplateError::Unresolved { .. }));
        assert!(!loader.exists(&name).unwrap());
        assert!(loader.is_fresh(&name, Utc::now()).is_err());
    }

    #[test]
    fn parent_segments_are_not_resolved() {
        let temp = fixture();
        fs::write(temp.path().join("base").join("page.html"), "page").unwrap();
        let loader = FilesystemLoader::new(temp.path());
        loader.set_paths("test_ns", ["main"]).unwrap();

        for name in [
            "@test_ns/../file.txt",
            "@test_ns/../base/page.html",
            "@test_ns/views/../../file.txt",
        ] {
            let err = loader.get(name).unwrap_err();
            assert!(err.is_not_found(), "{name} resolved");
        }
        assert!(loader.get("@test_ns/./views/home.html").is_ok());
    }

    #[test]
    fn with_namespaces_registers_top_level_dirs() {
        let temp = fixture();
        let loader = FilesystemLoader::with_namespaces(temp.path()).unwrap();

        assert_eq!(loader.namespaces(), vec!["base", "main"]);
        assert_eq!(&*loader.get("@main/views/home.html").unwrap().code, b"main home");
        assert!(loader.get("views/about.html").is_ok());
    }
}
