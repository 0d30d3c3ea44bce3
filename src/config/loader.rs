//! Configuration file discovery, loading and environment construction.

use crate::config::schema::EnvironmentConfig;
use crate::environment::Environment;
use crate::error::{Result, TemplateError};
use crate::loader::{ChainLoader, FilesystemLoader, Loader};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// File name looked for when no config path is given.
pub const CONFIG_FILE: &str = "stratum.yml";

/// Find `stratum.yml` in `start` or one of its ancestors.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let candidate = current.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load and parse a config file.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParseError` if the YAML is invalid.
pub fn load_config(path: &Path) -> Result<EnvironmentConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TemplateError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            TemplateError::Io(e)
        }
    })?;

    parse_config(&content, path)
}

/// Parse YAML content; `source_path` is only used for error reporting.
pub fn parse_config(content: &str, source_path: &Path) -> Result<EnvironmentConfig> {
    serde_yaml::from_str(content).map_err(|e| TemplateError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

impl EnvironmentConfig {
    /// Template root resolved against `base_dir`.
    pub fn root_dir(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.root)
    }

    /// Filesystem loader for the configured root and namespaces.
    pub fn filesystem_loader(&self, base_dir: &Path) -> Result<FilesystemLoader> {
        let root = self.root_dir(base_dir);
        if !root.is_dir() {
            return Err(TemplateError::DirectoryInvalid { path: root });
        }

        let Some(namespaces) = &self.namespaces else {
            debug!("Discovering namespaces under {}", root.display());
            return FilesystemLoader::with_namespaces(root);
        };

        let loader = FilesystemLoader::new(root);
        for (namespace, paths) in namespaces {
            loader.set_paths(namespace, paths)?;
        }
        Ok(loader)
    }

    /// Build a configured environment reading templates below `base_dir`.
    pub fn build(&self, base_dir: &Path) -> Result<Environment> {
        let filesystem: Arc<dyn Loader> = Arc::new(self.filesystem_loader(base_dir)?);
        let chain = ChainLoader::new(vec![filesystem]);

        let env = Environment::new(Arc::new(chain));
        env.set_delims(&self.delimiters.left, &self.delimiters.right)?
            .set_debug(self.debug)
            .set_globals(self.globals.iter().cloned());
        Ok(env)
    }
}
