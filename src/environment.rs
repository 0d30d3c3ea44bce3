//! Shared configuration and the wrapper cache.
//!
//! An [`Environment`] is the entry point for rendering: it owns the loader,
//! delimiters, template functions, global includes and post-resolution hooks,
//! and hands out one cached [`TemplateWrapper`] per template name.
//!
//! The cache is keyed by the template name combined with a fingerprint of the
//! configuration, so any configuration change starts from an empty cache.

use crate::engine::{Delimiters, FuncRegistry, TemplateSet};
use crate::error::Result;
use crate::loader::Loader;
use crate::resolve::{Directives, ResolveHook};
use crate::wrapper::TemplateWrapper;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

struct Config {
    delims: Delimiters,
    directives: Arc<Directives>,
    funcs: FuncRegistry,
    globals: Vec<String>,
    hooks: Vec<Arc<dyn ResolveHook>>,
    debug: bool,
    fingerprint: String,
}

impl Config {
    fn refresh_fingerprint(&mut self) {
        let mut hasher = Sha256::new();
        // NUL-terminated fields; globals are count-prefixed.
        let mut field = |bytes: &[u8]| {
            hasher.update(bytes);
            hasher.update([0u8]);
        };
        field(self.delims.left.as_bytes());
        field(self.delims.right.as_bytes());
        field(if self.debug { b"true".as_slice() } else { b"false".as_slice() });
        field(self.globals.len().to_string().as_bytes());
        for global in &self.globals {
            field(global.as_bytes());
        }
        for name in self.funcs.names() {
            field(name.as_bytes());
        }
        self.fingerprint = hex::encode(&hasher.finalize()[..]);
    }
}

/// Template environment.
///
/// All methods take `&self`; an environment is meant to be shared between
/// threads behind an `Arc`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use stratum::environment::Environment;
/// use stratum::loader::MemoryLoader;
///
/// let loader = MemoryLoader::new();
/// loader
///     .add("layout.html", r#"<main>{{ block "body" . }}{{ end }}</main>"#)
///     .add("page.html", r#"{{ extends "layout.html" }}{{ define "body" }}Hi {{ .name }}{{ end }}"#);
///
/// let env = Environment::new(Arc::new(loader));
/// let page = env.load("page.html").unwrap();
/// let html = page.render(&serde_json::json!({"name": "Ada"})).unwrap();
/// assert_eq!(html, "<main>Hi Ada</main>");
/// ```
pub struct Environment {
    loader: Arc<dyn Loader>,
    config: RwLock<Config>,
    cache: Mutex<HashMap<String, Arc<TemplateWrapper>>>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.config.read();
        f.debug_struct("Environment")
            .field("delims", &config.delims)
            .field("funcs", &config.funcs)
            .field("globals", &config.globals)
            .field("debug", &config.debug)
            .field("fingerprint", &config.fingerprint)
            .finish_non_exhaustive()
    }
}

impl Environment {
    /// Create an environment with default delimiters and no functions,
    /// globals or hooks.
    pub fn new(loader: Arc<dyn Loader>) -> Self {
        let delims = Delimiters::default();
        let directives =
            Directives::new(&delims).expect("default delimiter patterns must compile");

        let mut config = Config {
            delims,
            directives: Arc::new(directives),
            funcs: FuncRegistry::new(),
            globals: Vec::new(),
            hooks: Vec::new(),
            debug: false,
            fingerprint: String::new(),
        };
        config.refresh_fingerprint();

        Self {
            loader,
            config: RwLock::new(config),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Register post-resolution hooks.
    pub fn with_hooks(mut self, hooks: impl IntoIterator<Item = Arc<dyn ResolveHook>>) -> Self {
        self.config.get_mut().hooks.extend(hooks);
        self
    }

    /// The loader every wrapper reads from.
    pub fn loader(&self) -> &Arc<dyn Loader> {
        &self.loader
    }

    /// Add a post-resolution hook and drop every cached wrapper.
    pub fn add_hook(&self, hook: Arc<dyn ResolveHook>) -> &Self {
        let mut config = self.config.write();
        config.hooks.push(hook);
        self.cache.lock().clear();
        self
    }

    /// Toggle debug mode: every load reparses.
    pub fn set_debug(&self, debug: bool) -> &Self {
        self.reconfigure(|config| {
            if config.debug == debug {
                return false;
            }
            config.debug = debug;
            true
        });
        self
    }

    /// Switch delimiters, recompiling the directive patterns.
    pub fn set_delims(&self, left: &str, right: &str) -> Result<&Self> {
        let delims = Delimiters::new(left, right)?;
        let directives = Arc::new(Directives::new(&delims)?);
        self.reconfigure(|config| {
            config.delims = delims;
            config.directives = directives;
            true
        });
        Ok(self)
    }

    /// Merge template functions in; same-named entries are replaced.
    pub fn add_funcs(&self, funcs: &FuncRegistry) -> &Self {
        self.reconfigure(|config| {
            config.funcs.extend(funcs);
            true
        });
        self
    }

    /// Register one template function.
    pub fn add_func<F>(&self, name: impl Into<String>, func: F) -> &Self
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        self.reconfigure(|config| {
            config.funcs.register(name, func);
            true
        });
        self
    }

    /// Replace the global includes compiled into every template.
    pub fn set_globals<I, S>(&self, globals: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let globals: Vec<String> = globals.into_iter().map(Into::into).collect();
        self.reconfigure(|config| {
            config.globals = globals;
            true
        });
        self
    }

    fn reconfigure(&self, change: impl FnOnce(&mut Config) -> bool) {
        let mut config = self.config.write();
        if !change(&mut *config) {
            return;
        }
        config.refresh_fingerprint();
        let mut cache = self.cache.lock();
        debug!(
            "Configuration changed, dropping {} cached template(s)",
            cache.len()
        );
        cache.clear();
    }

    /// Whether every load reparses.
    pub fn is_debug(&self) -> bool {
        self.config.read().debug
    }

    /// Current action delimiters.
    pub fn delims(&self) -> Delimiters {
        self.config.read().delims.clone()
    }

    /// Global includes, in declaration order.
    pub fn globals(&self) -> Vec<String> {
        self.config.read().globals.clone()
    }

    /// Registered template function names, sorted.
    pub fn func_names(&self) -> Vec<String> {
        let config = self.config.read();
        config.funcs.names().into_iter().map(str::to_string).collect()
    }

    /// Hex digest of the configuration that shapes compiled templates.
    pub fn fingerprint(&self) -> String {
        self.config.read().fingerprint.clone()
    }

    /// Number of cached wrappers.
    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Get the wrapper for `name`, parsing it when it is new, stale or the
    /// environment is in debug mode.
    pub fn load(&self, name: &str) -> Result<Arc<TemplateWrapper>> {
        let (wrapper, cached, debug) = {
            let config = self.config.read();
            let key = cache_key(name, &config.fingerprint);
            let mut cache = self.cache.lock();

            match cache.get(&key) {
                Some(wrapper) => {
                    debug!("Template cache hit for '{}'", name);
                    (Arc::clone(wrapper), true, config.debug)
                }
                None => {
                    debug!("Template cache miss for '{}'", name);
                    let wrapper = Arc::new(self.new_wrapper(name, &config));
                    cache.insert(key, Arc::clone(&wrapper));
                    (wrapper, false, config.debug)
                }
            }
        };

        if !cached || debug || !wrapper.is_parsed() || !wrapper.is_fresh() {
            wrapper.parse()?;
        }
        Ok(wrapper)
    }

    fn new_wrapper(&self, name: &str, config: &Config) -> TemplateWrapper {
        let pristine = TemplateSet::new(name)
            .with_delims(config.delims.clone())
            .with_funcs(config.funcs.clone());
        TemplateWrapper::new(
            pristine,
            Arc::clone(&self.loader),
            Arc::clone(&config.directives),
        )
        .with_globals(config.globals.clone())
        .with_hooks(config.hooks.clone())
    }
}

/// Cache key of a template under one configuration fingerprint.
pub fn cache_key(name: &str, fingerprint: &str) -> String {
    let digest = Sha256::digest(format!("{}:{}", name, fingerprint).as_bytes());
    hex::encode(&digest[..])
}
