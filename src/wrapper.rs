//! One compiled entry template plus the bookkeeping to know when it is stale.

use crate::engine::TemplateSet;
use crate::error::Result;
use crate::loader::{namespace_prefix, Loader};
use crate::resolve::{Directives, ResolveHook, Resolver};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Default)]
struct State {
    compiled: Option<Arc<TemplateSet>>,
    tracked: BTreeSet<String>,
    parsed_at: Option<DateTime<Utc>>,
}

/// A template entry point compiled together with its parents, includes and
/// globals.
///
/// Each [`parse`](Self::parse) starts over from the pristine set it was
/// created with, so stale templates never leak into a recompiled unit.
pub struct TemplateWrapper {
    name: String,
    namespace: Option<String>,
    loader: Arc<dyn Loader>,
    directives: Arc<Directives>,
    hooks: Vec<Arc<dyn ResolveHook>>,
    globals: Vec<String>,
    pristine: TemplateSet,
    state: RwLock<State>,
}

impl fmt::Debug for TemplateWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("TemplateWrapper")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("globals", &self.globals)
            .field("tracked", &state.tracked)
            .field("parsed_at", &state.parsed_at)
            .finish_non_exhaustive()
    }
}

impl TemplateWrapper {
    /// Create an unparsed wrapper for the entry template `pristine.name()`.
    pub fn new(pristine: TemplateSet, loader: Arc<dyn Loader>, directives: Arc<Directives>) -> Self {
        let name = pristine.name().to_string();
        let namespace = namespace_prefix(&name).map(str::to_string);
        Self {
            name,
            namespace,
            loader,
            directives,
            hooks: Vec::new(),
            globals: Vec::new(),
            pristine,
            state: RwLock::new(State::default()),
        }
    }

    /// Templates compiled into every parse, ahead of the entry's own includes.
    pub fn with_globals(mut self, globals: Vec<String>) -> Self {
        self.globals = globals;
        self
    }

    /// Hooks run on every node each parse resolves.
    pub fn with_hooks(mut self, hooks: Vec<Arc<dyn ResolveHook>>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Entry template name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `@ns/` prefix of the entry name, if it has one.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Resolve and compile the entry template.
    ///
    /// On failure the previously compiled state, if any, is kept.
    pub fn parse(&self) -> Result<()> {
        let started = Utc::now();
        debug!("Parsing template '{}'", self.name);

        let mut resolver = Resolver::new(
            self.loader.as_ref(),
            &self.directives,
            self.namespace.as_deref(),
        )
        .with_hooks(&self.hooks);

        let entry = resolver.resolve(&self.name)?;
        let root = resolver.tree().root_of(entry);

        for global in self.globals.iter().rev() {
            let id = resolver.resolve(global)?;
            resolver.tree_mut().get_mut(root).includes.insert(0, id);
        }

        let (tree, tracked) = resolver.finish();
        let mut set = self.pristine.clone();
        tree.compile(root, &self.name, &mut set)?;

        debug!(
            "Parsed template '{}' from {} source(s)",
            self.name,
            tracked.len()
        );

        let mut state = self.state.write();
        state.compiled = Some(Arc::new(set));
        state.tracked = tracked;
        state.parsed_at = Some(started);
        Ok(())
    }

    /// Whether no source consulted by the last parse changed since.
    ///
    /// An unparsed wrapper is parsed first; a failed parse is never fresh.
    pub fn is_fresh(&self) -> bool {
        if !self.is_parsed() {
            if let Err(err) = self.parse() {
                debug!("Template '{}' failed to parse: {}", self.name, err);
                return false;
            }
        }

        let (tracked, parsed_at) = {
            let state = self.state.read();
            (state.tracked.clone(), state.parsed_at)
        };
        let Some(parsed_at) = parsed_at else {
            return false;
        };

        tracked
            .iter()
            .all(|name| match self.loader.is_fresh(name, parsed_at) {
                Ok(fresh) => {
                    if !fresh {
                        debug!("Template '{}' is stale: '{}' changed", self.name, name);
                    }
                    fresh
                }
                Err(err) => {
                    warn!("Freshness check for '{}' failed: {}", name, err);
                    false
                }
            })
    }

    /// Whether a parse has succeeded at least once.
    pub fn is_parsed(&self) -> bool {
        self.state.read().compiled.is_some()
    }

    /// When the last successful parse started.
    pub fn parsed_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().parsed_at
    }

    /// Source names consulted by the last successful parse, sorted.
    pub fn tracked_names(&self) -> Vec<String> {
        self.state.read().tracked.iter().cloned().collect()
    }

    /// The compiled set from the last successful parse.
    pub fn template_set(&self) -> Option<Arc<TemplateSet>> {
        self.state.read().compiled.clone()
    }

    fn compiled(&self) -> Result<Arc<TemplateSet>> {
        if let Some(set) = self.template_set() {
            return Ok(set);
        }
        self.parse()?;
        Ok(self
            .template_set()
            .unwrap_or_else(|| Arc::new(self.pristine.clone())))
    }

    /// Render the entry template.
    pub fn render(&self, data: &Value) -> Result<String> {
        self.render_template(&self.name, data)
    }

    /// Render any template of the compiled set, such as a block.
    pub fn render_template(&self, name: &str, data: &Value) -> Result<String> {
        self.compiled()?.render(name, data)
    }
}
