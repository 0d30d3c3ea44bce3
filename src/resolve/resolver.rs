//! Recursive extends/include resolution.

use super::directives::{prefix_spans, Directives};
use super::tree::{Node, NodeId, NodeTree};
use crate::error::{Result, TemplateError};
use crate::loader::{Loader, Source};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::trace;

/// Callback run on every resolved node, after its directives were processed.
///
/// Returning an error aborts the whole resolution.
///
/// Closures with the matching signature implement this trait:
///
/// ```
/// use stratum::resolve::{Node, ResolveHook};
///
/// let hook = |node: &mut Node, _namespace: Option<&str>| -> anyhow::Result<()> {
///     anyhow::ensure!(!node.name.contains(".."), "parent paths are not allowed");
///     Ok(())
/// };
/// # fn takes(_: impl ResolveHook) {}
/// # takes(hook);
/// ```
pub trait ResolveHook: Send + Sync {
    /// Inspect or rewrite a resolved node.
    fn on_resolved(&self, node: &mut Node, namespace: Option<&str>) -> anyhow::Result<()>;
}

impl<F> ResolveHook for F
where
    F: Fn(&mut Node, Option<&str>) -> anyhow::Result<()> + Send + Sync,
{
    fn on_resolved(&self, node: &mut Node, namespace: Option<&str>) -> anyhow::Result<()> {
        self(node, namespace)
    }
}

/// Walks directives starting from one template name and builds a [`NodeTree`].
///
/// A resolver is single-use per parse: it accumulates the nodes and the set
/// of source names it consulted.
pub struct Resolver<'a> {
    loader: &'a dyn Loader,
    directives: &'a Directives,
    hooks: &'a [Arc<dyn ResolveHook>],
    namespace: Option<&'a str>,
    tree: NodeTree,
    tracked: BTreeSet<String>,
    stack: Vec<String>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver.
    ///
    /// `namespace` is the `@ns/` prefix of the entry template; bare names met
    /// during resolution are qualified with it.
    pub fn new(
        loader: &'a dyn Loader,
        directives: &'a Directives,
        namespace: Option<&'a str>,
    ) -> Self {
        Self {
            loader,
            directives,
            hooks: &[],
            namespace,
            tree: NodeTree::new(),
            tracked: BTreeSet::new(),
            stack: Vec::new(),
        }
    }

    /// Run `hooks` on every resolved node.
    pub fn with_hooks(mut self, hooks: &'a [Arc<dyn ResolveHook>]) -> Self {
        self.hooks = hooks;
        self
    }

    /// Resolve `name` and everything it extends or includes.
    pub fn resolve(&mut self, name: &str) -> Result<NodeId> {
        let name = self.qualify(name);

        if self.stack.contains(&name) {
            let mut cycle = self.stack.clone();
            cycle.push(name);
            return Err(TemplateError::CircularExtends {
                cycle: cycle.join(" → "),
            });
        }

        self.stack.push(name.clone());
        let resolved = self.resolve_node(&name);
        self.stack.pop();
        resolved
    }

    fn resolve_node(&mut self, name: &str) -> Result<NodeId> {
        let source = self.loader.get(name)?;
        self.tracked.insert(name.to_string());
        trace!("Resolving template '{}'", name);

        let scan = self.directives.scan(&source.code);

        let parent = match &scan.extends {
            Some(target) => Some(self.resolve(target)?),
            None => None,
        };

        let mut includes = Vec::with_capacity(scan.includes.len());
        for include in &scan.includes {
            includes.push(self.resolve(&include.name)?);
        }

        let mut code = scan.code;
        if let Some(namespace) = self.namespace {
            let spans: Vec<_> = scan
                .includes
                .iter()
                .filter(|include| !include.name.starts_with('@'))
                .map(|include| include.span.clone())
                .collect();
            prefix_spans(&mut code, &spans, namespace);
        }

        let id = self.tree.push(Node {
            name: name.to_string(),
            source: Source {
                name: source.name,
                code: code.into(),
                origin: source.origin,
            },
            parent: None,
            child: None,
            includes,
        });
        if let Some(parent) = parent {
            self.tree.link(id, parent);
        }

        for hook in self.hooks {
            hook.on_resolved(self.tree.get_mut(id), self.namespace)
                .map_err(|source| TemplateError::Hook {
                    name: name.to_string(),
                    source,
                })?;
        }

        Ok(id)
    }

    fn qualify(&self, name: &str) -> String {
        match self.namespace {
            Some(namespace) if !name.starts_with('@') => format!("{}{}", namespace, name),
            _ => name.to_string(),
        }
    }

    /// Mutable access to the tree built so far.
    pub fn tree_mut(&mut self) -> &mut NodeTree {
        &mut self.tree
    }

    /// The tree built so far.
    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    /// Consume the resolver, returning its tree and consulted names.
    pub fn finish(self) -> (NodeTree, BTreeSet<String>) {
        (self.tree, self.tracked)
    }
}
