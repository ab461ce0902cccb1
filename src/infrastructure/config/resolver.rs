//! Substitution of `${name}` / `${name:default}` expressions.

use std::collections::BTreeMap;

use tracing::trace;

use super::environment::Environment;
use crate::domain::models::config_node::KEY_SEPARATOR;
use crate::domain::models::{ConfigNode, Placeholder};

/// Rewrites placeholders in every scalar of a merged configuration tree.
///
/// All lookups go against one snapshot of the tree taken before any
/// substitution, so the result does not depend on traversal order. A
/// substituted value is inserted verbatim and never scanned again.
///
/// A name is looked up as an environment variable first, then as a key of the
/// snapshot. A key never resolves against itself: `host: "${HOST:localhost}"`
/// yields `localhost` rather than its own unresolved text.
pub struct PlaceholderResolver<'a> {
    root: &'a ConfigNode,
    env: &'a Environment,
}

impl<'a> PlaceholderResolver<'a> {
    pub const fn new(root: &'a ConfigNode, env: &'a Environment) -> Self {
        Self { root, env }
    }

    /// Resolve a whole tree against itself.
    pub fn resolve_tree(tree: ConfigNode, env: &Environment) -> ConfigNode {
        let snapshot = tree.clone();
        PlaceholderResolver::new(&snapshot, env).resolve(tree)
    }

    /// Resolve `node`, which sits at the root of the snapshot.
    pub fn resolve(&self, node: ConfigNode) -> ConfigNode {
        self.resolve_at("", node)
    }

    fn resolve_at(&self, path: &str, node: ConfigNode) -> ConfigNode {
        match node {
            ConfigNode::Scalar(text) => ConfigNode::Scalar(self.resolve_scalar(path, &text)),
            ConfigNode::Sequence(items) => ConfigNode::Sequence(
                items
                    .into_iter()
                    .map(|item| self.resolve_at(path, item))
                    .collect(),
            ),
            ConfigNode::Mapping(map) => ConfigNode::Mapping(
                map.into_iter()
                    .map(|(key, value)| {
                        let child = join(path, &key);
                        let value = self.resolve_at(&child, value);
                        (key, value)
                    })
                    .collect::<BTreeMap<_, _>>(),
            ),
            ConfigNode::Null => ConfigNode::Null,
        }
    }

    /// Substitute every placeholder of `text`, the scalar stored at `path`.
    pub fn resolve_scalar(&self, path: &str, text: &str) -> String {
        if !Placeholder::contains_any(text) {
            return text.to_string();
        }
        Placeholder::substitute(text, |placeholder| {
            let value = self
                .lookup(path, placeholder.name)
                .filter(|v| !v.is_empty())
                .or_else(|| placeholder.default.map(str::to_string))
                .unwrap_or_default();
            trace!(key = %path, name = placeholder.name, "Resolved placeholder");
            value
        })
    }

    fn lookup(&self, path: &str, name: &str) -> Option<String> {
        if let Some(value) = self.env.lookup_key(name) {
            return Some(value.to_string());
        }
        if name.eq_ignore_ascii_case(path) {
            return None;
        }
        self.root.get_path(name).map(ConfigNode::to_lookup_string)
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}{KEY_SEPARATOR}{key}")
    }
}
