//! Dynamically shaped configuration tree.
//!
//! Every configuration source (YAML files, the remote document, environment
//! overrides) is converted into a [`ConfigNode`] before merging, so merge and
//! substitution logic pattern-match over four variants instead of inspecting
//! arbitrary YAML values.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Separator between segments of a dotted key path (`grpc.gateway.port`).
pub const KEY_SEPARATOR: char = '.';

/// A node of the configuration tree.
///
/// Scalars are kept in their string form; typed extraction converts them on
/// demand. Mapping keys are lowercase so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigNode {
    /// Explicit YAML null or an absent value.
    #[default]
    Null,
    /// Any scalar value (string, number, boolean, duration) in string form.
    Scalar(String),
    /// Ordered sequence of nodes.
    Sequence(Vec<ConfigNode>),
    /// Mapping of lowercase key to node.
    Mapping(BTreeMap<String, ConfigNode>),
}

impl ConfigNode {
    /// Empty mapping, the neutral element of [`ConfigNode::merge`].
    pub fn empty_mapping() -> Self {
        Self::Mapping(BTreeMap::new())
    }

    /// Build a scalar node.
    pub fn scalar(value: impl Into<String>) -> Self {
        Self::Scalar(value.into())
    }

    /// Parse a YAML document into a tree. An empty document yields an empty mapping.
    pub fn from_yaml_str(source: &str) -> Result<Self, serde_yaml::Error> {
        if source.trim().is_empty() {
            return Ok(Self::empty_mapping());
        }
        let value: serde_yaml::Value = serde_yaml::from_str(source)?;
        Ok(match Self::from(value) {
            Self::Null => Self::empty_mapping(),
            node => node,
        })
    }

    /// Returns `true` for [`ConfigNode::Mapping`].
    pub const fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping(_))
    }

    /// Scalar text, if this node is a scalar.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// String form used by lookups: scalars yield their text, everything else is empty.
    pub fn to_lookup_string(&self) -> String {
        self.as_scalar().map(str::to_string).unwrap_or_default()
    }

    /// Deep-merge `other` into `self`; `other` wins.
    ///
    /// Mappings merge recursively by key. Scalars and sequences are replaced
    /// whole. A `Null` in `other` never erases an existing value.
    pub fn merge(&mut self, other: Self) {
        match (self, other) {
            (Self::Mapping(base), Self::Mapping(overlay)) => {
                for (key, value) in overlay {
                    match base.get_mut(&key) {
                        Some(existing) => existing.merge(value),
                        None => {
                            base.insert(key, value);
                        }
                    }
                }
            }
            (_, Self::Null) => {}
            (slot, value) => *slot = value,
        }
    }

    /// Look up the node at a dotted key path. The empty path is the node itself.
    pub fn get_path(&self, path: &str) -> Option<&Self> {
        if path.is_empty() {
            return Some(self);
        }
        path.split(KEY_SEPARATOR).try_fold(self, |node, segment| match node {
            Self::Mapping(map) => map.get(&segment.to_lowercase()),
            _ => None,
        })
    }

    /// Replace the node at a dotted key path, creating intermediate mappings.
    ///
    /// A non-mapping node on the way is replaced by a mapping.
    pub fn set_path(&mut self, path: &str, value: Self) {
        let mut node = self;
        let mut segments = path.split(KEY_SEPARATOR).peekable();
        while let Some(segment) = segments.next() {
            if !node.is_mapping() {
                *node = Self::empty_mapping();
            }
            let Self::Mapping(map) = node else {
                unreachable!("node was just turned into a mapping");
            };
            let entry = map.entry(segment.to_lowercase()).or_default();
            if segments.peek().is_none() {
                *entry = value;
                return;
            }
            node = entry;
        }
    }

    /// Dotted paths of every non-mapping node, depth first.
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect_leaf_paths(String::new(), &mut paths);
        paths
    }

    fn collect_leaf_paths(&self, prefix: String, paths: &mut Vec<String>) {
        match self {
            Self::Mapping(map) => {
                for (key, value) in map {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}{KEY_SEPARATOR}{key}")
                    };
                    value.collect_leaf_paths(path, paths);
                }
            }
            _ if !prefix.is_empty() => paths.push(prefix),
            _ => {}
        }
    }
}

impl From<serde_yaml::Value> for ConfigNode {
    fn from(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Scalar(b.to_string()),
            Value::Number(n) => Self::Scalar(n.to_string()),
            Value::String(s) => Self::Scalar(s),
            Value::Sequence(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            Value::Mapping(map) => Self::Mapping(
                map.into_iter()
                    .map(|(key, value)| (yaml_key(key), Self::from(value)))
                    .collect(),
            ),
            Value::Tagged(tagged) => Self::from(tagged.value),
        }
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    use serde_yaml::Value;

    let key = match key {
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "~".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    };
    key.to_lowercase()
}

impl<K, V> FromIterator<(K, V)> for ConfigNode
where
    K: Into<String>,
    V: Into<Self>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::Mapping(
            iter.into_iter()
                .map(|(k, v)| (k.into().to_lowercase(), v.into()))
                .collect(),
        )
    }
}

impl From<&str> for ConfigNode {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for ConfigNode {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl Serialize for ConfigNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Scalar(s) => serializer.serialize_str(s),
            Self::Sequence(items) => items.serialize(serializer),
            Self::Mapping(map) => map.serialize(serializer),
        }
    }
}

impl fmt::Display for ConfigNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Scalar(s) => f.write_str(s),
            other => {
                let yaml = serde_yaml::to_string(other).map_err(|_| fmt::Error)?;
                f.write_str(yaml.trim_end())
            }
        }
    }
}
