//! Resolved, immutable configuration and its process-wide handle.

use std::sync::Arc;

use figment::providers::Serialized;
use figment::Figment;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;

use super::error::{ConfigError, Result};
use super::loader::{ConfigLoader, LoadOptions};
use crate::domain::models::ConfigNode;

static APPLICATION_CONFIG: OnceCell<ConfigStore> = OnceCell::const_new();

/// Fully merged and resolved configuration.
///
/// Cloning is cheap; all clones share the same tree.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: Arc<ConfigNode>,
}

impl ConfigStore {
    /// Wrap an already resolved tree.
    pub fn new(root: ConfigNode) -> Self {
        let root = if root.is_mapping() {
            root
        } else {
            ConfigNode::empty_mapping()
        };
        Self {
            root: Arc::new(root),
        }
    }

    /// Build a store straight from YAML text, without overlay or resolution.
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        let root = ConfigNode::from_yaml_str(source).map_err(|source| ConfigError::Parse {
            origin: "inline document".to_string(),
            source,
        })?;
        Ok(Self::new(root))
    }

    /// Deserialize the whole tree.
    pub fn unmarshal<T: DeserializeOwned>(&self) -> Result<T> {
        figment(&self.root)
            .extract_lossy()
            .map_err(|source| ConfigError::Extract {
                key: String::new(),
                source: Box::new(source),
            })
    }

    /// Deserialize the subtree at a dotted key.
    ///
    /// An absent or null key deserializes like an empty section, so types
    /// with `#[serde(default)]` come back with their defaults.
    pub fn unmarshal_key<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        extract_key(&self.root, key)
    }

    /// Node at a dotted key.
    pub fn get(&self, key: &str) -> Option<&ConfigNode> {
        self.root.get_path(key)
    }

    /// Scalar at a dotted key, or the empty string.
    pub fn get_string(&self, key: &str) -> String {
        self.get(key)
            .map(ConfigNode::to_lookup_string)
            .unwrap_or_default()
    }

    /// Returns `true` if the key holds a non-null value.
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some_and(|node| *node != ConfigNode::Null)
    }

    /// The complete settings tree.
    pub fn settings(&self) -> &ConfigNode {
        &self.root
    }
}

/// Figment holding `node` as its only layer.
fn figment(node: &ConfigNode) -> Figment {
    Figment::from(Serialized::defaults(node))
}

/// Deserialize the subtree of `root` at a dotted key.
///
/// String scalars convert to numbers and booleans where the target type asks
/// for them.
pub(crate) fn extract_key<T: DeserializeOwned>(root: &ConfigNode, key: &str) -> Result<T> {
    let key = key.to_lowercase();
    let extracted = match root.get_path(&key) {
        Some(node) if *node != ConfigNode::Null => figment(root).extract_inner_lossy(&key),
        _ => figment(&ConfigNode::empty_mapping()).extract_lossy(),
    };
    extracted.map_err(|source| ConfigError::Extract {
        key,
        source: Box::new(source),
    })
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(ConfigNode::empty_mapping())
    }
}

/// Process-wide configuration, loaded at most once.
pub struct ApplicationConfig;

impl ApplicationConfig {
    /// Load the configuration on first call and return the shared store.
    ///
    /// Concurrent first callers wait for a single load. Later calls ignore
    /// `options` and return the already built store. A failed load leaves the
    /// handle uninitialized so a later call may retry.
    pub async fn get_or_load(options: LoadOptions) -> Result<&'static ConfigStore> {
        APPLICATION_CONFIG
            .get_or_try_init(|| async move { ConfigLoader::new(options).load().await })
            .await
    }

    /// The shared store, if it has been loaded.
    pub fn get() -> Option<&'static ConfigStore> {
        APPLICATION_CONFIG.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Grpc {
        host: String,
        port: u16,
    }

    fn store() -> ConfigStore {
        ConfigStore::from_yaml_str("grpc:\n  host: localhost\n  port: \"8080\"\nname: svc\nempty: ~\n")
            .unwrap()
    }

    #[test]
    fn test_unmarshal_key() {
        let grpc: Grpc = store().unmarshal_key("grpc").unwrap();
        assert_eq!(
            grpc,
            Grpc {
                host: "localhost".to_string(),
                port: 8080
            }
        );
    }

    #[test]
    fn test_unmarshal_key_reports_key() {
        let err = store().unmarshal_key::<Grpc>("name").unwrap_err();
        assert!(err.to_string().contains("`name`"), "{err}");
    }

    #[test]
    fn test_unmarshal_whole_tree() {
        let all: BTreeMap<String, serde_json::Value> = store().unmarshal().unwrap();
        assert_eq!(all["name"], serde_json::json!("svc"));
        assert!(all.contains_key("grpc"));
        assert!(all.contains_key("name"));
    }

    #[test]
    fn test_unmarshal_key_converts_scalars() {
        #[derive(Debug, Deserialize)]
        struct Pool {
            size: u32,
            ratio: f64,
            enabled: bool,
            label: String,
        }

        let store = ConfigStore::from_yaml_str(
            "pool:\n  size: \"16\"\n  ratio: 0.75\n  enabled: \"true\"\n  label: \"42\"\n",
        )
        .unwrap();
        let pool: Pool = store.unmarshal_key("Pool").unwrap();
        assert_eq!(pool.size, 16);
        assert!((pool.ratio - 0.75).abs() < f64::EPSILON);
        assert!(pool.enabled);
        assert_eq!(pool.label, "42");
    }

    #[test]
    fn test_absent_or_null_key_uses_defaults() {
        #[derive(Debug, Default, Deserialize, PartialEq)]
        #[serde(default)]
        struct Section {
            retries: u32,
            name: String,
        }

        let missing: Section = store().unmarshal_key("missing").unwrap();
        assert_eq!(missing, Section::default());
        let null: Section = store().unmarshal_key("empty").unwrap();
        assert_eq!(null, Section::default());
    }

    #[test]
    fn test_getters() {
        let store = store();
        assert_eq!(store.get_string("GRPC.Port"), "8080");
        assert_eq!(store.get_string("missing"), "");
        assert!(store.is_set("name"));
        assert!(!store.is_set("empty"));
        assert!(!store.is_set("missing"));
        assert!(store.settings().is_mapping());
    }

    #[test]
    fn test_clones_share_tree() {
        let a = store();
        let b = a.clone();
        assert!(std::ptr::eq(a.settings(), b.settings()));
    }
}
