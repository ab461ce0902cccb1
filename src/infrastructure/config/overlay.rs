//! Environment variables as the highest-precedence configuration layer.

use tracing::trace;

use super::environment::Environment;
use crate::domain::models::ConfigNode;

/// Override every leaf of `tree` that has a matching environment variable.
///
/// `grpc.port` is overridden by `GRPC_PORT`. Only keys already present in the
/// tree are considered; the override value is always a string scalar.
/// Returns the number of keys that were overridden.
pub fn apply_environment(tree: &mut ConfigNode, env: &Environment) -> usize {
    let mut applied = 0;
    for path in tree.leaf_paths() {
        if let Some(value) = env.lookup_key(&path) {
            trace!(key = %path, "Configuration key overridden by environment");
            tree.set_path(&path, ConfigNode::scalar(value));
            applied += 1;
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(yaml: &str) -> ConfigNode {
        ConfigNode::from_yaml_str(yaml).unwrap()
    }

    #[test]
    fn test_overrides_nested_key() {
        let mut node = tree("grpc:\n  port: 8080\n  host: localhost\n");
        let env = Environment::from_pairs([("GRPC_PORT", "9090")]);

        assert_eq!(apply_environment(&mut node, &env), 1);
        assert_eq!(node.get_path("grpc.port").and_then(ConfigNode::as_scalar), Some("9090"));
        assert_eq!(node.get_path("grpc.host").and_then(ConfigNode::as_scalar), Some("localhost"));
    }

    #[test]
    fn test_overrides_sequence_leaf_with_string() {
        let mut node = tree("hosts:\n  - a\n  - b\n");
        let env = Environment::from_pairs([("HOSTS", "c,d")]);

        apply_environment(&mut node, &env);
        assert_eq!(node.get_path("hosts"), Some(&ConfigNode::scalar("c,d")));
    }

    #[test]
    fn test_unknown_variables_are_ignored() {
        let mut node = tree("name: svc\n");
        let env = Environment::from_pairs([("OTHER", "x"), ("NAME", "")]);

        assert_eq!(apply_environment(&mut node, &env), 0);
        assert_eq!(node.get_path("name").and_then(ConfigNode::as_scalar), Some("svc"));
        assert!(node.get_path("other").is_none());
    }
}
