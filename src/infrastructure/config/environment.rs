//! Snapshot of environment variables used by configuration loading.

use std::collections::HashMap;

use crate::domain::models::config_node::KEY_SEPARATOR;

/// Immutable view of environment variables.
///
/// Loading takes an explicit snapshot instead of reading the process
/// environment directly, so resolution is deterministic within one load and
/// can be exercised in tests without mutating process state.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Capture the current process environment. Non-UTF-8 entries are skipped.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    /// Build an environment from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of a variable. Empty values count as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// First set variable among `names`.
    pub fn first_of(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.get(name))
    }

    /// Variable name that overrides a dotted key: `grpc.port` → `GRPC_PORT`.
    pub fn variable_for_key(key: &str) -> String {
        key.replace(KEY_SEPARATOR, "_").to_uppercase()
    }

    /// Override value for a dotted configuration key, if set.
    pub fn lookup_key(&self, key: &str) -> Option<&str> {
        self.get(&Self::variable_for_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_for_key() {
        assert_eq!(Environment::variable_for_key("grpc.gateway.port"), "GRPC_GATEWAY_PORT");
        assert_eq!(Environment::variable_for_key("host"), "HOST");
        assert_eq!(Environment::variable_for_key("db-url"), "DB-URL");
    }

    #[test]
    fn test_empty_values_are_unset() {
        let env = Environment::from_pairs([("HOST", ""), ("PORT", "8080")]);
        assert_eq!(env.get("HOST"), None);
        assert_eq!(env.lookup_key("port"), Some("8080"));
    }

    #[test]
    fn test_first_of() {
        let env = Environment::from_pairs([("ACTIVE_PROFILE", "dev")]);
        assert_eq!(env.first_of(&["ACTIVE_PROFILES", "ACTIVE_PROFILE"]), Some("dev"));
        assert_eq!(env.first_of(&["MISSING"]), None);
    }

    #[test]
    fn test_from_process_sees_variables() {
        temp_env::with_var("WIZAPP_ENV_PROBE", Some("present"), || {
            let env = Environment::from_process();
            assert_eq!(env.get("WIZAPP_ENV_PROBE"), Some("present"));
        });
    }
}
