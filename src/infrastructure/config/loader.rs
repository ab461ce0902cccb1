use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::environment::Environment;
use super::error::{ConfigError, Result};
use super::overlay::apply_environment;
use super::remote::RemoteConfigClient;
use super::resolver::PlaceholderResolver;
use super::store::{extract_key, ConfigStore};
use crate::domain::models::{string_list, ConfigNode, RemoteConfigSettings, REMOTE_CONFIG_KEY};

/// Directory (or file inside it) holding `application.yaml`.
pub const ENV_CONFIG_PATH: &str = "CONFIG_PATH";
/// Comma-separated list of active profiles.
pub const ENV_ACTIVE_PROFILES: &str = "ACTIVE_PROFILES";
/// Single active profile, consulted when `ACTIVE_PROFILES` is unset.
pub const ENV_ACTIVE_PROFILE: &str = "ACTIVE_PROFILE";
/// Base URL of the remote configuration server.
pub const ENV_REMOTE_CONFIG_URI: &str = "SPRING_CLOUD_CONFIG_URI";
/// Application name used in the remote document path.
pub const ENV_APP_NAME: &str = "APP_NAME";

pub const DEFAULT_CONFIG_PATH: &str = "./resources";
pub const DEFAULT_APP_NAME: &str = "app";

const BASE_NAME: &str = "application";
const EXTENSIONS: [&str; 2] = ["yaml", "yml"];
const WELL_KNOWN_DIRS: [&str; 2] = ["./config", "."];
const PROFILE_KEYS: [&str; 2] = ["active_profiles", "active-profiles"];
const REMOTE_URI_KEYS: [&str; 2] = ["spring_cloud_config_uri", "spring.cloud.config.uri"];
const APP_NAME_KEYS: [&str; 2] = ["app_name", "app-name"];

/// Values given explicitly by the caller, typically from command-line flags.
///
/// Each one takes precedence over its environment variable.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub active_profiles: Option<String>,
    pub remote_uri: Option<String>,
    pub app_name: Option<String>,
}

/// Builds a [`ConfigStore`] from files, a remote document and the environment.
///
/// Precedence (lowest to highest):
/// 1. `application.yaml` from the config directory
/// 2. `application-<profile>.yaml` for each active profile, in listed order
/// 3. The remote document, when a remote URI is configured
/// 4. Environment variables named after dotted keys (`GRPC_PORT` for `grpc.port`)
///
/// Placeholders are then resolved and the environment is applied once more.
pub struct ConfigLoader {
    options: LoadOptions,
    env: Environment,
}

impl ConfigLoader {
    /// Loader over the current process environment.
    pub fn new(options: LoadOptions) -> Self {
        Self {
            options,
            env: Environment::from_process(),
        }
    }

    /// Replace the environment snapshot.
    #[must_use]
    pub fn with_environment(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Directories searched for configuration files, in order.
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        let configured = self
            .options
            .config_path
            .clone()
            .or_else(|| self.env.get(ENV_CONFIG_PATH).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let configured = if configured.is_file() {
            configured
                .parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        } else {
            configured
        };

        std::iter::once(configured)
            .chain(WELL_KNOWN_DIRS.iter().map(PathBuf::from))
            .collect()
    }

    /// Active profiles, from the explicit option, the environment, or the
    /// `active_profiles` key of the base file.
    pub fn active_profiles(&self, tree: &ConfigNode) -> Vec<String> {
        let raw = self
            .options
            .active_profiles
            .clone()
            .or_else(|| {
                self.env
                    .first_of(&[ENV_ACTIVE_PROFILES, ENV_ACTIVE_PROFILE])
                    .map(str::to_string)
            })
            .or_else(|| first_scalar(tree, &PROFILE_KEYS))
            .unwrap_or_default();

        string_list::split(&raw)
    }

    fn remote_uri(&self, tree: &ConfigNode) -> Option<String> {
        self.options
            .remote_uri
            .clone()
            .or_else(|| self.env.get(ENV_REMOTE_CONFIG_URI).map(str::to_string))
            .or_else(|| first_scalar(tree, &REMOTE_URI_KEYS))
    }

    fn app_name(&self, tree: &ConfigNode) -> String {
        self.options
            .app_name
            .clone()
            .or_else(|| self.env.get(ENV_APP_NAME).map(str::to_string))
            .or_else(|| first_scalar(tree, &APP_NAME_KEYS))
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string())
    }

    /// Run the whole pipeline and return the resolved store.
    pub async fn load(&self) -> Result<ConfigStore> {
        let merged = self.load_sources().await?;
        Ok(ConfigStore::new(self.finish(merged)))
    }

    /// Apply the environment, resolve placeholders, apply the environment again.
    pub fn finish(&self, mut tree: ConfigNode) -> ConfigNode {
        apply_environment(&mut tree, &self.env);
        let mut resolved = PlaceholderResolver::resolve_tree(tree, &self.env);
        apply_environment(&mut resolved, &self.env);
        resolved
    }

    /// Merge file and remote sources without overlay or resolution.
    pub async fn load_sources(&self) -> Result<ConfigNode> {
        let dirs = self.search_dirs();
        let mut tree = ConfigNode::empty_mapping();

        match read_first(&dirs, BASE_NAME).await {
            Ok(Some(base)) => tree.merge(base),
            Ok(None) => warn!(dirs = ?dirs, "Unable to find config file {BASE_NAME}.yaml"),
            Err(e) => warn!(error = %e, "Skipping base config file"),
        }

        let profiles = self.active_profiles(&tree);
        for profile in &profiles {
            let name = format!("{BASE_NAME}-{profile}");
            match read_first(&dirs, &name).await {
                Ok(Some(overlay)) => tree.merge(overlay),
                Ok(None) => warn!(profile = %profile, "Unable to find config file {name}.yaml"),
                Err(e) => warn!(profile = %profile, error = %e, "Skipping profile config file"),
            }
        }

        if let Some(uri) = self.remote_uri(&tree) {
            let app_name = self.app_name(&tree);
            match Self::fetch_remote(&uri, &app_name, &profiles, &tree).await {
                Ok(remote) => {
                    info!(uri = %uri, app = %app_name, "Merged remote configuration");
                    tree.merge(remote);
                }
                Err(e) => warn!(error = %e, "Could not load remote configuration, continuing without it"),
            }
        }

        Ok(tree)
    }

    async fn fetch_remote(
        uri: &str,
        app_name: &str,
        profiles: &[String],
        tree: &ConfigNode,
    ) -> Result<ConfigNode> {
        let settings: RemoteConfigSettings = extract_key(tree, REMOTE_CONFIG_KEY)?;
        RemoteConfigClient::new(uri, settings.timeout)?
            .fetch(app_name, profiles)
            .await
    }
}

/// Parse the first `<name>.<ext>` found in `dirs`.
async fn read_first(dirs: &[PathBuf], name: &str) -> Result<Option<ConfigNode>> {
    let Some(path) = find_file(dirs, name) else {
        return Ok(None);
    };
    debug!(path = %path.display(), "Loading config file");

    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
    ConfigNode::from_yaml_str(&text)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            origin: path.display().to_string(),
            source,
        })
}

fn find_file(dirs: &[PathBuf], name: &str) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| EXTENSIONS.iter().map(move |ext| dir.join(format!("{name}.{ext}"))))
        .find(|path| path.is_file())
}

fn first_scalar(tree: &ConfigNode, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| tree.get_path(key).and_then(ConfigNode::as_scalar))
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
