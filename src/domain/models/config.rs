use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::duration;

/// Configuration key of the lifecycle section.
pub const LIFECYCLE_CONFIG_KEY: &str = "lifecycle";

/// Configuration key of the remote configuration section.
pub const REMOTE_CONFIG_KEY: &str = "remote_config";

/// What the orchestrator does when a server's run loop fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartFailurePolicy {
    /// Stop every other server and fail the whole run.
    #[default]
    Abort,
    /// Mark the server failed, report it, keep the others running.
    Isolate,
}

/// Orchestrator settings, read from the `lifecycle` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LifecycleConfig {
    /// Upper bound for a single server's `stop` call.
    #[serde(default = "default_stop_timeout", with = "duration")]
    pub stop_timeout: Duration,

    /// How long to wait for run loops to return after all stops completed.
    #[serde(default = "default_drain_timeout", with = "duration")]
    pub drain_timeout: Duration,

    /// Behaviour on a server run-loop failure.
    #[serde(default)]
    pub start_failure_policy: StartFailurePolicy,
}

const fn default_stop_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_drain_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            stop_timeout: default_stop_timeout(),
            drain_timeout: default_drain_timeout(),
            start_failure_policy: StartFailurePolicy::default(),
        }
    }
}

/// Remote configuration fetch settings, read from the `remote_config` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RemoteConfigSettings {
    /// Request timeout for the configuration server.
    #[serde(default = "default_remote_timeout", with = "duration")]
    pub timeout: Duration,
}

const fn default_remote_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for RemoteConfigSettings {
    fn default() -> Self {
        Self {
            timeout: default_remote_timeout(),
        }
    }
}
