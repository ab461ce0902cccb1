use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a supervised server.
///
/// ```text
/// Created → Starting → Running → Stopping → Stopped
///              │          │          │
///              └──────────┴──────────┴────→ Failed
/// ```
///
/// `Running` → `Stopped` is also valid when a server's run loop returns on its
/// own before shutdown was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerState {
    /// Constructed by its factory, not yet started.
    Created,
    /// Start task spawned.
    Starting,
    /// Run loop in flight.
    Running,
    /// Stop requested.
    Stopping,
    /// Terminated cleanly.
    Stopped,
    /// Terminated with an error during start, run or stop.
    Failed,
}

impl ServerState {
    /// Whether moving from `self` to `next` is a legal transition.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Starting)
                | (Self::Starting, Self::Running | Self::Failed)
                | (Self::Running, Self::Stopping | Self::Stopped | Self::Failed)
                | (Self::Stopping, Self::Stopped | Self::Failed)
        )
    }

    /// `Stopped` or `Failed`.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}
