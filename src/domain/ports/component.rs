//! Component Port
//!
//! A component is a CLI-exposed utility that does not serve traffic, such as a
//! database migration tool. The bootstrap mounts each component's command
//! next to `start`.

use async_trait::async_trait;
use clap::{ArgMatches, Command};

/// Command-line unit mounted as a sub-command of the application.
#[async_trait]
pub trait Component: Send + Sync {
    /// CLI sub-surface: name, usage text, flags and sub-actions.
    fn command(&self) -> Command;

    /// Run the component with the matches of its own sub-command.
    async fn execute(&self, matches: &ArgMatches) -> anyhow::Result<()>;
}
