//! Command-line surface of an application.
//!
//! The root command carries the global configuration flags, a `start`
//! sub-command with one `--disable-<server>` flag per registered server, and
//! one sub-command per component.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Args, Command, FromArgMatches};

use crate::infrastructure::config::LoadOptions;

/// Sub-command that runs the registered servers.
pub const START_COMMAND: &str = "start";

/// Flags that shape configuration loading. They must precede the sub-command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalArgs {
    /// Directory holding application.yaml [env: CONFIG_PATH] [default: ./resources]
    #[arg(long, value_name = "DIR")]
    pub config_path: Option<PathBuf>,

    /// Comma-separated configuration profiles [env: ACTIVE_PROFILES]
    #[arg(long, value_name = "PROFILES")]
    pub active_profiles: Option<String>,
}

impl GlobalArgs {
    /// Extract the global flags without knowing the full command tree.
    ///
    /// Configuration has to be loaded before components can describe their
    /// sub-commands, so this parse tolerates anything it does not recognise.
    pub fn pre_parse(args: &[OsString]) -> Self {
        let command = Self::augment_args(
            Command::new("pre-parse")
                .disable_help_flag(true)
                .disable_version_flag(true)
                .allow_external_subcommands(true)
                .ignore_errors(true),
        );
        command
            .try_get_matches_from(args)
            .ok()
            .and_then(|matches| Self::from_arg_matches(&matches).ok())
            .unwrap_or_default()
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config_path.clone(),
            active_profiles: self.active_profiles.clone(),
            ..LoadOptions::default()
        }
    }
}

/// Root command with the global flags and no sub-commands yet.
pub fn root_command(name: &str, about: Option<&str>, version: Option<&str>) -> Command {
    let mut command = Command::new(name.to_string())
        .subcommand_required(true)
        .arg_required_else_help(true);
    if let Some(about) = about {
        command = command.about(about.to_string());
    }
    if let Some(version) = version {
        command = command.version(version.to_string());
    }
    GlobalArgs::augment_args(command)
}

fn disable_flag(server: &str) -> String {
    format!("disable-{server}")
}

/// `start` with one `--disable-<name>` flag per server.
pub fn start_command<'a>(servers: impl IntoIterator<Item = &'a str>) -> Command {
    servers.into_iter().fold(
        Command::new(START_COMMAND).about("Start registered servers"),
        |command, server| {
            command.arg(
                Arg::new(disable_flag(server))
                    .long(disable_flag(server))
                    .help(format!("Disable {server} server"))
                    .action(ArgAction::SetTrue),
            )
        },
    )
}

/// Servers switched off on the `start` command line.
pub fn disabled_servers<'a>(
    matches: &ArgMatches,
    servers: impl IntoIterator<Item = &'a str>,
) -> BTreeSet<String> {
    servers
        .into_iter()
        .filter(|server| {
            matches
                .try_get_one::<bool>(&disable_flag(server))
                .ok()
                .flatten()
                .copied()
                .unwrap_or(false)
        })
        .map(str::to_string)
        .collect()
}
