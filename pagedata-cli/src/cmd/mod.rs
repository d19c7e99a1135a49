pub mod build;
pub mod collection;
pub mod page;

use clap::{Arg, ArgAction, Command};

use crate::config::DEFAULT_CONFIG_FILE;

/// Options shared by every subcommand.
pub fn add_global_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file")
                .default_value(DEFAULT_CONFIG_FILE)
                .global(true),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("URL")
                .help("Content API base URL")
                .global(true),
        )
        .arg(
            Arg::new("api_key")
                .long("api-key")
                .value_name("KEY")
                .env("PAGEDATA_API_KEY")
                .hide_env_values(true)
                .help("Content API key")
                .global(true),
        )
        .arg(
            Arg::new("status")
                .long("status")
                .value_name("STATUS")
                .value_parser(["draft", "published"])
                .help("Content version to fetch")
                .global(true),
        )
        .arg(
            Arg::new("templates")
                .short('t')
                .long("templates")
                .value_name("DIR")
                .help("Template directory includes are resolved against")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log every fetch and render")
                .action(ArgAction::SetTrue)
                .global(true),
        )
}
