use anyhow::Result;
use clap::{ArgMatches, Command};
use tracing_subscriber::EnvFilter;

mod cmd;
mod config;

fn cli() -> Command {
    let command = Command::new("pagedata")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Render content API pages to HTML")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(cmd::build::make_subcommand())
        .subcommand(cmd::page::make_subcommand())
        .subcommand(cmd::collection::make_subcommand());

    cmd::add_global_args(command)
}

fn init_logging(args: &ArgMatches) {
    let default = if args.get_flag("verbose") { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_logging(&matches);

    match matches.subcommand() {
        Some(("build", args)) => cmd::build::execute(args).await,
        Some(("page", args)) => cmd::page::execute(args).await,
        Some(("collection", args)) => cmd::collection::execute(args).await,
        _ => unreachable!("subcommand_required prevents this"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn test_global_args_reach_subcommands() {
        let matches = cli()
            .try_get_matches_from(["pagedata", "build", "acme", "--status", "draft", "-v"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();

        assert_eq!(name, "build");
        assert_eq!(args.get_one::<String>("project").map(String::as_str), Some("acme"));
        assert_eq!(args.get_one::<String>("status").map(String::as_str), Some("draft"));
        assert!(args.get_flag("verbose"));
    }
}
