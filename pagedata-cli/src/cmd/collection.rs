use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use pagedata_core::PagedataRenderer;
use std::path::Path;

use crate::config::PagedataConfig;

pub fn make_subcommand() -> Command {
    Command::new("collection")
        .about("Render every child of a page and print a slug -> HTML JSON object")
        .arg(
            Arg::new("parent")
                .value_name("SLUG")
                .help("Parent page slug")
                .required(true),
        )
        .arg(
            Arg::new("template")
                .value_name("TEMPLATE")
                .help("Template file each child is rendered with")
                .required(true),
        )
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    let config = PagedataConfig::load(args)?;
    let parent = args.get_one::<String>("parent").context("Missing parent slug")?;
    let template = args.get_one::<String>("template").context("Missing template path")?;

    let renderer = PagedataRenderer::connect(config.renderer)?;
    let rendered = renderer.render_collection(parent, Path::new(template)).await?;

    println!("{}", serde_json::to_string_pretty(&rendered)?);

    Ok(())
}
