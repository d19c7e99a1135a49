use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use pagedata_core::PagedataRenderer;
use std::path::Path;

use crate::config::PagedataConfig;

pub fn make_subcommand() -> Command {
    Command::new("page")
        .about("Render a single page and print the HTML")
        .arg(Arg::new("slug").value_name("SLUG").help("Page slug").required(true))
        .arg(
            Arg::new("template")
                .value_name("TEMPLATE")
                .help("Template file to render the page with")
                .required(true),
        )
        .arg(
            Arg::new("out")
                .short('o')
                .long("out")
                .value_name("FILE")
                .help("Write the HTML to a file instead of stdout"),
        )
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    let config = PagedataConfig::load(args)?;
    let slug = args.get_one::<String>("slug").context("Missing page slug")?;
    let template = args.get_one::<String>("template").context("Missing template path")?;

    let renderer = PagedataRenderer::connect(config.renderer)?;
    let html = renderer.render_page(slug, Path::new(template)).await?;

    match args.get_one::<String>("out") {
        Some(out) => tokio::fs::write(out, html)
            .await
            .with_context(|| format!("Failed to write {out}"))?,
        None => print!("{html}"),
    }

    Ok(())
}
