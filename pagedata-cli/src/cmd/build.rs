use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use pagedata_core::{PageOutcome, PagedataRenderer, SkipReason};
use std::path::PathBuf;

use crate::config::PagedataConfig;

pub fn make_subcommand() -> Command {
    Command::new("build")
        .about("Build every page of a project into a static site")
        .arg(
            Arg::new("project")
                .value_name("PROJECT")
                .help("Project slug")
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory for generated site"),
        )
        .arg(
            Arg::new("concurrency")
                .short('j')
                .long("concurrency")
                .value_name("N")
                .help("Pages built at once"),
        )
        .arg(
            Arg::new("fail_fast")
                .long("fail-fast")
                .help("Stop at the first page that fails")
                .action(ArgAction::SetTrue),
        )
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    // Load cascading configuration
    let config = PagedataConfig::load(args)?;
    let project = args.get_one::<String>("project").context("Missing project slug")?;

    let template_dir = config.renderer.template_root.clone();
    let output_dir = PathBuf::from(&config.build.output);

    let renderer = PagedataRenderer::connect(config.renderer)?.policy(config.build.policy());
    let report = renderer.build_site(project, &template_dir, &output_dir).await?;

    for outcome in &report.outcomes {
        match outcome {
            PageOutcome::Written { slug, path } => println!("  wrote   {slug} -> {}", path.display()),
            PageOutcome::Skipped { slug, reason: SkipReason::MissingTemplate } => {
                println!("  skipped {slug} (no template)")
            }
            PageOutcome::Skipped { slug, reason: SkipReason::Collection } => {
                println!("  skipped {slug} (collection)")
            }
            PageOutcome::Failed { slug, stage, error } => {
                println!("  failed  {slug} while {stage}: {error}")
            }
        }
    }

    report.into_result()?;
    println!("Site built successfully in {}", output_dir.display());

    Ok(())
}
