//! Sums installer downloads over every published release and writes the
//! summary the landing page builds against.

use std::{path::PathBuf, process::ExitCode};

use amberize_release::{
    command::SystemRunner,
    config::CommonArgs,
    github::GhCli,
    init_logging, report_failure,
    stats::{fetch_release_stats, write_summary},
};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(version, about = "Fetch installer download counts and the latest version")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Where to write the summary. Defaults to the landing page's data file.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn inner_main(cli: &Cli) -> anyhow::Result<()> {
    let layout = cli.common.layout();
    let output = cli.output.clone().unwrap_or_else(|| layout.download_stats.clone());

    let runner = SystemRunner;
    let gh = GhCli::new(&runner, &cli.common.repo, &layout.root);
    let summary = fetch_release_stats(&gh)?;
    write_summary(&output, &summary)?;

    println!("Latest version: {}", summary.latest_version);
    println!("Total installer downloads: {}", summary.total_downloads);
    for release in &summary.releases {
        println!("  {}: {}", release.tag, release.downloads);
    }
    println!("\nWritten to {}", layout.relative(&output).display());

    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match inner_main(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_failure(&err),
    }
}
