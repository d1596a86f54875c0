//! Post-release verification of the desktop updater channel.

use std::{
    process::ExitCode,
    time::{Duration, Instant},
};

use amberize_release::{
    command::SystemRunner,
    config::{parse_timeout, CommonArgs, DEFAULT_HTTP_TIMEOUT, TIMEOUT_ENV_VAR},
    github::GhCli,
    init_logging, report_failure,
    verify::{configured_endpoint, http_client, run_checks},
};
use clap::Parser;
use humantime::format_duration;
use tokio::runtime;

#[derive(Debug, Parser)]
#[command(version, about = "Check that the shipped auto-update channel is healthy")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Timeout for fetching the update manifest.
    #[arg(long, env = TIMEOUT_ENV_VAR, value_parser = parse_timeout, default_value = "20s")]
    timeout: Duration,
}

async fn inner_main(cli: &Cli) -> anyhow::Result<bool> {
    let layout = cli.common.layout();
    let endpoint = configured_endpoint(&layout.tauri_conf)?;
    let client = http_client(cli.timeout)?;
    let runner = SystemRunner;
    let gh = GhCli::new(&runner, &cli.common.repo, &layout.root);

    println!("Release verification");
    println!("Configured updater endpoint: {endpoint}");
    println!();

    let started = Instant::now();
    let report = run_checks(&gh, &client, &endpoint, &layout.tauri_conf, |check| {
        println!("{check}");
    })
    .await;

    let elapsed = Duration::from_millis(started.elapsed().as_millis() as u64);
    println!();
    if report.all_passed() {
        println!("All updater checks passed. (took {})", format_duration(elapsed));
        return Ok(true);
    }
    println!(
        "Updater checks failed. Review failed checks before shipping updates. (took {})",
        format_duration(elapsed)
    );
    Ok(false)
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    if cli.timeout.is_zero() {
        eprintln!(
            "Error: timeout must be positive (default {})",
            format_duration(DEFAULT_HTTP_TIMEOUT)
        );
        return ExitCode::FAILURE;
    }

    let rt = match runtime::Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => return report_failure(&anyhow::Error::from(err)),
    };

    match rt.block_on(inner_main(&cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => report_failure(&err),
    }
}
