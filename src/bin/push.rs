//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Convert binary model shards into tab-separated text, one worker per file.
//!
//! ```bash
//! push input=obs://models/run-7/part-\d+ output=obs://models/run-7-text/
//! push input=/data/shards/part-.* output=/data/text need_inverse=1 max_workers=8 -v
//! ```

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use obsfs::{run_push, Error, PushOptions, StreamFactory};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short = 'v',
        long,
        action = ArgAction::Count,
        help = "Increase log verbosity: -v = Info, -vv = Debug",
    )]
    verbose: u8,

    /// Settings as key=value: input, output, need_inverse (0|1), max_workers
    #[arg(required = true, value_name = "KEY=VALUE")]
    settings: Vec<String>,
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => bail!("{key} must be 0 or 1, got '{other}'"),
    }
}

fn parse_settings(settings: &[String]) -> Result<PushOptions> {
    let mut input = None;
    let mut output = None;
    let mut need_inverse = false;
    let mut max_workers = None;

    for s in settings {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected key=value, got '{s}'"))?;
        match key {
            "input" => input = Some(value.to_string()),
            "output" => output = Some(value.to_string()),
            "need_inverse" => need_inverse = parse_flag(key, value)?,
            "max_workers" => {
                let n: usize = value
                    .parse()
                    .with_context(|| format!("max_workers must be a positive integer, got '{value}'"))?;
                if n == 0 {
                    bail!("max_workers must be at least 1");
                }
                max_workers = Some(n);
            }
            other => bail!("unknown setting '{other}'"),
        }
    }

    let mut opts = PushOptions::new(
        input.context("missing required setting input=<path-or-pattern>")?,
        output.context("missing required setting output=<dir>")?,
    );
    opts.need_inverse = need_inverse;
    opts.max_workers = max_workers;
    Ok(opts)
}

fn init_logging(verbose: u8) {
    let (filter, level) = match verbose {
        0 => ("warn", log::LevelFilter::Warn),
        1 => ("info", log::LevelFilter::Info),
        _ => ("debug", log::LevelFilter::Debug),
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    // Initialize tracing-log bridge to capture log crate messages from dependencies
    tracing_log::LogTracer::builder()
        .with_max_level(level)
        .init()
        .ok();
}

fn run(opts: &PushOptions) -> Result<ExitCode> {
    let factory = StreamFactory::for_paths([opts.input.as_str(), opts.output.as_str()])?;

    let t0 = Instant::now();
    let summary = match run_push(&factory, opts) {
        Ok(summary) => summary,
        Err(Error::NotFound { path }) => {
            error!("no input files match '{}'", path);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e).context("push"),
    };

    let failed = summary.failed().count();
    info!(
        "pushed {} records from {} files in {} ({} failed)",
        summary.records(),
        summary.files.len(),
        humantime::format_duration(t0.elapsed()),
        failed
    );
    Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let opts = parse_settings(&cli.settings)?;
    run(&opts)
}
