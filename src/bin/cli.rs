//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Filesystem CLI supporting `getpath`, `ls`, `cat`, and `cp`.
//!
//! Examples:
//! ```bash
//! obsfs getpath  obs://bucket/models/part-0
//! obsfs ls       obs://bucket/models/
//! obsfs cat      obs://bucket/models/part-0 | head
//! obsfs cp       obs://bucket/models/part-0 /tmp/part-0    # download
//! obsfs cp       /tmp/part-0 obs://bucket/models/part-0    # upload
//! ```
//!
//! Credentials come from `OBS_ACCESS_KEY_ID`, `OBS_SECRET_ACCESS_KEY` and
//! `OBS_ENDPOINT` (a `.env` file is honoured) and are only needed when an
//! `obs://` path is involved.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::io::{self, ErrorKind};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use obsfs::constants::DEFAULT_STREAM_BUFFER_SIZE;
use obsfs::{FileType, Stream, StreamFactory, Uri};

/// Macro to safely print with broken pipe handling
macro_rules! safe_println {
    ($($arg:tt)*) => {
        match { use std::io::Write as _; writeln!(io::stdout(), $($arg)*) } {
            Ok(_) => {},
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                // Gracefully exit on broken pipe (e.g., when piped to head/tail)
                std::process::exit(0);
            }
            Err(e) => return Err(e.into())
        }
    };
}

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short = 'v',
        long,
        action = ArgAction::Count,
        help = "Increase log verbosity: -v = Info, -vv = Debug",
    )]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show type and size of a file or directory.
    Getpath {
        /// obs://bucket/key, file:///path or a local path
        path: String,
    },

    /// List the entries of a directory.
    Ls {
        path: String,
    },

    /// Write a file's contents to stdout.
    Cat {
        path: String,
    },

    /// Copy a file between any two supported locations.
    Cp {
        src: String,
        dst: String,
    },
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

fn type_label(t: FileType) -> &'static str {
    match t {
        FileType::File => "file",
        FileType::Directory => "dir",
    }
}

fn getpath_cmd(factory: &StreamFactory, path: &str) -> Result<()> {
    let uri = Uri::parse(path);
    let info = factory
        .filesystem_for(&uri)?
        .get_path_info(&uri)
        .with_context(|| format!("stat {path}"))?;
    safe_println!("{}\t{}\t{}", type_label(info.file_type), info.size, info.path);
    Ok(())
}

fn ls_cmd(factory: &StreamFactory, path: &str) -> Result<()> {
    let uri = Uri::parse(path);
    let entries = factory
        .filesystem_for(&uri)?
        .list_directory(&uri)
        .with_context(|| format!("list {path}"))?;
    for e in &entries {
        safe_println!("{}\t{}\t{}", type_label(e.file_type), e.size, e.path);
    }
    info!("{} entries", entries.len());
    Ok(())
}

fn cat_cmd(factory: &StreamFactory, path: &str) -> Result<()> {
    use std::io::Write as _;

    let mut reader = factory.create(path, "rb").with_context(|| format!("open {path}"))?;
    let mut buf = vec![0u8; DEFAULT_STREAM_BUFFER_SIZE];
    let stdout = io::stdout();
    let mut out = stdout.lock();
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        match out.write_all(&buf[..n]) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::BrokenPipe => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }
    reader.close()?;
    out.flush()?;
    Ok(())
}

fn copy_all(reader: &mut dyn Stream, writer: &mut dyn Stream) -> obsfs::Result<u64> {
    let mut buf = vec![0u8; DEFAULT_STREAM_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Ok(total);
        }
        writer.write(&buf[..n])?;
        total += n as u64;
    }
}

fn cp_cmd(factory: &StreamFactory, src: &str, dst: &str) -> Result<()> {
    let t0 = Instant::now();
    let mut reader = factory.create(src, "rb").with_context(|| format!("open {src}"))?;
    let mut writer = factory.create(dst, "wb").with_context(|| format!("create {dst}"))?;
    let copied = copy_all(reader.as_mut(), writer.as_mut())
        .and_then(|total| reader.close().map(|()| total));
    let total = match copied {
        Ok(total) => total,
        Err(e) => {
            // Leave nothing half-written at the destination.
            if let Err(abort_err) = writer.abort() {
                warn!("discarding partial {} failed: {}", dst, abort_err);
            }
            return Err(e).with_context(|| format!("copy {src} to {dst}"));
        }
    };
    writer.close().with_context(|| format!("commit {dst}"))?;

    let dt = t0.elapsed();
    info!(
        "copied {} bytes in {} ({:.2} MB/s)",
        total,
        humantime::format_duration(dt),
        total as f64 / dt.as_secs_f64().max(1e-9) / 1_000_000.0
    );
    Ok(())
}

/// Main CLI function
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let paths: Vec<&str> = match &cli.cmd {
        Command::Getpath { path } | Command::Ls { path } | Command::Cat { path } => vec![path.as_str()],
        Command::Cp { src, dst } => vec![src.as_str(), dst.as_str()],
    };
    let factory = StreamFactory::for_paths(paths)?;

    match &cli.cmd {
        Command::Getpath { path } => getpath_cmd(&factory, path)?,
        Command::Ls { path } => ls_cmd(&factory, path)?,
        Command::Cat { path } => cat_cmd(&factory, path)?,
        Command::Cp { src, dst } => cp_cmd(&factory, src, dst)?,
    }
    Ok(())
}
