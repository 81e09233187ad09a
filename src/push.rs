// src/push.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Concurrent conversion of binary model shards into text lines.
//!
//! Every matched input file gets its own worker, which reads records from
//! the input stream and writes one line per record to `<output>/<basename>`.
//! Workers share nothing but the stream factory; a failing worker never stops
//! the others, and every outcome is reported once all of them have finished.

use std::thread;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::constants::PUSH_PROGRESS_INTERVAL;
use crate::error::{Error, Result};
use crate::match_file::match_files;
use crate::model_entry::{feature_id, format_line, RecordReader};
use crate::stream::Stream;
use crate::stream_factory::StreamFactory;
use crate::uri::Uri;

#[derive(Debug, Clone)]
pub struct PushOptions {
    /// Input path or pattern (last component is a regex).
    pub input: String,
    /// Output directory; each input keeps its file name.
    pub output: String,
    /// Byte-reverse record keys before printing.
    pub need_inverse: bool,
    /// Bound on concurrent workers. `None` runs one thread per file.
    pub max_workers: Option<usize>,
}

impl PushOptions {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            need_inverse: false,
            max_workers: None,
        }
    }
}

/// Outcome of one worker.
#[derive(Debug)]
pub struct FileOutcome {
    pub input: String,
    pub output: String,
    pub result: Result<u64>,
}

#[derive(Debug, Default)]
pub struct PushSummary {
    pub files: Vec<FileOutcome>,
}

impl PushSummary {
    pub fn records(&self) -> u64 {
        self.files.iter().filter_map(|f| f.result.as_ref().ok()).sum()
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| f.result.is_err())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Where the converted form of `input` goes.
pub fn output_path(output_dir: &str, input: &str) -> String {
    let name = Uri::parse(input).basename().to_string();
    format!("{}/{}", output_dir.trim_end_matches('/'), name)
}

/// Copy every record of `reader` into `writer` as text lines.
fn convert_records(
    reader: &mut dyn Stream,
    writer: &mut dyn Stream,
    input: &str,
    need_inverse: bool,
) -> Result<u64> {
    let mut records = RecordReader::new(reader, input);
    let mut count = 0u64;
    while let Some(record) = records.next_record()? {
        let line = format_line(feature_id(record.key, need_inverse), &record.entry);
        writer.write(line.as_bytes())?;
        count += 1;
        if count % PUSH_PROGRESS_INTERVAL == 0 {
            info!(input, records = count, "push progress");
        }
    }
    Ok(count)
}

/// Convert one file. Returns the number of records written.
///
/// Output is committed only when the whole input converts; on any error the
/// output stream is aborted and nothing is left at `output`.
pub fn push_file(factory: &StreamFactory, input: &str, output: &str, need_inverse: bool) -> Result<u64> {
    let started = Instant::now();
    let mut reader = factory.create(input, "rb")?;
    let mut writer = factory.create(output, "wb")?;

    let converted = convert_records(reader.as_mut(), writer.as_mut(), input, need_inverse)
        .and_then(|count| reader.close().map(|()| count));
    let count = match converted {
        Ok(count) => count,
        Err(e) => {
            if let Err(abort_err) = writer.abort() {
                warn!(output, "discarding partial output failed: {}", abort_err);
            }
            return Err(e);
        }
    };
    writer.close()?;

    info!(
        input,
        output,
        records = count,
        elapsed = %humantime::format_duration(started.elapsed()),
        "push finished"
    );
    Ok(count)
}

/// Resolve `opts.input` and convert every match into `opts.output`.
///
/// Fails only when nothing matches; per-file failures are in the summary.
pub fn run_push(factory: &StreamFactory, opts: &PushOptions) -> Result<PushSummary> {
    let inputs = match_files(factory, &opts.input)?;
    if inputs.is_empty() {
        return Err(Error::not_found(opts.input.clone()));
    }
    let jobs: Vec<(String, String)> = inputs
        .into_iter()
        .map(|input| {
            let output = output_path(&opts.output, &input);
            (input, output)
        })
        .collect();
    info!(files = jobs.len(), output = %opts.output, "starting push");

    let run = |(input, output): &(String, String)| FileOutcome {
        input: input.clone(),
        output: output.clone(),
        result: push_file(factory, input, output, opts.need_inverse),
    };

    let files: Vec<FileOutcome> = match opts.max_workers {
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n.max(1))
                .thread_name(|i| format!("push-worker-{i}"))
                .build()
                .map_err(|e| Error::runtime(format!("failed to create worker pool: {e}")))?;
            pool.install(|| jobs.par_iter().map(run).collect())
        }
        None => thread::scope(|s| {
            let run = &run;
            let handles: Vec<_> = jobs
                .iter()
                .map(|job| (job, s.spawn(move || run(job))))
                .collect();
            handles
                .into_iter()
                .map(|((input, output), handle)| {
                    handle.join().unwrap_or_else(|_| FileOutcome {
                        input: input.clone(),
                        output: output.clone(),
                        result: Err(Error::runtime("push worker panicked")),
                    })
                })
                .collect::<Vec<_>>()
        }),
    };

    let summary = PushSummary { files };
    for failed in summary.failed() {
        if let Err(e) = &failed.result {
            error!(input = %failed.input, "push failed: {}", e);
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_keeps_input_basename() {
        assert_eq!(output_path("obs://b/out/", "obs://b/in/part-3"), "obs://b/out/part-3");
        assert_eq!(output_path("/tmp/out", "/data/part-0"), "/tmp/out/part-0");
        assert_eq!(output_path("out", "part-0"), "out/part-0");
    }
}
