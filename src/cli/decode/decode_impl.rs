use super::output::{AudioWriter, resolve_output_path};
use super::progress::{create_progress_bar, finalize_progress_bar};
use crate::cli::command::{Cli, DecodeArgs};
use crate::input::{InputReader, is_pipe_path};
use crate::metadata::MetadataCollector;
use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar};
use log::Level;
use std::fs;
use std::io;
use std::path::Path;
use wac::process::decode::Decoder;
use wac::process::emit::SampleSink;

pub fn cmd_decode(args: &DecodeArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!(
        "Decoding WAC stream: {} (strict mode: {})",
        args.input.display(),
        cli.strict
    );

    let fail_level = if cli.strict { Level::Warn } else { Level::Error };

    let input_reader = InputReader::new(&args.input)?;
    if input_reader.is_pipe() {
        log::debug!("Reading WAC stream from stdin");
    }
    let mut decoder = Decoder::with_fail_level(input_reader, fail_level)?;
    let header = decoder.header().clone();

    let output_path = resolve_output_path(&args.input, args.output.as_deref(), args.format);
    if is_pipe_path(&output_path) {
        log::info!("Writing {:?} audio to stdout", args.format);
    } else {
        log::info!("Output path: {}", output_path.display());
    }

    let pb = match multi {
        Some(multi) => Some(create_progress_bar(multi, header.sample_count as u64)?),
        None => None,
    };

    let mut output = ProgressSink {
        writer: AudioWriter::create(&output_path, args.format, &header)?,
        pb,
        channels: header.channels() as u64,
        samples: 0,
    };
    let mut collector = args
        .metadata
        .as_ref()
        .map(|_| MetadataCollector::new(&args.input, &header));

    let start_time = std::time::Instant::now();
    let decoded = decoder.decode_into(&mut output, &mut collector);

    let ProgressSink { writer, pb, .. } = output;
    let finished = match decoded {
        Ok(summary) => writer.finish().map(|()| summary),
        Err(e) => {
            drop(writer);
            Err(e)
        }
    };

    let summary = match finished {
        Ok(summary) => summary,
        Err(e) => {
            if let Some(pb) = &pb {
                pb.finish_with_message("decode failed");
            }
            discard_partial_output(&output_path);
            return Err(e);
        }
    };

    if let (Some(path), Some(collector)) = (&args.metadata, collector) {
        log::info!(
            "Writing {} GPS fix(es) and {} tag span(s) to {}",
            collector.gps().len(),
            collector.tags().len(),
            path.display()
        );
        collector.into_metadata().write_yaml(path)?;
    }

    finalize_progress_bar(&pb, summary.samples, header.sample_rate, start_time);
    log::info!("Decoding completed successfully");

    Ok(())
}

/// Audio writer that advances the progress bar by samples per channel.
struct ProgressSink {
    writer: AudioWriter,
    pb: Option<ProgressBar>,
    channels: u64,
    samples: u64,
}

impl SampleSink for ProgressSink {
    fn write_samples(&mut self, samples: &[i16]) -> io::Result<()> {
        self.writer.write_samples(samples)?;
        self.samples += samples.len() as u64 / self.channels;
        if let Some(pb) = &self.pb {
            pb.set_position(self.samples);
        }
        Ok(())
    }
}

/// A failed decode leaves a header declaring the full sample count, so the
/// file is removed rather than left looking complete.
fn discard_partial_output(path: &Path) {
    if is_pipe_path(path) {
        return;
    }

    match fs::remove_file(path) {
        Ok(()) => log::warn!("Removed incomplete output {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Cannot remove incomplete output {}: {e}", path.display()),
    }
}
