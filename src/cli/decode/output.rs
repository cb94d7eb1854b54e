use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write};
use std::path::{Path, PathBuf};

use wac::process::emit::SampleSink;
use wac::structs::header::ContainerHeader;

use super::super::command::AudioFormat;
use crate::input::is_pipe_path;
use crate::wav::{WAVStats, WAVWriter};

pub fn create_path_with_extension(base_path: &Path, expected_ext: &str) -> PathBuf {
    if let Some(existing_ext) = base_path.extension() {
        if existing_ext == expected_ext {
            base_path.to_path_buf()
        } else {
            base_path.with_extension(expected_ext)
        }
    } else {
        let mut path = base_path.to_path_buf();
        path.set_extension(expected_ext);
        path
    }
}

/// Resolves where decoded audio goes: an explicit path, stdout for `-` or
/// stdin input, otherwise next to the input file.
pub fn resolve_output_path(input: &Path, output: Option<&Path>, format: AudioFormat) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None if is_pipe_path(input) => PathBuf::from("-"),
        None => create_path_with_extension(input, format.extension()),
    }
}

pub enum AudioWriter {
    Pcm(BufWriter<Box<dyn Write>>),
    WavFile(WAVWriter<File>),
    WavPipe(WAVWriter<Stdout>),
}

impl AudioWriter {
    pub fn create(path: &Path, format: AudioFormat, header: &ContainerHeader) -> Result<Self> {
        let is_pipe = is_pipe_path(path);

        match format {
            AudioFormat::Pcm => {
                let inner: Box<dyn Write> = if is_pipe {
                    Box::new(io::stdout())
                } else {
                    Box::new(create_file(path)?)
                };
                Ok(AudioWriter::Pcm(BufWriter::new(inner)))
            }
            AudioFormat::Wav if is_pipe => {
                let mut wav_writer = WAVWriter::new(io::stdout());
                configure_wav(&mut wav_writer, header)?;
                Ok(AudioWriter::WavPipe(wav_writer))
            }
            AudioFormat::Wav => {
                let mut wav_writer = WAVWriter::new(create_file(path)?);
                configure_wav(&mut wav_writer, header)?;
                Ok(AudioWriter::WavFile(wav_writer))
            }
        }
    }

    pub fn finish(self) -> Result<()> {
        match self {
            AudioWriter::Pcm(mut w) => {
                w.flush()?;
            }
            AudioWriter::WavFile(mut w) => {
                w.finish()?;
                w.patch_sizes()?;
                log_wav_stats(&w.stats());
            }
            AudioWriter::WavPipe(mut w) => {
                w.finish()?;
                log_wav_stats(&w.stats());
            }
        }
        Ok(())
    }
}

impl SampleSink for AudioWriter {
    fn write_samples(&mut self, samples: &[i16]) -> io::Result<()> {
        match self {
            AudioWriter::Pcm(pcm_writer) => {
                for &sample in samples {
                    pcm_writer.write_all(&sample.to_le_bytes())?;
                }
                Ok(())
            }
            AudioWriter::WavFile(wav_writer) => wav_writer.write_pcm_16bit(samples),
            AudioWriter::WavPipe(wav_writer) => wav_writer.write_pcm_16bit(samples),
        }
    }
}

fn log_wav_stats(stats: &WAVStats) {
    log::debug!(
        "WAV output: {} bytes of {}-bit PCM, {} channel(s) at {} Hz",
        stats.data_written,
        stats.bits_per_sample,
        stats.channels,
        stats.sample_rate
    );
}

fn create_file(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("cannot create {}", path.display()))
}

fn configure_wav<W: Write>(wav_writer: &mut WAVWriter<W>, header: &ContainerHeader) -> Result<()> {
    wav_writer.configure_audio_format(header.sample_rate, header.channel_count as u16, 16)?;
    wav_writer.write_header(header.sample_count as u64)?;
    Ok(())
}
