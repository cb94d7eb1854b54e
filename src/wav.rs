use std::io::{self, BufWriter, Seek, SeekFrom, Write};

use wac::process::emit::SampleSink;
use wac2wav_macros::{ToBytes, riff_chunk};

use crate::byteorder::WriteBytesLe;
use crate::join_bytes_le;

pub const RIFF_ID: [u8; 4] = *b"RIFF";
pub const WAVE_ID: [u8; 4] = *b"WAVE";
pub const DATA_ID: [u8; 4] = *b"data";

pub const WAVE_FORMAT_PCM: u16 = 1;

/// Size of the canonical header up to the first data byte.
pub const WAV_HEADER_BYTES: u64 = 44;

const RIFF_SIZE_OFFSET: u64 = 4;
const DATA_SIZE_OFFSET: u64 = 40;

pub trait RiffChunk {
    fn chunk_id(&self) -> &[u8; 4];
    fn chunk_data(&self) -> Vec<u8>;

    fn write_chunk(&self, dst: &mut Vec<u8>) {
        let data = self.chunk_data();
        dst.extend_from_slice(self.chunk_id());
        (data.len() as u32).write_le(dst);
        dst.extend_from_slice(&data);
    }
}

#[riff_chunk(b"fmt ")]
#[derive(ToBytes, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatChunk {
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl FormatChunk {
    pub fn pcm(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        let block_align = channels * (bits_per_sample / 8);
        Self {
            format_tag: WAVE_FORMAT_PCM,
            channels,
            sample_rate,
            byte_rate: sample_rate * block_align as u32,
            block_align,
            bits_per_sample,
        }
    }
}

/// RIFF/WAVE writer for 16-bit PCM audio.
///
/// Chunk sizes are written upfront from the expected length so the output
/// can go to a pipe. Seekable outputs can be corrected afterwards with
/// [`WAVWriter::patch_sizes`].
pub struct WAVWriter<W: Write> {
    writer: BufWriter<W>,
    format: FormatChunk,
    data_written: u64,
    data_declared: u64,
}

impl<W: Write> WAVWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            format: FormatChunk::pcm(48000, 1, 16),
            data_written: 0,
            data_declared: 0,
        }
    }

    /// Configure audio format parameters
    pub fn configure_audio_format(
        &mut self,
        sample_rate: u32,
        channels: u16,
        bits_per_sample: u16,
    ) -> io::Result<()> {
        if self.data_written > 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Cannot change format after writing data",
            ));
        }

        self.format = FormatChunk::pcm(sample_rate, channels, bits_per_sample);
        Ok(())
    }

    /// Write the RIFF header declaring `frames` samples per channel.
    pub fn write_header(&mut self, frames: u64) -> io::Result<()> {
        let max_data = (u32::MAX as u64 - WAV_HEADER_BYTES + 8) & !1;
        let requested = frames * self.format.block_align as u64;
        if requested > max_data {
            log::warn!("Output exceeds the 4 GiB RIFF limit, sizes are clamped");
        }
        let data_size = requested.min(max_data);
        self.data_declared = data_size;

        let mut header = join_bytes_le!(RIFF_ID, riff_size(data_size), WAVE_ID);
        self.format.write_chunk(&mut header);
        header.extend_from_slice(&join_bytes_le!(DATA_ID, data_size as u32));

        self.writer.write_all(&header)
    }

    pub fn write_pcm_16bit(&mut self, samples: &[i16]) -> io::Result<()> {
        for &sample in samples {
            self.writer.write_all(&sample.to_le_bytes())?;
        }
        self.data_written += samples.len() as u64 * 2;
        Ok(())
    }

    /// Flush buffered data
    pub fn finish(&mut self) -> io::Result<()> {
        if self.data_written != self.data_declared {
            log::debug!(
                "WAV data length {} differs from declared {}",
                self.data_written,
                self.data_declared
            );
        }
        self.writer.flush()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }

    /// Get statistics about written data
    pub fn stats(&self) -> WAVStats {
        WAVStats {
            data_written: self.data_written,
            sample_rate: self.format.sample_rate,
            channels: self.format.channels,
            bits_per_sample: self.format.bits_per_sample,
        }
    }
}

impl<W: Write + Seek> WAVWriter<W> {
    /// Rewrite chunk sizes to match the data actually written.
    pub fn patch_sizes(&mut self) -> io::Result<()> {
        self.writer.flush()?;

        if self.data_written == self.data_declared {
            return Ok(());
        }

        let current_pos = self.writer.stream_position()?;
        let data_size = self.data_written.min(u32::MAX as u64);

        self.writer.seek(SeekFrom::Start(RIFF_SIZE_OFFSET))?;
        self.writer.write_all(&riff_size(data_size).to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(DATA_SIZE_OFFSET))?;
        self.writer.write_all(&(data_size as u32).to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(current_pos))?;
        self.writer.flush()?;

        self.data_declared = self.data_written;
        Ok(())
    }
}

impl<W: Write> SampleSink for WAVWriter<W> {
    fn write_samples(&mut self, samples: &[i16]) -> io::Result<()> {
        self.write_pcm_16bit(samples)
    }
}

fn riff_size(data_size: u64) -> u32 {
    (data_size + WAV_HEADER_BYTES - 8).min(u32::MAX as u64) as u32
}

/// Statistics about WAV file writing
#[derive(Debug, Clone)]
pub struct WAVStats {
    pub data_written: u64,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}
