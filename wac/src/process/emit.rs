//! Interleaved 16-bit PCM emission.

use std::io;

use crate::structs::frame::Frame;
use crate::structs::header::ContainerHeader;

/// Destination for channel-interleaved 16-bit samples.
pub trait SampleSink {
    fn write_samples(&mut self, samples: &[i16]) -> io::Result<()>;
}

impl SampleSink for Vec<i16> {
    fn write_samples(&mut self, samples: &[i16]) -> io::Result<()> {
        self.extend_from_slice(samples);
        Ok(())
    }
}

impl<S: SampleSink + ?Sized> SampleSink for &mut S {
    fn write_samples(&mut self, samples: &[i16]) -> io::Result<()> {
        (**self).write_samples(samples)
    }
}

/// Converts decoded frames into interleaved PCM, stopping at the declared
/// per-channel sample count.
#[derive(Debug, Clone)]
pub struct PcmEmitter {
    lossy_bits: u32,
    channel_count: usize,
    expected: u64,
    emitted: u64,
}

impl PcmEmitter {
    pub fn new(header: &ContainerHeader) -> Self {
        Self {
            lossy_bits: header.lossy_bits(),
            channel_count: header.channels(),
            expected: header.sample_count as u64,
            emitted: 0,
        }
    }

    /// Appends one frame to `out`, sample by sample across channels.
    ///
    /// Returns the number of samples per channel appended, which is less
    /// than the frame length only for the frame that reaches the end.
    pub fn emit_frame(&mut self, frame: &Frame, out: &mut Vec<i16>) -> usize {
        let len = (frame.sample_len() as u64).min(self.remaining()) as usize;

        out.reserve(len * self.channel_count);
        for i in 0..len {
            for channel in frame.channels.iter().take(self.channel_count) {
                out.push(rescale(channel.samples[i], self.lossy_bits));
            }
        }

        self.emitted += len as u64;
        len
    }

    pub fn remaining(&self) -> u64 {
        self.expected - self.emitted
    }

    pub fn is_complete(&self) -> bool {
        self.emitted >= self.expected
    }

    /// Samples per channel emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

/// Restores the dynamic range of a sample whose low `lossy_bits` bits were
/// discarded by the encoder.
#[inline(always)]
pub fn rescale(sample: i32, lossy_bits: u32) -> i16 {
    sample.wrapping_shl(lossy_bits) as i16
}
