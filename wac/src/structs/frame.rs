//! Golomb-coded frames.
//!
//! A frame starts with one 4-bit remainder width per channel, followed by
//! `frame_size` deltas per channel interleaved sample by sample. Each delta
//! is a unary quotient (0 bits terminated by a 1 bit) and a fixed-width
//! remainder, folded to a signed value with zigzag mapping.
//!
//! A remainder width of zero marks a channel with no content in this frame
//! ("zero frame"). No delta bits are read for it and its samples hold the
//! current accumulator value.

use std::io;

use log::trace;

use crate::structs::header::{ContainerHeader, MAX_CHANNELS};
use crate::utils::bitstream_io::BitstreamIoReader;

pub const REMAINDER_BITS_WIDTH: u32 = 4;

/// Running absolute sample value per channel, carried across frames and
/// blocks for the whole file.
pub type Accumulators = [i32; MAX_CHANNELS];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelFrame {
    /// Golomb remainder width, 0..=15.
    pub remainder_bits: u8,
    /// Reconstructed samples, before lossy rescaling.
    pub samples: Vec<i32>,
}

impl ChannelFrame {
    /// True for an untriggered gap with no coded deltas.
    pub fn is_empty(&self) -> bool {
        self.remainder_bits == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub channels: Vec<ChannelFrame>,
}

impl Frame {
    /// Decodes one frame, updating `accumulators` with every delta.
    pub fn read<R: io::Read>(
        reader: &mut BitstreamIoReader<R>,
        header: &ContainerHeader,
        accumulators: &mut Accumulators,
    ) -> io::Result<Self> {
        let channel_count = header.channels();
        let frame_size = header.frame_size as usize;

        let mut channels = Vec::with_capacity(channel_count);
        for _ in 0..channel_count {
            channels.push(ChannelFrame {
                remainder_bits: reader.get_n(REMAINDER_BITS_WIDTH)? as u8,
                samples: Vec::with_capacity(frame_size),
            });
        }

        trace!(
            "frame at bit {}: remainder_bits = {:?}",
            reader.position(),
            channels.iter().map(|c| c.remainder_bits).collect::<Vec<_>>()
        );

        for _ in 0..frame_size {
            for (ch, channel) in channels.iter_mut().enumerate() {
                if channel.remainder_bits != 0 {
                    let magnitude = read_golomb(reader, channel.remainder_bits as u32)?;
                    accumulators[ch] = accumulators[ch].wrapping_add(unfold_delta(magnitude));
                }
                channel.samples.push(accumulators[ch]);
            }
        }

        Ok(Self { channels })
    }

    /// True when every channel is an untriggered gap.
    pub fn is_zero_frame(&self) -> bool {
        self.channels.iter().all(ChannelFrame::is_empty)
    }

    pub fn sample_len(&self) -> usize {
        self.channels.first().map_or(0, |c| c.samples.len())
    }
}

/// Reads one Golomb/Rice code: `quotient * 2^remainder_bits + remainder`.
pub fn read_golomb<R: io::Read>(
    reader: &mut BitstreamIoReader<R>,
    remainder_bits: u32,
) -> io::Result<u32> {
    let quotient = reader.get_unary()?;
    let remainder = reader.get_n(remainder_bits)?;

    let magnitude = ((quotient as u64) << remainder_bits) | remainder as u64;
    u32::try_from(magnitude).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "read_golomb: magnitude {magnitude:#X} overflows at {}",
                reader.position()
            ),
        )
    })
}

/// Maps an even magnitude to a non-negative delta and an odd one to a
/// negative delta: 0, 1, 2, 3, 4 -> 0, -1, 1, -2, 2.
#[inline(always)]
pub fn unfold_delta(magnitude: u32) -> i32 {
    let half = (magnitude >> 1) as i32;
    if magnitude & 1 == 0 { half } else { -half - 1 }
}
