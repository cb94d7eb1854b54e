//! Hand encoder for building WAC fixtures in tests.

use bitstream_io::{BitWrite, BitWriter, LittleEndian};

use crate::structs::block::BLOCK_SYNC;
use crate::structs::header::WAC_MAGIC;

pub(crate) struct BitSink {
    bw: BitWriter<Vec<u8>, LittleEndian>,
    bits: u64,
}

impl BitSink {
    pub fn new() -> Self {
        Self {
            bw: BitWriter::new(Vec::new()),
            bits: 0,
        }
    }

    pub fn put(&mut self, n: u32, value: u32) {
        if n == 0 {
            return;
        }
        self.bw.write_unsigned_var::<u32>(n, value).unwrap();
        self.bits += n as u64;
    }

    pub fn put_signed(&mut self, n: u32, value: i32) {
        self.bw.write_signed_var::<i32>(n, value).unwrap();
        self.bits += n as u64;
    }

    pub fn put_bit(&mut self, bit: bool) {
        self.bw.write_bit(bit).unwrap();
        self.bits += 1;
    }

    /// Zigzag-folds `delta` and writes it as a Golomb code with
    /// `remainder_bits` of remainder.
    pub fn put_delta(&mut self, delta: i32, remainder_bits: u32) {
        let magnitude = if delta >= 0 {
            (delta as u32) << 1
        } else {
            ((-(delta as i64) as u32) << 1) - 1
        };
        let quotient = magnitude >> remainder_bits;
        for _ in 0..quotient {
            self.put_bit(false);
        }
        self.put_bit(true);
        self.put(remainder_bits, magnitude & ((1 << remainder_bits) - 1));
    }

    pub fn align_16bit(&mut self) {
        while self.bits & 15 != 0 {
            self.put_bit(false);
        }
    }

    pub fn put_block_header(&mut self, index: u32) {
        self.align_16bit();
        self.put(32, BLOCK_SYNC);
        self.put(32, index);
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.align_16bit();
        self.bw.into_writer()
    }
}

/// Header fields for a fixture, with a mono lossless default.
#[derive(Clone, Copy)]
pub(crate) struct HeaderFields {
    pub magic: [u8; 4],
    pub version: u8,
    pub channel_count: u8,
    pub frame_size: u16,
    pub block_size: u16,
    pub flags: u16,
    pub sample_rate: u32,
    pub sample_count: u32,
    pub seek_size: u16,
    pub seek_entries: u16,
}

impl Default for HeaderFields {
    fn default() -> Self {
        Self {
            magic: WAC_MAGIC,
            version: 4,
            channel_count: 1,
            frame_size: 4,
            block_size: 1,
            flags: 0,
            sample_rate: 24000,
            sample_count: 4,
            seek_size: 1,
            seek_entries: 0,
        }
    }
}

impl HeaderFields {
    /// Writes the header followed by a zero-filled seek table.
    pub fn write(&self, sink: &mut BitSink) {
        for byte in self.magic {
            sink.put(8, byte as u32);
        }
        sink.put(8, self.version as u32);
        sink.put(8, self.channel_count as u32);
        sink.put(16, self.frame_size as u32);
        sink.put(16, self.block_size as u32);
        sink.put(16, self.flags as u32);
        sink.put(32, self.sample_rate);
        sink.put(32, self.sample_count);
        sink.put(16, self.seek_size as u32);
        sink.put(16, self.seek_entries as u32);
        for _ in 0..self.seek_entries {
            sink.put(32, 0);
        }
    }
}

/// Encodes one frame: remainder widths first, then deltas interleaved by
/// channel. `deltas[ch]` is ignored for channels whose width is zero.
pub(crate) fn put_frame(sink: &mut BitSink, remainder_bits: &[u32], deltas: &[&[i32]]) {
    for &bits in remainder_bits {
        sink.put(4, bits);
    }

    let len = deltas.iter().map(|d| d.len()).max().unwrap_or(0);
    for i in 0..len {
        for (ch, &bits) in remainder_bits.iter().enumerate() {
            if bits != 0 {
                sink.put_delta(deltas[ch][i], bits);
            }
        }
    }
}
