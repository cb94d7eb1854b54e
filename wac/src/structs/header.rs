//! WAC container header.
//!
//! ## Layout (24 bytes, little-endian)
//!
//! | Offset | Size | Field         |
//! |--------|------|---------------|
//! | 0x00   | 4    | magic `WAac`  |
//! | 0x04   | 1    | version       |
//! | 0x05   | 1    | channel count |
//! | 0x06   | 2    | frame size    |
//! | 0x08   | 2    | block size    |
//! | 0x0A   | 2    | flags         |
//! | 0x0C   | 4    | sample rate   |
//! | 0x10   | 4    | sample count  |
//! | 0x14   | 2    | seek size     |
//! | 0x16   | 2    | seek entries  |
//!
//! The header is followed by `seek entries` 32-bit offsets which this
//! decoder skips.

use std::fmt;
use std::io;

use anyhow::{Result, bail};
use log::{debug, info};

use crate::utils::bitstream_io::BitstreamIoReader;
use crate::utils::errors::{HeaderError, StreamError};

pub const WAC_MAGIC: [u8; 4] = *b"WAac";

/// Highest container version this decoder understands.
pub const MAX_VERSION: u8 = 4;

pub const HEADER_BYTES: u64 = 24;

pub const MAX_CHANNELS: usize = 2;

/// Size of one seek table entry in bytes.
pub const SEEK_ENTRY_BYTES: u64 = 4;

/// Header flag word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags(pub u16);

impl Flags {
    pub const LOSSY_BITS_MASK: u16 = 0x000F;
    pub const TRIGGERED: u16 = 0x0010;
    pub const GPS_PRESENT: u16 = 0x0020;
    pub const TAG_PRESENT: u16 = 0x0040;

    /// Number of least-significant bits discarded by the encoder.
    pub fn lossy_bits(self) -> u32 {
        (self.0 & Self::LOSSY_BITS_MASK) as u32
    }

    pub fn triggered(self) -> bool {
        self.0 & Self::TRIGGERED != 0
    }

    pub fn gps_present(self) -> bool {
        self.0 & Self::GPS_PRESENT != 0
    }

    pub fn tag_present(self) -> bool {
        self.0 & Self::TAG_PRESENT != 0
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WAC{}", self.lossy_bits())?;
        if self.triggered() {
            write!(f, " triggered")?;
        }
        if self.gps_present() {
            write!(f, " gps")?;
        }
        if self.tag_present() {
            write!(f, " tag")?;
        }
        Ok(())
    }
}

/// Validated container descriptor, read once per file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub version: u8,
    pub channel_count: u8,
    /// Samples per channel per frame.
    pub frame_size: u16,
    /// Frames per block.
    pub block_size: u16,
    pub flags: Flags,
    pub sample_rate: u32,
    /// Samples per channel in the whole file.
    pub sample_count: u32,
    /// Blocks per seek table entry.
    pub seek_size: u16,
    pub seek_entries: u16,
}

impl ContainerHeader {
    /// Reads and validates the fixed 24-byte header.
    ///
    /// The reader is left positioned at the first seek table entry; see
    /// [`ContainerHeader::seek_table_bytes`].
    pub fn read<R: io::Read>(reader: &mut BitstreamIoReader<R>) -> Result<Self> {
        let magic = Self::read_magic(reader).map_err(|e| truncated_header(e, reader))?;
        if magic != WAC_MAGIC {
            bail!(HeaderError::InvalidMagic(magic));
        }

        let header = Self::read_fields(reader).map_err(|e| truncated_header(e, reader))?;
        header.validate()?;

        info!(
            "WAC v{}: {} channel(s), {} Hz, {} samples, {}",
            header.version, header.channel_count, header.sample_rate, header.sample_count, header.flags
        );
        debug!(
            "frame_size = {}, block_size = {}, seek_size = {}, seek_entries = {}",
            header.frame_size, header.block_size, header.seek_size, header.seek_entries
        );

        Ok(header)
    }

    fn read_magic<R: io::Read>(reader: &mut BitstreamIoReader<R>) -> io::Result<[u8; 4]> {
        let mut magic = [0u8; 4];
        for byte in magic.iter_mut() {
            *byte = reader.get_n(8)? as u8;
        }
        Ok(magic)
    }

    fn read_fields<R: io::Read>(reader: &mut BitstreamIoReader<R>) -> io::Result<Self> {
        Ok(Self {
            version: reader.get_n(8)? as u8,
            channel_count: reader.get_n(8)? as u8,
            frame_size: reader.get_n(16)? as u16,
            block_size: reader.get_n(16)? as u16,
            flags: Flags(reader.get_n(16)? as u16),
            sample_rate: reader.get_n(32)?,
            sample_count: reader.get_n(32)?,
            seek_size: reader.get_n(16)? as u16,
            seek_entries: reader.get_n(16)? as u16,
        })
    }

    /// Byte length of the seek table that follows the header.
    pub fn seek_table_bytes(&self) -> u64 {
        self.seek_entries as u64 * SEEK_ENTRY_BYTES
    }

    /// Advances the reader past the seek table without materializing it.
    pub fn skip_seek_table<R: io::Read>(&self, reader: &mut BitstreamIoReader<R>) -> Result<()> {
        let len = self.seek_table_bytes();
        reader
            .skip_bytes(len)
            .map_err(|e| truncated_header(e, reader))?;

        debug!("Skipped {len} byte seek table");
        Ok(())
    }

    pub fn channels(&self) -> usize {
        self.channel_count as usize
    }

    pub fn lossy_bits(&self) -> u32 {
        self.flags.lossy_bits()
    }

    /// Samples per channel carried by one full block.
    pub fn samples_per_block(&self) -> u64 {
        self.frame_size as u64 * self.block_size as u64
    }

    /// Whether the block with this index carries a GPS fix.
    pub fn gps_expected(&self, block_index: u32) -> bool {
        self.flags.gps_present() && block_index % self.seek_size as u32 == 0
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.sample_count as f64 / self.sample_rate as f64
    }

    fn validate(&self) -> Result<()> {
        if self.version > MAX_VERSION {
            bail!(HeaderError::UnsupportedVersion(self.version));
        }

        if !(1..=MAX_CHANNELS as u8).contains(&self.channel_count) {
            bail!(HeaderError::InvalidChannelCount(self.channel_count));
        }

        if self.frame_size == 0 {
            bail!(HeaderError::InvalidFrameSize);
        }

        if self.block_size == 0 {
            bail!(HeaderError::InvalidBlockSize);
        }

        if self.flags.gps_present() && self.seek_size == 0 {
            bail!(HeaderError::InvalidSeekSize);
        }

        Ok(())
    }
}

fn truncated_header<R: io::Read>(e: io::Error, reader: &BitstreamIoReader<R>) -> anyhow::Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        debug!("{e}");
        StreamError::TruncatedHeader {
            offset: reader.byte_position(),
        }
        .into()
    } else {
        e.into()
    }
}
