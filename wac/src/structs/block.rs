//! Synchronization-checked blocks of frames.
//!
//! ## Block Structure
//!
//! - **Alignment**: every block starts on a 16-bit word boundary
//! - **Sync**: 32-bit pattern `0x00018000`
//! - **Index**: 32-bit running counter starting at 0
//! - **GPS** (optional): 25-bit latitude + 26-bit longitude at the start of
//!   every seek grouping
//! - **Tag** (optional): 4 bits on every block
//! - **Frames**: `block_size` Golomb-coded frames

use std::io;

use anyhow::{Result, bail};
use log::{debug, trace};

use crate::structs::frame::{Accumulators, Frame};
use crate::structs::gps::{GpsFix, Tag};
use crate::structs::header::ContainerHeader;
use crate::utils::bitstream_io::BitstreamIoReader;
use crate::utils::errors::{StreamError, SyncError};

/// Block header sync pattern. The pattern cannot occur inside coded data.
pub const BLOCK_SYNC: u32 = 0x0001_8000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub index: u32,
    pub gps: Option<GpsFix>,
    pub tag: Option<Tag>,
    pub frames: Vec<Frame>,
}

impl Block {
    /// Reads the block expected at `expected_index`.
    ///
    /// At most `frame_limit` frames are decoded, so a final partial block
    /// is never read past the declared sample count. Returns `None` if the
    /// input ends cleanly where the next block would start.
    pub fn read<R: io::Read>(
        reader: &mut BitstreamIoReader<R>,
        header: &ContainerHeader,
        expected_index: u32,
        frame_limit: usize,
        accumulators: &mut Accumulators,
    ) -> Result<Option<Self>> {
        if let Err(e) = reader.align_16bit() {
            return Err(stream_error(e, expected_index, reader));
        }

        let offset = reader.byte_position();

        let sync = match read_sync(reader) {
            Ok(Some(sync)) => sync,
            Ok(None) => return Ok(None),
            Err(e) => return Err(stream_error(e, expected_index, reader)),
        };

        if sync != BLOCK_SYNC {
            bail!(SyncError::InvalidBlockSync {
                block: expected_index,
                offset,
                read: sync,
            });
        }

        let index = reader
            .get_n(32)
            .map_err(|e| stream_error(e, expected_index, reader))?;

        if index != expected_index {
            bail!(SyncError::BlockIndexMismatch {
                expected: expected_index,
                read: index,
                offset: offset + 4,
            });
        }

        Self::read_body(reader, header, index, frame_limit, accumulators)
            .map(Some)
            .map_err(|e| stream_error(e, index, reader))
    }

    fn read_body<R: io::Read>(
        reader: &mut BitstreamIoReader<R>,
        header: &ContainerHeader,
        index: u32,
        frame_limit: usize,
        accumulators: &mut Accumulators,
    ) -> io::Result<Self> {
        let gps = if header.gps_expected(index) {
            let fix = GpsFix::read(reader)?;
            debug!("block {index}: GPS {fix}");
            Some(fix)
        } else {
            None
        };

        let tag = if header.flags.tag_present() {
            let tag = Tag::read(reader)?;
            if tag.is_set() {
                debug!("block {index}: tag {tag}");
            }
            Some(tag)
        } else {
            None
        };

        let frame_count = frame_limit.min(header.block_size as usize);
        let mut frames = Vec::with_capacity(frame_count);
        for _ in 0..frame_count {
            frames.push(Frame::read(reader, header, accumulators)?);
        }

        trace!(
            "block {index}: {frame_count} frames, ends at bit {}",
            reader.position()
        );

        Ok(Self {
            index,
            gps,
            tag,
            frames,
        })
    }

    pub fn zero_frames(&self) -> usize {
        self.frames.iter().filter(|f| f.is_zero_frame()).count()
    }
}

/// Reads the sync word low byte first so that a clean end of input is told
/// apart from a truncated header.
fn read_sync<R: io::Read>(reader: &mut BitstreamIoReader<R>) -> io::Result<Option<u32>> {
    let Some(low) = reader.get_n_or_eof(8)? else {
        return Ok(None);
    };
    let high = reader.get_n(24)?;
    Ok(Some(low | (high << 8)))
}

fn stream_error<R: io::Read>(
    e: io::Error,
    block: u32,
    reader: &BitstreamIoReader<R>,
) -> anyhow::Error {
    let offset = reader.byte_position();
    match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            debug!("{e}");
            StreamError::Truncated { block, offset }.into()
        }
        io::ErrorKind::InvalidData => {
            debug!("{e}");
            StreamError::CorruptCode { block, offset }.into()
        }
        _ => e.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::header::Flags;
    use crate::utils::bitstream_io::{BsIoSliceReader, MAX_UNARY_RUN};
    use crate::utils::test_util::{BitSink, put_frame};

    fn header(flags: u16, seek_size: u16) -> ContainerHeader {
        ContainerHeader {
            version: 4,
            channel_count: 1,
            frame_size: 2,
            block_size: 2,
            flags: Flags(flags),
            sample_rate: 8000,
            sample_count: 100,
            seek_size,
            seek_entries: 0,
        }
    }

    fn read(data: &[u8], header: &ContainerHeader, expected: u32) -> Result<Option<Block>> {
        let mut acc = [0; 2];
        Block::read(
            &mut BsIoSliceReader::from_slice(data),
            header,
            expected,
            usize::MAX,
            &mut acc,
        )
    }

    #[test]
    fn block_with_frames() {
        let mut sink = BitSink::new();
        sink.put_block_header(0);
        put_frame(&mut sink, &[2], &[&[1, 1]]);
        put_frame(&mut sink, &[2], &[&[-1, -1]]);
        let data = sink.finish();

        let block = read(&data, &header(0, 1), 0).unwrap().unwrap();
        assert_eq!(block.index, 0);
        assert_eq!(block.gps, None);
        assert_eq!(block.tag, None);
        assert_eq!(block.frames.len(), 2);
        assert_eq!(block.frames[0].channels[0].samples, [1, 2]);
        assert_eq!(block.frames[1].channels[0].samples, [1, 0]);
    }

    #[test]
    fn bad_sync_pattern_is_sync_error() {
        let mut sink = BitSink::new();
        sink.put(32, 0x0001_8001);
        sink.put(32, 0);
        let data = sink.finish();

        let err = read(&data, &header(0, 1), 0).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SyncError>(),
            Some(&SyncError::InvalidBlockSync {
                block: 0,
                offset: 0,
                read: 0x0001_8001
            })
        );
    }

    #[test]
    fn out_of_sequence_index_is_sync_error() {
        let mut sink = BitSink::new();
        sink.put_block_header(2);
        let data = sink.finish();

        let err = read(&data, &header(0, 1), 1).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SyncError>(),
            Some(&SyncError::BlockIndexMismatch {
                expected: 1,
                read: 2,
                offset: 4
            })
        );
    }

    #[test]
    fn gps_only_at_seek_grouping_start() {
        let flags = Flags::GPS_PRESENT | Flags::TAG_PRESENT;
        let hdr = header(flags, 4);

        let mut sink = BitSink::new();
        sink.put_block_header(4);
        sink.put_signed(25, 4_200_000);
        sink.put_signed(26, -3_500_000);
        sink.put(4, 2);
        put_frame(&mut sink, &[0], &[&[]]);
        put_frame(&mut sink, &[0], &[&[]]);
        let data = sink.finish();

        let block = read(&data, &hdr, 4).unwrap().unwrap();
        assert_eq!(
            block.gps,
            Some(GpsFix {
                latitude: 4_200_000,
                longitude: -3_500_000
            })
        );
        assert_eq!(block.tag, Some(Tag::Button('B')));
        assert_eq!(block.zero_frames(), 2);

        let mut sink = BitSink::new();
        sink.put_block_header(5);
        sink.put(4, 0);
        put_frame(&mut sink, &[0], &[&[]]);
        put_frame(&mut sink, &[0], &[&[]]);
        let data = sink.finish();

        let block = read(&data, &hdr, 5).unwrap().unwrap();
        assert_eq!(block.gps, None);
        assert_eq!(block.tag, Some(Tag::None));
    }

    #[test]
    fn clean_end_of_input_is_none() {
        assert!(read(&[], &header(0, 1), 3).unwrap().is_none());
    }

    #[test]
    fn truncated_block_reports_position() {
        let mut sink = BitSink::new();
        sink.put_block_header(0);
        sink.put(4, 3);
        let data = sink.finish();

        let err = read(&data, &header(0, 1), 0).unwrap_err();
        assert_eq!(
            err.downcast_ref::<StreamError>(),
            Some(&StreamError::Truncated {
                block: 0,
                offset: 10
            })
        );
    }

    fn put_zero_run(sink: &mut BitSink, bits: u32) {
        for _ in 0..bits / 32 {
            sink.put(32, 0);
        }
        sink.put(bits % 32, 0);
    }

    #[test]
    fn overlong_unary_run_is_corrupt_code() {
        let mut sink = BitSink::new();
        sink.put_block_header(0);
        sink.put(4, 1);
        put_zero_run(&mut sink, 1 << 18);
        let data = sink.finish();

        let err = read(&data, &header(0, 1), 0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StreamError>(),
            Some(StreamError::CorruptCode { block: 0, .. })
        ));
    }

    #[test]
    fn overflowing_magnitude_is_corrupt_code() {
        // Longest accepted quotient with a 15-bit remainder needs 33 bits
        let mut sink = BitSink::new();
        sink.put_block_header(0);
        sink.put(4, 15);
        put_zero_run(&mut sink, MAX_UNARY_RUN);
        sink.put_bit(true);
        sink.put(15, 0);
        let data = sink.finish();

        let err = read(&data, &header(0, 1), 0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StreamError>(),
            Some(StreamError::CorruptCode { block: 0, .. })
        ));
    }

    #[test]
    fn truncated_sync_is_not_clean_end() {
        let err = read(&[0x00, 0x80], &header(0, 1), 0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StreamError>(),
            Some(StreamError::Truncated { block: 0, .. })
        ));
    }
}
