use std::io;

use anyhow::Result;
use log::Level::{Info, Warn};
use log::{debug, info, trace};

use crate::log_or_err;
use crate::process::emit::{PcmEmitter, SampleSink};
use crate::structs::block::Block;
use crate::structs::frame::Accumulators;
use crate::structs::gps::{GpsFix, Tag};
use crate::structs::header::{ContainerHeader, MAX_CHANNELS};
use crate::utils::bitstream_io::BitstreamIoReader;
use crate::utils::errors::{StreamError, UnsupportedFeature};

/// Receiver for the GPS and tag side channel.
///
/// Default methods discard the data; `()` is the no-op sink.
pub trait AuxSink {
    fn gps_fix(&mut self, _block: u32, _fix: &GpsFix) {}

    fn tag(&mut self, _block: u32, _tag: Tag) {}
}

impl AuxSink for () {}

impl<A: AuxSink> AuxSink for Option<A> {
    fn gps_fix(&mut self, block: u32, fix: &GpsFix) {
        if let Some(aux) = self {
            aux.gps_fix(block, fix)
        }
    }

    fn tag(&mut self, block: u32, tag: Tag) {
        if let Some(aux) = self {
            aux.tag(block, tag)
        }
    }
}

impl<A: AuxSink + ?Sized> AuxSink for &mut A {
    fn gps_fix(&mut self, block: u32, fix: &GpsFix) {
        (**self).gps_fix(block, fix)
    }

    fn tag(&mut self, block: u32, tag: Tag) {
        (**self).tag(block, tag)
    }
}

#[derive(Debug, Clone)]
pub struct DecoderState {
    pub fail_level: log::Level,
    pub next_block_index: u32,
    pub accumulators: Accumulators,
    pub zero_frames: u64,
    pub finished: bool,
}

impl Default for DecoderState {
    fn default() -> Self {
        Self {
            fail_level: log::Level::Error,
            next_block_index: 0,
            accumulators: [0; MAX_CHANNELS],
            zero_frames: 0,
            finished: false,
        }
    }
}

/// Streaming WAC decoder.
///
/// Reads the header and skips the seek table on construction, then decodes
/// one block per [`Decoder::decode_block`] call. Memory use is bounded by
/// one block regardless of file length.
pub struct Decoder<R: io::Read> {
    reader: BitstreamIoReader<R>,
    header: ContainerHeader,
    emitter: PcmEmitter,
    state: DecoderState,
}

/// One block decoded to interleaved 16-bit PCM.
#[derive(Debug, Clone)]
pub struct DecodedBlock {
    pub index: u32,

    /// GPS fix, present at the start of each seek grouping in GPS files.
    pub gps: Option<GpsFix>,

    /// Tag nibble, present on every block in tagged files.
    pub tag: Option<Tag>,

    /// Frames decoded from this block.
    pub frame_count: usize,

    /// Frames in which every channel was an untriggered gap.
    pub zero_frames: usize,

    /// Valid samples per channel in `pcm_data`.
    pub sample_length: usize,

    pub channel_count: usize,

    /// Samples interleaved by channel, rescaled for lossy files.
    pub pcm_data: Vec<i16>,
}

/// Totals for a completed decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    pub blocks: u32,
    /// Samples per channel written to the sink.
    pub samples: u64,
    pub zero_frames: u64,
}

impl<R: io::Read> Decoder<R> {
    pub fn new(read: R) -> Result<Self> {
        Self::with_fail_level(read, log::Level::Error)
    }

    /// Creates a decoder with the given failure level for validation
    /// conditions.
    ///
    /// - `log::Level::Error`: Only fail on Error level conditions (default)
    /// - `log::Level::Warn`: Fail on Warning level and above (strict mode)
    pub fn with_fail_level(read: R, fail_level: log::Level) -> Result<Self> {
        let mut reader = BitstreamIoReader::new(read);
        let header = ContainerHeader::read(&mut reader)?;
        header.skip_seek_table(&mut reader)?;

        let state = DecoderState {
            fail_level,
            ..Default::default()
        };

        if header.flags.triggered() {
            log_or_err!(state, Warn, UnsupportedFeature::TriggeredZeroFrames);
        }
        if header.flags.gps_present() {
            log_or_err!(state, Info, UnsupportedFeature::UninterpretedGps);
        }
        if header.flags.tag_present() {
            log_or_err!(state, Info, UnsupportedFeature::UninterpretedTag);
        }

        Ok(Self {
            emitter: PcmEmitter::new(&header),
            reader,
            header,
            state,
        })
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    pub fn set_fail_level(&mut self, level: log::Level) {
        self.state.fail_level = level;
    }

    /// Samples per channel decoded so far.
    pub fn samples_decoded(&self) -> u64 {
        self.emitter.emitted()
    }

    pub fn blocks_decoded(&self) -> u32 {
        self.state.next_block_index
    }

    pub fn is_finished(&self) -> bool {
        self.state.finished
    }

    /// Decodes the next block.
    ///
    /// Returns `None` once the declared sample count has been produced, even
    /// if more block data follows, or when the input ends on a block
    /// boundary first.
    pub fn decode_block(&mut self) -> Result<Option<DecodedBlock>> {
        if self.state.finished || self.emitter.is_complete() {
            self.state.finished = true;
            return Ok(None);
        }

        let frame_size = self.header.frame_size as u64;
        let frame_limit = self.emitter.remaining().div_ceil(frame_size);
        let frame_limit = usize::try_from(frame_limit).unwrap_or(usize::MAX);

        let index = self.state.next_block_index;
        let block = match Block::read(
            &mut self.reader,
            &self.header,
            index,
            frame_limit,
            &mut self.state.accumulators,
        ) {
            Ok(Some(block)) => block,
            Ok(None) => {
                self.state.finished = true;
                log_or_err!(
                    self.state,
                    Warn,
                    StreamError::ShortStream {
                        decoded: self.emitter.emitted(),
                        expected: self.header.sample_count as u64,
                    }
                );
                return Ok(None);
            }
            Err(e) => {
                self.state.finished = true;
                return Err(e);
            }
        };

        self.state.next_block_index = index.wrapping_add(1);

        let mut pcm_data = Vec::with_capacity(
            block.frames.len() * self.header.frame_size as usize * self.header.channels(),
        );
        let mut sample_length = 0;
        for frame in &block.frames {
            sample_length += self.emitter.emit_frame(frame, &mut pcm_data);
        }

        let zero_frames = block.zero_frames();
        if zero_frames > 0 {
            trace!("block {index}: {zero_frames} zero frame(s)");
        }
        self.state.zero_frames += zero_frames as u64;

        if self.emitter.is_complete() {
            self.state.finished = true;
            debug!(
                "Reached declared sample count {} at block {index}",
                self.header.sample_count
            );
        }

        Ok(Some(DecodedBlock {
            index,
            gps: block.gps,
            tag: block.tag,
            frame_count: block.frames.len(),
            zero_frames,
            sample_length,
            channel_count: self.header.channels(),
            pcm_data,
        }))
    }

    /// Decodes every remaining block into `sink`, reporting side-channel
    /// data to `aux`.
    pub fn decode_into<S, A>(&mut self, sink: &mut S, aux: &mut A) -> Result<DecodeSummary>
    where
        S: SampleSink + ?Sized,
        A: AuxSink + ?Sized,
    {
        let mut summary = DecodeSummary::default();

        while let Some(block) = self.decode_block()? {
            if let Some(fix) = &block.gps {
                aux.gps_fix(block.index, fix);
            }
            if let Some(tag) = block.tag {
                aux.tag(block.index, tag);
            }

            sink.write_samples(&block.pcm_data)?;

            summary.blocks += 1;
            summary.samples += block.sample_length as u64;
            summary.zero_frames += block.zero_frames as u64;
        }

        info!(
            "Decoded {} blocks, {} samples per channel ({} zero frames)",
            summary.blocks, summary.samples, summary.zero_frames
        );

        Ok(summary)
    }
}

impl<R: io::Read> Iterator for Decoder<R> {
    type Item = Result<DecodedBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decode_block().transpose()
    }
}

/// Decodes a whole WAC stream into memory.
///
/// The output holds `sample_count * channel_count` interleaved samples for
/// a complete file.
pub fn decode_to_vec<R: io::Read>(read: R) -> Result<(ContainerHeader, Vec<i16>)> {
    let mut decoder = Decoder::new(read)?;
    let header = decoder.header().clone();

    let mut pcm = Vec::with_capacity(header.sample_count as usize * header.channels());
    decoder.decode_into(&mut pcm, &mut ())?;

    Ok((header, pcm))
}
