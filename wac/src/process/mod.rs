/// Block-by-block decoding of a WAC stream.
///
/// Provides the [`Decoder`](decode::Decoder) that validates the container
/// header, skips the seek table and yields
/// [`DecodedBlock`](decode::DecodedBlock) objects holding 16-bit PCM.
pub mod decode;

/// PCM emission.
///
/// Provides the [`PcmEmitter`](emit::PcmEmitter) that interleaves and
/// rescales frame samples, and the [`SampleSink`](emit::SampleSink) trait
/// for PCM destinations.
pub mod emit;
