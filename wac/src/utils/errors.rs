#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err.into());
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum HeaderError {
    #[error("Invalid WAC magic, Read {0:02X?}, expected \"WAac\"")]
    InvalidMagic([u8; 4]),

    #[error("Unsupported WAC version {0}, only versions <= 4 are supported")]
    UnsupportedVersion(u8),

    #[error("channel count must be 1 or 2. Read {0}")]
    InvalidChannelCount(u8),

    #[error("frame size must be non-zero")]
    InvalidFrameSize,

    #[error("block size must be non-zero")]
    InvalidBlockSize,

    #[error("seek size must be non-zero when GPS data is present")]
    InvalidSeekSize,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SyncError {
    #[error("Invalid block sync for block {block} at byte {offset}. Read {read:#010X}")]
    InvalidBlockSync { block: u32, offset: u64, read: u32 },

    #[error("Block index out of sequence at byte {offset}: read {read}, expected {expected}")]
    BlockIndexMismatch { expected: u32, read: u32, offset: u64 },
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum StreamError {
    #[error("Stream truncated in block {block} at byte {offset}")]
    Truncated { block: u32, offset: u64 },

    #[error("Stream truncated in header at byte {offset}")]
    TruncatedHeader { offset: u64 },

    #[error("Stream ended after {decoded} of {expected} samples per channel")]
    ShortStream { decoded: u64, expected: u64 },

    #[error("Corrupt Golomb code in block {block} at byte {offset}")]
    CorruptCode { block: u32, offset: u64 },
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum UnsupportedFeature {
    #[error("Triggered WAC file: zero frames are decoded as silence instead of being elided")]
    TriggeredZeroFrames,

    #[error("GPS data present: fixes are extracted but not interpreted")]
    UninterpretedGps,

    #[error("Tag data present: tags are extracted but not interpreted")]
    UninterpretedTag,
}
