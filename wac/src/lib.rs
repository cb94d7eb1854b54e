#![doc = include_str!("../README.md")]
//!
//! ## Technical Overview
//!
//! Decoder for the Wildlife Acoustics WAC container (versions up to 4).
//!
//! ### Bitstream Organization
//!
//! **Header**: 24 bytes of little-endian fields followed by a seek table.
//! **Blocks**: 16-bit aligned, each opened by a sync pattern and a running
//! block index, then optional GPS/tag fields and a fixed number of frames.
//! **Frames**: per-channel Golomb/Rice coded sample deltas.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! use wac::process::decode::Decoder;
//!
//! let file = BufReader::new(File::open("recording.wac")?);
//! let mut decoder = Decoder::new(file)?;
//!
//! let channels = decoder.header().channels();
//! for block in decoder.by_ref() {
//!     let block = block?;
//!     // Interleaved 16-bit PCM
//!     let pcm: &[i16] = &block.pcm_data;
//!     assert_eq!(pcm.len(), block.sample_length * channels);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

/// Processing functionality for WAC streams.
///
/// 1. **Decoding** ([`process::decode`]): Header validation, block
///    synchronization and frame reconstruction.
///
/// 2. **Emission** ([`process::emit`]): Interleaved, rescaled 16-bit PCM.
pub mod process;

/// Data structures representing WAC format components.
///
/// - **Header** ([`structs::header`]): Container descriptor and flags
/// - **Blocks** ([`structs::block`]): Sync-checked groups of frames
/// - **Frames** ([`structs::frame`]): Golomb-coded sample deltas
/// - **GPS/Tag** ([`structs::gps`]): Side-channel fields in block headers
pub mod structs;

/// Utility functions and supporting infrastructure.
///
/// - **Bitstream I/O** ([`utils::bitstream_io`]): Bit-level reading
/// - **Error Handling** ([`utils::errors`]): Error types
pub mod utils;
