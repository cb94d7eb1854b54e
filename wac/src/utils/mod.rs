//! Utility functions and supporting infrastructure.
//!
//! Provides bitstream I/O and error handling for processing.

pub mod bitstream_io;
pub mod errors;

#[cfg(test)]
pub(crate) mod test_util;
