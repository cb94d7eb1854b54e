//! Data structures representing WAC format components.
//!
//! Contains structured representations of the container header, blocks,
//! frames and the GPS/tag side channel decoded from the bitstream.

pub mod block;
pub mod frame;
pub mod gps;
pub mod header;
