mod decode_impl;
pub mod output;
pub mod progress;

// Re-export the main decode function
pub use decode_impl::cmd_decode;
