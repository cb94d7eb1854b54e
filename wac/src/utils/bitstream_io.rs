//! Bitstream I/O utilities for WAC parsing.
//!
//! WAC fields are packed least-significant-bit first into little-endian
//! 16-bit words, which is the same bit order as reading each byte LSB first.
//! The reader tracks its own bit position so that it can be used over
//! non-seekable sources such as pipes.

use std::io;

use bitstream_io::{BitRead, BitReader, LittleEndian};

/// Longest unary run accepted before the stream is treated as corrupt.
///
/// A 16-bit sample delta with a 1-bit remainder never needs a quotient
/// longer than this.
pub const MAX_UNARY_RUN: u32 = 1 << 17;

#[derive(Debug)]
pub struct BitstreamIoReader<R: io::Read> {
    bs: BitReader<R, LittleEndian>,
    position: u64,
}

pub type BsIoSliceReader<'a> = BitstreamIoReader<&'a [u8]>;

impl<R> BitstreamIoReader<R>
where
    R: io::Read,
{
    pub fn new(read: R) -> Self {
        Self {
            bs: BitReader::new(read),
            position: 0,
        }
    }

    #[inline(always)]
    pub fn get(&mut self) -> io::Result<bool> {
        match self.bs.read_bit() {
            Ok(bit) => {
                self.position += 1;
                Ok(bit)
            }
            Err(e) => Err(self.annotate(e, "get")),
        }
    }

    /// Reads `n` bits (0..=32) as an unsigned value.
    #[inline(always)]
    pub fn get_n(&mut self, n: u32) -> io::Result<u32> {
        if n == 0 {
            return Ok(0);
        }

        if n > 32 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("get_n({n}): field wider than 32 bits"),
            ));
        }

        match self.bs.read_unsigned_var::<u32>(n) {
            Ok(val) => {
                self.position += n as u64;
                Ok(val)
            }
            Err(e) => Err(self.annotate(e, &format!("get_n({n})"))),
        }
    }

    /// Reads `n` bits (1..=32) as a two's complement value.
    #[inline(always)]
    pub fn get_s(&mut self, n: u32) -> io::Result<i32> {
        if n == 0 || n > 32 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("get_s({n}): unsupported signed field width"),
            ));
        }

        match self.bs.read_signed_var::<i32>(n) {
            Ok(val) => {
                self.position += n as u64;
                Ok(val)
            }
            Err(e) => Err(self.annotate(e, &format!("get_s({n})"))),
        }
    }

    /// Reads `n` bits, or returns `None` if the source is exhausted before
    /// the first bit. Only meaningful on a byte boundary, where a failed
    /// read cannot have consumed a partial byte.
    #[inline(always)]
    pub fn get_n_or_eof(&mut self, n: u32) -> io::Result<Option<u32>> {
        match self.get_n(n) {
            Ok(val) => Ok(Some(val)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof && self.bs.byte_aligned() => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Counts 0 bits up to the terminating 1 bit, consuming the terminator.
    #[inline(always)]
    pub fn get_unary(&mut self) -> io::Result<u32> {
        let mut count = 0;

        while !self.get()? {
            count += 1;
            if count > MAX_UNARY_RUN {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "get_unary: run exceeds {MAX_UNARY_RUN} bits at {}",
                        self.position
                    ),
                ));
            }
        }

        Ok(count)
    }

    #[inline(always)]
    pub fn skip_n(&mut self, n: u32) -> io::Result<()> {
        match self.bs.skip(n) {
            Ok(()) => {
                self.position += n as u64;
                Ok(())
            }
            Err(e) => Err(self.annotate(e, &format!("skip_n({n})"))),
        }
    }

    pub fn skip_bytes(&mut self, mut len: u64) -> io::Result<()> {
        const CHUNK_BYTES: u64 = (u32::MAX >> 3) as u64;

        while len > 0 {
            let chunk = len.min(CHUNK_BYTES);
            self.skip_n((chunk << 3) as u32)?;
            len -= chunk;
        }

        Ok(())
    }

    /// Skips pad bits up to the next 16-bit word boundary.
    #[inline(always)]
    pub fn align_16bit(&mut self) -> io::Result<()> {
        let pad = (16 - (self.position & 15)) & 15;
        if pad > 0 {
            self.skip_n(pad as u32)?;
        }

        Ok(())
    }

    /// Bits consumed since the start of the stream.
    #[inline(always)]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Byte offset of the next unread bit.
    #[inline(always)]
    pub fn byte_position(&self) -> u64 {
        self.position >> 3
    }

    fn annotate(&self, e: io::Error, what: &str) -> io::Error {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{what}: out of bounds bits at {}", self.position),
            )
        } else {
            e
        }
    }
}

impl<'a> BsIoSliceReader<'a> {
    pub fn from_slice(buf: &'a [u8]) -> Self {
        Self::new(buf)
    }
}

impl Default for BsIoSliceReader<'_> {
    fn default() -> Self {
        Self::from_slice(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_read_lsb_first() {
        // 0b1011_0110: low nibble 0x6 first, then 0xB
        let mut reader = BsIoSliceReader::from_slice(&[0xB6]);
        assert_eq!(reader.get_n(4).unwrap(), 0x6);
        assert_eq!(reader.get_n(4).unwrap(), 0xB);
        assert_eq!(reader.position(), 8);
    }

    #[test]
    fn multi_byte_fields_are_little_endian() {
        let mut reader = BsIoSliceReader::from_slice(&[0x00, 0x80, 0x01, 0x00, 0x34, 0x12]);
        assert_eq!(reader.get_n(32).unwrap(), 0x0001_8000);
        assert_eq!(reader.get_n(16).unwrap(), 0x1234);
    }

    #[test]
    fn fields_straddle_word_boundaries() {
        let mut reader = BsIoSliceReader::from_slice(&[0xFF, 0x0F, 0xA5, 0x00]);
        assert_eq!(reader.get_n(12).unwrap(), 0xFFF);
        assert_eq!(reader.get_n(12).unwrap(), 0xA50);
        assert_eq!(reader.get_n(8).unwrap(), 0x00);
    }

    #[test]
    fn zero_width_read_consumes_nothing() {
        let mut reader = BsIoSliceReader::from_slice(&[0x01]);
        assert_eq!(reader.get_n(0).unwrap(), 0);
        assert_eq!(reader.position(), 0);
        assert!(reader.get().unwrap());
    }

    #[test]
    fn unary_counts_zeros_before_stop_bit() {
        // bits LSB first: 0 0 0 1 | 1 | 0 1 ...
        let mut reader = BsIoSliceReader::from_slice(&[0b0101_1000]);
        assert_eq!(reader.get_unary().unwrap(), 3);
        assert_eq!(reader.get_unary().unwrap(), 0);
        assert_eq!(reader.get_unary().unwrap(), 1);
        assert_eq!(reader.position(), 7);
    }

    #[test]
    fn signed_fields_are_twos_complement() {
        // 0xF in 4 bits is -1, 0x7 is 7
        let mut reader = BsIoSliceReader::from_slice(&[0x7F]);
        assert_eq!(reader.get_s(4).unwrap(), -1);
        assert_eq!(reader.get_s(4).unwrap(), 7);
    }

    #[test]
    fn align_skips_to_word_boundary() {
        let mut reader = BsIoSliceReader::from_slice(&[0xFF, 0xFF, 0x34, 0x12]);
        reader.get_n(3).unwrap();
        reader.align_16bit().unwrap();
        assert_eq!(reader.position(), 16);
        reader.align_16bit().unwrap();
        assert_eq!(reader.get_n(16).unwrap(), 0x1234);
    }

    #[test]
    fn reading_past_end_is_unexpected_eof() {
        let mut reader = BsIoSliceReader::from_slice(&[0xAA]);
        let err = reader.get_n(12).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn eof_on_boundary_is_reported_as_none() {
        let mut reader = BsIoSliceReader::from_slice(&[0x5A]);
        assert_eq!(reader.get_n_or_eof(8).unwrap(), Some(0x5A));
        assert_eq!(reader.get_n_or_eof(8).unwrap(), None);
    }

    #[test]
    fn skip_bytes_advances_position() {
        let data = [0u8, 1, 2, 3, 4, 5];
        let mut reader = BsIoSliceReader::from_slice(&data);
        reader.skip_bytes(4).unwrap();
        assert_eq!(reader.byte_position(), 4);
        assert_eq!(reader.get_n(8).unwrap(), 4);
        assert!(reader.skip_bytes(2).is_err());
    }
}
