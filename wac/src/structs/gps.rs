//! GPS and tag side-channel data interleaved in block headers.
//!
//! Both are extracted as raw bit fields. Nothing in the decoder interprets
//! them beyond the unit conversions below; consumers receive them through
//! [`crate::process::decode::AuxSink`].

use std::fmt;
use std::io;

use crate::utils::bitstream_io::BitstreamIoReader;

pub const GPS_LATITUDE_BITS: u32 = 25;
pub const GPS_LONGITUDE_BITS: u32 = 26;

/// Raw GPS units per degree.
pub const GPS_UNITS_PER_DEGREE: f64 = 100_000.0;

pub const TAG_BITS: u32 = 4;

/// GPS position sampled at the start of a seek grouping.
///
/// Positive latitude is North, positive longitude is West.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpsFix {
    pub latitude: i32,
    pub longitude: i32,
}

impl GpsFix {
    pub fn read<R: io::Read>(reader: &mut BitstreamIoReader<R>) -> io::Result<Self> {
        Ok(Self {
            latitude: reader.get_s(GPS_LATITUDE_BITS)?,
            longitude: reader.get_s(GPS_LONGITUDE_BITS)?,
        })
    }

    pub fn latitude_degrees(&self) -> f64 {
        self.latitude as f64 / GPS_UNITS_PER_DEGREE
    }

    pub fn longitude_degrees(&self) -> f64 {
        self.longitude as f64 / GPS_UNITS_PER_DEGREE
    }
}

impl fmt::Display for GpsFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.latitude >= 0 { 'N' } else { 'S' };
        let ew = if self.longitude >= 0 { 'W' } else { 'E' };
        write!(
            f,
            "{:.5}°{ns} {:.5}°{ew}",
            self.latitude_degrees().abs(),
            self.longitude_degrees().abs()
        )
    }
}

/// Recorder button tag attached to a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    None,
    Button(char),
    Reserved(u8),
}

impl Tag {
    pub fn read<R: io::Read>(reader: &mut BitstreamIoReader<R>) -> io::Result<Self> {
        Ok(Self::from_nibble(reader.get_n(TAG_BITS)? as u8))
    }

    pub fn from_nibble(value: u8) -> Self {
        match value {
            0 => Tag::None,
            1..=4 => Tag::Button((b'A' + value - 1) as char),
            _ => Tag::Reserved(value),
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Tag::None)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::None => write!(f, "none"),
            Tag::Button(c) => write!(f, "{c}"),
            Tag::Reserved(v) => write!(f, "reserved({v})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::bitstream_io::BsIoSliceReader;
    use crate::utils::test_util::BitSink;

    #[test]
    fn gps_fix_decodes_signed_fields() {
        let mut sink = BitSink::new();
        sink.put_signed(GPS_LATITUDE_BITS, 4_200_000);
        sink.put_signed(GPS_LONGITUDE_BITS, -3_500_000);
        let data = sink.finish();

        let fix = GpsFix::read(&mut BsIoSliceReader::from_slice(&data)).unwrap();
        assert_eq!(fix.latitude, 4_200_000);
        assert_eq!(fix.longitude, -3_500_000);
        assert_eq!(fix.latitude_degrees(), 42.0);
        assert_eq!(fix.longitude_degrees(), -35.0);
        // Recorders store longitude positive West, so a negative fix is
        // East, not West as a naive reading of the signed value suggests.
        assert_eq!(fix.to_string(), "42.00000°N 35.00000°E");
    }

    #[test]
    fn gps_fix_extremes_fit_field_widths() {
        let mut sink = BitSink::new();
        sink.put_signed(GPS_LATITUDE_BITS, -9_000_000);
        sink.put_signed(GPS_LONGITUDE_BITS, 18_000_000);
        let data = sink.finish();

        let fix = GpsFix::read(&mut BsIoSliceReader::from_slice(&data)).unwrap();
        assert_eq!(fix.to_string(), "90.00000°S 180.00000°W");
    }

    #[test]
    fn tag_nibbles_map_to_buttons() {
        assert_eq!(Tag::from_nibble(0), Tag::None);
        assert_eq!(Tag::from_nibble(1), Tag::Button('A'));
        assert_eq!(Tag::from_nibble(4), Tag::Button('D'));
        assert_eq!(Tag::from_nibble(9), Tag::Reserved(9));
        assert!(!Tag::None.is_set());
    }
}
