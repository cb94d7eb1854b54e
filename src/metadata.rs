use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use wac::process::decode::AuxSink;
use wac::structs::gps::{GpsFix, Tag};
use wac::structs::header::ContainerHeader;

pub const METADATA_VERSION: &str = "1.0";

/// Side-channel data found in a WAC file, as written to the YAML sidecar.
#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub version: String,
    pub source: String,
    pub stream: StreamInfo,
    #[serde(default)]
    pub gps: Vec<GpsRecord>,
    #[serde(default)]
    pub tags: Vec<TagSpan>,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    pub wac_version: u8,
    pub channels: u8,
    pub sample_rate: u32,
    pub sample_count: u32,
    pub frame_size: u16,
    pub block_size: u16,
    pub lossy_bits: u32,
    pub triggered: bool,
    pub seek_size: u16,
    pub seek_entries: u16,
}

impl StreamInfo {
    pub fn from_header(header: &ContainerHeader) -> Self {
        Self {
            wac_version: header.version,
            channels: header.channel_count,
            sample_rate: header.sample_rate,
            sample_count: header.sample_count,
            frame_size: header.frame_size,
            block_size: header.block_size,
            lossy_bits: header.lossy_bits(),
            triggered: header.flags.triggered(),
            seek_size: header.seek_size,
            seek_entries: header.seek_entries,
        }
    }
}

/// A GPS fix in signed degrees: positive latitude is North, positive
/// longitude is West.
#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GpsRecord {
    pub block: u32,
    pub offset: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Consecutive blocks carrying the same button tag.
#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TagSpan {
    pub tag: String,
    pub first_block: u32,
    pub last_block: u32,
    pub offset: f64,
}

/// Collects GPS fixes and tag spans while a file is decoded.
pub struct MetadataCollector {
    source: String,
    stream: StreamInfo,
    seconds_per_block: f64,
    gps: Vec<GpsRecord>,
    tags: Vec<TagSpan>,
    open_tag: Option<Tag>,
}

impl MetadataCollector {
    pub fn new(source: &Path, header: &ContainerHeader) -> Self {
        let seconds_per_block = if header.sample_rate > 0 {
            header.samples_per_block() as f64 / header.sample_rate as f64
        } else {
            0.0
        };

        Self {
            source: source.display().to_string(),
            stream: StreamInfo::from_header(header),
            seconds_per_block,
            gps: Vec::new(),
            tags: Vec::new(),
            open_tag: None,
        }
    }

    pub fn gps(&self) -> &[GpsRecord] {
        &self.gps
    }

    pub fn tags(&self) -> &[TagSpan] {
        &self.tags
    }

    pub fn into_metadata(self) -> Metadata {
        Metadata {
            version: METADATA_VERSION.to_string(),
            source: self.source,
            stream: self.stream,
            gps: self.gps,
            tags: self.tags,
        }
    }

    fn block_offset(&self, block: u32) -> f64 {
        round_ms(block as f64 * self.seconds_per_block)
    }
}

impl AuxSink for MetadataCollector {
    fn gps_fix(&mut self, block: u32, fix: &GpsFix) {
        self.gps.push(GpsRecord {
            block,
            offset: self.block_offset(block),
            latitude: fix.latitude_degrees(),
            longitude: fix.longitude_degrees(),
        });
    }

    fn tag(&mut self, block: u32, tag: Tag) {
        let continues = self.open_tag == Some(tag)
            && self.tags.last().is_some_and(|span| span.last_block + 1 == block);

        if continues {
            if let Some(span) = self.tags.last_mut() {
                span.last_block = block;
            }
        } else if tag.is_set() {
            self.tags.push(TagSpan {
                tag: tag.to_string(),
                first_block: block,
                last_block: block,
                offset: self.block_offset(block),
            });
        }

        self.open_tag = tag.is_set().then_some(tag);
    }
}

impl Metadata {
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    pub fn write_yaml(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_yaml()?)
            .with_context(|| format!("cannot write metadata to {}", path.display()))
    }
}

fn round_ms(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use wac::structs::header::Flags;

    fn header() -> ContainerHeader {
        ContainerHeader {
            version: 4,
            channel_count: 1,
            frame_size: 512,
            block_size: 8,
            flags: Flags(Flags::GPS_PRESENT | Flags::TAG_PRESENT),
            sample_rate: 24000,
            sample_count: 240000,
            seek_size: 16,
            seek_entries: 0,
        }
    }

    #[test]
    fn tag_runs_are_coalesced() {
        let mut collector = MetadataCollector::new(Path::new("a.wac"), &header());
        for (block, nibble) in [(0, 0), (1, 1), (2, 1), (3, 1), (4, 0), (5, 2), (6, 1)] {
            collector.tag(block, Tag::from_nibble(nibble));
        }

        let spans: Vec<(&str, u32, u32)> = collector
            .tags()
            .iter()
            .map(|s| (s.tag.as_str(), s.first_block, s.last_block))
            .collect();
        assert_eq!(spans, [("A", 1, 3), ("B", 5, 5), ("A", 6, 6)]);
    }

    #[test]
    fn gps_records_use_signed_degrees() {
        let mut collector = MetadataCollector::new(Path::new("a.wac"), &header());
        collector.gps_fix(
            16,
            &GpsFix {
                latitude: 4_200_000,
                longitude: -3_500_000,
            },
        );

        let record = &collector.gps()[0];
        assert_eq!(record.latitude, 42.0);
        assert_eq!(record.longitude, -35.0);
        // 16 blocks of 4096 samples at 24 kHz
        assert_eq!(record.offset, 2.731);
    }

    #[test]
    fn yaml_roundtrip() {
        let mut collector = MetadataCollector::new(Path::new("a.wac"), &header());
        collector.gps_fix(
            0,
            &GpsFix {
                latitude: 100,
                longitude: 200,
            },
        );
        collector.tag(0, Tag::Button('D'));
        let metadata = collector.into_metadata();

        let yaml = metadata.to_yaml().unwrap();
        assert!(yaml.contains("sampleRate: 24000"));
        assert!(yaml.contains("firstBlock: 0"));

        let parsed: Metadata = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(parsed, metadata);
    }
}
