use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::Level;

use super::command::{Cli, InfoArgs};
use crate::input::InputReader;
use crate::timestamp::time_str;
use wac::process::decode::Decoder;
use wac::structs::gps::{GpsFix, Tag};
use wac::structs::header::{ContainerHeader, HEADER_BYTES};

pub fn cmd_info(args: &InfoArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Analyzing WAC stream: {}", args.input.display());

    let fail_level = if cli.strict { Level::Warn } else { Level::Error };
    let input_reader = InputReader::new(&args.input)?;
    let mut decoder = Decoder::with_fail_level(input_reader, fail_level)?;
    let header = decoder.header().clone();

    println!();
    println!("WAC Stream Information");
    println!("======================");
    println!();
    display_header(&header);

    if !args.blocks {
        return Ok(());
    }

    let pb = match multi {
        Some(multi) => {
            let pb = multi.add(ProgressBar::new_spinner());
            pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            pb.set_message("Analyzing blocks...");
            Some(pb)
        }
        None => None,
    };

    let mut analysis = BlockAnalysis::default();
    for block in decoder.by_ref() {
        let block = block?;

        analysis.blocks += 1;
        analysis.frames += block.frame_count as u64;
        analysis.zero_frames += block.zero_frames as u64;
        analysis.samples += block.sample_length as u64;
        if let Some(fix) = block.gps {
            analysis.gps.push((block.index, fix));
        }
        if let Some(tag) = block.tag.filter(Tag::is_set) {
            analysis.tags.push((block.index, tag));
        }

        if analysis.blocks.is_multiple_of(100) {
            if let Some(pb) = &pb {
                pb.set_message(format!("Analyzing blocks...       {}", analysis.blocks));
            }
        }
    }

    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    display_analysis(&analysis, &header);

    Ok(())
}

fn display_header(header: &ContainerHeader) {
    println!("Container");
    println!("  Version                   {}", header.version);
    println!("  Channels                  {}", header.channel_count);
    println!("  Sampling rate             {} Hz", header.sample_rate);
    println!("  Sample count              {}", header.sample_count);
    println!("  Duration                  {}", time_str(header.duration_secs()));
    println!("  Frame size                {} samples", header.frame_size);
    println!("  Block size                {} frames", header.block_size);
    println!();

    println!("Flags");
    println!("  Raw                       {:#06x} ({})", header.flags.0, header.flags);
    println!("  Lossy bits                {}", header.lossy_bits());
    println!("  Triggered                 {}", header.flags.triggered());
    println!("  GPS                       {}", header.flags.gps_present());
    println!("  Tags                      {}", header.flags.tag_present());
    println!();

    println!("Seek Table");
    println!("  Blocks per entry          {}", header.seek_size);
    println!("  Entries                   {}", header.seek_entries);
    println!(
        "  Audio data offset         {} bytes",
        HEADER_BYTES + header.seek_table_bytes()
    );
    println!();
}

#[derive(Default)]
struct BlockAnalysis {
    blocks: u32,
    frames: u64,
    zero_frames: u64,
    samples: u64,
    gps: Vec<(u32, GpsFix)>,
    tags: Vec<(u32, Tag)>,
}

fn display_analysis(analysis: &BlockAnalysis, header: &ContainerHeader) {
    println!("Analysis Summary");
    println!("  Blocks processed          {}", analysis.blocks);
    println!("  Frames processed          {}", analysis.frames);
    println!("  Zero frames               {}", analysis.zero_frames);
    println!("  Samples per channel       {}", analysis.samples);
    if header.sample_rate > 0 {
        let decoded_secs = analysis.samples as f64 / header.sample_rate as f64;
        println!("  Decoded duration          {}", time_str(decoded_secs));
    }
    println!();

    let samples_per_block = header.samples_per_block() as f64;
    let block_time = |index: u32| {
        if header.sample_rate == 0 {
            return time_str(0.0);
        }
        time_str(index as f64 * samples_per_block / header.sample_rate as f64)
    };

    if !analysis.gps.is_empty() {
        println!("GPS Fixes");
        for (index, fix) in &analysis.gps {
            println!("  Block {index:<8} {}    {fix}", block_time(*index));
        }
        println!();
    }

    if !analysis.tags.is_empty() {
        println!("Tags");
        for (index, tag) in &analysis.tags {
            println!("  Block {index:<8} {}    {tag}", block_time(*index));
        }
        println!();
    }
}
