use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};

pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (wac ",
    env!("WAC_VERSION"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Debug, ClapParser)]
#[command(
    name         = env!("CARGO_PKG_NAME"),
    version      = env!("CARGO_PKG_VERSION"),
    long_version = LONG_VERSION,
    about        = "Tools for inspecting and decoding Wildlife Acoustics WAC recordings",
    long_about   = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors (fail on first warning).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Decode the specified WAC file into PCM audio.
    Decode(DecodeArgs),

    /// Print stream information
    Info(InfoArgs),
}

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Input WAC file (use "-" for stdin).
    #[arg(value_name = "INPUT", default_value = "-")]
    pub input: PathBuf,

    /// Output audio file (use "-" for stdout). Defaults to the input path
    /// with the format's extension, or stdout when reading stdin.
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Audio format for output.
    #[arg(long, value_enum, default_value_t = AudioFormat::Wav)]
    pub format: AudioFormat,

    /// Write GPS fixes and tags found in block headers to a YAML file.
    #[arg(long, value_name = "PATH")]
    pub metadata: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input WAC file (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Decode every block and report GPS fixes, tags and zero frames.
    #[arg(long)]
    pub blocks: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum AudioFormat {
    /// RIFF/WAVE, 16-bit PCM.
    Wav,
    /// Raw PCM format (16-bit little-endian, interleaved).
    Pcm,
}

impl AudioFormat {
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Pcm => "pcm",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_defaults_to_stdin() {
        let cli = Cli::try_parse_from(["wac2wav", "decode"]).unwrap();
        let Commands::Decode(args) = cli.command else {
            panic!("expected decode");
        };
        assert_eq!(args.input, PathBuf::from("-"));
        assert!(args.output.is_none());
        assert_eq!(args.format, AudioFormat::Wav);
    }

    #[test]
    fn decode_accepts_source_and_destination() {
        let cli = Cli::try_parse_from([
            "wac2wav", "--strict", "decode", "in.wac", "out.wav", "--format", "pcm",
        ])
        .unwrap();
        assert!(cli.strict);
        let Commands::Decode(args) = cli.command else {
            panic!("expected decode");
        };
        assert_eq!(args.input, PathBuf::from("in.wac"));
        assert_eq!(args.output, Some(PathBuf::from("out.wav")));
        assert_eq!(args.format, AudioFormat::Pcm);
    }
}
