use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};

/// Unified input reader that handles both file and pipe input with buffered reading
pub struct InputReader {
    reader: Box<dyn Read>,
    is_pipe: bool,
}

impl InputReader {
    /// Create a new InputReader from a path
    /// Use "-" for stdin pipe input
    pub fn new<P: AsRef<Path>>(input_path: P) -> Result<Self> {
        let is_pipe = is_pipe_path(input_path.as_ref());

        let reader: Box<dyn Read> = if is_pipe {
            Box::new(BufReader::new(io::stdin().lock()))
        } else {
            let file = File::open(input_path.as_ref())
                .with_context(|| format!("cannot open {}", input_path.as_ref().display()))?;
            Box::new(BufReader::new(file))
        };

        Ok(Self { reader, is_pipe })
    }

    /// Check if this is pipe input
    pub fn is_pipe(&self) -> bool {
        self.is_pipe
    }
}

impl Read for InputReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

pub fn is_pipe_path(path: &Path) -> bool {
    path.as_os_str() == "-"
}
