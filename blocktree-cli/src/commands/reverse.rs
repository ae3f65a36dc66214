//! Reverse streaming command

use anyhow::{Context, Result};
use blocktree_merkle::ReverseSeekReader;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::info;

pub fn handle(file: &Path, output: Option<&Path>, forward: bool) -> Result<()> {
    let source = File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let mut reader = ReverseSeekReader::new(source)
        .with_context(|| format!("Failed to seek to the end of {}", file.display()))?;

    let mut sink: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let written = if forward {
        let bytes = reader.read_forward().context("Reverse read failed")?;
        sink.write_all(&bytes)?;
        bytes.len() as u64
    } else {
        io::copy(&mut reader, &mut sink).context("Reverse read failed")?
    };
    sink.flush()?;

    info!(file = %file.display(), bytes = written, forward, "Reverse stream complete");
    Ok(())
}
