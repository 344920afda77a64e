//! Folding per-search partial files into one numbered batch file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use harvest_common::{HarvestError, Result};
use tracing::{debug, info};

use crate::jsonl::open_lines;
use crate::sequence::FilePattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineMode {
    /// Truncate (or create) the destination.
    Create,
    /// Keep what the destination already holds and add after it.
    Append,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CombineReport {
    pub files: usize,
    pub lines: usize,
}

/// Copy every line of every `pattern` file in `dir` into `dest`, in sorted
/// file-name order, deleting each source as soon as it has been copied.
///
/// A source that cannot be opened or decompressed stops the combine with
/// [`HarvestError::CorruptPartial`]. Sources copied before it are already
/// gone; it and everything after it stay on disk. Whatever reached `dest`
/// before the failure is flushed.
pub fn combine_partials(
    dir: &Path,
    pattern: &FilePattern,
    dest: &Path,
    mode: CombineMode,
) -> Result<CombineReport> {
    let partials = pattern.list(dir)?;

    let file = match mode {
        CombineMode::Create => File::create(dest),
        CombineMode::Append => OpenOptions::new().create(true).append(true).open(dest),
    }
    .map_err(HarvestError::io(dest))?;
    // In append mode this starts a new gzip member after the existing ones.
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());

    let mut report = CombineReport::default();
    for partial in &partials {
        // Decode the whole partial first so a truncated one adds no lines.
        let copied = match read_partial(partial).and_then(|lines| write_lines(&lines, &mut encoder, dest)) {
            Ok(n) => n,
            Err(e) => {
                let _ = encoder.try_finish();
                return Err(e);
            }
        };
        std::fs::remove_file(partial).map_err(HarvestError::io(partial))?;
        debug!(partial = %partial.display(), lines = copied, "Partial file combined");
        report.files += 1;
        report.lines += copied;
    }

    encoder
        .finish()
        .and_then(|mut w| w.flush())
        .map_err(HarvestError::io(dest))?;

    info!(
        dest = %dest.display(),
        files = report.files,
        lines = report.lines,
        ?mode,
        "Combined partial files"
    );
    Ok(report)
}

fn read_partial(source: &Path) -> Result<Vec<String>> {
    open_lines(source)
        .and_then(|lines| lines.collect())
        .map_err(|e| HarvestError::CorruptPartial {
            path: source.to_path_buf(),
            source: e,
        })
}

fn write_lines<W: Write>(lines: &[String], out: &mut W, dest: &Path) -> Result<usize> {
    for line in lines {
        out.write_all(line.as_bytes())
            .and_then(|_| out.write_all(b"\n"))
            .map_err(HarvestError::io(dest))?;
    }
    Ok(lines.len())
}
