// Gzip-compressed newline-delimited JSON files.
//
// Appended files are a chain of gzip members, so reads always go through
// MultiGzDecoder.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use harvest_common::{HarvestError, Result};

/// Write `records` to `path` (truncating), one JSON document per line.
pub fn write_jsonl_gz(path: &Path, records: &[serde_json::Value]) -> Result<()> {
    let file = File::create(path).map_err(HarvestError::io(path))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    for record in records {
        let line = serde_json::to_string(record)?;
        encoder
            .write_all(line.as_bytes())
            .and_then(|_| encoder.write_all(b"\n"))
            .map_err(HarvestError::io(path))?;
    }
    encoder
        .finish()
        .and_then(|mut w| w.flush())
        .map_err(HarvestError::io(path))?;
    Ok(())
}

/// Open a gzip file for line-by-line reading.
pub fn open_lines(path: &Path) -> std::io::Result<std::io::Lines<BufReader<MultiGzDecoder<File>>>> {
    let file = File::open(path)?;
    Ok(BufReader::new(MultiGzDecoder::new(file)).lines())
}

/// All lines of a gzip file, without their trailing newlines.
pub fn read_lines_gz(path: &Path) -> Result<Vec<String>> {
    open_lines(path)
        .and_then(|lines| lines.collect())
        .map_err(HarvestError::io(path))
}
