//! Output file numbering.
//!
//! Batch files are named `<prefix><N><suffix>`. A [`FileSequence`] is a
//! snapshot of the numbers present in a directory at scan time and hands out
//! `max + 1` as the next free number. Two writers against the same directory
//! must be serialized by the caller; nothing here locks.

use std::path::{Path, PathBuf};

use harvest_common::{HarvestError, Result};

/// A `<prefix>*<suffix>` file name pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePattern {
    prefix: String,
    suffix: String,
}

impl FilePattern {
    pub fn new(prefix: &str, suffix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.middle(name).is_some()
    }

    /// The integer between prefix and suffix. Names whose middle is empty or
    /// not all digits yield `None`.
    pub fn number_of(&self, name: &str) -> Option<u32> {
        let middle = self.middle(name)?;
        if middle.is_empty() || !middle.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        middle.parse().ok()
    }

    pub fn file_name(&self, number: u32) -> String {
        format!("{}{}{}", self.prefix, number, self.suffix)
    }

    /// Sorted names in `dir` matching the pattern. A missing directory has none.
    pub fn list(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut names: Vec<String> = read_names(dir)?
            .into_iter()
            .filter(|name| self.matches(name))
            .collect();
        names.sort();
        Ok(names.into_iter().map(|name| dir.join(name)).collect())
    }

    fn middle<'a>(&self, name: &'a str) -> Option<&'a str> {
        name.strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())
    }
}

/// Snapshot of the numbered files in one directory.
#[derive(Debug, Clone)]
pub struct FileSequence {
    dir: PathBuf,
    pattern: FilePattern,
    existing: Vec<u32>,
}

impl FileSequence {
    pub fn scan(dir: &Path, pattern: FilePattern) -> Result<Self> {
        let mut existing: Vec<u32> = read_names(dir)?
            .iter()
            .filter_map(|name| pattern.number_of(name))
            .collect();
        existing.sort_unstable();
        existing.dedup();

        Ok(Self {
            dir: dir.to_path_buf(),
            pattern,
            existing,
        })
    }

    /// One past the highest number on disk, or 1 when there is none.
    pub fn next(&self) -> u32 {
        self.existing.last().map_or(1, |max| max + 1)
    }

    /// Numbers found at scan time, ascending.
    pub fn existing(&self) -> &[u32] {
        &self.existing
    }

    pub fn path_for(&self, number: u32) -> PathBuf {
        self.dir.join(self.pattern.file_name(number))
    }
}

fn read_names(dir: &Path) -> Result<Vec<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(HarvestError::io(dir)(e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(HarvestError::io(dir))?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}
