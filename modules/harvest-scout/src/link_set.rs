//! The deduplicated link file: one absolute URI per line, append-only.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use harvest_common::{HarvestError, Result};
use tracing::{info, warn};

use crate::quota::QuotaStore;

pub struct LinkSet {
    path: PathBuf,
    links: Vec<String>,
    seen: HashSet<String>,
    duplicates: Vec<String>,
    needs_newline: bool,
}

impl LinkSet {
    /// Load the link file at `path`. A missing file is an empty set; the file
    /// is created on the first append that adds something.
    pub fn open(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(HarvestError::io(path)(e)),
        };

        let mut set = Self {
            path: path.to_path_buf(),
            links: Vec::new(),
            seen: HashSet::new(),
            duplicates: Vec::new(),
            needs_newline: !raw.is_empty() && !raw.ends_with('\n'),
        };

        for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if set.seen.insert(line.to_string()) {
                set.links.push(line.to_string());
            } else {
                set.duplicates.push(line.to_string());
            }
        }

        if !set.duplicates.is_empty() {
            warn!(
                path = %path.display(),
                duplicates = set.duplicates.len(),
                "Link file already contains duplicate lines"
            );
        }

        Ok(set)
    }

    /// Append the links not already present. Returns how many were new.
    pub fn append<I>(&mut self, links: I) -> Result<usize>
    where
        I: IntoIterator<Item = String>,
    {
        let fresh: Vec<String> = links
            .into_iter()
            .filter(|link| self.seen.insert(link.clone()))
            .collect();
        if fresh.is_empty() {
            return Ok(0);
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(HarvestError::io(&self.path))?;
        let mut out = BufWriter::new(file);

        let mut write = || -> std::io::Result<()> {
            if self.needs_newline {
                out.write_all(b"\n")?;
            }
            for link in &fresh {
                out.write_all(link.as_bytes())?;
                out.write_all(b"\n")?;
            }
            out.flush()
        };
        if let Err(e) = write() {
            for link in &fresh {
                self.seen.remove(link);
            }
            return Err(HarvestError::io(&self.path)(e));
        }

        self.needs_newline = false;
        let added = fresh.len();
        self.links.extend(fresh);
        info!(added, total = self.links.len(), "Link file updated");
        Ok(added)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn contains(&self, link: &str) -> bool {
        self.seen.contains(link)
    }

    /// Links in file order.
    pub fn links(&self) -> &[String] {
        &self.links
    }

    /// Lines that were repeated in the file as it was found on open.
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl QuotaStore for LinkSet {
    type Item = String;

    fn count(&self) -> usize {
        self.len()
    }

    fn merge(&mut self, items: Vec<String>) -> Result<usize> {
        self.append(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn missing_file_is_empty_and_created_on_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tweet_links.txt");
        let mut set = LinkSet::open(&path).unwrap();
        assert!(set.is_empty());
        assert!(!path.exists());

        assert_eq!(set.append(strings(&["https://a.example/"])).unwrap(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "https://a.example/\n");
    }

    #[test]
    fn append_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tweet_links.txt");
        let mut set = LinkSet::open(&path).unwrap();

        assert_eq!(set.append(strings(&["https://a.example/", "https://b.example/"])).unwrap(), 2);
        assert_eq!(set.append(strings(&["https://b.example/", "https://c.example/"])).unwrap(), 1);
        assert_eq!(set.append(strings(&["https://a.example/"])).unwrap(), 0);

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert_eq!(on_disk, "https://a.example/\nhttps://b.example/\nhttps://c.example/\n");
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn repeats_within_one_append_are_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tweet_links.txt");
        let mut set = LinkSet::open(&path).unwrap();
        assert_eq!(set.append(strings(&["https://a.example/", "https://a.example/"])).unwrap(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 1);
    }

    #[test]
    fn reopen_sees_previous_links() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tweet_links.txt");
        LinkSet::open(&path)
            .unwrap()
            .append(strings(&["https://a.example/"]))
            .unwrap();

        let mut set = LinkSet::open(&path).unwrap();
        assert!(set.contains("https://a.example/"));
        assert_eq!(set.append(strings(&["https://a.example/"])).unwrap(), 0);
        assert_eq!(set.links(), &["https://a.example/".to_string()]);
    }

    #[test]
    fn existing_duplicates_are_reported_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tweet_links.txt");
        std::fs::write(&path, "https://a.example/\nhttps://b.example/\nhttps://a.example/\n").unwrap();

        let set = LinkSet::open(&path).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.duplicates(), &["https://a.example/".to_string()]);
    }

    #[test]
    fn missing_trailing_newline_is_repaired_before_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tweet_links.txt");
        std::fs::write(&path, "https://a.example/").unwrap();

        let mut set = LinkSet::open(&path).unwrap();
        set.append(strings(&["https://b.example/"])).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "https://a.example/\nhttps://b.example/\n"
        );
    }
}
