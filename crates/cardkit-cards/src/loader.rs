//! Recursive card file loader
//!
//! Walks a directory tree and parses every file whose name contains
//! `.json`. Files that fail to read or parse are logged and skipped so a
//! single broken card never stops a bulk pass over the card set.

use cardkit_core::{CardDocument, CardKitError, Result, parse_document};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the default card directory
pub const CARDS_DIR_ENV: &str = "CARDKIT_CARDS_DIR";

/// Configuration for the card loader
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Root of the card directory tree
    pub root: PathBuf,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        let root = std::env::var_os(CARDS_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/main/resources/cards")
            });

        Self { root }
    }
}

impl LoaderConfig {
    /// Create config with a custom root
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Start iterating the configured tree
    pub fn iter(&self) -> CardFiles {
        CardFiles::new(&self.root)
    }
}

/// Iterate every card under `root`, or under the default card directory
pub fn iter_cards(root: Option<&Path>) -> CardFiles {
    match root {
        Some(root) => CardFiles::new(root),
        None => LoaderConfig::default().iter(),
    }
}

/// Read and parse a single card file
pub fn load_card(path: &Path) -> Result<CardDocument> {
    let text = fs::read_to_string(path)
        .map_err(|e| CardKitError::Io(format!("{}: {}", path.display(), e)))?;
    parse_document(&text)
}

/// Lazy, one-shot iterator over `(card, path)` pairs
///
/// Directories are visited top-down: the files of a directory come before
/// the contents of its subdirectories, and entries are taken in file-name
/// order.
#[derive(Debug)]
pub struct CardFiles {
    /// Directories not yet listed, next one on top
    dirs: Vec<PathBuf>,
    /// Card files of the current directory not yet parsed
    files: VecDeque<PathBuf>,
    /// Files that could not be loaded
    skipped: Vec<PathBuf>,
}

impl CardFiles {
    /// Create an iterator rooted at `root`
    pub fn new(root: &Path) -> Self {
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        Self {
            dirs: vec![root],
            files: VecDeque::new(),
            skipped: Vec::new(),
        }
    }

    /// Paths skipped so far because they failed to load
    pub fn skipped(&self) -> &[PathBuf] {
        &self.skipped
    }

    /// List one directory, queueing its card files and subdirectories
    fn scan(&mut self, dir: &Path) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot read directory {}: {}", dir.display(), e);
                return;
            }
        };

        let mut entries: Vec<_> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Cannot read entry in {}: {}", dir.display(), e);
                    None
                }
            })
            .collect();
        entries.sort_by_key(|entry| entry.file_name());

        let mut subdirs = Vec::new();
        for entry in entries {
            let path = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                subdirs.push(path);
            } else if entry.file_name().to_string_lossy().contains(".json") {
                self.files.push_back(path);
            }
        }

        debug!(
            "Scanned {}: {} card files, {} subdirectories",
            dir.display(),
            self.files.len(),
            subdirs.len()
        );

        // Reverse so the first subdirectory is popped next
        self.dirs.extend(subdirs.into_iter().rev());
    }
}

impl Iterator for CardFiles {
    type Item = (CardDocument, PathBuf);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(path) = self.files.pop_front() {
                match load_card(&path) {
                    Ok(card) => return Some((card, path)),
                    Err(e) => {
                        warn!("Parsing error in {}: {}", path.display(), e);
                        self.skipped.push(path);
                        continue;
                    }
                }
            }

            let dir = self.dirs.pop()?;
            self.scan(&dir);
        }
    }
}
