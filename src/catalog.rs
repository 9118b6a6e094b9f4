use crate::error::{Error, Result};
use glob::Pattern;
use serde::Serialize;
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: i32,
    pub name: String,
    pub location: PathBuf,
}

/// Files offered by one server run. Ids are `1..=N` in directory-listing
/// order and never change while the process lives.
#[derive(Serialize, Debug, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Scans the regular files directly inside `dir`. Nothing is sorted: the
    /// order is whatever the filesystem listing returns.
    pub fn build(dir: &Path, exclude_patterns: &[String]) -> Result<Self> {
        let load_err = |source: io::Error| Error::CatalogLoad {
            path: dir.to_path_buf(),
            source,
        };

        let root = std::fs::canonicalize(dir).map_err(load_err)?;
        if !root.is_dir() {
            return Err(load_err(io::Error::new(
                io::ErrorKind::NotADirectory,
                "not a directory",
            )));
        }

        let patterns: Vec<Pattern> = exclude_patterns
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect();

        let walker = WalkDir::new(&root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true);

        let mut entries = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                // Depth 0 is the directory itself; anything deeper is one bad entry.
                Err(e) if e.depth() == 0 => return Err(load_err(e.into())),
                Err(e) => {
                    warn!("Skipping unreadable catalog entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if patterns.iter().any(|p| p.matches(&name)) {
                debug!("Excluded from catalog: {}", name);
                continue;
            }

            entries.push(CatalogEntry {
                id: entries.len() as i32 + 1,
                name,
                location: entry.into_path(),
            });
        }

        info!("Catalog loaded {} files from {:?}", entries.len(), root);
        Ok(Catalog { entries })
    }

    pub fn lookup(&self, id: i32) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The listing text sent in answer to a list request: one line per entry
    /// followed by a blank line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for e in &self.entries {
            let _ = write!(out, "FileId: ({}) - FileName: \"{}\"\n\n", e.id, e.name);
        }
        out
    }
}
