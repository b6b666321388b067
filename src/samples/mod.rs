pub mod cache;
pub mod model;
pub mod rust_walker;

pub use cache::ParseCache;
pub use model::{Binding, CallSite, SampleExpr, SampleFile, SampleTree};
pub use rust_walker::{RustSampleWalker, SampleWalkError};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::Config;

/// Walks a sample directory and loads every Rust sample file into the
/// language-agnostic model. Unparseable files are skipped, never fatal.
pub struct SampleTreeLoader {
    walker: RustSampleWalker,
    cache: Option<ParseCache>,
    exclude_suffixes: Vec<String>,
    exclude_dirs: Vec<String>,
}

impl SampleTreeLoader {
    pub fn new(config: &Config) -> Result<Self> {
        let walker = RustSampleWalker::new()?;
        let cache = if config.walker.cache_parsed_files {
            Some(ParseCache::new())
        } else {
            None
        };

        Ok(Self {
            walker,
            cache,
            exclude_suffixes: config.samples.exclude_suffixes.clone(),
            exclude_dirs: config.samples.exclude_dirs.clone(),
        })
    }

    pub fn load(&mut self, root: &Path) -> Result<SampleTree> {
        let mut tree = SampleTree::default();

        for (abs, rel) in self.discover(root)? {
            let source = match std::fs::read_to_string(&abs) {
                Ok(source) => source,
                Err(e) => {
                    warn!("Skipping unreadable sample file {}: {}", abs.display(), e);
                    continue;
                }
            };

            let parsed = match &self.cache {
                Some(cache) => {
                    let walker = &mut self.walker;
                    cache
                        .get_or_parse(&rel, &source, || walker.walk_source(&source, &rel))
                        .map(|file| (*file).clone())
                }
                None => self.walker.walk_source(&source, &rel),
            };

            match parsed {
                Ok(file) => tree.files.push(file),
                Err(e) => {
                    warn!("Skipping sample file: {}", e);
                }
            }
        }

        debug!("Loaded {} sample files from {}", tree.file_count(), root.display());
        Ok(tree)
    }

    /// Enumerate sample files under the root in sorted order. The coverage
    /// engine's first-occurrence dedup is defined against this order.
    fn discover(&self, root: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
        if !root.exists() {
            anyhow::bail!("Samples path does not exist: {}", root.display());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded_dir(e))
        {
            let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("rs") {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy();
            if self.exclude_suffixes.iter().any(|s| file_name.ends_with(s.as_str())) {
                continue;
            }

            let rel = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            files.push((path.to_path_buf(), rel));
        }

        Ok(files)
    }

    fn is_excluded_dir(&self, entry: &walkdir::DirEntry) -> bool {
        if !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') && name.len() > 1 {
            return true;
        }
        self.exclude_dirs.iter().any(|d| d.as_str() == name)
    }
}
