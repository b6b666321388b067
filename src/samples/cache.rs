use blake3::Hasher;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::samples::model::SampleFile;

/// Content-hash-keyed store for parsed sample files.
///
/// The key is the blake3 hash of (relative path, file content), so the same
/// content at two paths never aliases to the wrong location in a report. The
/// lock guards parse-on-miss; lifetime is owned by whoever walks the samples,
/// never by the coverage engine itself.
pub struct ParseCache {
    entries: Mutex<HashMap<blake3::Hash, Arc<SampleFile>>>,
}

impl ParseCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_parse<F, E>(&self, rel_path: &Path, source: &str, parse: F) -> Result<Arc<SampleFile>, E>
    where
        F: FnOnce() -> Result<SampleFile, E>,
    {
        let mut hasher = Hasher::new();
        hasher.update(rel_path.to_string_lossy().as_bytes());
        hasher.update(b"\0");
        hasher.update(source.as_bytes());
        let key = hasher.finalize();

        let mut entries = self.entries.lock().expect("parse cache lock poisoned");
        if let Some(cached) = entries.get(&key) {
            return Ok(Arc::clone(cached));
        }

        let parsed = Arc::new(parse()?);
        entries.insert(key, Arc::clone(&parsed));
        Ok(parsed)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("parse cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_once_per_content() {
        let cache = ParseCache::new();
        let path = PathBuf::from("a.rs");
        let mut parses = 0;

        for _ in 0..3 {
            let file = cache
                .get_or_parse::<_, ()>(&path, "let x = 1;", || {
                    parses += 1;
                    Ok(SampleFile::new(path.clone()))
                })
                .unwrap();
            assert_eq!(file.path, path);
        }

        assert_eq!(parses, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_same_content_different_path_not_aliased() {
        let cache = ParseCache::new();
        let a = PathBuf::from("a.rs");
        let b = PathBuf::from("b.rs");

        let file_a = cache
            .get_or_parse::<_, ()>(&a, "let x = 1;", || Ok(SampleFile::new(a.clone())))
            .unwrap();
        let file_b = cache
            .get_or_parse::<_, ()>(&b, "let x = 1;", || Ok(SampleFile::new(b.clone())))
            .unwrap();

        assert_eq!(file_a.path, a);
        assert_eq!(file_b.path, b);
        assert_eq!(cache.len(), 2);
    }
}
