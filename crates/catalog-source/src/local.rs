//! Files matched by glob patterns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use validator::Validate;

use crate::backend::{Backend, SourceEntry};
use crate::error::{SourceError, SourceResult};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LocalSource {
    /// Glob patterns, relative to the working directory.
    #[validate(length(min = 1, message = "at least one file pattern is required"))]
    pub files: Vec<String>,
}

impl LocalSource {
    pub fn new(files: Vec<String>) -> Self {
        Self { files }
    }

    /// Expand all patterns into a sorted, de-duplicated list of paths.
    fn matched_paths(&self) -> SourceResult<Vec<std::path::PathBuf>> {
        let mut paths = Vec::new();
        for pattern in &self.files {
            let matches = glob::glob(pattern).map_err(|e| SourceError::Glob {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;

            let before = paths.len();
            for entry in matches {
                let path = entry.map_err(|e| SourceError::Io {
                    path: e.path().display().to_string(),
                    source: e.into_error(),
                })?;
                if path.is_file() {
                    paths.push(path);
                }
            }

            if paths.len() == before {
                warn!(pattern = %pattern, "File pattern matched no files");
            }
        }

        paths.sort();
        paths.dedup();
        Ok(paths)
    }
}

#[async_trait]
impl Backend for LocalSource {
    fn describe(&self) -> String {
        format!("local files {}", self.files.join(", "))
    }

    async fn load(&self) -> SourceResult<Vec<SourceEntry>> {
        let mut entries = Vec::new();
        for path in self.matched_paths()? {
            let origin = path.display().to_string();
            let content = tokio::fs::read(&path)
                .await
                .map_err(|source| SourceError::Io {
                    path: origin.clone(),
                    source,
                })?;
            debug!(path = %origin, bytes = content.len(), "Read source file");
            entries.push(SourceEntry::new(origin, content));
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_load_matches_glob_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.json"), r#"{"id": "b"}"#).unwrap();
        fs::write(dir.path().join("a.json"), r#"{"id": "a"}"#).unwrap();
        fs::write(dir.path().join("skip.txt"), "ignored").unwrap();

        let pattern = format!("{}/*.json", dir.path().display());
        let source = LocalSource::new(vec![pattern.clone(), pattern]);
        let entries = source.load().await.unwrap();

        assert_eq!(entries.len(), 2);
        assert!(entries[0].origin.ends_with("a.json"));
        assert!(entries[1].origin.ends_with("b.json"));
    }

    #[tokio::test]
    async fn test_load_no_matches_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = LocalSource::new(vec![format!("{}/*.yaml", dir.path().display())]);
        assert!(source.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_pattern() {
        let source = LocalSource::new(vec!["[".into()]);
        assert!(matches!(source.load().await, Err(SourceError::Glob { .. })));
    }
}
