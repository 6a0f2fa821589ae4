use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::schema::PageCounts;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no extracted counts recorded for {0}")]
    Missing(String),
    #[error("fetch failed: {0}")]
    Failed(String),
}

/// Source of already-extracted counts for a URL. HTML retrieval and tag
/// extraction live behind this seam; the engine never sees raw markup.
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> Result<PageCounts, FetchError>;
}

/// Fetcher backed by a JSON file of pre-extracted counts keyed by URL,
/// the hand-off format of the upstream extractor. A URL missing from
/// the file is reported as a fetch failure for this run.
pub struct FileFetcher {
    counts: BTreeMap<String, PageCounts>,
}

impl FileFetcher {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read counts file {path:?}"))?;
        let counts: BTreeMap<String, PageCounts> = serde_json::from_str(&text)
            .with_context(|| format!("Counts file {path:?} is not valid JSON"))?;

        info!(
            action = "load",
            component = "file_fetcher",
            path = ?path,
            url_count = counts.len(),
            "Loaded extracted counts"
        );
        Ok(Self { counts })
    }
}

impl PageFetcher for FileFetcher {
    fn fetch(&self, url: &str) -> Result<PageCounts, FetchError> {
        self.counts
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Missing(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CountValue;
    use std::io::Write;

    #[test]
    fn loads_counts_and_misses_unknown_urls() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"https://a.example/": {{"h1_total": 2, "title_count": 1}}}}"#
        )
        .unwrap();

        let fetcher = FileFetcher::load(file.path()).unwrap();
        let counts = fetcher.fetch("https://a.example/").unwrap();
        assert_eq!(counts["h1_total"], CountValue::Count(2));

        let err = fetcher.fetch("https://b.example/").unwrap_err();
        assert!(matches!(err, FetchError::Missing(_)));
    }

    #[test]
    fn rejects_malformed_counts_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(FileFetcher::load(file.path()).is_err());
    }
}
