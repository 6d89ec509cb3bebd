//! Schema document sources.
//!
//! The store reads four named documents (span, event and metric
//! conventions plus the shared attribute registry) through the
//! [`SchemaSource`] trait. A source that cannot provide a document returns
//! `Ok(None)`; the store then simply has no entries from it.

use crate::domain::error::SchemaLoadError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default location of the upstream GenAI convention documents.
pub const DEFAULT_SCHEMA_BASE_URL: &str =
    "https://raw.githubusercontent.com/open-telemetry/opentelemetry-specification/main/semantic_conventions/genai";

/// The four named schema documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaDocument {
    Spans,
    Events,
    Metrics,
    Registry,
}

impl SchemaDocument {
    pub const ALL: [Self; 4] = [Self::Spans, Self::Events, Self::Metrics, Self::Registry];

    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Spans => "spans.yaml",
            Self::Events => "events.yaml",
            Self::Metrics => "metrics.yaml",
            Self::Registry => "registry.yaml",
        }
    }
}

/// Provides the raw text of schema documents.
pub trait SchemaSource {
    /// Returns the document text, or `Ok(None)` when it is unavailable.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures that should abort loading, such
    /// as a document that exists but cannot be read.
    fn read(&self, document: SchemaDocument) -> Result<Option<String>, SchemaLoadError>;
}

/// Fetches a missing schema document into a local path.
///
/// This is the seam for remote download; failures are reported to the
/// caller, which downgrades them to an absent document.
pub trait SchemaFetcher {
    /// # Errors
    ///
    /// Returns [`SchemaLoadError::Unavailable`] when the document cannot be
    /// fetched or written.
    fn fetch(&self, document: SchemaDocument, destination: &Path) -> Result<(), SchemaLoadError>;
}

/// Reads documents from a directory, optionally fetching missing ones.
pub struct DirectorySource {
    dir: PathBuf,
    fetcher: Option<Box<dyn SchemaFetcher>>,
}

impl DirectorySource {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), fetcher: None }
    }

    /// Attaches a fetcher used for documents missing from the directory.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Box<dyn SchemaFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    fn ensure_present(&self, document: SchemaDocument, path: &Path) -> bool {
        if path.exists() {
            return true;
        }
        let Some(fetcher) = &self.fetcher else {
            tracing::warn!(path = ?path, "schema file not found");
            return false;
        };

        tracing::info!(document = document.file_name(), "schema file missing, fetching");
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            tracing::warn!(dir = ?self.dir, error = %e, "cannot create schema directory");
            return false;
        }
        match fetcher.fetch(document, path) {
            Ok(()) => path.exists(),
            Err(e) => {
                tracing::warn!(error = %e, "schema fetch failed, treating document as absent");
                false
            }
        }
    }
}

impl SchemaSource for DirectorySource {
    fn read(&self, document: SchemaDocument) -> Result<Option<String>, SchemaLoadError> {
        let path = self.dir.join(document.file_name());
        if !self.ensure_present(document, &path) {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)?;
        tracing::debug!(path = ?path, "read schema file");
        Ok(Some(text))
    }
}

impl std::fmt::Debug for DirectorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorySource")
            .field("dir", &self.dir)
            .field("fetcher", &self.fetcher.is_some())
            .finish()
    }
}

/// GenAI convention documents compiled into the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct BundledSource;

impl SchemaSource for BundledSource {
    fn read(&self, document: SchemaDocument) -> Result<Option<String>, SchemaLoadError> {
        let text = match document {
            SchemaDocument::Spans => include_str!("../../schemas/spans.yaml"),
            SchemaDocument::Events => include_str!("../../schemas/events.yaml"),
            SchemaDocument::Metrics => include_str!("../../schemas/metrics.yaml"),
            SchemaDocument::Registry => include_str!("../../schemas/registry.yaml"),
        };
        Ok(Some(text.to_string()))
    }
}

/// In-memory documents, mostly useful for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct InlineSource {
    documents: HashMap<SchemaDocument, String>,
}

impl InlineSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, document: SchemaDocument, text: impl Into<String>) -> Self {
        self.documents.insert(document, text.into());
        self
    }
}

impl SchemaSource for InlineSource {
    fn read(&self, document: SchemaDocument) -> Result<Option<String>, SchemaLoadError> {
        Ok(self.documents.get(&document).cloned())
    }
}

/// Downloads documents over HTTP from a base URL.
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    base_url: String,
}

#[cfg(feature = "remote")]
impl HttpFetcher {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into() }
    }
}

#[cfg(feature = "remote")]
impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEMA_BASE_URL)
    }
}

#[cfg(feature = "remote")]
impl SchemaFetcher for HttpFetcher {
    fn fetch(&self, document: SchemaDocument, destination: &Path) -> Result<(), SchemaLoadError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), document.file_name());
        let unavailable = |reason: String| SchemaLoadError::Unavailable {
            document: document.file_name().to_string(),
            reason,
        };

        tracing::info!(url = %url, "downloading schema");
        let response = reqwest::blocking::get(&url).map_err(|e| unavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(unavailable(format!("HTTP {}", response.status())));
        }
        let body = response.text().map_err(|e| unavailable(e.to_string()))?;
        std::fs::write(destination, body).map_err(|e| unavailable(e.to_string()))?;
        tracing::info!(path = ?destination, "downloaded schema");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingFetcher;

    impl SchemaFetcher for FailingFetcher {
        fn fetch(&self, document: SchemaDocument, _: &Path) -> Result<(), SchemaLoadError> {
            Err(SchemaLoadError::Unavailable {
                document: document.file_name().to_string(),
                reason: "offline".to_string(),
            })
        }
    }

    struct WritingFetcher;

    impl SchemaFetcher for WritingFetcher {
        fn fetch(&self, _: SchemaDocument, destination: &Path) -> Result<(), SchemaLoadError> {
            std::fs::write(destination, "groups: []\n")?;
            Ok(())
        }
    }

    #[test]
    fn missing_file_without_fetcher_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path());
        assert!(source.read(SchemaDocument::Spans).unwrap().is_none());
    }

    #[test]
    fn failed_fetch_degrades_to_absent() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path()).with_fetcher(Box::new(FailingFetcher));
        assert!(source.read(SchemaDocument::Events).unwrap().is_none());
    }

    #[test]
    fn fetched_file_is_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path().join("nested")).with_fetcher(Box::new(WritingFetcher));
        assert_eq!(source.read(SchemaDocument::Metrics).unwrap().as_deref(), Some("groups: []\n"));
    }

    #[test]
    fn bundled_documents_are_present() {
        for document in SchemaDocument::ALL {
            assert!(BundledSource.read(document).unwrap().is_some());
        }
    }
}
