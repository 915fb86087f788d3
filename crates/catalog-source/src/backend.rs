//! Backend trait and raw source content.

use async_trait::async_trait;
use catalog_core::SourceRecord;

use crate::error::SourceResult;
use crate::parse;

/// Raw content produced by a backend, before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Where the content came from, attached to every parsed record.
    pub origin: String,
    pub content: Vec<u8>,
}

impl SourceEntry {
    pub fn new(origin: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            origin: origin.into(),
            content: content.into(),
        }
    }

    /// Parse this content into records. Each element is either a record or
    /// the reason one part of the content could not become a record.
    #[must_use]
    pub fn parse(&self) -> Vec<SourceResult<SourceRecord>> {
        parse::parse(&self.origin, &self.content)
    }
}

/// A source of raw record content.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short description used in logs.
    fn describe(&self) -> String;

    /// Load all content from this backend.
    async fn load(&self) -> SourceResult<Vec<SourceEntry>>;
}
