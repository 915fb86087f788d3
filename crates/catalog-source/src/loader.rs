//! Loading and parsing every configured source.

use catalog_core::SourceRecord;
use tracing::{info, warn};

use crate::config::SourceConfig;
use crate::error::SourceResult;

/// Default number of characters of unparseable content included in logs.
pub const DEFAULT_SAMPLE_LENGTH: usize = 256;

/// Load all sources and parse their content into records.
///
/// Backend failures (unreadable files, failing commands) abort the load.
/// Content that does not parse is logged with a sample of at most
/// `sample_length` characters and skipped.
pub async fn load_records(
    sources: &[SourceConfig],
    sample_length: usize,
) -> SourceResult<Vec<SourceRecord>> {
    let mut records = Vec::new();

    for source in sources {
        let backend = source.backend()?;
        let entries = backend.load().await?;

        let mut parsed = 0usize;
        let mut skipped = 0usize;
        for entry in &entries {
            for result in entry.parse() {
                match result {
                    Ok(record) => {
                        records.push(record);
                        parsed += 1;
                    }
                    Err(e) => {
                        skipped += 1;
                        warn!(
                            origin = %entry.origin,
                            error = %e,
                            sample = %sample(&entry.content, sample_length),
                            "Skipping content that could not be parsed"
                        );
                    }
                }
            }
        }

        info!(
            source = %backend.describe(),
            entries = entries.len(),
            records = parsed,
            skipped,
            "Loaded source"
        );
    }

    Ok(records)
}

/// The first `length` characters of `content`, with an ellipsis when cut.
pub(crate) fn sample(content: &[u8], length: usize) -> String {
    let text = String::from_utf8_lossy(content);
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(length).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
