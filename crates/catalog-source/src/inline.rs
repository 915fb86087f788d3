//! Entries written directly in config.

use std::collections::BTreeMap;

use async_trait::async_trait;
use catalog_core::Value;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::backend::{Backend, SourceEntry};
use crate::error::{SourceError, SourceResult};

/// Origin attached to inline records.
pub const INLINE_ORIGIN: &str = "inline";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct InlineSource {
    pub entries: Vec<BTreeMap<String, Value>>,
}

#[async_trait]
impl Backend for InlineSource {
    fn describe(&self) -> String {
        format!("{} inline entries", self.entries.len())
    }

    async fn load(&self) -> SourceResult<Vec<SourceEntry>> {
        let content = serde_json::to_vec(&self.entries)
            .map_err(|e| SourceError::parse(INLINE_ORIGIN, e.to_string()))?;
        Ok(vec![SourceEntry::new(INLINE_ORIGIN, content)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inline_round_trips_through_parser() {
        let source: InlineSource = serde_yaml::from_str(
            "entries:\n  - id: p1\n    name: P1\n  - id: p2\n    name: P2\n",
        )
        .unwrap();

        let entries = source.load().await.unwrap();
        assert_eq!(entries.len(), 1);

        let records: Vec<_> = entries[0].parse().into_iter().map(Result::unwrap).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("name"), Some(&Value::from("P2")));
        assert_eq!(records[0].origin, INLINE_ORIGIN);
    }
}
