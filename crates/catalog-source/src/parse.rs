//! Parsing raw content into source records.

use catalog_core::{SourceRecord, Value};
use serde::Deserialize;

use crate::error::{SourceError, SourceResult};

/// Parse content into records.
///
/// JSON content (starting with `{` or `[`) may hold several concatenated
/// documents. Otherwise the content is read as YAML, with `---` separating
/// documents. Each document is a map (one record) or a list of maps. Content
/// that is neither is read as CSV with a header row.
pub fn parse(origin: &str, content: &[u8]) -> Vec<SourceResult<SourceRecord>> {
    let text = match std::str::from_utf8(content) {
        Ok(text) => text,
        Err(e) => {
            return vec![Err(SourceError::parse(
                origin,
                format!("content is not valid UTF-8: {e}"),
            ))]
        }
    };

    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return match parse_json(text) {
            Ok(documents) => records_from_documents(origin, documents),
            Err(e) => vec![Err(SourceError::parse(origin, e.to_string()))],
        };
    }

    if let Some(documents) = parse_yaml(text) {
        if documents
            .iter()
            .all(|document| matches!(document, Value::Map(_) | Value::List(_) | Value::Null))
        {
            return records_from_documents(origin, documents);
        }
    }

    parse_csv(origin, text)
}

fn parse_json(text: &str) -> Result<Vec<Value>, serde_json::Error> {
    serde_json::Deserializer::from_str(text)
        .into_iter::<Value>()
        .collect()
}

fn parse_yaml(text: &str) -> Option<Vec<Value>> {
    serde_yaml::Deserializer::from_str(text)
        .map(|document| Value::deserialize(document).ok())
        .collect()
}

fn records_from_documents(origin: &str, documents: Vec<Value>) -> Vec<SourceResult<SourceRecord>> {
    let mut records = Vec::new();
    for document in documents {
        match document {
            Value::Null => {}
            Value::Map(fields) => records.push(Ok(SourceRecord::new(origin, fields))),
            Value::List(items) => {
                for (index, item) in items.into_iter().enumerate() {
                    records.push(match item {
                        Value::Map(fields) => Ok(SourceRecord::new(origin, fields)),
                        other => Err(SourceError::parse(
                            origin,
                            format!("list item {index} is not a map: {other}"),
                        )),
                    });
                }
            }
            other => records.push(Err(SourceError::parse(
                origin,
                format!("document is not a map or list of maps: {other}"),
            ))),
        }
    }
    records
}

fn parse_csv(origin: &str, text: &str) -> Vec<SourceResult<SourceRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => return vec![Err(SourceError::parse(origin, format!("CSV header: {e}")))],
    };

    reader
        .records()
        .enumerate()
        .map(|(index, row)| {
            // +1 for the header, +1 for 1-based lines
            let row = row.map_err(|e| {
                SourceError::parse(origin, format!("CSV line {}: {e}", index + 2))
            })?;
            let fields = headers
                .iter()
                .zip(row.iter())
                .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
                .collect();
            Ok(SourceRecord::new(origin, fields))
        })
        .collect()
}
