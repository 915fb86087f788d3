//! Building desired entries from source records.

use std::collections::BTreeSet;

use catalog_core::{DesiredEntry, SourceRecord};
use catalog_expr::Sandbox;
use tracing::debug;

use crate::compiled::CompiledOutput;
use crate::config::OutputConfig;
use crate::error::BuildResult;
use crate::filter::collect;
use crate::types::DesiredType;

/// Build one entry per record accepted by the output's filter.
///
/// Fails on the first record whose name or external id cannot be evaluated.
pub fn build_entries(
    sandbox: &Sandbox,
    output: &OutputConfig,
    records: &[SourceRecord],
) -> BuildResult<Vec<DesiredEntry>> {
    let compiled = CompiledOutput::compile(sandbox, output)?;
    let matched = collect(sandbox, &compiled, records)?;

    let entries = matched
        .into_iter()
        .map(|record| compiled.build_entry(sandbox, record))
        .collect::<BuildResult<Vec<_>>>()?;

    debug!(type_name = %output.type_name, entries = entries.len(), "Built entries");
    Ok(entries)
}

/// Entries of an enum type: one per distinct value of its source attribute
/// across `entries`, sorted, with the value as both name and external id.
#[must_use]
pub fn build_enum_entries(enum_type: &DesiredType, entries: &[DesiredEntry]) -> Vec<DesiredEntry> {
    let Some(attribute_id) = &enum_type.source_attribute else {
        return Vec::new();
    };

    let values: BTreeSet<&str> = entries
        .iter()
        .filter_map(|entry| entry.attribute_values.get(attribute_id))
        .flat_map(|binding| binding.literals())
        .filter(|value| !value.is_empty())
        .collect();

    values
        .into_iter()
        .map(|value| DesiredEntry::new(value, value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use crate::types::desired_types;
    use catalog_core::{AttributeBinding, Value};

    fn record(json: serde_json::Value) -> SourceRecord {
        SourceRecord::from_value("services.yaml", Value::from(json)).unwrap()
    }

    fn output(yaml: &str) -> OutputConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    const SERVICE: &str = r#"
name: Service
description: Services
type_name: Custom["Service"]
source:
  name: record.name
  external_id: record.id
  rank: record.rank
  aliases:
    - record.alias
attributes:
  - id: tier
    name: Tier
    type: Number
  - id: tags
    name: Tags
    type: String
    array: true
  - id: team
    name: Team
    enum:
      name: Team
      type_name: Custom["ServiceTeam"]
  - id: notes
    name: Notes
    type: Text
    schema_only: true
"#;

    #[test]
    fn test_build_full_entry() {
        let records = vec![record(serde_json::json!({
            "id": "svc-1",
            "name": "Payments",
            "rank": "3",
            "alias": ["pay", ""],
            "tier": "1",
            "tags": ["a", "b"],
            "team": "core",
            "notes": "ignored",
        }))];

        let entries = build_entries(&Sandbox::new(), &output(SERVICE), &records).unwrap();
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.external_id, "svc-1");
        assert_eq!(entry.name, "Payments");
        assert_eq!(entry.rank, Some(3));
        assert_eq!(entry.aliases, vec!["pay".to_string()]);
        assert_eq!(
            entry.attribute_values.get("tier"),
            Some(&AttributeBinding::Single("1".into()))
        );
        assert_eq!(
            entry.attribute_values.get("tags"),
            Some(&AttributeBinding::List(vec!["a".into(), "b".into()]))
        );
        assert_eq!(
            entry.attribute_values.get("team"),
            Some(&AttributeBinding::Single("core".into()))
        );
        assert!(!entry.attribute_values.contains_key("notes"));
    }

    #[test]
    fn test_missing_optional_fields_are_omitted() {
        let records = vec![record(serde_json::json!({"id": "svc-2", "name": "Search"}))];
        let entries = build_entries(&Sandbox::new(), &output(SERVICE), &records).unwrap();

        let entry = &entries[0];
        assert_eq!(entry.rank, None);
        assert!(entry.aliases.is_empty());
        assert!(entry.attribute_values.is_empty());
    }

    #[test]
    fn test_failing_attribute_is_omitted() {
        let mut config = output(SERVICE);
        config.attributes[0].source = Some(r#"throw "nope""#.into());
        let records = vec![record(serde_json::json!({"id": "svc-3", "name": "Auth", "tags": "x"}))];

        let entries = build_entries(&Sandbox::new(), &config, &records).unwrap();
        assert!(!entries[0].attribute_values.contains_key("tier"));
        assert_eq!(
            entries[0].attribute_values.get("tags"),
            Some(&AttributeBinding::List(vec!["x".into()]))
        );
    }

    #[test]
    fn test_missing_external_id_fails() {
        let records = vec![record(serde_json::json!({"name": "No id"}))];
        let err = build_entries(&Sandbox::new(), &output(SERVICE), &records).unwrap_err();
        assert!(matches!(
            err,
            BuildError::MissingField {
                field: "external_id",
                ..
            }
        ));
        assert_eq!(err.to_string(), "external_id is empty for record from services.yaml");
    }

    #[test]
    fn test_failing_name_fails_with_origin() {
        let mut config = output(SERVICE);
        config.source.name = r#"throw "bad name""#.into();
        let records = vec![record(serde_json::json!({"id": "svc-4"}))];
        let err = build_entries(&Sandbox::new(), &config, &records).unwrap_err();
        assert!(matches!(err, BuildError::Field { field: "name", .. }));
        assert!(err.to_string().contains("services.yaml"));
    }

    #[test]
    fn test_alias_scalar_and_list_normalize() {
        let records = vec![
            record(serde_json::json!({"id": "1", "name": "One", "alias": "solo"})),
            record(serde_json::json!({"id": "2", "name": "Two", "alias": ["a", "b"]})),
        ];
        let entries = build_entries(&Sandbox::new(), &output(SERVICE), &records).unwrap();
        assert_eq!(entries[0].aliases, vec!["solo".to_string()]);
        assert_eq!(entries[1].aliases, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let records = vec![
            record(serde_json::json!({"id": "dup", "name": "A"})),
            record(serde_json::json!({"id": "dup", "name": "B"})),
        ];
        let entries = build_entries(&Sandbox::new(), &output(SERVICE), &records).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_compile_error_names_field() {
        let mut config = output(SERVICE);
        config.source.aliases = vec!["record.alias +".into()];
        let err = build_entries(&Sandbox::new(), &config, &[]).unwrap_err();
        assert!(err.to_string().starts_with("source.aliases.0:"), "{err}");
    }

    #[test]
    fn test_enum_entries_from_distinct_values() {
        let config = output(SERVICE);
        let records = vec![
            record(serde_json::json!({"id": "1", "name": "One", "team": "core"})),
            record(serde_json::json!({"id": "2", "name": "Two", "team": "billing"})),
            record(serde_json::json!({"id": "3", "name": "Three", "team": "core"})),
        ];
        let entries = build_entries(&Sandbox::new(), &config, &records).unwrap();

        let types = desired_types(&config);
        let team_type = types
            .iter()
            .find(|t| t.source_attribute.as_deref() == Some("team"))
            .unwrap();

        let enum_entries = build_enum_entries(team_type, &entries);
        let names: Vec<_> = enum_entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["billing", "core"]);
        assert_eq!(enum_entries[0].external_id, "billing");
    }
}
