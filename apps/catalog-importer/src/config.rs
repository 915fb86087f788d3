//! Importer configuration file.

use std::collections::HashSet;
use std::path::Path;

use catalog_output::{desired_types, DesiredType, OutputConfig};
use catalog_source::SourceConfig;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::{CliError, CliResult};

/// The whole importer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_unique_type_names"))]
#[serde(deny_unknown_fields)]
pub struct ImporterConfig {
    /// Identifies the catalog types this importer owns.
    #[validate(length(min = 1, message = "sync_id is required"))]
    pub sync_id: String,

    #[validate(length(min = 1, message = "at least one pipeline is required"), nested)]
    pub pipelines: Vec<PipelineConfig>,
}

/// Sources whose records feed a set of outputs.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[validate(length(min = 1, message = "at least one source is required"), nested)]
    pub sources: Vec<SourceConfig>,

    #[validate(length(min = 1, message = "at least one output is required"), nested)]
    pub outputs: Vec<OutputConfig>,
}

impl ImporterConfig {
    /// Every output across all pipelines.
    pub fn outputs(&self) -> impl Iterator<Item = &OutputConfig> {
        self.pipelines.iter().flat_map(|p| p.outputs.iter())
    }

    /// Every catalog type the outputs define, enum types included.
    #[must_use]
    pub fn all_output_types(&self) -> Vec<DesiredType> {
        self.outputs().flat_map(desired_types).collect()
    }

    /// Keep only outputs whose type name is in `targets`, dropping pipelines
    /// left without outputs.
    #[must_use]
    pub fn filter(mut self, targets: &[String]) -> Self {
        for pipeline in &mut self.pipelines {
            pipeline
                .outputs
                .retain(|output| targets.iter().any(|t| *t == output.type_name));
        }
        self.pipelines.retain(|p| !p.outputs.is_empty());
        self
    }

    /// Pipeline, source and output counts.
    #[must_use]
    pub fn counts(&self) -> (usize, usize, usize) {
        let sources = self.pipelines.iter().map(|p| p.sources.len()).sum();
        let outputs = self.pipelines.iter().map(|p| p.outputs.len()).sum();
        (self.pipelines.len(), sources, outputs)
    }
}

fn validate_unique_type_names(config: &ImporterConfig) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for desired in config.all_output_types() {
        if !seen.insert(desired.type_name.clone()) {
            let mut err = ValidationError::new("duplicate_type_name");
            err.message = Some(
                format!(
                    "type_name {} is defined more than once across outputs and enums",
                    desired.type_name
                )
                .into(),
            );
            return Err(err);
        }
    }
    Ok(())
}

/// Parse a config document. YAML and JSON are both accepted.
pub fn parse_config(content: &str) -> CliResult<ImporterConfig> {
    serde_yaml::from_str(content).map_err(|e| {
        let location = if let Some(loc) = e.location() {
            format!(" at line {}, column {}", loc.line(), loc.column())
        } else {
            String::new()
        };
        CliError::Validation(format!("Invalid YAML{location}: {e}"))
    })
}

/// Load, parse and validate a config file.
pub fn load_config(path: &Path) -> CliResult<ImporterConfig> {
    if !path.exists() {
        return Err(CliError::Validation(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::Io(format!("Failed to read file {}: {e}", path.display())))?;
    let config = parse_config(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Run every validation rule, naming the offending field.
pub fn validate_config(config: &ImporterConfig) -> CliResult<()> {
    config
        .validate()
        .map_err(|e| CliError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
sync_id: example-org/services
pipelines:
  - sources:
      - inline:
          entries:
            - id: payments
              name: Payments
              tier: 1
    outputs:
      - name: Service
        description: Services we run
        type_name: Custom["Service"]
        source:
          name: record["name"]
          external_id: record["id"]
        attributes:
          - id: tier
            name: Tier
            type: Number
          - id: team
            name: Team
            enum:
              name: Team
              description: Owning teams
              type_name: Custom["Team"]
              enable_backlink: true
      - name: Feature
        description: Product features
        type_name: Custom["Feature"]
        source:
          name: record["name"]
          external_id: record["id"]
"#;

    #[test]
    fn test_parse_and_validate() {
        let config = parse_config(CONFIG).unwrap();
        validate_config(&config).unwrap();
        assert_eq!(config.counts(), (1, 1, 2));

        let types: Vec<_> = config
            .all_output_types()
            .into_iter()
            .map(|t| t.type_name)
            .collect();
        assert_eq!(
            types,
            vec![
                r#"Custom["Service"]"#.to_string(),
                r#"Custom["Team"]"#.to_string(),
                r#"Custom["Feature"]"#.to_string(),
            ]
        );
    }

    #[test]
    fn test_json_is_accepted() {
        let json = r#"{"sync_id": "x", "pipelines": [{"sources": [{"inline": {"entries": []}}], "outputs": [{"name": "A", "description": "A", "type_name": "Custom[\"A\"]", "source": {"name": "record[\"n\"]", "external_id": "record[\"id\"]"}}]}]}"#;
        let config = parse_config(json).unwrap();
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_yaml_errors_report_location() {
        let err = parse_config("sync_id: x\npipelines: [\n  - {").unwrap_err();
        assert!(err.to_string().contains("line"), "{err}");
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = parse_config("sync_id: x\npipelines: []\nextra: 1\n").unwrap_err();
        assert!(err.to_string().contains("extra"));
    }

    #[test]
    fn test_missing_sync_id() {
        let config = parse_config(&CONFIG.replace("example-org/services", "''")).unwrap();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("sync_id is required"), "{err}");
    }

    #[test]
    fn test_nested_errors_name_the_field() {
        let config = parse_config(&CONFIG.replace(r#"Custom["Feature"]"#, "Feature")).unwrap();
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("pipelines[0].outputs[1].type_name"), "{err}");
    }

    #[test]
    fn test_duplicate_type_names_are_rejected() {
        let config =
            parse_config(&CONFIG.replace(r#"Custom["Feature"]"#, r#"Custom["Team"]"#)).unwrap();
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("defined more than once"), "{err}");
    }

    #[test]
    fn test_filter_targets() {
        let config = parse_config(CONFIG).unwrap();
        let filtered = config.filter(&[r#"Custom["Feature"]"#.to_string()]);
        assert_eq!(filtered.counts(), (1, 1, 1));
        assert_eq!(filtered.pipelines[0].outputs[0].name, "Feature");

        let none = parse_config(CONFIG)
            .unwrap()
            .filter(&["Custom[\"Missing\"]".to_string()]);
        assert!(none.pipelines.is_empty());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/importer.yaml")).unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
