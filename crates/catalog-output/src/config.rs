//! Output configuration.

use std::collections::HashSet;
use std::sync::LazyLock;

use catalog_core::AttributeMode;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Custom type names look like `Custom["Service"]`.
static TYPE_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^Custom\["[A-Z][a-zA-Z0-9]*"\]$"#).expect("valid regex")
});

/// Attribute ids are quoted into `record["<id>"]`, so they cannot contain
/// quotes or backslashes.
static ATTRIBUTE_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[^"\\]+$"#).expect("valid regex"));

/// One managed catalog type.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_unique_attribute_ids"))]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,

    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,

    #[validate(custom(function = "validate_type_name"))]
    pub type_name: String,

    #[serde(default)]
    pub ranked: bool,

    #[serde(default)]
    pub use_name_as_identifier: bool,

    #[serde(default)]
    pub categories: Vec<String>,

    #[validate(nested)]
    pub source: OutputSource,

    #[serde(default)]
    #[validate(nested)]
    pub attributes: Vec<AttributeConfig>,
}

impl OutputConfig {
    /// Attributes whose values this importer writes.
    pub fn writable_attributes(&self) -> impl Iterator<Item = &AttributeConfig> {
        self.attributes
            .iter()
            .filter(|attr| attr.mode().is_api_writable())
    }

    /// Ids of the attributes entry updates may write.
    #[must_use]
    pub fn writable_attribute_ids(&self) -> Vec<String> {
        self.writable_attributes().map(|attr| attr.id.clone()).collect()
    }
}

/// How records are selected for an output and how the entry identity is built.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct OutputSource {
    /// Expression evaluated as a bool; records where it is not `true` are skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    #[validate(length(min = 1, message = "source.name is required"))]
    pub name: String,

    #[validate(length(min = 1, message = "source.external_id is required"))]
    pub external_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,

    /// Each expression may produce a string or a list of strings.
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// One attribute of an output's schema.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_attribute_shape"))]
#[serde(deny_unknown_fields)]
pub struct AttributeConfig {
    #[validate(custom(function = "validate_attribute_id"))]
    pub id: String,

    #[validate(length(min = 1, message = "attribute name is required"))]
    pub name: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,

    #[serde(default)]
    pub array: bool,

    /// Defaults to reading the field named after the attribute id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub enum_config: Option<EnumConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backlink_attribute: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<String>>,

    #[serde(default)]
    pub schema_only: bool,
}

impl AttributeConfig {
    #[must_use]
    pub fn mode(&self) -> AttributeMode {
        if self.schema_only {
            AttributeMode::SchemaOnly
        } else if self.backlink_attribute.is_some() {
            AttributeMode::DerivedBacklink
        } else if self.path.is_some() {
            AttributeMode::DerivedPath
        } else {
            AttributeMode::ApiWritable
        }
    }

    /// The catalog type of this attribute's values.
    #[must_use]
    pub fn resolved_type(&self) -> &str {
        match (&self.enum_config, &self.type_name) {
            (Some(enum_config), _) => &enum_config.type_name,
            (None, Some(type_name)) => type_name,
            (None, None) => "",
        }
    }

    /// The expression producing this attribute's value.
    #[must_use]
    pub fn source_expression(&self) -> String {
        match &self.source {
            Some(source) => source.clone(),
            None => format!(r#"record["{}"]"#, self.id),
        }
    }
}

/// An attribute whose values become entries of a generated type.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct EnumConfig {
    #[validate(length(min = 1, message = "enum name is required"))]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[validate(custom(function = "validate_type_name"))]
    pub type_name: String,

    /// Add an attribute to the enum type listing the entries that use each value.
    #[serde(default)]
    pub enable_backlink: bool,
}

fn validation_error(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn validate_type_name(type_name: &str) -> Result<(), ValidationError> {
    if TYPE_NAME_REGEX.is_match(type_name) {
        Ok(())
    } else {
        Err(validation_error(
            "invalid_type_name",
            format!(r#"type_name {type_name:?} must look like Custom["Name"]"#),
        ))
    }
}

fn validate_attribute_id(id: &str) -> Result<(), ValidationError> {
    if ATTRIBUTE_ID_REGEX.is_match(id) {
        Ok(())
    } else {
        Err(validation_error(
            "invalid_attribute_id",
            format!("attribute id {id:?} must be non-empty and cannot contain quotes or backslashes"),
        ))
    }
}

fn validate_attribute_shape(attr: &AttributeConfig) -> Result<(), ValidationError> {
    match (&attr.type_name, &attr.enum_config) {
        (None, None) => {
            return Err(validation_error(
                "attribute_type",
                format!("attribute {}: type is required when enum is not set", attr.id),
            ))
        }
        (Some(_), Some(_)) => {
            return Err(validation_error(
                "attribute_type",
                format!("attribute {}: type cannot be set when enum is provided", attr.id),
            ))
        }
        _ => {}
    }

    if attr.backlink_attribute.is_some() && attr.path.is_some() {
        return Err(validation_error(
            "attribute_derivation",
            format!("attribute {}: backlink_attribute and path are exclusive", attr.id),
        ));
    }

    Ok(())
}

fn validate_unique_attribute_ids(output: &OutputConfig) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for attr in &output.attributes {
        if !seen.insert(attr.id.as_str()) {
            return Err(validation_error(
                "duplicate_attribute",
                format!("attribute id {:?} is declared more than once", attr.id),
            ));
        }
    }
    Ok(())
}
