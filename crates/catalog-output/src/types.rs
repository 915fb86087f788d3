//! Catalog type definitions derived from outputs.

use catalog_core::AttributeMode;
use serde::{Deserialize, Serialize};

use crate::config::OutputConfig;

/// One attribute of a desired catalog type schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAttribute {
    pub id: String,
    pub name: String,
    pub type_name: String,
    pub array: bool,
    pub mode: AttributeMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backlink_attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<String>>,
}

/// The target state of a catalog type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredType {
    pub name: String,
    pub description: String,
    pub type_name: String,
    pub ranked: bool,
    pub use_name_as_identifier: bool,
    pub categories: Vec<String>,
    pub attributes: Vec<TypeAttribute>,
    /// For enum types, the base type attribute whose values become entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_attribute: Option<String>,
}

impl DesiredType {
    #[must_use]
    pub fn is_enum(&self) -> bool {
        self.source_attribute.is_some()
    }

    /// Ids of the attributes entry updates may write.
    #[must_use]
    pub fn writable_attribute_ids(&self) -> Vec<String> {
        self.attributes
            .iter()
            .filter(|attr| attr.mode.is_api_writable())
            .map(|attr| attr.id.clone())
            .collect()
    }
}

/// The base type of an output followed by one type per enum attribute.
#[must_use]
pub fn desired_types(output: &OutputConfig) -> Vec<DesiredType> {
    let mut base = DesiredType {
        name: output.name.clone(),
        description: output.description.clone(),
        type_name: output.type_name.clone(),
        ranked: output.ranked,
        use_name_as_identifier: output.use_name_as_identifier,
        categories: output.categories.clone(),
        attributes: Vec::with_capacity(output.attributes.len()),
        source_attribute: None,
    };
    let mut enum_types = Vec::new();

    for attr in &output.attributes {
        base.attributes.push(TypeAttribute {
            id: attr.id.clone(),
            name: attr.name.clone(),
            type_name: attr.resolved_type().to_string(),
            array: attr.array,
            mode: attr.mode(),
            backlink_attribute: attr.backlink_attribute.clone(),
            path: attr.path.clone(),
        });

        let Some(enum_config) = &attr.enum_config else {
            continue;
        };

        // Enum entries carry no attribute values; descriptions are set from
        // the dashboard.
        let mut attributes = vec![TypeAttribute {
            id: "description".into(),
            name: "Description".into(),
            type_name: "String".into(),
            array: false,
            mode: AttributeMode::SchemaOnly,
            backlink_attribute: None,
            path: None,
        }];

        if enum_config.enable_backlink {
            attributes.push(TypeAttribute {
                id: backlink_id(&output.type_name),
                name: output.name.clone(),
                type_name: output.type_name.clone(),
                array: true,
                mode: AttributeMode::DerivedBacklink,
                backlink_attribute: Some(attr.id.clone()),
                path: None,
            });
        }

        enum_types.push(DesiredType {
            name: enum_config.name.clone(),
            description: enum_config.description.clone(),
            type_name: enum_config.type_name.clone(),
            ranked: false,
            use_name_as_identifier: false,
            categories: output.categories.clone(),
            attributes,
            source_attribute: Some(attr.id.clone()),
        });
    }

    let mut types = vec![base];
    types.extend(enum_types);
    types
}

/// Attribute id for a backlink to `type_name`: `Custom["ServiceTeam"]`
/// becomes `service_team`.
fn backlink_id(type_name: &str) -> String {
    let inner = type_name
        .trim_start_matches("Custom[\"")
        .trim_end_matches("\"]");

    let mut id = String::with_capacity(inner.len() + 4);
    for (idx, ch) in inner.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if idx > 0 {
                id.push('_');
            }
            id.push(ch.to_ascii_lowercase());
        } else {
            id.push(ch);
        }
    }
    id
}
