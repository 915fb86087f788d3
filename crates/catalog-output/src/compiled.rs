//! Outputs with their expressions compiled.

use catalog_core::{AttributeBinding, DesiredEntry, SourceRecord, Value};
use catalog_expr::{coerce_literal, EvalError, LiteralKind, Sandbox, Script};
use tracing::debug;

use crate::config::OutputConfig;
use crate::error::{BuildError, BuildResult};

#[derive(Debug, Clone)]
struct CompiledAttribute {
    id: String,
    array: bool,
    kind: LiteralKind,
    script: Script,
}

/// An output whose expressions compiled successfully.
///
/// Only api-writable attributes are compiled: derived and schema-only
/// attribute values are owned elsewhere and never built from records.
#[derive(Debug, Clone)]
pub struct CompiledOutput {
    type_name: String,
    filter: Option<Script>,
    name: Script,
    external_id: Script,
    rank: Option<Script>,
    aliases: Vec<Script>,
    attributes: Vec<CompiledAttribute>,
}

impl CompiledOutput {
    pub fn compile(sandbox: &Sandbox, output: &OutputConfig) -> BuildResult<Self> {
        let compile = |field: String, source: &str| {
            sandbox
                .compile(source)
                .map_err(|e| BuildError::compile(field, e))
        };

        let filter = output
            .source
            .filter
            .as_deref()
            .map(|source| compile("source.filter".into(), source))
            .transpose()?;
        let name = compile("source.name".into(), &output.source.name)?;
        let external_id = compile("source.external_id".into(), &output.source.external_id)?;
        let rank = output
            .source
            .rank
            .as_deref()
            .map(|source| compile("source.rank".into(), source))
            .transpose()?;

        let aliases = output
            .source
            .aliases
            .iter()
            .enumerate()
            .map(|(idx, source)| compile(format!("source.aliases.{idx}"), source))
            .collect::<BuildResult<Vec<_>>>()?;

        let mut attributes = Vec::new();
        for (idx, attr) in output.attributes.iter().enumerate() {
            if !attr.mode().is_api_writable() {
                continue;
            }
            attributes.push(CompiledAttribute {
                id: attr.id.clone(),
                array: attr.array,
                kind: LiteralKind::for_type_name(attr.resolved_type()),
                script: compile(
                    format!("attributes.{idx} (id = {})", attr.id),
                    &attr.source_expression(),
                )?,
            });
        }

        Ok(Self {
            type_name: output.type_name.clone(),
            filter,
            name,
            external_id,
            rank,
            aliases,
            attributes,
        })
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whether a record belongs to this output. Outputs without a filter
    /// accept every record.
    pub fn matches(&self, sandbox: &Sandbox, record: &SourceRecord) -> BuildResult<bool> {
        let Some(filter) = &self.filter else {
            return Ok(true);
        };

        sandbox
            .evaluate_scalar::<bool>(filter, record)
            .map(|matched| matched.unwrap_or(false))
            .map_err(|source| BuildError::Filter {
                origin: record.origin.clone(),
                source,
            })
    }

    /// Build the entry for one record.
    ///
    /// Name and external id are required. Rank, aliases and attributes that
    /// fail to evaluate are left out of the entry.
    pub fn build_entry(&self, sandbox: &Sandbox, record: &SourceRecord) -> BuildResult<DesiredEntry> {
        let name = required(sandbox, "name", &self.name, record)?;
        let external_id = required(sandbox, "external_id", &self.external_id, record)?;
        let mut entry = DesiredEntry::new(external_id, name);

        if let Some(script) = &self.rank {
            entry.rank = best_effort(record, "rank", sandbox.evaluate_scalar::<i64>(script, record))
                .flatten()
                .and_then(|rank| i32::try_from(rank).ok());
        }

        for script in &self.aliases {
            if let Some(aliases) =
                best_effort(record, "aliases", sandbox.evaluate_list::<String>(script, record))
            {
                entry
                    .aliases
                    .extend(aliases.into_iter().filter(|alias| !alias.is_empty()));
            }
        }

        for attr in &self.attributes {
            let binding = if attr.array {
                sandbox
                    .evaluate_list::<Value>(&attr.script, record)
                    .and_then(|values| {
                        values
                            .into_iter()
                            .map(|value| coerce_literal(value, attr.kind))
                            .collect::<Result<Vec<_>, EvalError>>()
                    })
                    .map(|literals| (!literals.is_empty()).then_some(AttributeBinding::List(literals)))
            } else {
                sandbox
                    .evaluate_scalar::<Value>(&attr.script, record)
                    .and_then(|value| {
                        value
                            .map(|value| coerce_literal(value, attr.kind))
                            .transpose()
                    })
                    .map(|literal| literal.map(AttributeBinding::Single))
            };

            if let Some(binding) = best_effort(record, &attr.id, binding).flatten() {
                entry.attribute_values.insert(attr.id.clone(), binding);
            }
        }

        Ok(entry)
    }
}

fn required(
    sandbox: &Sandbox,
    field: &'static str,
    script: &Script,
    record: &SourceRecord,
) -> BuildResult<String> {
    let value = sandbox
        .evaluate_scalar::<String>(script, record)
        .map_err(|source| BuildError::Field {
            field,
            origin: record.origin.clone(),
            source,
        })?;

    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(BuildError::MissingField {
            field,
            origin: record.origin.clone(),
        }),
    }
}

fn best_effort<T>(record: &SourceRecord, field: &str, result: Result<T, EvalError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(origin = %record.origin, field, error = %e, "Omitting field that failed to evaluate");
            None
        }
    }
}
