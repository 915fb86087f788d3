//! Selecting the records that belong to an output.

use catalog_core::SourceRecord;
use catalog_expr::Sandbox;
use tracing::debug;

use crate::compiled::CompiledOutput;
use crate::error::BuildResult;

/// Records accepted by the output's filter, in source order.
pub fn collect<'a>(
    sandbox: &Sandbox,
    output: &CompiledOutput,
    records: &'a [SourceRecord],
) -> BuildResult<Vec<&'a SourceRecord>> {
    let mut matched = Vec::new();
    for record in records {
        if output.matches(sandbox, record)? {
            matched.push(record);
        }
    }

    debug!(
        type_name = %output.type_name(),
        records = records.len(),
        matched = matched.len(),
        "Filtered source records"
    );
    Ok(matched)
}
