//! List the types attributes can reference

use catalog_client::{CatalogClient, CatalogResource};
use clap::Args;

use crate::commands::client_config;
use crate::error::{CliError, CliResult};

/// List the types usable as attribute types
#[derive(Args, Debug, Clone, Default)]
pub struct TypesArgs {
    /// API key for the catalog API
    #[arg(long, env = "CATALOG_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the catalog API
    #[arg(long, env = "CATALOG_API_ENDPOINT")]
    pub api_endpoint: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the types command
pub async fn execute(args: TypesArgs) -> CliResult<()> {
    let config = client_config(args.api_key.as_deref(), args.api_endpoint.as_deref())?;
    let client = CatalogClient::new(config.with_read_only(true))?;

    let mut resources = client
        .list_resources()
        .await
        .map_err(|e| CliError::api("finding catalog resources", e))?;
    sort_resources(&mut resources);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resources)?);
    } else {
        print_resource_table(&resources);
    }

    Ok(())
}

/// Primitive types first, then custom, then external; by type name within
/// each category.
pub fn sort_resources(resources: &mut [CatalogResource]) {
    resources.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then_with(|| a.type_name.cmp(&b.type_name))
    });
}

fn print_resource_table(resources: &[CatalogResource]) {
    println!(
        "{:<28} {:<36} {:<10} {:<40} VALUE",
        "NAME", "TYPE NAME", "CATEGORY", "DESCRIPTION"
    );
    println!("{}", "-".repeat(130));

    for resource in resources {
        println!(
            "{:<28} {:<36} {:<10} {:<40} {}",
            resource.label,
            resource.type_name,
            resource.category,
            truncate(&resource.description, 40),
            resource.value_docstring
        );
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        text.to_string()
    }
}
