use std::path::PathBuf;

use serde::Serialize;
use shopwise_core::catalog::CatalogWarning;
use shopwise_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use shopwise_core::errors::ApplicationError;
use shopwise_core::open_catalog;

use crate::commands::{to_pretty_json, CommandResult};

const COMMAND: &str = "catalog";

#[derive(Debug, Serialize)]
struct CatalogReport<'a> {
    origin: &'a str,
    currency: &'a str,
    stores: &'a [String],
    product_count: usize,
    products: Vec<ProductSummary<'a>>,
    warnings: &'a [CatalogWarning],
}

#[derive(Debug, Serialize)]
struct ProductSummary<'a> {
    id: &'a str,
    name: &'a str,
    stocked_at: usize,
}

pub fn run(path: Option<PathBuf>, json: bool) -> CommandResult {
    match execute(path, json) {
        Ok(result) => result,
        Err(error) => CommandResult::from_error(COMMAND, error),
    }
}

fn execute(path: Option<PathBuf>, json: bool) -> Result<CommandResult, ApplicationError> {
    let config = AppConfig::load(LoadOptions {
        overrides: ConfigOverrides { catalog_path: path, ..ConfigOverrides::default() },
        ..LoadOptions::default()
    })?;
    let loaded = open_catalog(&config.catalog)?;
    let catalog = &loaded.catalog;

    let report = CatalogReport {
        origin: &loaded.origin,
        currency: catalog.currency(),
        stores: catalog.stores(),
        product_count: catalog.len(),
        products: catalog
            .products()
            .iter()
            .map(|product| ProductSummary {
                id: &product.id.0,
                name: &product.name,
                stocked_at: product.prices.values().filter(|price| price.is_some()).count(),
            })
            .collect(),
        warnings: &loaded.warnings,
    };

    if json {
        return Ok(to_pretty_json(COMMAND, &report));
    }

    let mut lines = vec![
        format!("catalog: {}", report.origin),
        format!("- products: {}", report.product_count),
        format!("- stores: {}", report.stores.join(", ")),
        format!("- currency: {}", report.currency),
    ];
    if report.warnings.is_empty() {
        lines.push("- skipped records: none".to_string());
    } else {
        lines.push(format!("- skipped records: {}", report.warnings.len()));
        for warning in report.warnings {
            lines.push(format!(
                "  - #{} ({}): {}",
                warning.index,
                warning.product_id.as_deref().unwrap_or("unknown"),
                warning.reason
            ));
        }
    }

    Ok(CommandResult::raw(lines.join("\n")))
}
