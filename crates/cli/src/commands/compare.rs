use std::path::PathBuf;

use serde::Serialize;
use shopwise_agent::build_summary_generator;
use shopwise_core::catalog::CatalogWarning;
use shopwise_core::config::{AppConfig, ConfigOverrides, LoadOptions, SummaryMode};
use shopwise_core::domain::comparison::ComparisonResult;
use shopwise_core::domain::query::{parse_shopping_list, QueryItem};
use shopwise_core::errors::ApplicationError;
use shopwise_core::export::write_csv_file;
use shopwise_core::summary::{display_store, format_amount, Language};
use shopwise_core::PriceComparer;
use tracing::{info, warn};

use crate::commands::{to_pretty_json, CommandResult};

const COMMAND: &str = "compare";

#[derive(Clone, Debug, Default)]
pub struct CompareArgs {
    pub items: Vec<String>,
    /// Shopping list text read from stdin, appended after `items`.
    pub stdin: Option<String>,
    pub language: Option<Language>,
    pub threshold: Option<f64>,
    pub catalog: Option<PathBuf>,
    pub summary: Option<SummaryMode>,
    pub export: Option<PathBuf>,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct CompareReport<'a> {
    comparison: &'a ComparisonResult,
    summary: &'a str,
    summary_generator: &'static str,
    catalog_origin: &'a str,
    catalog_warnings: &'a [CatalogWarning],
    export_path: Option<String>,
    export_error: Option<ExportFailure>,
}

#[derive(Debug, Serialize)]
struct ExportFailure {
    error_class: &'static str,
    message: String,
}

pub fn run(args: CompareArgs) -> CommandResult {
    match execute(args) {
        Ok(result) => result,
        Err(error) => CommandResult::from_error(COMMAND, error),
    }
}

fn execute(args: CompareArgs) -> Result<CommandResult, ApplicationError> {
    let config = AppConfig::load(LoadOptions {
        overrides: ConfigOverrides {
            catalog_path: args.catalog.clone(),
            threshold: args.threshold,
            summary_mode: args.summary,
            language: args.language,
            ..ConfigOverrides::default()
        },
        ..LoadOptions::default()
    })?;

    let items = collect_items(&args);
    if items.is_empty() {
        return Err(ApplicationError::Input("the shopping list is empty".to_string()));
    }

    let (comparer, loaded) = PriceComparer::from_config(&config)?;
    let comparison = comparer.compare(&items);

    let generator = build_summary_generator(&config)?;
    let language = config.summary.language;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| {
            ApplicationError::Summary(format!("failed to initialize async runtime: {error}"))
        })?;
    let summary = runtime.block_on(generator.generate(&comparison, language))?;

    let mut export_path = None;
    let mut export_failure = None;
    if let Some(path) = &args.export {
        match write_csv_file(&comparison, path) {
            Ok(()) => {
                info!(
                    event_name = "export.written",
                    path = %path.display(),
                    rows = comparison.lines.len(),
                    "comparison exported"
                );
                export_path = Some(path.display().to_string());
            }
            Err(error) => {
                warn!(
                    event_name = "export.failed",
                    path = %path.display(),
                    error = %error,
                    "comparison export failed"
                );
                export_failure = Some(ApplicationError::from(error));
            }
        }
    }

    let exit_code =
        export_failure.as_ref().map(|error| error.clone().into_interface().exit_code()).unwrap_or(0);
    let export_error = export_failure.map(|error| ExportFailure {
        error_class: error.error_class(),
        message: error.to_string(),
    });

    let mut result = if args.json {
        let report = CompareReport {
            comparison: &comparison,
            summary: &summary,
            summary_generator: generator.name(),
            catalog_origin: &loaded.origin,
            catalog_warnings: &loaded.warnings,
            export_path,
            export_error,
        };
        to_pretty_json(COMMAND, &report)
    } else {
        CommandResult::raw(render_human(
            &comparison,
            &summary,
            export_path.as_deref(),
            export_error.as_ref().map(|failure| failure.message.as_str()),
        ))
    };
    if result.exit_code == 0 {
        result.exit_code = exit_code;
    }

    Ok(result)
}

fn collect_items(args: &CompareArgs) -> Vec<QueryItem> {
    let mut items: Vec<QueryItem> =
        args.items.iter().flat_map(|item| parse_shopping_list(item)).collect();
    if let Some(text) = &args.stdin {
        items.extend(parse_shopping_list(text));
    }
    items
}

fn render_human(
    comparison: &ComparisonResult,
    summary: &str,
    export_path: Option<&str>,
    export_error: Option<&str>,
) -> String {
    let mut lines = Vec::new();
    let currency = &comparison.currency;

    lines.push(format!(
        "matched {} of {} items",
        comparison.matched_count(),
        comparison.matched_count() + comparison.unmatched.len()
    ));
    for line in &comparison.lines {
        let prices = comparison
            .stores
            .iter()
            .map(|store| match line.line_amount(store) {
                Some(amount) => format!("{store} {}", format_amount(amount)),
                None => format!("{store} -"),
            })
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!(
            "- {} x{} -> {} [{:.3}] ({prices})",
            line.query, line.quantity, line.product_name, line.score
        ));
    }
    for item in &comparison.unmatched {
        lines.push(format!("- {} -> not found", item.text));
    }

    lines.push(String::new());
    lines.push(format!("store totals ({currency}):"));
    for (rank, total) in comparison.totals.iter().enumerate() {
        let marker = if comparison.cheapest.as_deref() == Some(total.store.as_str()) {
            " (cheapest)"
        } else if total.incomplete {
            " (no items)"
        } else if total.unavailable_count > 0 {
            " (partial)"
        } else {
            ""
        };
        lines.push(format!(
            "{}. {} {} [{} stocked, {} missing]{marker}",
            rank + 1,
            display_store(&total.store),
            format_amount(total.subtotal),
            total.stocked_count,
            total.unavailable_count
        ));
    }

    lines.push(String::new());
    lines.push(summary.to_string());

    if let Some(path) = export_path {
        lines.push(String::new());
        lines.push(format!("exported to {path}"));
    }
    if let Some(error) = export_error {
        lines.push(String::new());
        lines.push(format!("export failed: {error}"));
    }

    lines.join("\n")
}
