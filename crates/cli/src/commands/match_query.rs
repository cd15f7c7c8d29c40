use std::path::PathBuf;

use serde::Serialize;
use shopwise_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use shopwise_core::errors::ApplicationError;
use shopwise_core::matching::normalize;
use shopwise_core::PriceComparer;

use crate::commands::{to_pretty_json, CommandResult};

const COMMAND: &str = "match";

#[derive(Clone, Debug, Default)]
pub struct MatchArgs {
    pub query: String,
    pub threshold: Option<f64>,
    pub catalog: Option<PathBuf>,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct MatchReport {
    query: String,
    normalized: String,
    scorer: &'static str,
    threshold: f64,
    accepted: bool,
    product_id: Option<String>,
    product: Option<String>,
    alias: Option<String>,
    score: Option<f64>,
}

pub fn run(args: MatchArgs) -> CommandResult {
    match execute(args) {
        Ok(result) => result,
        Err(error) => CommandResult::from_error(COMMAND, error),
    }
}

fn execute(args: MatchArgs) -> Result<CommandResult, ApplicationError> {
    let config = AppConfig::load(LoadOptions {
        overrides: ConfigOverrides {
            catalog_path: args.catalog.clone(),
            threshold: args.threshold,
            ..ConfigOverrides::default()
        },
        ..LoadOptions::default()
    })?;

    let (comparer, _) = PriceComparer::from_config(&config)?;
    let matcher = comparer.matcher();
    let candidate = matcher.best_candidate(comparer.catalog(), &args.query);
    let threshold = matcher.config().threshold;

    let report = MatchReport {
        query: args.query.clone(),
        normalized: normalize(&args.query, matcher.config().strip_diacritics),
        scorer: matcher.config().scorer.as_str(),
        threshold,
        accepted: candidate.as_ref().is_some_and(|candidate| candidate.score >= threshold),
        product_id: candidate.as_ref().map(|candidate| candidate.entry.id.to_string()),
        product: candidate.as_ref().map(|candidate| candidate.entry.name.clone()),
        alias: candidate.as_ref().map(|candidate| candidate.alias.to_string()),
        score: candidate.as_ref().map(|candidate| candidate.score),
    };

    if args.json {
        return Ok(to_pretty_json(COMMAND, &report));
    }

    let verdict = if report.accepted { "matched" } else { "unmatched" };
    let detail = match (&report.product_id, &report.alias, report.score) {
        (Some(id), Some(alias), Some(score)) => {
            format!("best candidate `{id}` via `{alias}` scored {score:.3}")
        }
        _ => "no candidate".to_string(),
    };

    Ok(CommandResult::raw(format!(
        "{}: {verdict} ({detail}, threshold {:.2}, scorer {})",
        report.query, report.threshold, report.scorer
    )))
}
