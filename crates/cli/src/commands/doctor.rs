use serde::Serialize;
use shopwise_agent::llm::{provider_name, HttpLlmClient};
use shopwise_core::config::{AppConfig, LoadOptions, SummaryMode};
use shopwise_core::domain::query::parse_shopping_list;
use shopwise_core::summary::TemplateSummaryGenerator;
use shopwise_core::{open_catalog, Matcher, PriceComparer};

use crate::commands::{escape_json, CommandResult};

const PROBE_LIST: &str = "milch, brot";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_catalog(&config));
            checks.push(check_template_summary(&config));
            checks.push(check_llm_readiness(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["catalog_load", "template_summary", "llm_readiness"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let any_fail = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let any_warn = checks.iter().any(|check| check.status == CheckStatus::Warn);
    let (overall_status, summary) = if any_fail {
        (CheckStatus::Fail, "doctor: one or more readiness checks failed".to_string())
    } else if any_warn {
        (CheckStatus::Warn, "doctor: ready with warnings".to_string())
    } else {
        (CheckStatus::Pass, "doctor: all readiness checks passed".to_string())
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_catalog(config: &AppConfig) -> DoctorCheck {
    match open_catalog(&config.catalog) {
        Ok(loaded) if loaded.warnings.is_empty() => DoctorCheck {
            name: "catalog_load",
            status: CheckStatus::Pass,
            details: format!(
                "{} products across {} stores from `{}`",
                loaded.catalog.len(),
                loaded.catalog.stores().len(),
                loaded.origin
            ),
        },
        Ok(loaded) => DoctorCheck {
            name: "catalog_load",
            status: CheckStatus::Warn,
            details: format!(
                "{} products loaded from `{}`, {} malformed records skipped",
                loaded.catalog.len(),
                loaded.origin,
                loaded.warnings.len()
            ),
        },
        Err(error) => {
            DoctorCheck { name: "catalog_load", status: CheckStatus::Fail, details: error.to_string() }
        }
    }
}

fn check_template_summary(config: &AppConfig) -> DoctorCheck {
    let result = (|| -> Result<String, String> {
        let generator = TemplateSummaryGenerator::new().map_err(|error| error.to_string())?;
        let loaded = open_catalog(&config.catalog).map_err(|error| error.to_string())?;
        let comparer = PriceComparer::new(loaded.catalog, Matcher::new(config.matcher_config()));
        let comparison = comparer.compare(&parse_shopping_list(PROBE_LIST));
        generator.render(&comparison, config.summary.language).map_err(|error| error.to_string())
    })();

    match result {
        Ok(text) => DoctorCheck {
            name: "template_summary",
            status: CheckStatus::Pass,
            details: format!("rendered {} characters in {}", text.chars().count(), config.summary.language.code()),
        },
        Err(error) => {
            DoctorCheck { name: "template_summary", status: CheckStatus::Fail, details: error }
        }
    }
}

fn check_llm_readiness(config: &AppConfig) -> DoctorCheck {
    let provider = provider_name(config.llm.provider);

    if config.summary.mode == SummaryMode::Template {
        return DoctorCheck {
            name: "llm_readiness",
            status: CheckStatus::Skipped,
            details: "summary.mode is `template`".to_string(),
        };
    }

    if !config.llm.has_credentials() {
        return DoctorCheck {
            name: "llm_readiness",
            status: CheckStatus::Warn,
            details: format!("{provider} has no credentials; summaries will use templates"),
        };
    }

    match HttpLlmClient::from_config(&config.llm) {
        Ok(_) => DoctorCheck {
            name: "llm_readiness",
            status: CheckStatus::Pass,
            details: format!("{provider} client ready for model `{}`", config.llm.model),
        },
        Err(error) => DoctorCheck {
            name: "llm_readiness",
            status: CheckStatus::Warn,
            details: format!("{error}; summaries will use templates"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
