use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use shopwise_agent::llm::provider_name;
use shopwise_core::config::{resolve_config_path, AppConfig, LoadOptions, SummaryMode};
use toml::Value;

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "configuration",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let entries: Vec<(&str, &str, String)> = vec![
        (
            "catalog.path",
            "SHOPWISE_CATALOG_PATH",
            config
                .catalog
                .path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "<builtin>".to_string()),
        ),
        ("catalog.currency", "SHOPWISE_CATALOG_CURRENCY", config.catalog.currency.clone()),
        (
            "catalog.extend_builtin",
            "SHOPWISE_CATALOG_EXTEND_BUILTIN",
            config.catalog.extend_builtin.to_string(),
        ),
        ("matching.threshold", "SHOPWISE_MATCHING_THRESHOLD", config.matching.threshold.to_string()),
        ("matching.scorer", "SHOPWISE_MATCHING_SCORER", config.matching.scorer.as_str().to_string()),
        (
            "matching.strip_diacritics",
            "SHOPWISE_MATCHING_STRIP_DIACRITICS",
            config.matching.strip_diacritics.to_string(),
        ),
        (
            "summary.mode",
            "SHOPWISE_SUMMARY_MODE",
            match config.summary.mode {
                SummaryMode::Template => "template".to_string(),
                SummaryMode::Llm => "llm".to_string(),
            },
        ),
        ("summary.language", "SHOPWISE_SUMMARY_LANGUAGE", config.summary.language.code().to_string()),
        ("llm.provider", "SHOPWISE_LLM_PROVIDER", provider_name(config.llm.provider).to_string()),
        ("llm.model", "SHOPWISE_LLM_MODEL", config.llm.model.clone()),
        (
            "llm.base_url",
            "SHOPWISE_LLM_BASE_URL",
            config.llm.base_url.clone().unwrap_or_else(|| "<provider default>".to_string()),
        ),
        (
            "llm.api_key",
            "SHOPWISE_LLM_API_KEY",
            config
                .llm
                .api_key
                .as_ref()
                .map(|key| redact_token(key.expose_secret()))
                .unwrap_or_else(|| "<unset>".to_string()),
        ),
        ("llm.timeout_secs", "SHOPWISE_LLM_TIMEOUT_SECS", config.llm.timeout_secs.to_string()),
        ("logging.level", "SHOPWISE_LOGGING_LEVEL", config.logging.level.clone()),
        ("logging.format", "SHOPWISE_LOGGING_FORMAT", format!("{:?}", config.logging.format)),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, env_key, value) in &entries {
        lines.push(render_line(
            key_path,
            value,
            field_source(key_path, Some(*env_key), config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    }

    CommandResult::raw(lines.join("\n"))
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("config file"));
            return format!("file ({})", file_path.display());
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
