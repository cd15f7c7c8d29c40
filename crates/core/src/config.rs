use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::DEFAULT_CURRENCY;
use crate::matching::{MatcherConfig, Scorer, DEFAULT_THRESHOLD};
use crate::summary::Language;

pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["shopwise.toml", "config/shopwise.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub matching: MatchingConfig,
    pub summary: SummaryConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    /// `None` selects the built-in staples catalog.
    pub path: Option<PathBuf>,
    pub currency: String,
    /// Append the built-in staples after the products of `path`.
    pub extend_builtin: bool,
}

#[derive(Clone, Debug)]
pub struct MatchingConfig {
    pub threshold: f64,
    pub scorer: Scorer,
    pub strip_diacritics: bool,
}

#[derive(Clone, Debug)]
pub struct SummaryConfig {
    pub mode: SummaryMode,
    pub language: Language,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMode {
    Template,
    Llm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(rename = "openai", alias = "open_ai")]
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub catalog_path: Option<PathBuf>,
    pub threshold: Option<f64>,
    pub scorer: Option<Scorer>,
    pub summary_mode: Option<SummaryMode>,
    pub language: Option<Language>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig {
                path: None,
                currency: DEFAULT_CURRENCY.to_string(),
                extend_builtin: false,
            },
            matching: MatchingConfig {
                threshold: DEFAULT_THRESHOLD,
                scorer: Scorer::Ratio,
                strip_diacritics: true,
            },
            summary: SummaryConfig { mode: SummaryMode::Template, language: Language::English },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: None,
                model: "llama3.1".to_string(),
                timeout_secs: 20,
            },
            logging: LoggingConfig { level: "warn".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for SummaryMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "template" => Ok(Self::Template),
            "llm" => Ok(Self::Llm),
            other => Err(ConfigError::Validation(format!(
                "unsupported summary mode `{other}` (expected template|llm)"
            ))),
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl LlmConfig {
    /// Whether enough credentials are present to attempt a delegated call.
    /// Ollama needs none; an unset `base_url` resolves to the local daemon.
    pub fn has_credentials(&self) -> bool {
        match self.provider {
            LlmProvider::OpenAi | LlmProvider::Anthropic => self
                .api_key
                .as_ref()
                .is_some_and(|value| !value.expose_secret().trim().is_empty()),
            LlmProvider::Ollama => true,
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_CANDIDATES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn matcher_config(&self) -> MatcherConfig {
        MatcherConfig {
            threshold: self.matching.threshold,
            scorer: self.matching.scorer,
            strip_diacritics: self.matching.strip_diacritics,
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(catalog) = patch.catalog {
            if let Some(path) = catalog.path {
                self.catalog.path = Some(path);
            }
            if let Some(currency) = catalog.currency {
                self.catalog.currency = currency;
            }
            if let Some(extend_builtin) = catalog.extend_builtin {
                self.catalog.extend_builtin = extend_builtin;
            }
        }

        if let Some(matching) = patch.matching {
            if let Some(threshold) = matching.threshold {
                self.matching.threshold = threshold;
            }
            if let Some(scorer) = matching.scorer {
                self.matching.scorer = scorer;
            }
            if let Some(strip_diacritics) = matching.strip_diacritics {
                self.matching.strip_diacritics = strip_diacritics;
            }
        }

        if let Some(summary) = patch.summary {
            if let Some(mode) = summary.mode {
                self.summary.mode = mode;
            }
            if let Some(language) = summary.language {
                self.summary.language = language;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SHOPWISE_CATALOG_PATH") {
            self.catalog.path = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("SHOPWISE_CATALOG_CURRENCY") {
            self.catalog.currency = value;
        }
        if let Some(value) = read_env("SHOPWISE_CATALOG_EXTEND_BUILTIN") {
            self.catalog.extend_builtin = parse_bool("SHOPWISE_CATALOG_EXTEND_BUILTIN", &value)?;
        }

        if let Some(value) = read_env("SHOPWISE_MATCHING_THRESHOLD") {
            self.matching.threshold = parse_f64("SHOPWISE_MATCHING_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("SHOPWISE_MATCHING_SCORER") {
            self.matching.scorer = value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "SHOPWISE_MATCHING_SCORER".to_string(),
                value: value.clone(),
            })?;
        }
        if let Some(value) = read_env("SHOPWISE_MATCHING_STRIP_DIACRITICS") {
            self.matching.strip_diacritics =
                parse_bool("SHOPWISE_MATCHING_STRIP_DIACRITICS", &value)?;
        }

        if let Some(value) = read_env("SHOPWISE_SUMMARY_MODE") {
            self.summary.mode = value.parse()?;
        }
        if let Some(value) = read_env("SHOPWISE_SUMMARY_LANGUAGE") {
            self.summary.language =
                value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                    key: "SHOPWISE_SUMMARY_LANGUAGE".to_string(),
                    value: value.clone(),
                })?;
        }

        if let Some(value) = read_env("SHOPWISE_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("SHOPWISE_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SHOPWISE_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("SHOPWISE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("SHOPWISE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("SHOPWISE_LLM_TIMEOUT_SECS", &value)?;
        }

        let log_level =
            read_env("SHOPWISE_LOGGING_LEVEL").or_else(|| read_env("SHOPWISE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SHOPWISE_LOGGING_FORMAT").or_else(|| read_env("SHOPWISE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(catalog_path) = overrides.catalog_path {
            self.catalog.path = Some(catalog_path);
        }
        if let Some(threshold) = overrides.threshold {
            self.matching.threshold = threshold;
        }
        if let Some(scorer) = overrides.scorer {
            self.matching.scorer = scorer;
        }
        if let Some(summary_mode) = overrides.summary_mode {
            self.summary.mode = summary_mode;
        }
        if let Some(language) = overrides.language {
            self.summary.language = language;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_catalog(&self.catalog)?;
        validate_matching(&self.matching)?;
        validate_llm(&self.llm)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    CONFIG_FILE_CANDIDATES.iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_catalog(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    if catalog.path.as_ref().is_some_and(|path| path.as_os_str().is_empty()) {
        return Err(ConfigError::Validation("catalog.path must not be empty".to_string()));
    }

    let currency = catalog.currency.trim();
    if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(
            "catalog.currency must be a three-letter ISO code such as `EUR`".to_string(),
        ));
    }

    Ok(())
}

fn validate_matching(matching: &MatchingConfig) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&matching.threshold) {
        return Err(ConfigError::Validation(
            "matching.threshold must be in range 0.0..=1.0".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    catalog: Option<CatalogPatch>,
    matching: Option<MatchingPatch>,
    summary: Option<SummaryPatch>,
    llm: Option<LlmPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    path: Option<PathBuf>,
    currency: Option<String>,
    extend_builtin: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct MatchingPatch {
    threshold: Option<f64>,
    scorer: Option<Scorer>,
    strip_diacritics: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct SummaryPatch {
    mode: Option<SummaryMode>,
    language: Option<Language>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
