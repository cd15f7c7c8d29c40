use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shopwise_core::config::{AppConfig, SummaryMode};
use shopwise_core::domain::comparison::ComparisonResult;
use shopwise_core::summary::{
    Language, SummaryError, SummaryFacts, SummaryGenerator, TemplateSummaryGenerator,
};
use tracing::{info, warn};

use crate::llm::{provider_name, HttpLlmClient, LlmClient};

/// Phrases comparison facts through an [`LlmClient`].
///
/// The prompt carries every amount pre-formatted; the model is asked to
/// rephrase, never to compute.
pub struct LlmSummaryGenerator {
    client: Arc<dyn LlmClient>,
}

impl LlmSummaryGenerator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

pub fn build_prompt(comparison: &ComparisonResult, language: Language) -> Result<String, SummaryError> {
    let facts = SummaryFacts::from_comparison(comparison);
    let facts_json = serde_json::to_string_pretty(&facts)
        .map_err(|error| SummaryError::Delegate(error.to_string()))?;

    Ok(format!(
        "You summarize a grocery price comparison for a shopper.\n\
         Write two to four sentences in {language}.\n\
         Name the cheapest store and its total, the savings against `most_expensive` \
         when `savings` is given, stores that are missing items, and items that were not found.\n\
         Use only the numbers given below. Do not calculate new amounts. \
         All amounts are in {currency}.\n\n\
         Facts:\n{facts_json}",
        language = language.display_name(),
        currency = facts.currency,
    ))
}

#[async_trait]
impl SummaryGenerator for LlmSummaryGenerator {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn generate(
        &self,
        comparison: &ComparisonResult,
        language: Language,
    ) -> Result<String, SummaryError> {
        let prompt = build_prompt(comparison, language)?;
        let text = self
            .client
            .complete(&prompt)
            .await
            .map_err(|error| SummaryError::Delegate(error.to_string()))?;

        let text = text.trim();
        if text.is_empty() {
            return Err(SummaryError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

/// Runs a primary generator under a deadline and answers with the template
/// text whenever it fails, times out or says nothing.
pub struct FallbackSummaryGenerator {
    primary: Box<dyn SummaryGenerator>,
    fallback: TemplateSummaryGenerator,
    timeout: Duration,
}

impl FallbackSummaryGenerator {
    pub fn new(
        primary: Box<dyn SummaryGenerator>,
        fallback: TemplateSummaryGenerator,
        timeout: Duration,
    ) -> Self {
        Self { primary, fallback, timeout }
    }

    async fn try_primary(
        &self,
        comparison: &ComparisonResult,
        language: Language,
    ) -> Result<String, SummaryError> {
        let text = tokio::time::timeout(self.timeout, self.primary.generate(comparison, language))
            .await
            .map_err(|_| SummaryError::Timeout(self.timeout.as_secs()))??;

        if text.trim().is_empty() {
            return Err(SummaryError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl SummaryGenerator for FallbackSummaryGenerator {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    async fn generate(
        &self,
        comparison: &ComparisonResult,
        language: Language,
    ) -> Result<String, SummaryError> {
        match self.try_primary(comparison, language).await {
            Ok(text) => Ok(text),
            Err(error) => {
                warn!(
                    event_name = "summary.fallback",
                    generator = self.primary.name(),
                    error = %error,
                    "summary delegate failed; using template summary"
                );
                self.fallback.generate(comparison, language).await
            }
        }
    }
}

/// Selects the summary path from configuration. `llm` mode without usable
/// credentials degrades to templates.
pub fn build_summary_generator(config: &AppConfig) -> Result<Box<dyn SummaryGenerator>, SummaryError> {
    let template = TemplateSummaryGenerator::new()?;

    if config.summary.mode == SummaryMode::Template {
        return Ok(Box::new(template));
    }

    if !config.llm.has_credentials() {
        warn!(
            event_name = "summary.llm.unconfigured",
            provider = provider_name(config.llm.provider),
            "llm summary requested without credentials; using template summary"
        );
        return Ok(Box::new(template));
    }

    let client = match HttpLlmClient::from_config(&config.llm) {
        Ok(client) => client,
        Err(error) => {
            warn!(
                event_name = "summary.llm.unavailable",
                provider = provider_name(config.llm.provider),
                error = %error,
                "could not build llm client; using template summary"
            );
            return Ok(Box::new(template));
        }
    };

    info!(
        event_name = "summary.llm.selected",
        provider = provider_name(config.llm.provider),
        model = %config.llm.model,
        "llm summaries enabled"
    );

    Ok(Box::new(FallbackSummaryGenerator::new(
        Box::new(LlmSummaryGenerator::new(Arc::new(client))),
        template,
        Duration::from_secs(config.llm.timeout_secs),
    )))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use secrecy::SecretString;
    use shopwise_core::catalog::{load_catalog, CatalogSource};
    use shopwise_core::config::{AppConfig, LlmProvider, SummaryMode};
    use shopwise_core::domain::comparison::ComparisonResult;
    use shopwise_core::domain::query::parse_shopping_list;
    use shopwise_core::matching::Matcher;
    use shopwise_core::summary::{Language, SummaryGenerator, TemplateSummaryGenerator};
    use shopwise_core::PriceComparer;

    use crate::llm::LlmClient;

    use super::{build_prompt, build_summary_generator, FallbackSummaryGenerator, LlmSummaryGenerator};

    enum Behavior {
        Reply(&'static str),
        Fail,
        Hang,
    }

    struct FakeLlmClient {
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl FakeLlmClient {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self { behavior, calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl LlmClient for FakeLlmClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Reply(text) => Ok(text.to_string()),
                Behavior::Fail => Err(anyhow!("connection refused")),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok("too late".to_string())
                }
            }
        }
    }

    fn comparison() -> ComparisonResult {
        let catalog = load_catalog(&CatalogSource::Builtin).expect("builtin").catalog;
        PriceComparer::new(catalog, Matcher::default())
            .compare(&parse_shopping_list("2x milch, brot, caviar"))
    }

    fn fallback(client: Arc<FakeLlmClient>, timeout: Duration) -> FallbackSummaryGenerator {
        FallbackSummaryGenerator::new(
            Box::new(LlmSummaryGenerator::new(client)),
            TemplateSummaryGenerator::new().expect("templates"),
            timeout,
        )
    }

    fn template_text(result: &ComparisonResult) -> String {
        TemplateSummaryGenerator::new().expect("templates").render(result, Language::English).expect("render")
    }

    #[test]
    fn prompt_carries_preformatted_facts_and_language() {
        let prompt = build_prompt(&comparison(), Language::German).expect("prompt");

        assert!(prompt.contains("in German"));
        assert!(prompt.contains("\"cheapest\""));
        assert!(prompt.contains("caviar"));
        assert!(prompt.contains("Do not calculate new amounts"));
    }

    #[tokio::test]
    async fn delegate_text_is_used_when_it_answers() {
        let client = FakeLlmClient::new(Behavior::Reply("  Lidl is cheapest today.  "));
        let generator = fallback(client.clone(), Duration::from_secs(5));

        let text = generator.generate(&comparison(), Language::English).await.expect("summary");

        assert_eq!(text, "Lidl is cheapest today.");
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_delegate_falls_back_to_template() {
        let result = comparison();
        let generator = fallback(FakeLlmClient::new(Behavior::Fail), Duration::from_secs(5));

        let text = generator.generate(&result, Language::English).await.expect("summary");

        assert_eq!(text, template_text(&result));
    }

    #[tokio::test]
    async fn empty_delegate_answer_falls_back_to_template() {
        let result = comparison();
        let generator = fallback(FakeLlmClient::new(Behavior::Reply("   ")), Duration::from_secs(5));

        let text = generator.generate(&result, Language::English).await.expect("summary");

        assert_eq!(text, template_text(&result));
    }

    #[tokio::test]
    async fn slow_delegate_times_out_into_template() {
        let result = comparison();
        let generator = fallback(FakeLlmClient::new(Behavior::Hang), Duration::from_millis(50));

        let text = generator.generate(&result, Language::English).await.expect("summary");

        assert_eq!(text, template_text(&result));
    }

    #[test]
    fn template_mode_selects_template_generator() {
        let generator = build_summary_generator(&AppConfig::default()).expect("generator");

        assert_eq!(generator.name(), "template");
    }

    #[test]
    fn llm_mode_without_credentials_degrades_to_template() {
        let mut config = AppConfig::default();
        config.summary.mode = SummaryMode::Llm;
        config.llm.provider = LlmProvider::OpenAi;
        config.llm.api_key = None;

        let generator = build_summary_generator(&config).expect("generator");

        assert_eq!(generator.name(), "template");
    }

    #[test]
    fn llm_mode_with_credentials_selects_llm_generator() {
        let mut config = AppConfig::default();
        config.summary.mode = SummaryMode::Llm;
        config.llm.provider = LlmProvider::OpenAi;
        config.llm.api_key = Some(SecretString::from("sk-test".to_string()));

        let generator = build_summary_generator(&config).expect("generator");

        assert_eq!(generator.name(), "llm");
    }
}
