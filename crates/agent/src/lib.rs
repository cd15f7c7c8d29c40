//! Delegated summaries.
//!
//! This crate phrases a finished price comparison through a language model:
//! - `llm` - the `LlmClient` seam and an HTTP client for OpenAI, Anthropic and Ollama
//! - `summary` - the LLM-backed `SummaryGenerator`, the template fallback wrapper,
//!   and selection from configuration
//!
//! The model is strictly a phraser. Totals, rankings and the cheapest store
//! come from `shopwise-core`; the prompt hands them over pre-formatted.

pub mod llm;
pub mod summary;

pub use llm::{HttpLlmClient, LlmClient, LlmError};
pub use summary::{build_summary_generator, FallbackSummaryGenerator, LlmSummaryGenerator};
