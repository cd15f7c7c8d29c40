//! Human-readable explanations of a comparison.
//!
//! [`SummaryGenerator`] is the seam between the deterministic comparison
//! and whatever phrases it. The template generator in this crate is always
//! available; delegated generators live in `shopwise-agent` and fall back to
//! it.

pub mod template;

use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::comparison::{ComparisonResult, StoreTotal};

pub use template::TemplateSummaryGenerator;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "de")]
    German,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::German => "de",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::German => "German",
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::English),
            "de" | "german" | "deutsch" => Ok(Self::German),
            other => Err(format!("unsupported language `{other}` (expected en|de)")),
        }
    }
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("summary template error: {0}")]
    Template(String),
    #[error("summary delegate failed: {0}")]
    Delegate(String),
    #[error("summary delegate timed out after {0}s")]
    Timeout(u64),
    #[error("summary delegate returned an empty response")]
    EmptyResponse,
}

#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(
        &self,
        comparison: &ComparisonResult,
        language: Language,
    ) -> Result<String, SummaryError>;
}

/// Formats an amount to the currency's minor unit, rounding half away from
/// zero.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Capitalizes a store key for display: `kaufland` → `Kaufland`.
pub fn display_store(store: &str) -> String {
    let mut chars = store.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StoreFact {
    pub store: String,
    pub subtotal: String,
    pub stocked: usize,
    pub missing: usize,
    pub incomplete: bool,
}

impl StoreFact {
    fn from_total(total: &StoreTotal) -> Self {
        Self {
            store: display_store(&total.store),
            subtotal: format_amount(total.subtotal),
            stocked: total.stocked_count,
            missing: total.unavailable_count,
            incomplete: total.incomplete,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LineFact {
    pub query: String,
    pub product: String,
    pub quantity: u32,
}

/// Pre-formatted facts every summary is phrased from. Amounts are already
/// strings so that no generator does its own arithmetic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SummaryFacts {
    pub currency: String,
    pub empty: bool,
    pub matched_count: usize,
    pub requested_count: usize,
    pub cheapest: Option<StoreFact>,
    pub most_expensive: Option<StoreFact>,
    pub savings: Option<String>,
    pub stores: Vec<StoreFact>,
    pub partial_stores: Vec<StoreFact>,
    pub incomplete_stores: Vec<String>,
    pub lines: Vec<LineFact>,
    pub unmatched: Vec<String>,
}

impl SummaryFacts {
    pub fn from_comparison(comparison: &ComparisonResult) -> Self {
        let cheapest = comparison.cheapest_total();
        // Savings only compare baskets holding the same number of items.
        let most_expensive = cheapest.and_then(|cheapest| {
            comparison.totals.iter().rev().find(|total| {
                !total.incomplete
                    && total.stocked_count == cheapest.stocked_count
                    && total.store != cheapest.store
                    && total.subtotal > cheapest.subtotal
            })
        });
        let savings = match (cheapest, most_expensive) {
            (Some(cheapest), Some(most_expensive)) => {
                Some(format_amount(most_expensive.subtotal - cheapest.subtotal))
            }
            _ => None,
        };

        Self {
            currency: comparison.currency.clone(),
            empty: comparison.is_empty_comparison(),
            matched_count: comparison.matched_count(),
            requested_count: comparison.matched_count() + comparison.unmatched.len(),
            cheapest: cheapest.map(StoreFact::from_total),
            most_expensive: most_expensive.map(StoreFact::from_total),
            savings,
            stores: comparison.totals.iter().map(StoreFact::from_total).collect(),
            partial_stores: comparison
                .totals
                .iter()
                .filter(|total| !total.incomplete && total.unavailable_count > 0)
                .map(StoreFact::from_total)
                .collect(),
            incomplete_stores: comparison
                .totals
                .iter()
                .filter(|total| total.incomplete)
                .map(|total| display_store(&total.store))
                .collect(),
            lines: comparison
                .lines
                .iter()
                .map(|line| LineFact {
                    query: line.query.clone(),
                    product: line.product_name.clone(),
                    quantity: line.quantity,
                })
                .collect(),
            unmatched: comparison.unmatched.iter().map(|item| item.text.clone()).collect(),
        }
    }
}
