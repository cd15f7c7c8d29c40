use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::{ProductEntry, ProductId};
use crate::domain::query::QueryItem;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMatch {
    pub entry: ProductEntry,
    /// Confidence in `[0, 1]`.
    pub score: f64,
    /// Catalog spelling that produced the score.
    pub alias: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub query: QueryItem,
    pub resolved: Option<ResolvedMatch>,
}

impl MatchResult {
    pub fn unmatched(query: QueryItem) -> Self {
        Self { query, resolved: None }
    }

    pub fn is_matched(&self) -> bool {
        self.resolved.is_some()
    }

    pub fn score(&self) -> Option<f64> {
        self.resolved.as_ref().map(|resolved| resolved.score)
    }

    pub fn product_id(&self) -> Option<&ProductId> {
        self.resolved.as_ref().map(|resolved| &resolved.entry.id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTotal {
    pub store: String,
    pub subtotal: Decimal,
    pub stocked_count: usize,
    pub unavailable_count: usize,
    /// No requested item has a known price at this store.
    pub incomplete: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonLine {
    pub query: String,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit: Option<String>,
    pub quantity: u32,
    pub score: f64,
    pub unit_prices: BTreeMap<String, Option<Decimal>>,
}

impl ComparisonLine {
    /// Saturates at `Decimal::MAX`; loaded catalogs cap unit prices well below that.
    pub fn line_amount(&self, store: &str) -> Option<Decimal> {
        self.unit_prices
            .get(store)
            .copied()
            .flatten()
            .map(|unit_price| unit_price.saturating_mul(Decimal::from(self.quantity)))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub currency: String,
    /// Every store known to the catalog, alphabetical.
    pub stores: Vec<String>,
    /// Ascending by subtotal, ties by store name.
    pub totals: Vec<StoreTotal>,
    pub cheapest: Option<String>,
    pub lines: Vec<ComparisonLine>,
    pub unmatched: Vec<QueryItem>,
    pub generated_at: DateTime<Utc>,
}

impl ComparisonResult {
    pub fn total_for(&self, store: &str) -> Option<&StoreTotal> {
        self.totals.iter().find(|total| total.store == store)
    }

    pub fn cheapest_total(&self) -> Option<&StoreTotal> {
        self.cheapest.as_deref().and_then(|store| self.total_for(store))
    }

    /// True when no store stocks any requested item.
    pub fn is_empty_comparison(&self) -> bool {
        self.cheapest.is_none()
    }

    pub fn matched_count(&self) -> usize {
        self.lines.len()
    }
}
