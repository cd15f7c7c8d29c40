pub mod normalize;
pub mod similarity;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::Catalog;
use crate::domain::comparison::{MatchResult, ResolvedMatch};
use crate::domain::product::ProductEntry;
use crate::domain::query::QueryItem;

pub use normalize::normalize;
pub use similarity::Scorer;

pub const DEFAULT_THRESHOLD: f64 = 0.6;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Minimum score, inclusive, for a match to be accepted.
    pub threshold: f64,
    pub scorer: Scorer,
    pub strip_diacritics: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self { threshold: DEFAULT_THRESHOLD, scorer: Scorer::Ratio, strip_diacritics: true }
    }
}

impl MatcherConfig {
    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold, ..Self::default() }
    }
}

/// Highest scoring catalog spelling for a query, regardless of threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate<'a> {
    pub entry: &'a ProductEntry,
    pub alias: &'a str,
    pub score: f64,
    alias_len: usize,
}

/// Resolves free-text queries against a catalog.
///
/// Every spelling of every product is scored. The winner has the highest
/// score; equal scores go to the shorter normalized spelling, then to the
/// product that comes first in the catalog.
#[derive(Clone, Debug, Default)]
pub struct Matcher {
    config: MatcherConfig,
}

impl Matcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn best_candidate<'a>(&self, catalog: &'a Catalog, text: &str) -> Option<Candidate<'a>> {
        let query = normalize(text, self.config.strip_diacritics);
        if query.is_empty() {
            return None;
        }

        let mut best: Option<Candidate<'a>> = None;
        for entry in catalog.products() {
            for alias in entry.spellings() {
                let spelling = normalize(alias, self.config.strip_diacritics);
                if spelling.is_empty() {
                    continue;
                }

                let score = self.config.scorer.score(&query, &spelling);
                let alias_len = spelling.chars().count();
                let better = match &best {
                    None => true,
                    Some(current) => {
                        score > current.score
                            || (score == current.score && alias_len < current.alias_len)
                    }
                };
                if better {
                    best = Some(Candidate { entry, alias, score, alias_len });
                }
            }
        }

        best
    }

    pub fn match_item(&self, catalog: &Catalog, query: &QueryItem) -> MatchResult {
        let candidate = self
            .best_candidate(catalog, &query.text)
            .filter(|candidate| candidate.score >= self.config.threshold);

        match candidate {
            Some(candidate) => {
                debug!(
                    event_name = "matching.resolved",
                    query = %query.text,
                    product_id = %candidate.entry.id,
                    alias = candidate.alias,
                    score = candidate.score,
                    "query resolved"
                );
                MatchResult {
                    query: query.clone(),
                    resolved: Some(ResolvedMatch {
                        entry: candidate.entry.clone(),
                        score: candidate.score,
                        alias: candidate.alias.to_string(),
                    }),
                }
            }
            None => {
                debug!(
                    event_name = "matching.unmatched",
                    query = %query.text,
                    threshold = self.config.threshold,
                    "query left unmatched"
                );
                MatchResult::unmatched(query.clone())
            }
        }
    }

    pub fn match_all(&self, catalog: &Catalog, items: &[QueryItem]) -> Vec<MatchResult> {
        items.iter().map(|item| self.match_item(catalog, item)).collect()
    }
}

/// Matches a single query with the default scorer and normalization.
pub fn match_query(query: &str, catalog: &Catalog, threshold: f64) -> MatchResult {
    Matcher::new(MatcherConfig::with_threshold(threshold)).match_item(catalog, &QueryItem::new(query))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use crate::catalog::{load_catalog, Catalog, CatalogSource};
    use crate::domain::product::{ProductEntry, ProductId};
    use crate::domain::query::QueryItem;

    use super::{match_query, Matcher, MatcherConfig, Scorer, DEFAULT_THRESHOLD};

    fn product(id: &str, name: &str, aliases: &[&str]) -> ProductEntry {
        ProductEntry {
            id: ProductId(id.to_string()),
            name: name.to_string(),
            unit: None,
            aliases: aliases.iter().map(|alias| alias.to_string()).collect(),
            prices: BTreeMap::from([("A".to_string(), Some(Decimal::ONE))]),
        }
    }

    fn milk_catalog() -> Catalog {
        Catalog::new(vec![product("1", "milk", &["milk", "Milch"])]).expect("catalog")
    }

    fn staples() -> Catalog {
        load_catalog(&CatalogSource::Builtin).expect("builtin catalog").catalog
    }

    #[test]
    fn exact_alias_scores_one_after_normalization() {
        let catalog = milk_catalog();

        for query in ["milch", "MILCH", "  Milch ", "milk"] {
            let result = match_query(query, &catalog, DEFAULT_THRESHOLD);
            assert_eq!(result.score(), Some(1.0), "query {query:?}");
            assert_eq!(result.product_id().map(|id| id.0.as_str()), Some("1"));
        }
    }

    #[test]
    fn misspelled_query_resolves_above_default_threshold() {
        let result = match_query("milkk", &milk_catalog(), DEFAULT_THRESHOLD);

        let score = result.score().expect("milkk should match");
        assert!(score >= DEFAULT_THRESHOLD && score < 1.0);
        assert_eq!(result.resolved.as_ref().map(|r| r.alias.as_str()), Some("milk"));
    }

    #[test]
    fn single_character_typos_resolve_in_the_staples_catalog() {
        let catalog = staples();
        let cases = [
            ("schokolate", "chocolate"),
            ("kartofeln", "potatoes"),
            ("toilettenpapir", "toilet-paper"),
            ("waschmittle", "detergent"),
            ("nutela", "nutella"),
            ("kaffe", "coffee"),
            ("bananne", "bananas"),
        ];

        for (query, expected) in cases {
            let result = match_query(query, &catalog, DEFAULT_THRESHOLD);
            assert_eq!(
                result.product_id().map(|id| id.0.as_str()),
                Some(expected),
                "query {query:?}"
            );
        }
    }

    #[test]
    fn german_and_english_spellings_resolve_to_the_same_product() {
        let catalog = staples();

        for query in ["Äpfel", "apfel", "apples", "aepfel"] {
            let result = match_query(query, &catalog, DEFAULT_THRESHOLD);
            assert_eq!(result.product_id().map(|id| id.0.as_str()), Some("apples"), "{query:?}");
        }
    }

    #[test]
    fn empty_query_is_unmatched() {
        let catalog = milk_catalog();

        assert!(!match_query("", &catalog, 0.0).is_matched());
        assert!(!match_query("   ", &catalog, 0.0).is_matched());
    }

    #[test]
    fn threshold_is_inclusive_at_the_boundary() {
        let catalog = milk_catalog();
        // "milkk" vs "milk": 2 * 4 / 9
        let exact = 8.0 / 9.0;

        assert!(match_query("milkk", &catalog, exact).is_matched());
        assert!(!match_query("milkk", &catalog, exact + 1e-9).is_matched());
    }

    #[test]
    fn unrelated_text_stays_unmatched() {
        let catalog = staples();

        assert!(!match_query("qwertz", &catalog, DEFAULT_THRESHOLD).is_matched());
        assert!(!match_query("xyz", &catalog, DEFAULT_THRESHOLD).is_matched());
    }

    #[test]
    fn equal_scores_prefer_the_shorter_spelling() {
        // "abcdef" scores 2/3 against both: 2*3/(6+3) and 2*4/(6+6).
        let catalog = Catalog::new(vec![
            product("long", "abcdzz", &[]),
            product("short", "abc", &[]),
        ])
        .expect("catalog");

        let result = match_query("abcdef", &catalog, 0.5);

        assert_eq!(result.product_id().map(|id| id.0.as_str()), Some("short"));
    }

    #[test]
    fn equal_scores_and_lengths_prefer_catalog_order() {
        let catalog = Catalog::new(vec![
            product("first", "brot", &[]),
            product("second", "brot", &["bread"]),
        ])
        .expect("catalog");

        let result = match_query("brot", &catalog, DEFAULT_THRESHOLD);

        assert_eq!(result.product_id().map(|id| id.0.as_str()), Some("first"));
    }

    #[test]
    fn alternative_scorers_still_honor_exact_matches() {
        let catalog = staples();

        for scorer in [Scorer::JaroWinkler, Scorer::Levenshtein] {
            let matcher = Matcher::new(MatcherConfig { scorer, ..MatcherConfig::default() });
            let result = matcher.match_item(&catalog, &QueryItem::new("Zucker"));
            assert_eq!(result.product_id().map(|id| id.0.as_str()), Some("sugar"));
            assert_eq!(result.score(), Some(1.0));
        }
    }

    #[test]
    fn match_all_keeps_input_order_and_quantities() {
        let catalog = milk_catalog();
        let matcher = Matcher::default();

        let results = matcher.match_all(
            &catalog,
            &[QueryItem::with_quantity("milch", 2), QueryItem::new("caviar")],
        );

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].query.quantity, 2);
        assert!(results[0].is_matched());
        assert!(!results[1].is_matched());
    }
}
