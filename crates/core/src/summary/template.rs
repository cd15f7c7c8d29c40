use async_trait::async_trait;
use tera::{Context, Tera};

use crate::domain::comparison::ComparisonResult;
use crate::summary::{Language, SummaryError, SummaryFacts, SummaryGenerator};

const ENGLISH_TEMPLATE: &str = "summary_en.txt";
const GERMAN_TEMPLATE: &str = "summary_de.txt";

/// Deterministic summaries rendered from embedded Tera templates.
#[derive(Clone, Debug)]
pub struct TemplateSummaryGenerator {
    tera: Tera,
}

impl TemplateSummaryGenerator {
    pub fn new() -> Result<Self, SummaryError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (ENGLISH_TEMPLATE, include_str!("../../templates/summary_en.txt.tera")),
            (GERMAN_TEMPLATE, include_str!("../../templates/summary_de.txt.tera")),
        ])
        .map_err(|error| SummaryError::Template(error.to_string()))?;

        Ok(Self { tera })
    }

    pub fn render(
        &self,
        comparison: &ComparisonResult,
        language: Language,
    ) -> Result<String, SummaryError> {
        let facts = SummaryFacts::from_comparison(comparison);
        let context = Context::from_serialize(&facts)
            .map_err(|error| SummaryError::Template(error.to_string()))?;

        let template = match language {
            Language::English => ENGLISH_TEMPLATE,
            Language::German => GERMAN_TEMPLATE,
        };
        let rendered = self
            .tera
            .render(template, &context)
            .map_err(|error| SummaryError::Template(error.to_string()))?;

        Ok(rendered.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

#[async_trait]
impl SummaryGenerator for TemplateSummaryGenerator {
    fn name(&self) -> &'static str {
        "template"
    }

    async fn generate(
        &self,
        comparison: &ComparisonResult,
        language: Language,
    ) -> Result<String, SummaryError> {
        self.render(comparison, language)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use crate::aggregate::aggregate;
    use crate::catalog::Catalog;
    use crate::domain::comparison::ComparisonResult;
    use crate::domain::product::{ProductEntry, ProductId};
    use crate::domain::query::QueryItem;
    use crate::matching::Matcher;
    use crate::summary::{Language, SummaryGenerator};

    use super::TemplateSummaryGenerator;

    fn comparison(items: &[QueryItem]) -> ComparisonResult {
        let catalog = Catalog::new(vec![
            ProductEntry {
                id: ProductId("milk".to_string()),
                name: "milch 1l".to_string(),
                unit: Some("1 l".to_string()),
                aliases: vec!["milch".to_string(), "milk".to_string()],
                prices: BTreeMap::from([
                    ("aldi".to_string(), Some(Decimal::new(109, 2))),
                    ("lidl".to_string(), Some(Decimal::new(99, 2))),
                    ("netto".to_string(), None),
                ]),
            },
            ProductEntry {
                id: ProductId("bread".to_string()),
                name: "brot".to_string(),
                unit: None,
                aliases: vec!["bread".to_string()],
                prices: BTreeMap::from([
                    ("aldi".to_string(), Some(Decimal::new(129, 2))),
                    ("lidl".to_string(), None),
                    ("netto".to_string(), None),
                ]),
            },
        ])
        .expect("catalog");

        aggregate(&catalog, &Matcher::default().match_all(&catalog, items))
    }

    #[test]
    fn english_summary_names_cheapest_store_savings_and_gaps() {
        let generator = TemplateSummaryGenerator::new().expect("templates should compile");
        let result = comparison(&[
            QueryItem::with_quantity("milch", 2),
            QueryItem::new("brot"),
            QueryItem::new("caviar"),
        ]);

        let summary = generator.render(&result, Language::English).expect("render");

        assert!(
            summary.starts_with("Cheapest overall: Lidl with 1.98 EUR (based on 1 of 2 matched items)."),
            "{summary}"
        );
        assert!(!summary.contains("less than"), "Aldi prices a larger basket: {summary}");
        assert!(summary.contains("Lidl is missing 1 of the matched items."), "{summary}");
        assert!(summary.contains("No matching items at: Netto."), "{summary}");
        assert!(summary.contains("Not found in the catalog: caviar."), "{summary}");
    }

    #[test]
    fn savings_compare_stores_with_the_same_basket() {
        let generator = TemplateSummaryGenerator::new().expect("templates should compile");
        let result = comparison(&[QueryItem::with_quantity("milch", 3)]);

        let summary = generator.render(&result, Language::English).expect("render");

        assert!(summary.contains("That is 0.30 EUR less than Aldi."), "{summary}");
    }

    #[test]
    fn german_summary_uses_german_copy() {
        let generator = TemplateSummaryGenerator::new().expect("templates should compile");
        let result = comparison(&[QueryItem::new("milk")]);

        let summary = generator.render(&result, Language::German).expect("render");

        assert!(summary.starts_with("Am günstigsten insgesamt: Lidl mit 0.99 EUR"), "{summary}");
        assert!(summary.contains("weniger als bei Aldi"), "{summary}");
        assert!(summary.contains("Keine passenden Artikel bei: Netto."), "{summary}");
    }

    #[test]
    fn empty_comparison_has_dedicated_copy() {
        let generator = TemplateSummaryGenerator::new().expect("templates should compile");
        let result = comparison(&[QueryItem::new("caviar")]);

        let english = generator.render(&result, Language::English).expect("render");
        let german = generator.render(&result, Language::German).expect("render");

        assert_eq!(
            english,
            "No item on your list could be priced at any store. Not found in the catalog: caviar."
        );
        assert!(german.starts_with("Kein Artikel Ihrer Liste"), "{german}");
    }

    #[tokio::test]
    async fn trait_generate_matches_render() {
        let generator = TemplateSummaryGenerator::new().expect("templates should compile");
        let result = comparison(&[QueryItem::new("milch")]);

        let generated = generator.generate(&result, Language::English).await.expect("generate");

        assert_eq!(generated, generator.render(&result, Language::English).expect("render"));
        assert_eq!(generator.name(), "template");
    }
}
