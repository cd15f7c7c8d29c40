use chrono::Utc;
use rust_decimal::Decimal;
use tracing::debug;

use crate::catalog::Catalog;
use crate::domain::comparison::{ComparisonLine, ComparisonResult, MatchResult, StoreTotal};

/// Builds per-store basket totals from resolved matches.
///
/// Each store known to the catalog gets a subtotal of `unit_price * quantity`
/// over the matched items it stocks. A store that stocks none of them is
/// `incomplete` and can never be the cheapest store; when every store is
/// incomplete no cheapest store is designated.
pub fn aggregate(catalog: &Catalog, matches: &[MatchResult]) -> ComparisonResult {
    let mut lines = Vec::new();
    let mut unmatched = Vec::new();

    for result in matches {
        match &result.resolved {
            Some(resolved) => lines.push(ComparisonLine {
                query: result.query.text.clone(),
                product_id: resolved.entry.id.clone(),
                product_name: resolved.entry.name.clone(),
                unit: resolved.entry.unit.clone(),
                quantity: result.query.quantity,
                score: resolved.score,
                unit_prices: catalog
                    .stores()
                    .iter()
                    .map(|store| (store.clone(), resolved.entry.price_at(store)))
                    .collect(),
            }),
            None => unmatched.push(result.query.clone()),
        }
    }

    let mut totals: Vec<StoreTotal> =
        catalog.stores().iter().map(|store| store_total(store, &lines)).collect();
    totals.sort_by(|left, right| {
        left.subtotal.cmp(&right.subtotal).then_with(|| left.store.cmp(&right.store))
    });

    let cheapest = totals.iter().find(|total| !total.incomplete).map(|total| total.store.clone());

    debug!(
        event_name = "aggregate.completed",
        matched = lines.len(),
        unmatched = unmatched.len(),
        cheapest = cheapest.as_deref().unwrap_or("none"),
        "basket totals computed"
    );

    ComparisonResult {
        currency: catalog.currency().to_string(),
        stores: catalog.stores().to_vec(),
        totals,
        cheapest,
        lines,
        unmatched,
        generated_at: Utc::now(),
    }
}

fn store_total(store: &str, lines: &[ComparisonLine]) -> StoreTotal {
    let mut subtotal = Decimal::ZERO;
    let mut stocked_count = 0;
    let mut unavailable_count = 0;

    for line in lines {
        match line.line_amount(store) {
            Some(amount) => {
                subtotal = subtotal.saturating_add(amount);
                stocked_count += 1;
            }
            None => unavailable_count += 1,
        }
    }

    StoreTotal {
        store: store.to_string(),
        subtotal,
        stocked_count,
        unavailable_count,
        incomplete: unavailable_count == lines.len(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use crate::catalog::Catalog;
    use crate::domain::comparison::MatchResult;
    use crate::domain::product::{ProductEntry, ProductId};
    use crate::domain::query::QueryItem;
    use crate::matching::{Matcher, MatcherConfig};

    use super::aggregate;

    fn entry(id: &str, name: &str, aliases: &[&str], prices: &[(&str, Option<i64>)]) -> ProductEntry {
        ProductEntry {
            id: ProductId(id.to_string()),
            name: name.to_string(),
            unit: None,
            aliases: aliases.iter().map(|alias| alias.to_string()).collect(),
            prices: prices
                .iter()
                .map(|(store, cents)| (store.to_string(), cents.map(|cents| Decimal::new(cents, 2))))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn milk_catalog() -> Catalog {
        Catalog::new(vec![entry(
            "1",
            "milk",
            &["milk", "Milch"],
            &[("A", Some(109)), ("B", Some(119)), ("C", None)],
        )])
        .expect("catalog")
    }

    fn basket_catalog() -> Catalog {
        Catalog::new(vec![
            entry("milk", "milch", &["milk"], &[("aldi", Some(109)), ("lidl", Some(99)), ("netto", None)]),
            entry("bread", "brot", &["bread"], &[("aldi", Some(129)), ("lidl", Some(139)), ("netto", Some(119))]),
            entry("eggs", "eier", &["eggs"], &[("aldi", Some(225)), ("lidl", None), ("netto", Some(219))]),
        ])
        .expect("catalog")
    }

    fn resolve(catalog: &Catalog, items: &[QueryItem]) -> Vec<MatchResult> {
        Matcher::new(MatcherConfig::default()).match_all(catalog, items)
    }

    #[test]
    fn milk_scenario_picks_store_a() {
        let catalog = milk_catalog();
        let matches = resolve(
            &catalog,
            &[QueryItem::with_quantity("milch", 2), QueryItem::with_quantity("milkk", 1)],
        );
        assert!(matches.iter().all(|m| m.product_id().map(|id| id.0.as_str()) == Some("1")));

        let result = aggregate(&catalog, &matches);

        let a = result.total_for("A").expect("store A");
        let b = result.total_for("B").expect("store B");
        let c = result.total_for("C").expect("store C");
        assert_eq!(a.subtotal, Decimal::new(327, 2));
        assert_eq!(b.subtotal, Decimal::new(357, 2));
        assert_eq!(c.subtotal, Decimal::ZERO);
        assert!(c.incomplete);
        assert_eq!(c.unavailable_count, 2);
        assert!(!a.incomplete && !b.incomplete);
        assert_eq!(result.cheapest.as_deref(), Some("A"));
    }

    #[test]
    fn incomplete_store_is_ranked_but_never_cheapest() {
        let catalog = milk_catalog();
        let matches = resolve(&catalog, &[QueryItem::new("milch")]);

        let result = aggregate(&catalog, &matches);

        let ranked: Vec<&str> = result.totals.iter().map(|t| t.store.as_str()).collect();
        assert_eq!(ranked, vec!["C", "A", "B"]);
        assert_eq!(result.cheapest.as_deref(), Some("A"));
    }

    #[test]
    fn empty_query_list_marks_every_store_incomplete() {
        let catalog = basket_catalog();

        let result = aggregate(&catalog, &[]);

        assert_eq!(result.totals.len(), 3);
        assert!(result.totals.iter().all(|t| t.incomplete && t.subtotal == Decimal::ZERO));
        assert!(result.cheapest.is_none());
        assert!(result.is_empty_comparison());
        let ranked: Vec<&str> = result.totals.iter().map(|t| t.store.as_str()).collect();
        assert_eq!(ranked, vec!["aldi", "lidl", "netto"]);
    }

    #[test]
    fn unmatched_items_are_reported_and_excluded_from_totals() {
        let catalog = basket_catalog();
        let matches = resolve(
            &catalog,
            &[QueryItem::new("caviar"), QueryItem::new("milk"), QueryItem::new("truffles")],
        );

        let result = aggregate(&catalog, &matches);

        let unmatched: Vec<&str> = result.unmatched.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(unmatched, vec!["caviar", "truffles"]);
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.total_for("lidl").map(|t| t.subtotal), Some(Decimal::new(99, 2)));
        assert_eq!(result.cheapest.as_deref(), Some("lidl"));
    }

    #[test]
    fn all_unmatched_is_an_empty_comparison() {
        let catalog = basket_catalog();
        let matches = resolve(&catalog, &[QueryItem::new("caviar")]);

        let result = aggregate(&catalog, &matches);

        assert!(result.cheapest.is_none());
        assert!(result.totals.iter().all(|t| t.incomplete));
        assert_eq!(result.unmatched.len(), 1);
    }

    #[test]
    fn totals_do_not_depend_on_input_order() {
        let catalog = basket_catalog();
        let items = vec![
            QueryItem::with_quantity("milk", 3),
            QueryItem::with_quantity("bread", 2),
            QueryItem::new("eggs"),
            QueryItem::new("caviar"),
        ];
        let mut reversed = items.clone();
        reversed.reverse();
        let mut rotated = items.clone();
        rotated.rotate_left(2);

        let baseline = aggregate(&catalog, &resolve(&catalog, &items));
        for permutation in [reversed, rotated] {
            let result = aggregate(&catalog, &resolve(&catalog, &permutation));
            assert_eq!(result.totals, baseline.totals);
            assert_eq!(result.cheapest, baseline.cheapest);
        }
    }

    #[test]
    fn partially_stocked_stores_count_unavailable_items() {
        let catalog = basket_catalog();
        let matches =
            resolve(&catalog, &[QueryItem::new("milk"), QueryItem::new("bread"), QueryItem::new("eggs")]);

        let result = aggregate(&catalog, &matches);

        let lidl = result.total_for("lidl").expect("lidl");
        assert_eq!(lidl.subtotal, Decimal::new(238, 2));
        assert_eq!((lidl.stocked_count, lidl.unavailable_count), (2, 1));
        let netto = result.total_for("netto").expect("netto");
        assert_eq!(netto.subtotal, Decimal::new(338, 2));
        assert!(!netto.incomplete);
        assert_eq!(result.cheapest.as_deref(), Some("lidl"));
    }

    #[test]
    fn oversized_prices_saturate_instead_of_overflowing() {
        let mut huge = entry("milk", "milk", &["milch"], &[("A", Some(100)), ("B", Some(200))]);
        huge.prices.insert("A".to_string(), Some(Decimal::MAX));
        let catalog = Catalog::new(vec![
            huge,
            entry("bread", "bread", &["brot"], &[("A", Some(100)), ("B", Some(200))]),
        ])
        .expect("catalog");

        let result = aggregate(
            &catalog,
            &resolve(&catalog, &[QueryItem::with_quantity("milk", 2), QueryItem::new("bread")]),
        );

        assert_eq!(result.total_for("A").map(|t| t.subtotal), Some(Decimal::MAX));
        assert_eq!(result.total_for("B").map(|t| t.subtotal), Some(Decimal::new(600, 2)));
        assert_eq!(result.cheapest.as_deref(), Some("B"));
    }

    #[test]
    fn exact_ties_are_ordered_by_store_name() {
        let catalog = Catalog::new(vec![entry(
            "salt",
            "salz",
            &["salt"],
            &[("lidl", Some(39)), ("aldi", Some(39)), ("kaufland", Some(35))],
        )])
        .expect("catalog");

        let result = aggregate(&catalog, &resolve(&catalog, &[QueryItem::new("salz")]));

        let ranked: Vec<&str> = result.totals.iter().map(|t| t.store.as_str()).collect();
        assert_eq!(ranked, vec!["kaufland", "aldi", "lidl"]);
        assert_eq!(result.cheapest.as_deref(), Some("kaufland"));
    }
}
