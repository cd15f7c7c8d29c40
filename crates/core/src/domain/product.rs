use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A catalog product with its spelling variants and per-store unit prices.
///
/// `prices` maps a store name to its unit price; `None` means the store is
/// known to not stock the product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductEntry {
    pub id: ProductId,
    pub name: String,
    pub unit: Option<String>,
    pub aliases: Vec<String>,
    pub prices: BTreeMap<String, Option<Decimal>>,
}

impl ProductEntry {
    pub fn price_at(&self, store: &str) -> Option<Decimal> {
        self.prices.get(store).copied().flatten()
    }

    /// Canonical name followed by every alias, without duplicates.
    pub fn spellings(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(
            self.aliases
                .iter()
                .map(String::as_str)
                .filter(move |alias| *alias != self.name.as_str()),
        )
    }
}

/// Largest unit price a catalog may carry. Keeps `unit_price * quantity`
/// and basket subtotals well inside `Decimal`'s range.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Parses a shelf price as it appears in scraped or hand-written data:
/// `1.09`, `"1,09"`, `"1,09 €"`, `"€ 2.49"`.
pub fn parse_price(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .replace('€', "")
        .replace("EUR", "")
        .trim()
        .chars()
        .map(|ch| if ch == ',' { '.' } else { ch })
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    cleaned
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
        .filter(|price| !price.is_sign_negative())
}
