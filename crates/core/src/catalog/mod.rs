pub mod loader;

use std::collections::{BTreeSet, HashSet};

use thiserror::Error;

use crate::domain::product::{ProductEntry, ProductId};

pub use loader::{
    load_catalog, merge_catalogs, parse_catalog, CatalogSource, CatalogWarning, LoadedCatalog,
};

pub const DEFAULT_CURRENCY: &str = "EUR";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file `{path}`: {source}")]
    ReadFile { path: std::path::PathBuf, source: std::io::Error },
    #[error("could not parse catalog `{origin}`: {source}")]
    Parse { origin: String, source: serde_json::Error },
    #[error("catalog `{origin}` has no `products` list")]
    MissingProducts { origin: String },
    #[error("catalog `{origin}` contains no usable products ({skipped} records skipped)")]
    Empty { origin: String, skipped: usize },
    #[error("duplicate product identifier `{0}`")]
    DuplicateProductId(ProductId),
}

/// Immutable product catalog. Products keep their insertion order, which
/// is the final tie-breaker when matching.
#[derive(Clone, Debug)]
pub struct Catalog {
    products: Vec<ProductEntry>,
    stores: Vec<String>,
    currency: String,
}

impl Catalog {
    pub fn new(products: Vec<ProductEntry>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for product in &products {
            if !seen.insert(&product.id) {
                return Err(CatalogError::DuplicateProductId(product.id.clone()));
            }
        }

        let stores = products
            .iter()
            .flat_map(|product| product.prices.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Ok(Self { products, stores, currency: DEFAULT_CURRENCY.to_string() })
    }

    /// Declares stores that may not appear in any price map, e.g. a
    /// retailer whose prices have not been collected yet.
    pub fn with_stores(mut self, stores: impl IntoIterator<Item = String>) -> Self {
        let mut all: BTreeSet<String> = self.stores.into_iter().collect();
        all.extend(stores.into_iter().map(|store| store.trim().to_string()).filter(|s| !s.is_empty()));
        self.stores = all.into_iter().collect();
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn products(&self) -> &[ProductEntry] {
        &self.products
    }

    pub fn stores(&self) -> &[String] {
        &self.stores
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn find(&self, product_id: &ProductId) -> Option<&ProductEntry> {
        self.products.iter().find(|product| &product.id == product_id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
