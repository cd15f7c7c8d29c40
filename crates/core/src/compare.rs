use crate::aggregate::aggregate;
use crate::catalog::{
    load_catalog, merge_catalogs, Catalog, CatalogError, CatalogSource, LoadedCatalog,
};
use crate::config::{AppConfig, CatalogConfig};
use crate::domain::comparison::{ComparisonResult, MatchResult};
use crate::domain::query::QueryItem;
use crate::matching::Matcher;

/// Loads the configured catalog, followed by the built-in staples when
/// `extend_builtin` is set. The configured currency applies when the
/// document does not declare one.
pub fn open_catalog(config: &CatalogConfig) -> Result<LoadedCatalog, CatalogError> {
    let source = CatalogSource::from_path(config.path.clone());
    let mut loaded = load_catalog(&source)?;
    if config.extend_builtin && source != CatalogSource::Builtin {
        loaded = merge_catalogs(loaded, load_catalog(&CatalogSource::Builtin)?)?;
    }
    if !loaded.currency_declared {
        loaded.catalog = loaded.catalog.with_currency(config.currency.trim());
    }
    Ok(loaded)
}

/// A loaded catalog paired with the matcher configured for it.
#[derive(Clone, Debug)]
pub struct PriceComparer {
    catalog: Catalog,
    matcher: Matcher,
}

impl PriceComparer {
    pub fn new(catalog: Catalog, matcher: Matcher) -> Self {
        Self { catalog, matcher }
    }

    pub fn from_config(config: &AppConfig) -> Result<(Self, LoadedCatalog), CatalogError> {
        let loaded = open_catalog(&config.catalog)?;
        let comparer = Self::new(loaded.catalog.clone(), Matcher::new(config.matcher_config()));
        Ok((comparer, loaded))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn resolve(&self, items: &[QueryItem]) -> Vec<MatchResult> {
        self.matcher.match_all(&self.catalog, items)
    }

    pub fn compare(&self, items: &[QueryItem]) -> ComparisonResult {
        aggregate(&self.catalog, &self.resolve(items))
    }
}
