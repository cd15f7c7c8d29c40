//! Catalog loading.
//!
//! A catalog document is JSON:
//!
//! ```json
//! {
//!   "currency": "EUR",
//!   "stores": ["aldi", "kaufland", "lidl"],
//!   "products": [
//!     { "id": "milk", "name": "milch 1l", "unit": "1 l",
//!       "aliases": ["milk", "milch"],
//!       "prices": { "aldi": 1.09, "lidl": "0,99 €", "kaufland": null } }
//!   ]
//! }
//! ```
//!
//! A bare top-level array of products is accepted too. Records that cannot
//! be used are skipped and reported as [`CatalogWarning`]s; the load only
//! fails when the document itself is unreadable or nothing usable remains.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::catalog::{Catalog, CatalogError};
use crate::domain::product::{parse_price, ProductEntry, ProductId, MAX_UNIT_PRICE};

const BUILTIN_CATALOG: &str = include_str!("../../data/staples.json");
const BUILTIN_ORIGIN: &str = "builtin:staples";

const NAME_KEYS: [&str; 3] = ["name", "product_name", "title"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogSource {
    Builtin,
    File(PathBuf),
}

impl CatalogSource {
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map(Self::File).unwrap_or(Self::Builtin)
    }

    pub fn origin(&self) -> String {
        match self {
            Self::Builtin => BUILTIN_ORIGIN.to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CatalogWarning {
    /// Position of the record in the `products` list.
    pub index: usize,
    pub product_id: Option<String>,
    pub reason: String,
}

#[derive(Clone, Debug)]
pub struct LoadedCatalog {
    pub catalog: Catalog,
    pub origin: String,
    pub warnings: Vec<CatalogWarning>,
    /// Whether the document named its own currency.
    pub currency_declared: bool,
}

pub fn load_catalog(source: &CatalogSource) -> Result<LoadedCatalog, CatalogError> {
    match source {
        CatalogSource::Builtin => parse_catalog(BUILTIN_CATALOG, BUILTIN_ORIGIN),
        CatalogSource::File(path) => {
            let raw = read_file(path)?;
            parse_catalog(&raw, &path.display().to_string())
        }
    }
}

/// Appends `fallback`'s products after `primary`'s. A fallback product whose
/// identifier `primary` already uses is skipped with a warning. Currency and
/// its declaration follow `primary`.
pub fn merge_catalogs(
    primary: LoadedCatalog,
    fallback: LoadedCatalog,
) -> Result<LoadedCatalog, CatalogError> {
    let mut products = primary.catalog.products().to_vec();
    let mut seen: HashSet<ProductId> = products.iter().map(|product| product.id.clone()).collect();
    let mut warnings = primary.warnings;
    warnings.extend(fallback.warnings);

    for (index, product) in fallback.catalog.products().iter().enumerate() {
        if !seen.insert(product.id.clone()) {
            warn!(
                event_name = "catalog.record.shadowed",
                origin = %fallback.origin,
                product_id = %product.id,
                "catalog product shadowed by an earlier catalog"
            );
            warnings.push(CatalogWarning {
                index,
                product_id: Some(product.id.0.clone()),
                reason: format!("duplicate identifier, `{}` takes precedence", primary.origin),
            });
            continue;
        }
        products.push(product.clone());
    }

    let stores: Vec<String> = primary
        .catalog
        .stores()
        .iter()
        .chain(fallback.catalog.stores())
        .cloned()
        .collect();
    let catalog = Catalog::new(products)?
        .with_stores(stores)
        .with_currency(primary.catalog.currency());
    let origin = format!("{} + {}", primary.origin, fallback.origin);

    info!(
        event_name = "catalog.merged",
        origin = %origin,
        products = catalog.len(),
        stores = catalog.stores().len(),
        "catalogs merged"
    );

    Ok(LoadedCatalog { catalog, origin, warnings, currency_declared: primary.currency_declared })
}

fn read_file(path: &Path) -> Result<String, CatalogError> {
    fs::read_to_string(path)
        .map_err(|source| CatalogError::ReadFile { path: path.to_path_buf(), source })
}

pub fn parse_catalog(raw: &str, origin: &str) -> Result<LoadedCatalog, CatalogError> {
    let document: Value = serde_json::from_str(raw)
        .map_err(|source| CatalogError::Parse { origin: origin.to_string(), source })?;

    let (records, header) = match &document {
        Value::Array(records) => (records.as_slice(), None),
        Value::Object(header) => match header.get("products") {
            Some(Value::Array(records)) => (records.as_slice(), Some(header)),
            _ => return Err(CatalogError::MissingProducts { origin: origin.to_string() }),
        },
        _ => return Err(CatalogError::MissingProducts { origin: origin.to_string() }),
    };

    let mut products = Vec::with_capacity(records.len());
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();

    for (index, record) in records.iter().enumerate() {
        match parse_record(record) {
            Ok(entry) => {
                if !seen.insert(entry.id.clone()) {
                    warnings.push(CatalogWarning {
                        index,
                        product_id: Some(entry.id.0.clone()),
                        reason: "duplicate identifier".to_string(),
                    });
                    continue;
                }
                products.push(entry);
            }
            Err(reason) => warnings.push(CatalogWarning {
                index,
                product_id: record_id(record),
                reason,
            }),
        }
    }

    for warning in &warnings {
        warn!(
            event_name = "catalog.record.skipped",
            origin,
            index = warning.index,
            product_id = warning.product_id.as_deref().unwrap_or("unknown"),
            reason = %warning.reason,
            "skipping malformed catalog record"
        );
    }

    if products.is_empty() {
        return Err(CatalogError::Empty { origin: origin.to_string(), skipped: warnings.len() });
    }

    let mut catalog = Catalog::new(products)?;
    let currency_declared = header.is_some_and(declares_currency);
    if let Some(header) = header {
        catalog = apply_header(catalog, header);
    }

    info!(
        event_name = "catalog.loaded",
        origin,
        products = catalog.len(),
        stores = catalog.stores().len(),
        skipped = warnings.len(),
        "catalog loaded"
    );

    Ok(LoadedCatalog { catalog, origin: origin.to_string(), warnings, currency_declared })
}

fn declares_currency(header: &Map<String, Value>) -> bool {
    header.get("currency").and_then(Value::as_str).is_some_and(|currency| !currency.trim().is_empty())
}

fn apply_header(mut catalog: Catalog, header: &Map<String, Value>) -> Catalog {
    if let Some(Value::Array(stores)) = header.get("stores") {
        let stores = stores.iter().filter_map(Value::as_str).map(str::to_string);
        catalog = catalog.with_stores(stores.collect::<Vec<_>>());
    }
    if let Some(currency) = header.get("currency").and_then(Value::as_str) {
        if !currency.trim().is_empty() {
            catalog = catalog.with_currency(currency.trim());
        }
    }
    catalog
}

fn parse_record(record: &Value) -> Result<ProductEntry, String> {
    let object = record.as_object().ok_or_else(|| "record is not an object".to_string())?;

    let id = record_id(record).ok_or_else(|| "missing identifier".to_string())?;
    let name = NAME_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| "missing name".to_string())?;

    let unit = object
        .get("unit")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|unit| !unit.is_empty())
        .map(str::to_string);

    let aliases = match object.get("aliases") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(values)) => values
            .iter()
            .map(|value| {
                value.as_str().map(str::to_string).ok_or_else(|| "alias is not a string".to_string())
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|alias| !alias.trim().is_empty())
            .collect(),
        Some(_) => return Err("aliases must be a list".to_string()),
    };

    let prices = match object.get("prices") {
        Some(Value::Object(prices)) => parse_prices(prices)?,
        Some(_) => return Err("prices must be an object".to_string()),
        None => return Err("missing prices".to_string()),
    };

    Ok(ProductEntry { id: ProductId(id), name: name.to_string(), unit, aliases, prices })
}

fn parse_prices(raw: &Map<String, Value>) -> Result<BTreeMap<String, Option<Decimal>>, String> {
    let mut prices = BTreeMap::new();
    for (store, value) in raw {
        let store = store.trim();
        if store.is_empty() {
            return Err("empty store name".to_string());
        }
        let price = match value {
            Value::Null => None,
            Value::Number(number) => Some(
                parse_price(&number.to_string())
                    .ok_or_else(|| format!("invalid price for store `{store}`"))?,
            ),
            Value::String(text) => Some(
                parse_price(text)
                    .ok_or_else(|| format!("non-numeric price `{text}` for store `{store}`"))?,
            ),
            _ => return Err(format!("non-numeric price for store `{store}`")),
        };
        if price.is_some_and(|price| price > MAX_UNIT_PRICE) {
            return Err(format!("price for store `{store}` exceeds {MAX_UNIT_PRICE}"));
        }
        prices.insert(store.to_string(), price);
    }
    Ok(prices)
}

fn record_id(record: &Value) -> Option<String> {
    match record.get("id")? {
        Value::String(id) => Some(id.trim().to_string()).filter(|id| !id.is_empty()),
        Value::Number(id) if id.is_u64() || id.is_i64() => Some(id.to_string()),
        _ => None,
    }
}
