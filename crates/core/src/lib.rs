pub mod aggregate;
pub mod catalog;
pub mod compare;
pub mod config;
pub mod domain;
pub mod errors;
pub mod export;
pub mod matching;
pub mod summary;

pub use aggregate::aggregate;
pub use catalog::{
    load_catalog, merge_catalogs, Catalog, CatalogError, CatalogSource, CatalogWarning,
    LoadedCatalog,
};
pub use compare::{open_catalog, PriceComparer};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use domain::comparison::{ComparisonLine, ComparisonResult, MatchResult, StoreTotal};
pub use domain::product::{ProductEntry, ProductId};
pub use domain::query::{parse_shopping_list, QueryItem};
pub use errors::{ApplicationError, InterfaceError};
pub use export::{export_csv, parse_csv_export, ExportError};
pub use matching::{match_query, Matcher, MatcherConfig, Scorer};
pub use summary::{Language, SummaryError, SummaryGenerator, TemplateSummaryGenerator};
