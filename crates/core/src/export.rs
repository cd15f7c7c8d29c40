//! Tabular export of a comparison.
//!
//! Columns are `query,product_id,product,unit,quantity,score` followed by one
//! column per store in catalog order. Store cells hold the line amount
//! (`unit_price * quantity`) and stay empty when the store does not stock
//! the product. The last row is labelled `TOTAL` and carries the store
//! subtotals.

use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::domain::comparison::ComparisonResult;
use crate::summary::format_amount;

pub const FIXED_COLUMNS: [&str; 6] = ["query", "product_id", "product", "unit", "quantity", "score"];
pub const TOTAL_ROW_LABEL: &str = "TOTAL";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unexpected export header: {0}")]
    InvalidHeader(String),
    #[error("invalid value `{value}` in column `{column}`")]
    InvalidValue { column: String, value: String },
    #[error("export has no `TOTAL` row")]
    MissingTotals,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub query: String,
    pub product_id: String,
    pub product: String,
    pub unit: String,
    pub quantity: u32,
    pub score: String,
    pub amounts: BTreeMap<String, Option<Decimal>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParsedExport {
    pub stores: Vec<String>,
    pub rows: Vec<ExportRow>,
    pub totals: BTreeMap<String, Decimal>,
}

pub fn header(comparison: &ComparisonResult) -> Vec<String> {
    FIXED_COLUMNS
        .iter()
        .map(|column| column.to_string())
        .chain(comparison.stores.iter().cloned())
        .collect()
}

pub fn export_csv<W: io::Write>(comparison: &ComparisonResult, writer: W) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(header(comparison))?;

    for line in &comparison.lines {
        let mut record = vec![
            line.query.clone(),
            line.product_id.0.clone(),
            line.product_name.clone(),
            line.unit.clone().unwrap_or_default(),
            line.quantity.to_string(),
            format!("{:.3}", line.score),
        ];
        record.extend(
            comparison
                .stores
                .iter()
                .map(|store| line.line_amount(store).map(format_amount).unwrap_or_default()),
        );
        csv_writer.write_record(&record)?;
    }

    let mut totals = vec![TOTAL_ROW_LABEL.to_string()];
    totals.extend(std::iter::repeat(String::new()).take(FIXED_COLUMNS.len() - 1));
    totals.extend(comparison.stores.iter().map(|store| {
        comparison.total_for(store).map(|total| format_amount(total.subtotal)).unwrap_or_default()
    }));
    csv_writer.write_record(&totals)?;

    csv_writer.flush()?;
    Ok(())
}

pub fn export_csv_string(comparison: &ComparisonResult) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    export_csv(comparison, &mut buffer)?;
    String::from_utf8(buffer).map_err(|error| ExportError::InvalidValue {
        column: "*".to_string(),
        value: error.to_string(),
    })
}

pub fn write_csv_file(comparison: &ComparisonResult, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path)?;
    export_csv(comparison, file)
}

pub fn parse_csv_export<R: io::Read>(reader: R) -> Result<ParsedExport, ExportError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let fixed: Vec<&str> = headers.iter().take(FIXED_COLUMNS.len()).collect();
    if fixed != FIXED_COLUMNS {
        return Err(ExportError::InvalidHeader(headers.iter().collect::<Vec<_>>().join(",")));
    }
    let stores: Vec<String> =
        headers.iter().skip(FIXED_COLUMNS.len()).map(str::to_string).collect();

    let mut rows = Vec::new();
    let mut totals = None;

    for record in csv_reader.records() {
        let record = record?;
        let cell = |index: usize| record.get(index).unwrap_or_default().to_string();
        let amounts = stores
            .iter()
            .enumerate()
            .map(|(offset, store)| {
                let raw = cell(FIXED_COLUMNS.len() + offset);
                parse_amount(store, &raw).map(|amount| (store.clone(), amount))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        if cell(0) == TOTAL_ROW_LABEL && cell(1).is_empty() {
            totals = Some(
                amounts
                    .into_iter()
                    .map(|(store, amount)| (store, amount.unwrap_or(Decimal::ZERO)))
                    .collect(),
            );
            continue;
        }

        let quantity_raw = cell(4);
        let quantity = quantity_raw.parse::<u32>().map_err(|_| ExportError::InvalidValue {
            column: "quantity".to_string(),
            value: quantity_raw.clone(),
        })?;

        rows.push(ExportRow {
            query: cell(0),
            product_id: cell(1),
            product: cell(2),
            unit: cell(3),
            quantity,
            score: cell(5),
            amounts,
        });
    }

    let totals = totals.ok_or(ExportError::MissingTotals)?;
    Ok(ParsedExport { stores, rows, totals })
}

fn parse_amount(column: &str, raw: &str) -> Result<Option<Decimal>, ExportError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    raw.trim().parse::<Decimal>().map(Some).map_err(|_| ExportError::InvalidValue {
        column: column.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use crate::aggregate::aggregate;
    use crate::catalog::{load_catalog, Catalog, CatalogSource};
    use crate::domain::comparison::ComparisonResult;
    use crate::domain::product::{ProductEntry, ProductId};
    use crate::domain::query::{parse_shopping_list, QueryItem};
    use crate::matching::Matcher;

    use super::{export_csv_string, parse_csv_export, write_csv_file, ExportError};

    fn milk_comparison() -> ComparisonResult {
        let catalog = Catalog::new(vec![ProductEntry {
            id: ProductId("1".to_string()),
            name: "milk".to_string(),
            unit: Some("1 l".to_string()),
            aliases: vec!["milk".to_string(), "Milch".to_string()],
            prices: BTreeMap::from([
                ("A".to_string(), Some(Decimal::new(109, 2))),
                ("B".to_string(), Some(Decimal::new(119, 2))),
                ("C".to_string(), None),
            ]),
        }])
        .expect("catalog");
        let items = [QueryItem::with_quantity("milch", 2), QueryItem::with_quantity("milkk", 1)];
        aggregate(&catalog, &Matcher::default().match_all(&catalog, &items))
    }

    #[test]
    fn export_has_stable_header_rows_and_totals() {
        let csv = export_csv_string(&milk_comparison()).expect("export");
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "query,product_id,product,unit,quantity,score,A,B,C");
        assert_eq!(lines[1], "milch,1,milk,1 l,2,1.000,2.18,2.38,");
        assert!(lines[2].starts_with("milkk,1,milk,1 l,1,0.889,1.09,1.19,"));
        assert_eq!(lines[3], "TOTAL,,,,,,3.27,3.57,0.00");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn round_trip_reproduces_store_totals() {
        let catalog = load_catalog(&CatalogSource::Builtin).expect("builtin").catalog;
        let items = parse_shopping_list("3x milch, brot, eier, kartofeln, schokolade x2, caviar");
        let comparison = aggregate(&catalog, &Matcher::default().match_all(&catalog, &items));

        let csv = export_csv_string(&comparison).expect("export");
        let parsed = parse_csv_export(csv.as_bytes()).expect("parse");

        assert_eq!(parsed.stores, comparison.stores);
        assert_eq!(parsed.rows.len(), comparison.lines.len());
        for total in &comparison.totals {
            assert_eq!(parsed.totals.get(&total.store), Some(&total.subtotal.round_dp(2)));
            let summed: Decimal =
                parsed.rows.iter().filter_map(|row| row.amounts[&total.store]).sum();
            assert_eq!(summed, total.subtotal);
        }
    }

    #[test]
    fn values_with_commas_are_quoted() {
        let catalog = load_catalog(&CatalogSource::Builtin).expect("builtin").catalog;
        let items = [QueryItem::new("kartoffeln")];
        let comparison = aggregate(&catalog, &Matcher::default().match_all(&catalog, &items));

        let csv = export_csv_string(&comparison).expect("export");

        assert!(csv.contains("\"kartoffeln 2,5kg\",\"2,5 kg\""), "{csv}");
        let parsed = parse_csv_export(csv.as_bytes()).expect("parse");
        assert_eq!(parsed.rows[0].product, "kartoffeln 2,5kg");
    }

    #[test]
    fn export_without_totals_row_is_rejected() {
        let raw = "query,product_id,product,unit,quantity,score,A\nmilch,1,milk,,1,1.000,1.09\n";

        let error = parse_csv_export(raw.as_bytes()).expect_err("parse should fail");

        assert!(matches!(error, ExportError::MissingTotals));
    }

    #[test]
    fn foreign_header_is_rejected() {
        let raw = "name,price\nmilk,1.09\n";

        let error = parse_csv_export(raw.as_bytes()).expect_err("parse should fail");

        assert!(matches!(error, ExportError::InvalidHeader(_)));
    }

    #[test]
    fn export_to_missing_directory_fails_and_result_stays_usable() {
        let comparison = milk_comparison();
        let dir = TempDir::new().expect("temp dir");
        let missing = dir.path().join("missing").join("export.csv");

        let error = write_csv_file(&comparison, &missing).expect_err("export should fail");
        assert!(matches!(error, ExportError::Io(_)));

        let path = dir.path().join("export.csv");
        write_csv_file(&comparison, &path).expect("re-export should succeed");
        let parsed =
            parse_csv_export(std::fs::File::open(&path).expect("open")).expect("parse");
        assert_eq!(parsed.totals.get("A"), Some(&Decimal::new(327, 2)));
    }
}
