//! Dataset assembly
//!
//! Pivots resolved region values into a wide table: one row per region,
//! one column per source map labelled `"{map title} ({unit})"`.
//!
//! Cells without an observation hold the missing-value sentinel (0 by
//! default). After all maps are written, each column's sentinel cells are
//! replaced by the median of that column's other cells. A genuine observed
//! zero is indistinguishable from a missing cell and is imputed as well;
//! this is a known approximation. A column with no observed cell keeps
//! its sentinels.

use std::collections::{BTreeSet, HashSet};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::DatasetConfig;
use crate::legend::MapRecord;
use crate::resolve::ResolvedValue;

/// A value column and the map file it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub label: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub region_name: String,
    /// One cell per column, in column order
    pub cells: Vec<f64>,
}

/// Final, imputed region-by-map table
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    region_column: String,
    provenance_label: String,
    columns: Vec<Column>,
    rows: Vec<TableRow>,
}

impl ResultTable {
    pub fn region_column(&self) -> &str {
        &self.region_column
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn column_labels(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.label.as_str()).collect()
    }

    pub fn region_names(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.region_name.as_str()).collect()
    }

    pub fn cell(&self, region_name: &str, label: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c.label == label)?;
        self.rows
            .iter()
            .find(|r| r.region_name == region_name)
            .map(|r| r.cells[col])
    }

    pub fn header(&self) -> Vec<String> {
        std::iter::once(self.region_column.clone())
            .chain(self.columns.iter().map(|c| c.label.clone()))
            .collect()
    }

    /// Trailing row mapping each column label back to its source file
    pub fn provenance_row(&self) -> Vec<String> {
        std::iter::once(self.provenance_label.clone())
            .chain(self.columns.iter().map(|c| c.file_name.clone()))
            .collect()
    }

    /// Data rows as text followed by the provenance row
    pub fn text_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                std::iter::once(row.region_name.clone())
                    .chain(row.cells.iter().map(|v| format_cell(*v)))
                    .collect()
            })
            .chain(std::iter::once(self.provenance_row()))
            .collect()
    }

    /// One JSON object per row (provenance row last), keyed by header
    pub fn to_json_records(&self) -> Value {
        let mut records: Vec<Value> = self
            .rows
            .iter()
            .map(|row| {
                let mut object = Map::new();
                object.insert(self.region_column.clone(), Value::from(row.region_name.clone()));
                for (column, value) in self.columns.iter().zip(&row.cells) {
                    object.insert(column.label.clone(), Value::from(*value));
                }
                Value::Object(object)
            })
            .collect();

        let mut provenance = Map::new();
        provenance.insert(
            self.region_column.clone(),
            Value::from(self.provenance_label.clone()),
        );
        for column in &self.columns {
            provenance.insert(column.label.clone(), Value::from(column.file_name.clone()));
        }
        records.push(Value::Object(provenance));

        Value::Array(records)
    }
}

fn format_cell(value: f64) -> String {
    format!("{value:?}")
}

/// Median of `values`, or `None` for an empty slice
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Table under construction; becomes a [`ResultTable`] after imputation
#[derive(Debug)]
struct PendingTable {
    sentinel: f64,
    columns: Vec<Column>,
    rows: Vec<TableRow>,
}

impl PendingTable {
    /// One row per distinct region name; repeated detections share a row
    fn new(region_names: BTreeSet<String>, sentinel: f64) -> Self {
        let rows = region_names
            .into_iter()
            .map(|region_name| TableRow {
                region_name,
                cells: Vec::new(),
            })
            .collect();
        Self {
            sentinel,
            columns: Vec::new(),
            rows,
        }
    }

    fn add_column(&mut self, label: String, file_name: String) -> usize {
        self.columns.push(Column { label, file_name });
        for row in &mut self.rows {
            row.cells.push(self.sentinel);
        }
        self.columns.len() - 1
    }

    fn has_label(&self, label: &str) -> bool {
        self.columns.iter().any(|c| c.label == label)
    }

    /// Later writes to the same cell replace earlier ones
    fn set(&mut self, region_name: &str, col: usize, value: f64) {
        if let Some(row) = self.rows.iter_mut().find(|r| r.region_name == region_name) {
            row.cells[col] = value;
        }
    }

    fn impute(mut self, region_column: String, provenance_label: String) -> ResultTable {
        let sentinel = self.sentinel;

        for col in 0..self.columns.len() {
            let mut observed: Vec<f64> = self
                .rows
                .iter()
                .map(|r| r.cells[col])
                .filter(|v| *v != sentinel && v.is_finite())
                .collect();

            match median(&mut observed) {
                Some(fill) => {
                    for row in &mut self.rows {
                        if row.cells[col] == sentinel {
                            row.cells[col] = fill;
                        }
                    }
                }
                None => warn!(
                    column = %self.columns[col].label,
                    "column has no observed values, leaving missing cells as-is"
                ),
            }
        }

        ResultTable {
            region_column,
            provenance_label,
            columns: self.columns,
            rows: self.rows,
        }
    }
}

/// Builds the result table of a batch
#[derive(Debug, Clone, Default)]
pub struct DatasetAssembler {
    config: DatasetConfig,
}

impl DatasetAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &DatasetConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Assemble and impute the table.
    ///
    /// Columns follow the order of `records`; rows are sorted by region
    /// name and unique, so no two rows are ever identical. Maps with no
    /// resolved region get no column.
    pub fn assemble(&self, records: &[MapRecord], resolved: &[ResolvedValue]) -> ResultTable {
        let sentinel = self.config.missing_sentinel;
        let regions: BTreeSet<String> = resolved.iter().map(|r| r.region_name.clone()).collect();
        let mut table = PendingTable::new(regions, sentinel);
        let mut seen_files = HashSet::new();

        for record in records {
            if !seen_files.insert(record.file_name.as_str()) {
                continue;
            }

            let values: Vec<&ResolvedValue> = resolved
                .iter()
                .filter(|r| r.file_name == record.file_name)
                .collect();
            let Some(first) = values.first() else {
                warn!("no resolved regions for {}, no column added", record.file_name);
                continue;
            };

            let base = format!("{} ({})", record.map_title, first.unit);
            let label = unique_label(&table, base);
            let col = table.add_column(label, record.file_name.clone());

            for value in values {
                table.set(&value.region_name, col, value.value.unwrap_or(sentinel));
            }
        }

        debug!(
            rows = table.rows.len(),
            columns = table.columns.len(),
            "imputing missing cells"
        );
        table.impute(
            self.config.region_column.clone(),
            self.config.provenance_label.clone(),
        )
    }
}

/// Suffix ` #2`, ` #3`, ... onto a label already used by another map
fn unique_label(table: &PendingTable, base: String) -> String {
    if !table.has_label(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{base} #{n}"))
        .find(|candidate| !table.has_label(candidate))
        .unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legend::{MapType, Unit};

    fn record(file: &str, title: &str) -> MapRecord {
        MapRecord {
            file_name: file.into(),
            map_type: MapType::Discrete,
            map_title: title.into(),
            legend: Vec::new(),
        }
    }

    fn value(file: &str, region: &str, v: Option<f64>, unit: Unit) -> ResolvedValue {
        ResolvedValue {
            file_name: file.into(),
            region_name: region.into(),
            value: v,
            unit,
        }
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&mut []), None);
        assert_eq!(median(&mut [3.0]), Some(3.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&mut [4.0, 8.0, 1.0, 3.0]), Some(3.5));
    }

    #[test]
    fn test_pivot_and_labels() {
        let records = vec![record("a.png", "Income"), record("b.png", "Rate")];
        let resolved = vec![
            value("a.png", "Ohio", Some(10.0), Unit::Suffix('k')),
            value("a.png", "Iowa", Some(20.0), Unit::Suffix('k')),
            value("b.png", "Ohio", Some(1.5), Unit::Unspecified),
        ];

        let table = DatasetAssembler::new().assemble(&records, &resolved);
        assert_eq!(table.column_labels(), vec!["Income (k)", "Rate (u)"]);
        assert_eq!(table.region_names(), vec!["Iowa", "Ohio"]);
        assert_eq!(table.cell("Ohio", "Income (k)"), Some(10.0));
        // Iowa missing on b.png: median of observed {1.5}
        assert_eq!(table.cell("Iowa", "Rate (u)"), Some(1.5));
        assert_eq!(table.header(), vec!["State_Name", "Income (k)", "Rate (u)"]);
        assert_eq!(table.provenance_row(), vec!["File_Name", "a.png", "b.png"]);
    }

    #[test]
    fn test_last_write_wins_for_duplicate_regions() {
        let records = vec![record("a.png", "Income")];
        let resolved = vec![
            value("a.png", "Ohio", Some(10.0), Unit::Unspecified),
            value("a.png", "Ohio", Some(20.0), Unit::Unspecified),
        ];
        let table = DatasetAssembler::new().assemble(&records, &resolved);
        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.cell("Ohio", "Income (u)"), Some(20.0));
    }

    #[test]
    fn test_zero_is_imputed_with_column_median() {
        let records = vec![record("a.png", "A"), record("b.png", "B")];
        let resolved = vec![
            value("a.png", "Texas", Some(5.0), Unit::Unspecified),
            value("a.png", "Ohio", Some(7.0), Unit::Unspecified),
            value("b.png", "Texas", Some(0.0), Unit::Unspecified),
            value("b.png", "Ohio", Some(4.0), Unit::Unspecified),
            value("b.png", "Utah", Some(8.0), Unit::Unspecified),
        ];
        let table = DatasetAssembler::new().assemble(&records, &resolved);
        assert_eq!(table.cell("Texas", "B (u)"), Some(6.0));
        assert_eq!(table.cell("Texas", "A (u)"), Some(5.0));
        // Utah absent from a.png
        assert_eq!(table.cell("Utah", "A (u)"), Some(6.0));
    }

    #[test]
    fn test_unresolved_value_is_missing() {
        let records = vec![record("a.png", "A")];
        let resolved = vec![
            value("a.png", "Ohio", None, Unit::Unspecified),
            value("a.png", "Iowa", Some(3.0), Unit::Unspecified),
        ];
        let table = DatasetAssembler::new().assemble(&records, &resolved);
        assert_eq!(table.cell("Ohio", "A (u)"), Some(3.0));
    }

    #[test]
    fn test_all_missing_column_keeps_sentinel() {
        let records = vec![record("a.png", "A")];
        let resolved = vec![value("a.png", "Ohio", None, Unit::Unspecified)];
        let table = DatasetAssembler::new().assemble(&records, &resolved);
        let cell = table.cell("Ohio", "A (u)").unwrap();
        assert_eq!(cell, 0.0);
        assert!(!cell.is_nan());
    }

    #[test]
    fn test_map_without_regions_has_no_column() {
        let records = vec![record("a.png", "A"), record("b.png", "B")];
        let resolved = vec![value("a.png", "Ohio", Some(1.0), Unit::Unspecified)];
        let table = DatasetAssembler::new().assemble(&records, &resolved);
        assert_eq!(table.column_labels(), vec!["A (u)"]);
    }

    #[test]
    fn test_colliding_labels_are_suffixed() {
        let records = vec![record("a.png", "Rate"), record("b.png", "Rate")];
        let resolved = vec![
            value("a.png", "Ohio", Some(1.0), Unit::Unspecified),
            value("b.png", "Ohio", Some(2.0), Unit::Unspecified),
        ];
        let table = DatasetAssembler::new().assemble(&records, &resolved);
        assert_eq!(table.column_labels(), vec!["Rate (u)", "Rate (u) #2"]);
        assert_eq!(table.cell("Ohio", "Rate (u) #2"), Some(2.0));
    }

    #[test]
    fn test_text_rows_end_with_provenance() {
        let records = vec![record("a.png", "A")];
        let resolved = vec![value("a.png", "Ohio", Some(2.5), Unit::Suffix('%'))];
        let table = DatasetAssembler::new().assemble(&records, &resolved);
        let rows = table.text_rows();
        assert_eq!(rows[0], vec!["Ohio", "2.5"]);
        assert_eq!(rows[1], vec!["File_Name", "a.png"]);

        let json = table.to_json_records();
        assert_eq!(json[0]["State_Name"], "Ohio");
        assert_eq!(json[0]["A (%)"], 2.5);
        assert_eq!(json[1]["A (%)"], "a.png");
    }
}
