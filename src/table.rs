use crate::error::{FlatFinderError, Result};
use crate::listings::postcode::extract_postcode;
use crate::types::Listing;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Numeric columns the enrichment steps add to a listing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Transit,
    Bicycling,
    Walking,
    Distance,
    LateTransit,
    Latitude,
    Longitude,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Transit,
        Column::Bicycling,
        Column::Walking,
        Column::Distance,
        Column::LateTransit,
        Column::Latitude,
        Column::Longitude,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Column::Transit => "transit",
            Column::Bicycling => "bicycling",
            Column::Walking => "walking",
            Column::Distance => "distance",
            Column::LateTransit => "late_transit",
            Column::Latitude => "latitude",
            Column::Longitude => "longitude",
        }
    }

    pub fn from_name(name: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Freshly computed column values for one enrichment step.
///
/// Every column starts out fully absent and is sized to the row count of the
/// table it was created for; values are written by row index.
#[derive(Debug, Clone)]
pub struct ColumnSet {
    rows: usize,
    columns: BTreeMap<Column, Vec<Option<f64>>>,
}

impl ColumnSet {
    pub fn absent(rows: usize, columns: &[Column]) -> Self {
        Self {
            rows,
            columns: columns.iter().map(|c| (*c, vec![None; rows])).collect(),
        }
    }

    /// Write one cell. Writes outside the set's rows or columns are ignored.
    pub fn set(&mut self, row: usize, column: Column, value: Option<f64>) {
        if let Some(slot) = self.columns.get_mut(&column).and_then(|v| v.get_mut(row)) {
            *slot = value;
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of absent cells across all columns.
    pub fn absent_count(&self) -> usize {
        self.columns
            .values()
            .flat_map(|v| v.iter())
            .filter(|v| v.is_none())
            .count()
    }
}

/// A table of listings plus enrichment columns aligned by row index.
///
/// Every column always holds exactly one value per listing; failed lookups
/// are stored as `None` rather than left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingTable {
    listings: Vec<Listing>,
    columns: BTreeMap<Column, Vec<Option<f64>>>,
}

impl ListingTable {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings,
            columns: BTreeMap::new(),
        }
    }

    /// Build a table from loosely-typed records (JSON objects or CSV rows).
    ///
    /// `address` is required. Keys that name a known column are parsed back
    /// into that column so an already-enriched file can be re-enriched in
    /// place; everything else becomes a listing attribute.
    pub fn from_records(records: Vec<Map<String, Value>>) -> Result<Self> {
        let rows = records.len();
        let mut listings = Vec::with_capacity(rows);
        let mut columns: BTreeMap<Column, Vec<Option<f64>>> = BTreeMap::new();

        for (row, mut record) in records.into_iter().enumerate() {
            let address = match record.shift_remove("address") {
                Some(Value::String(s)) if !s.trim().is_empty() => s,
                _ => {
                    return Err(FlatFinderError::MissingField(format!(
                        "address (row {row})"
                    )))
                }
            };
            let postcode = match record.shift_remove("postcode") {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
                _ => extract_postcode(&address),
            };

            let mut attributes = Map::new();
            for (key, value) in record {
                match Column::from_name(&key) {
                    Some(column) => {
                        columns.entry(column).or_insert_with(|| vec![None; rows])[row] =
                            numeric_cell(&value);
                    }
                    None => {
                        attributes.insert(key, value);
                    }
                }
            }

            listings.push(Listing {
                address,
                postcode,
                attributes,
            });
        }

        Ok(Self { listings, columns })
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn column(&self, column: Column) -> Option<&[Option<f64>]> {
        self.columns.get(&column).map(|v| v.as_slice())
    }

    /// Value of one cell; `None` both for absent values and missing columns.
    pub fn value(&self, row: usize, column: Column) -> Option<f64> {
        self.columns
            .get(&column)
            .and_then(|v| v.get(row).copied())
            .flatten()
    }

    /// Columns present in the table, in canonical order.
    pub fn column_names(&self) -> Vec<Column> {
        Column::ALL
            .into_iter()
            .filter(|c| self.columns.contains_key(c))
            .collect()
    }

    /// Start an empty set of the given columns sized to this table.
    pub fn column_set(&self, columns: &[Column]) -> ColumnSet {
        ColumnSet::absent(self.len(), columns)
    }

    /// Return a new table with the given column replaced or added.
    pub fn with_column(mut self, column: Column, values: Vec<Option<f64>>) -> Result<Self> {
        if values.len() != self.len() {
            return Err(FlatFinderError::ColumnLength {
                column,
                expected: self.len(),
                actual: values.len(),
            });
        }
        self.columns.insert(column, values);
        Ok(self)
    }

    /// Merge a finished column set, replacing any columns with the same name.
    /// The merge is all-or-nothing.
    pub fn merge(mut self, set: ColumnSet) -> Result<Self> {
        if let Some((column, values)) = set.columns.iter().find(|(_, v)| v.len() != self.len()) {
            return Err(FlatFinderError::ColumnLength {
                column: *column,
                expected: self.len(),
                actual: values.len(),
            });
        }
        self.columns.extend(set.columns);
        Ok(self)
    }

    /// Flatten each row into a JSON object: listing fields first, then the
    /// enrichment columns. Absent values become `null`.
    pub fn to_records(&self) -> Result<Vec<Map<String, Value>>> {
        let names = self.column_names();
        self.listings
            .iter()
            .enumerate()
            .map(|(row, listing)| {
                let mut record = match serde_json::to_value(listing)? {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                for column in &names {
                    let cell = self
                        .value(row, *column)
                        .and_then(serde_json::Number::from_f64)
                        .map(Value::Number)
                        .unwrap_or(Value::Null);
                    record.insert(column.name().to_string(), cell);
                }
                Ok(record)
            })
            .collect()
    }
}

fn numeric_cell(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: Value) -> Vec<Map<String, Value>> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    #[test]
    fn test_from_records_splits_columns_and_attributes() {
        let table = ListingTable::from_records(records(json!([
            {"address": "1 Euston Road, London NW1 2RA", "price": 1850, "latitude": 51.52},
            {"address": "Camden, London", "latitude": null}
        ])))
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.listings()[0].postcode.as_deref(), Some("NW1 2RA"));
        assert_eq!(table.listings()[0].attributes["price"], json!(1850));
        assert_eq!(table.column(Column::Latitude).unwrap(), &[Some(51.52), None]);
        assert_eq!(table.column(Column::Longitude), None);
    }

    #[test]
    fn test_from_records_requires_address() {
        let err = ListingTable::from_records(records(json!([{"price": 1200}]))).unwrap_err();
        assert!(matches!(err, FlatFinderError::MissingField(_)));
    }

    #[test]
    fn test_column_missing_from_some_rows_stays_rectangular() {
        let table = ListingTable::from_records(records(json!([
            {"address": "A"},
            {"address": "B", "walking": "1200"}
        ])))
        .unwrap();
        assert_eq!(table.column(Column::Walking).unwrap(), &[None, Some(1200.0)]);
    }

    #[test]
    fn test_with_column_rejects_wrong_length() {
        let table = ListingTable::new(vec![Listing::new("A"), Listing::new("B")]);
        let err = table.with_column(Column::Transit, vec![Some(1.0)]).unwrap_err();
        assert!(matches!(
            err,
            FlatFinderError::ColumnLength { expected: 2, actual: 1, .. }
        ));
    }

    #[test]
    fn test_merge_replaces_existing_columns() {
        let table = ListingTable::new(vec![Listing::new("A")])
            .with_column(Column::Latitude, vec![Some(1.0)])
            .unwrap();

        let mut set = table.column_set(&[Column::Latitude, Column::Longitude]);
        set.set(0, Column::Latitude, Some(51.5));
        let table = table.merge(set).unwrap();

        assert_eq!(table.value(0, Column::Latitude), Some(51.5));
        assert_eq!(table.column(Column::Longitude).unwrap(), &[None]);
        assert_eq!(table.column_names(), vec![Column::Latitude, Column::Longitude]);
    }

    #[test]
    fn test_merge_from_foreign_set_fails() {
        let table = ListingTable::new(vec![Listing::new("A")]);
        let set = ColumnSet::absent(3, &[Column::Distance]);
        assert!(table.merge(set).is_err());
    }

    #[test]
    fn test_to_records_writes_null_for_absent() {
        let table = ListingTable::new(vec![Listing::new("A").with_attribute("price", 900)])
            .with_column(Column::Distance, vec![None])
            .unwrap();
        let out = table.to_records().unwrap();
        assert_eq!(out[0]["address"], json!("A"));
        assert_eq!(out[0]["price"], json!(900));
        assert_eq!(out[0]["distance"], Value::Null);
    }
}
