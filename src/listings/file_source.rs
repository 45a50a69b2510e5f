use std::fs::{self, File};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::info;

use crate::app::ports::ListingSource;
use crate::error::{FlatFinderError, Result};
use crate::table::ListingTable;

/// On-disk table formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Json,
    Csv,
}

impl TableFormat {
    /// `.csv` is CSV; anything else is treated as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => TableFormat::Csv,
            _ => TableFormat::Json,
        }
    }
}

/// Listings previously saved to a JSON array or a CSV file with a header
/// row. Both need an `address` field per row.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ListingSource for FileSource {
    fn source_name(&self) -> &'static str {
        "file"
    }

    async fn fetch_table(&self) -> Result<ListingTable> {
        let table = read_table(&self.path)?;
        info!("Loaded {} listings from {}", table.len(), self.path.display());
        Ok(table)
    }
}

pub fn read_table(path: &Path) -> Result<ListingTable> {
    let records = match TableFormat::from_path(path) {
        TableFormat::Json => read_json_records(path)?,
        TableFormat::Csv => read_csv_records(path)?,
    };
    ListingTable::from_records(records)
}

fn read_json_records(path: &Path) -> Result<Vec<Map<String, Value>>> {
    let content = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    let rows = value.as_array().ok_or_else(|| FlatFinderError::Source {
        message: format!("{} does not contain a JSON array", path.display()),
    })?;

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            row.as_object().cloned().ok_or_else(|| FlatFinderError::Source {
                message: format!("row {i} of {} is not an object", path.display()),
            })
        })
        .collect()
}

fn read_csv_records(path: &Path) -> Result<Vec<Map<String, Value>>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(File::open(path)?);
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        let map = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), Value::String(v.to_string())))
            .collect();
        records.push(map);
    }
    Ok(records)
}

/// Write a table in the format implied by the path. Absent values are
/// `null` in JSON and empty cells in CSV.
pub fn write_table(table: &ListingTable, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let records = table.to_records()?;
    match TableFormat::from_path(path) {
        TableFormat::Json => {
            fs::write(path, serde_json::to_string_pretty(&records)?)?;
        }
        TableFormat::Csv => write_csv(&records, path)?,
    }
    info!("💾 Saved {} listings to {}", table.len(), path.display());
    Ok(())
}

fn write_csv(records: &[Map<String, Value>], path: &Path) -> Result<()> {
    // Header is the union of keys in first-seen order
    let mut header: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !header.contains(key) {
                header.push(key.clone());
            }
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&header)?;
    for record in records {
        let row: Vec<String> = header
            .iter()
            .map(|key| record.get(key).map(csv_cell).unwrap_or_default())
            .collect();
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
