//! Batch importer: reads a tabular file into rows, drives the cleaner and
//! deduplicator, and upserts each surviving record into the store.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::enrich::CompanyDetector;
use crate::error::{Result, TalentError};
use crate::etl::cleaner::RowCleaner;
use crate::etl::dedupe::deduplicate_profiles;
use crate::etl::normalize::title_case;
use crate::storage::{ProfileStore, UpsertOutcome};

/// File name pattern that carries a derivable category, e.g.
/// `linkedin_senior_software_engineer_results.csv` -> "Senior Software Engineer".
static CATEGORY_FILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^linkedin_(.+?)_results\.(csv|xlsx|xls)$").unwrap());

#[derive(Debug, Clone, Serialize)]
pub struct ImportStats {
    pub inserted: usize,
    pub updated: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Per-file outcome of a folder import. One file failing never stops its
/// siblings; the failure is reported in place of its stats.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FileReport {
    Imported(ImportStats),
    Failed { error: String },
}

pub struct Importer {
    store: Arc<dyn ProfileStore>,
    cleaner: RowCleaner,
}

impl Importer {
    pub fn new(store: Arc<dyn ProfileStore>, detector: Arc<dyn CompanyDetector>) -> Self {
        Self {
            store,
            cleaner: RowCleaner::new(detector),
        }
    }

    /// Imports a single CSV/Excel file, returning insert/update tallies.
    /// Each record's upsert is independent; the batch is not transactional.
    pub async fn import_file(&self, path: &Path, category: Option<&str>) -> Result<ImportStats> {
        let rows = read_rows(path)?;
        let mut cleaned = Vec::with_capacity(rows.len());
        for row in &rows {
            cleaned.push(self.cleaner.clean(row, category).await);
        }
        let unique = deduplicate_profiles(cleaned);

        let mut inserted = 0;
        let mut updated = 0;
        for mut profile in unique {
            match self.store.upsert(&mut profile).await? {
                UpsertOutcome::Inserted => inserted += 1,
                UpsertOutcome::Updated => updated += 1,
            }
        }

        info!(
            file = %path.display(),
            inserted,
            updated,
            category = category.unwrap_or("-"),
            "import finished"
        );
        Ok(ImportStats {
            inserted,
            updated,
            category: category.map(str::to_string),
        })
    }

    /// Imports every recognized tabular file in a folder. Without an explicit
    /// category, each file name is checked against the naming pattern.
    pub async fn import_folder(
        &self,
        dir: &Path,
        category: Option<&str>,
    ) -> Result<BTreeMap<String, FileReport>> {
        if !dir.is_dir() {
            return Err(TalentError::InvalidRequest(format!(
                "invalid folder path: {}",
                dir.display()
            )));
        }

        let mut results = BTreeMap::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !has_tabular_extension(file_name) {
                continue;
            }
            let file_category = category
                .map(str::to_string)
                .or_else(|| category_from_file_name(file_name));
            let report = match self.import_file(&path, file_category.as_deref()).await {
                Ok(stats) => FileReport::Imported(stats),
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "file import failed");
                    FileReport::Failed {
                        error: err.to_string(),
                    }
                }
            };
            results.insert(file_name.to_string(), report);
        }
        Ok(results)
    }
}

fn has_tabular_extension(file_name: &str) -> bool {
    let lowered = file_name.to_ascii_lowercase();
    lowered.ends_with(".csv") || lowered.ends_with(".xlsx") || lowered.ends_with(".xls")
}

/// Derives a category from the file name pattern: descriptive segment with
/// underscores turned into spaces, title-cased. Non-matching names get none.
pub fn category_from_file_name(file_name: &str) -> Option<String> {
    CATEGORY_FILE_RE
        .captures(file_name)
        .map(|caps| title_case(&caps[1].replace('_', " ")))
}

/// Reads the file into raw rows keyed by header cell. The header is matched
/// case-sensitively downstream, so cells are kept as-is apart from trimming.
fn read_rows(path: &Path) -> Result<Vec<Map<String, Value>>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match extension.as_str() {
        "csv" => read_csv_rows(path),
        "xlsx" | "xls" => read_sheet_rows(path),
        other => Err(TalentError::UnsupportedFormat(format!(
            "'{other}'. Use CSV or Excel."
        ))),
    }
}

fn read_csv_rows(path: &Path) -> Result<Vec<Map<String, Value>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = Map::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            row.insert(header.trim().to_string(), Value::String(value.to_string()));
        }
        rows.push(row);
    }
    Ok(rows)
}

fn read_sheet_rows(path: &Path) -> Result<Vec<Map<String, Value>>> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(path)?;
    let Some(range) = workbook.worksheet_range_at(0) else {
        return Ok(Vec::new());
    };
    let range = range?;

    let mut row_iter = range.rows();
    let Some(header_row) = row_iter.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for data_row in row_iter {
        let mut row = Map::new();
        for (header, cell) in headers.iter().zip(data_row.iter()) {
            if header.is_empty() {
                continue;
            }
            row.insert(header.clone(), cell_to_value(cell));
        }
        rows.push(row);
    }
    Ok(rows)
}

fn cell_to_value(cell: &calamine::Data) -> Value {
    use calamine::Data;

    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::Int(i) => Value::Number((*i).into()),
        Data::Bool(b) => Value::Bool(*b),
        other => Value::String(other.to_string()),
    }
}
