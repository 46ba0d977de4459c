use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use sha2::{Digest, Sha256};

use crate::error::StoreError;
use crate::models::{HistoryEntry, Recipe};

pub const CATALOG_FILE: &str = "master_list.csv";
pub const HISTORY_FILE: &str = "history.csv";

const RECIPE_COLUMN: &str = "Recipe";
const CATEGORY_COLUMN: &str = "Item Type";
const DATE_COLUMN: &str = "Date";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Rows read from one file plus the digest of the bytes they came from.
///
/// `version` is `None` when the file did not exist. Pass it back to the
/// matching `save_*` call so concurrent edits are detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<T> {
    pub rows: T,
    pub version: Option<String>,
}

/// The catalog and history CSV files inside one data directory.
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
        Ok(Store {
            dir: dir.to_path_buf(),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn catalog_path(&self) -> PathBuf {
        self.dir.join(CATALOG_FILE)
    }

    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    pub fn load_catalog(&self) -> Result<Snapshot<Vec<Recipe>>> {
        let path = self.catalog_path();
        let Some(bytes) = read_if_exists(&path)? else {
            tracing::debug!(path = %path.display(), "no catalog file yet");
            return Ok(Snapshot {
                rows: Vec::new(),
                version: None,
            });
        };
        let rows = parse_catalog_csv(bytes.as_slice())
            .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
        tracing::debug!(recipes = rows.len(), "loaded catalog");
        Ok(Snapshot {
            rows,
            version: Some(content_version(&bytes)),
        })
    }

    pub fn load_history(&self) -> Result<Snapshot<Vec<HistoryEntry>>> {
        let path = self.history_path();
        let Some(bytes) = read_if_exists(&path)? else {
            tracing::debug!(path = %path.display(), "no history file yet");
            return Ok(Snapshot {
                rows: Vec::new(),
                version: None,
            });
        };
        let rows = parse_history_csv(bytes.as_slice())
            .with_context(|| format!("Failed to read history: {}", path.display()))?;
        tracing::debug!(entries = rows.len(), "loaded history");
        Ok(Snapshot {
            rows,
            version: Some(content_version(&bytes)),
        })
    }

    /// Write the catalog if the file still matches `expected`. Returns the new version.
    pub fn save_catalog(&self, rows: &[Recipe], expected: Option<&str>) -> Result<String> {
        let bytes = encode_catalog_csv(rows)?;
        write_if_unchanged(&self.catalog_path(), expected, &bytes)
    }

    /// Write the history if the file still matches `expected`. Returns the new version.
    pub fn save_history(&self, rows: &[HistoryEntry], expected: Option<&str>) -> Result<String> {
        let bytes = encode_history_csv(rows)?;
        write_if_unchanged(&self.history_path(), expected, &bytes)
    }
}

fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

fn write_if_unchanged(path: &Path, expected: Option<&str>, bytes: &[u8]) -> Result<String> {
    let current = read_if_exists(path)?.map(|b| content_version(&b));
    if current.as_deref() != expected {
        let file = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        tracing::warn!(%file, "refusing to overwrite a file changed since it was loaded");
        return Err(StoreError::Conflict { file }.into());
    }

    let tmp = path.with_extension("csv.tmp");
    fs::write(&tmp, bytes).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;

    let version = content_version(bytes);
    tracing::debug!(path = %path.display(), %version, "saved");
    Ok(version)
}

/// Lowercase hex SHA-256 of a file's bytes.
#[must_use]
pub fn content_version(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}

fn cell(record: &csv::StringRecord, idx: Option<usize>) -> String {
    idx.and_then(|i| record.get(i))
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Parse the master list. Header names are matched ignoring case; rows with a
/// blank recipe name are skipped and a missing category column reads as blank.
pub fn parse_catalog_csv<R: Read>(reader: R) -> Result<Vec<Recipe>> {
    let mut rdr = csv_reader(reader);
    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();

    let idx_recipe = column(&headers, RECIPE_COLUMN);
    let idx_category = column(&headers, CATEGORY_COLUMN);
    if idx_recipe.is_none() && !headers.is_empty() {
        tracing::warn!("catalog has no '{RECIPE_COLUMN}' column");
    }

    let mut rows = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to parse CSV row {}", line_num + 2))?;
        let name = cell(&record, idx_recipe);
        if name.is_empty() {
            continue;
        }
        rows.push(Recipe {
            name,
            category: cell(&record, idx_category),
        });
    }
    Ok(rows)
}

/// Parse the pick history. Unparseable dates become `None` for that row only;
/// blank categories become `None`.
pub fn parse_history_csv<R: Read>(reader: R) -> Result<Vec<HistoryEntry>> {
    let mut rdr = csv_reader(reader);
    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();

    let idx_date = column(&headers, DATE_COLUMN);
    let idx_recipe = column(&headers, RECIPE_COLUMN);
    let idx_category = column(&headers, CATEGORY_COLUMN);

    let mut rows = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to parse CSV row {}", line_num + 2))?;
        let recipe = cell(&record, idx_recipe);
        if recipe.is_empty() {
            continue;
        }
        let raw_date = cell(&record, idx_date);
        let date = parse_date_cell(&raw_date);
        if date.is_none() && !raw_date.is_empty() {
            tracing::debug!(row = line_num + 2, value = %raw_date, "unparseable history date");
        }
        let category = cell(&record, idx_category);
        rows.push(HistoryEntry {
            date,
            recipe,
            category: (!category.is_empty()).then_some(category),
        });
    }
    Ok(rows)
}

/// Accepts `YYYY-MM-DD`, `DD-MM-YYYY`, and ISO date-times (the time is dropped).
#[must_use]
pub fn parse_date_cell(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
}

pub fn encode_catalog_csv(rows: &[Recipe]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut wtr = csv::Writer::from_writer(&mut buf);
        wtr.write_record([RECIPE_COLUMN, CATEGORY_COLUMN])?;
        for r in rows {
            wtr.write_record([r.name.as_str(), r.category.as_str()])?;
        }
        wtr.flush().context("Failed to encode catalog CSV")?;
    }
    Ok(buf)
}

pub fn encode_history_csv(rows: &[HistoryEntry]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut wtr = csv::Writer::from_writer(&mut buf);
        wtr.write_record([DATE_COLUMN, RECIPE_COLUMN, CATEGORY_COLUMN])?;
        for e in rows {
            let date = e
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            wtr.write_record([
                date.as_str(),
                e.recipe.as_str(),
                e.category.as_deref().unwrap_or(""),
            ])?;
        }
        wtr.flush().context("Failed to encode history CSV")?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_catalog_tolerates_messy_headers() {
        let csv = " recipe , ITEM TYPE \nIdli, Breakfast\n,Dinner\nSoup,\n";
        let rows = parse_catalog_csv(csv.as_bytes()).unwrap();
        assert_eq!(
            rows,
            vec![Recipe::new("Idli", "Breakfast"), Recipe::new("Soup", "")]
        );
    }

    #[test]
    fn test_parse_catalog_missing_category_column() {
        let rows = parse_catalog_csv("Recipe\nIdli\n".as_bytes()).unwrap();
        assert_eq!(rows, vec![Recipe::new("Idli", "")]);
    }

    #[test]
    fn test_parse_catalog_empty_input() {
        assert!(parse_catalog_csv("".as_bytes()).unwrap().is_empty());
        assert!(parse_catalog_csv("Recipe,Item Type\n".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_history_dates() {
        let csv = "\
Date,Recipe,Item Type
2024-03-10,Idli,Breakfast
2024-03-11 00:00:00,Dosa,Breakfast
12-03-2024,Soup,Dinner
not a date,Poha,
,Rajma,Lunch
";
        let rows = parse_history_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].date, Some(date(2024, 3, 10)));
        assert_eq!(rows[1].date, Some(date(2024, 3, 11)));
        assert_eq!(rows[2].date, Some(date(2024, 3, 12)));
        assert_eq!(rows[3].date, None);
        assert_eq!(rows[3].category, None);
        assert_eq!(rows[4].date, None);
        assert_eq!(rows[4].category.as_deref(), Some("Lunch"));
    }

    #[test]
    fn test_parse_date_cell_iso_datetime() {
        assert_eq!(parse_date_cell("2024-03-11T18:30:00"), Some(date(2024, 3, 11)));
        assert_eq!(parse_date_cell("  "), None);
        assert_eq!(parse_date_cell("2024-02-30"), None);
    }

    #[test]
    fn test_encode_history_writes_iso_dates() {
        let rows = vec![
            HistoryEntry::new(date(2024, 3, 10), "Idli", "Breakfast"),
            HistoryEntry {
                date: None,
                recipe: "Soup, hot".to_string(),
                category: None,
            },
        ];
        let text = String::from_utf8(encode_history_csv(&rows).unwrap()).unwrap();
        assert_eq!(
            text,
            "Date,Recipe,Item Type\n2024-03-10,Idli,Breakfast\n,\"Soup, hot\",\n"
        );
    }

    #[test]
    fn test_store_missing_files_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        let catalog = store.load_catalog().unwrap();
        assert!(catalog.rows.is_empty());
        assert!(catalog.version.is_none());

        let history = store.load_history().unwrap();
        assert!(history.rows.is_empty());
        assert!(history.version.is_none());
    }

    #[test]
    fn test_store_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let recipes = vec![Recipe::new("Idli", "Breakfast"), Recipe::new("Soup", "Dinner")];

        let version = store.save_catalog(&recipes, None).unwrap();
        let loaded = store.load_catalog().unwrap();
        assert_eq!(loaded.rows, recipes);
        assert_eq!(loaded.version.as_deref(), Some(version.as_str()));
        assert!(!dir.path().join("master_list.csv.tmp").exists());
    }

    #[test]
    fn test_store_detects_conflicting_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        let first = store
            .save_history(&[HistoryEntry::new(date(2024, 3, 10), "Idli", "Breakfast")], None)
            .unwrap();
        let stale = store.load_history().unwrap();
        assert_eq!(stale.version.as_deref(), Some(first.as_str()));

        // Someone else writes in between
        store
            .save_history(
                &[HistoryEntry::new(date(2024, 3, 11), "Dosa", "Breakfast")],
                Some(first.as_str()),
            )
            .unwrap();

        let err = store
            .save_history(&stale.rows, stale.version.as_deref())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::Conflict { file }) if file == "history.csv"
        ));

        // Creating a file that already exists is also a conflict
        assert!(store.save_history(&[], None).is_err());
    }

    #[test]
    fn test_content_version_is_hex_sha256() {
        let v = content_version(b"");
        assert_eq!(
            v,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
