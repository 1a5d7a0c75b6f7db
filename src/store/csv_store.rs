// src/store/csv_store.rs

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{Local, NaiveDateTime};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use tracing::{debug, error, info, warn};

use super::StoreError;
use crate::domain::listing::{RecordKey, COLUMNS};
use crate::domain::{ErrorRow, ListingRecord};

const ERRORS_FILE: &str = "errors.csv";
const RESULTS_FILE: &str = "results.csv";

/// Which file a write goes to. Always chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    Success,
    Error,
}

impl Sink {
    pub fn file_name(self) -> &'static str {
        match self {
            Sink::Success => RESULTS_FILE,
            Sink::Error => ERRORS_FILE,
        }
    }
}

impl fmt::Display for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::Success => write!(f, "results"),
            Sink::Error => write!(f, "errors"),
        }
    }
}

/// Counts from one upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub inserted: usize,
    pub updated: usize,
    pub total_rows: usize,
}

/// The results and errors files of one results directory.
///
/// Every write reloads the file, upserts into it and rewrites it whole, holding
/// the sink's mutex for the duration. Shared by reference across workers.
#[derive(Debug)]
pub struct CsvStore {
    dir: PathBuf,
    success_lock: Mutex<()>,
    error_lock: Mutex<()>,
}

impl CsvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            success_lock: Mutex::new(()),
            error_lock: Mutex::new(()),
        }
    }

    pub fn path(&self, sink: Sink) -> PathBuf {
        self.dir.join(sink.file_name())
    }

    /// The mutex guards no data, so a writer that panicked leaves nothing
    /// behind and the lock stays usable.
    fn lock(&self, sink: Sink) -> MutexGuard<'_, ()> {
        let lock = match sink {
            Sink::Success => &self.success_lock,
            Sink::Error => &self.error_lock,
        };
        lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Upserts `records` into `sink`. Failures are logged and reported as
    /// `false`; an empty batch is a no-op that also reports `false`.
    pub fn save(&self, records: &[ListingRecord], sink: Sink) -> bool {
        if records.is_empty() {
            warn!(%sink, "No data to save");
            return false;
        }

        match self.try_save(records, sink, Local::now().naive_local()) {
            Ok(summary) => {
                info!(
                    %sink,
                    inserted = summary.inserted,
                    updated = summary.updated,
                    total_rows = summary.total_rows,
                    "Data saved"
                );
                true
            }
            Err(e) => {
                error!(%sink, error = %e, "Error saving data");
                false
            }
        }
    }

    pub fn save_error(&self, row: ErrorRow) -> bool {
        self.save(&[row.into()], Sink::Error)
    }

    pub fn try_save(
        &self,
        records: &[ListingRecord],
        sink: Sink,
        now: NaiveDateTime,
    ) -> Result<SaveSummary, StoreError> {
        let _guard = self.lock(sink);
        let path = self.path(sink);

        let mut rows = read_records(&path)?;
        let (inserted, updated) = upsert(&mut rows, records, now);
        write_records(&path, &rows)?;

        Ok(SaveSummary {
            inserted,
            updated,
            total_rows: rows.len(),
        })
    }

    /// Current contents of `sink`; a file that does not exist yet is empty.
    pub fn load(&self, sink: Sink) -> Result<Vec<ListingRecord>, StoreError> {
        let _guard = self.lock(sink);
        read_records(&self.path(sink))
    }

    /// Read-modify-write of the whole sink under its lock.
    pub fn update_all<T>(
        &self,
        sink: Sink,
        apply: impl FnOnce(&mut Vec<ListingRecord>) -> T,
    ) -> Result<T, StoreError> {
        let _guard = self.lock(sink);
        let path = self.path(sink);

        let mut rows = read_records(&path)?;
        let out = apply(&mut rows);
        write_records(&path, &rows)?;
        Ok(out)
    }
}

/// Merges `incoming` into `existing` by `(url_scrapped, website_address)`.
/// Returns `(inserted, updated)`.
pub fn upsert(
    existing: &mut Vec<ListingRecord>,
    incoming: &[ListingRecord],
    now: NaiveDateTime,
) -> (usize, usize) {
    let mut index: HashMap<RecordKey, usize> = existing
        .iter()
        .enumerate()
        .map(|(i, row)| (row.key(), i))
        .collect();

    let (mut inserted, mut updated) = (0, 0);
    for record in incoming {
        let key = record.key();
        match index.get(&key) {
            Some(&i) => {
                existing[i].merge_from(record, now);
                updated += 1;
            }
            None => {
                let mut fresh = record.clone();
                fresh.timestamp = Some(now);
                index.insert(key, existing.len());
                existing.push(fresh);
                inserted += 1;
            }
        }
    }
    (inserted, updated)
}

pub fn read_records(path: &Path) -> Result<Vec<ListingRecord>, StoreError> {
    if !path.exists() {
        debug!(path = %path.display(), "No existing file, starting empty");
        return Ok(Vec::new());
    }

    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(file);

    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let row: ListingRecord = result?;
        rows.push(row);
    }
    Ok(rows)
}

/// Writes header plus rows to a sibling temp file, then renames it over `path`.
pub fn write_records(path: &Path, rows: &[ListingRecord]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let tmp = path.with_extension("csv.tmp");
    {
        let file = File::create(&tmp).map_err(|e| StoreError::io(&tmp, e))?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(COLUMNS)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush().map_err(|e| StoreError::io(&tmp, e))?;
    }

    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))
}

/// Rows of an errors file. Only `URL_Scrapped` is required; rows without a URL
/// are skipped.
pub fn load_error_rows(path: &Path) -> Result<Vec<ErrorRow>, StoreError> {
    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(file);

    let has_url = reader.headers()?.iter().any(|h| h == COLUMNS[0]);
    if !has_url {
        return Err(StoreError::MissingColumn {
            path: path.to_path_buf(),
            column: COLUMNS[0],
        });
    }

    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let record: ListingRecord = result?;
        if record.url_scrapped.is_empty() {
            continue;
        }
        rows.push(ErrorRow {
            url_scrapped: record.url_scrapped,
            note: record.note,
            timestamp: record.timestamp,
        });
    }
    Ok(rows)
}

/// The highest-numbered `errors-N.csv` in `dir`, else `errors.csv`.
pub fn latest_error_file(dir: &Path) -> PathBuf {
    let numbered = fs::read_dir(dir)
        .into_iter()
        .flatten()
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name();
            let n: u32 = name
                .to_str()?
                .strip_prefix("errors-")?
                .strip_suffix(".csv")?
                .parse()
                .ok()?;
            Some((n, entry.path()))
        })
        .max_by_key(|(n, _)| *n);

    match numbered {
        Some((_, path)) => path,
        None => dir.join(ERRORS_FILE),
    }
}
