use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use tracing::info;

use super::StoreError;

const WEBSITES_COLUMN: &str = "websites";

/// Site URLs from the `websites` column of `path`, in file order. Blank cells
/// are skipped.
pub fn load_websites(path: &Path) -> Result<Vec<String>, StoreError> {
    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(file);

    let column = reader
        .headers()?
        .iter()
        .position(|h| h.eq_ignore_ascii_case(WEBSITES_COLUMN))
        .ok_or_else(|| StoreError::MissingColumn {
            path: path.to_path_buf(),
            column: WEBSITES_COLUMN,
        })?;

    let mut sites = Vec::new();
    for result in reader.records() {
        let record = result?;
        if let Some(url) = record.get(column).filter(|url| !url.is_empty()) {
            sites.push(url.to_string());
        }
    }

    info!(path = %path.display(), count = sites.len(), "Loaded websites");
    Ok(sites)
}
