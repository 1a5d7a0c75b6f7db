use std::path::Path;

use rust_xlsxwriter::{Workbook, XlsxError};
use thiserror::Error;
use tracing::info;

use crate::domain::listing::COLUMNS;
use crate::domain::ListingRecord;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write {what}: {source}")]
    Xlsx {
        what: String,
        #[source]
        source: XlsxError,
    },
}

fn xlsx(what: impl Into<String>) -> impl FnOnce(XlsxError) -> ExportError {
    let what = what.into();
    move |source| ExportError::Xlsx { what, source }
}

pub fn google_maps_link(latitude: f64, longitude: f64) -> String {
    format!("https://www.google.com/maps/search/?api=1&query={latitude},{longitude}")
}

/// Writes `records` to a single-sheet workbook at `path`: the CSV columns in
/// order, then a `Map Link` column for rows that have coordinates.
pub fn export_listings_xlsx(records: &[ListingRecord], path: &Path) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    // Headers
    let map_col = COLUMNS.len() as u16;
    for (col, header) in COLUMNS.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *header)
            .map_err(xlsx(format!("header '{header}'")))?;
    }
    worksheet
        .write_string(0, map_col, "Map Link")
        .map_err(xlsx("header 'Map Link'"))?;

    // Rows
    for (i, record) in records.iter().enumerate() {
        let r = (i + 1) as u32;

        let text_cells = [
            &record.url_scrapped,
            &record.website_address,
            &record.full_address,
            &record.street_number,
            &record.street_name,
            &record.zipcode,
            &record.state,
            &record.city,
            &record.county,
        ];
        for (col, value) in text_cells.into_iter().enumerate() {
            worksheet
                .write_string(r, col as u16, value.as_str())
                .map_err(xlsx(COLUMNS[col]))?;
        }

        for (col, value) in [(9u16, record.latitude), (10, record.longitude)] {
            if let Some(value) = value {
                worksheet
                    .write_number(r, col, value)
                    .map_err(xlsx(COLUMNS[col as usize]))?;
            }
        }

        let detail_cells = [
            &record.beds,
            &record.bath,
            &record.price,
            &record.available,
            &record.note,
        ];
        for (offset, value) in detail_cells.into_iter().enumerate() {
            let col = 11 + offset;
            worksheet
                .write_string(r, col as u16, value.as_str())
                .map_err(xlsx(COLUMNS[col]))?;
        }

        let timestamp = record
            .timestamp
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        worksheet
            .write_string(r, 16, timestamp)
            .map_err(xlsx("Timestamp"))?;

        if let (Some(lat), Some(lon)) = (record.latitude, record.longitude) {
            worksheet
                .write_url(r, map_col, google_maps_link(lat, lon).as_str())
                .map_err(xlsx("map link"))?;
        }
    }

    workbook
        .save(path)
        .map_err(xlsx(format!("workbook {}", path.display())))?;

    info!(path = %path.display(), rows = records.len(), "Exported listings workbook");
    Ok(())
}
