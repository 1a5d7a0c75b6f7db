use std::collections::HashMap;

use tracing::{info, warn};

use super::Geocoder;
use crate::domain::listing::RecordKey;
use crate::domain::AddressRecord;
use crate::store::{CsvStore, Sink, StoreError};

/// Geocodes up to `max_rows` result rows that have an address but no
/// coordinates, and writes the found locations back. Returns the number of
/// rows updated.
///
/// Lookups run outside the sink lock; the write-back merges by key so rows
/// saved in the meantime are kept.
pub fn backfill(
    store: &CsvStore,
    geocoder: &dyn Geocoder,
    max_rows: usize,
) -> Result<usize, StoreError> {
    let pending: Vec<(RecordKey, String)> = store
        .load(Sink::Success)?
        .into_iter()
        .filter(|row| {
            row.latitude.is_none()
                && row.longitude.is_none()
                && !row.website_address.trim().is_empty()
        })
        .take(max_rows)
        .map(|row| (row.key(), row.website_address))
        .collect();

    if pending.is_empty() {
        info!("No rows need geocoding");
        return Ok(0);
    }
    info!(rows = pending.len(), max_rows, "Geocoding rows without coordinates");

    let mut found: HashMap<RecordKey, AddressRecord> = HashMap::new();
    for (key, address) in pending {
        match geocoder.geocode(&address) {
            Ok(Some(record)) if record.has_coordinates() => {
                found.insert(key, record);
            }
            Ok(_) => warn!(address = %address, "No location found"),
            Err(e) => warn!(address = %address, error = %e, "Geocoding failed"),
        }
    }

    if found.is_empty() {
        return Ok(0);
    }

    let updated = store.update_all(Sink::Success, |rows| {
        let mut updated = 0;
        for row in rows.iter_mut() {
            if let Some(address) = found.get(&row.key()) {
                row.apply_address(address);
                updated += 1;
            }
        }
        updated
    })?;

    info!(updated, "Geocode backfill finished");
    Ok(updated)
}
