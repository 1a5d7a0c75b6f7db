// src/domain/listing.rs

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::address::AddressRecord;
use super::notes;

/// Column order of both the results file and the errors file.
pub const COLUMNS: [&str; 17] = [
    "URL_Scrapped",
    "Website_Address",
    "Full_Address",
    "Street_Number",
    "Street_Name",
    "Zipcode",
    "State",
    "City",
    "County",
    "Latitude",
    "Longitude",
    "Beds",
    "Bath",
    "Price",
    "Available",
    "Note",
    "Timestamp",
];

/// One row of a results or errors file.
///
/// Field order matches [`COLUMNS`]; the csv writer relies on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingRecord {
    #[serde(rename = "URL_Scrapped")]
    pub url_scrapped: String,
    #[serde(rename = "Website_Address")]
    pub website_address: String,

    // Geocode-derived
    #[serde(rename = "Full_Address")]
    pub full_address: String,
    #[serde(rename = "Street_Number")]
    pub street_number: String,
    #[serde(rename = "Street_Name")]
    pub street_name: String,
    #[serde(rename = "Zipcode")]
    pub zipcode: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "County")]
    pub county: String,
    #[serde(rename = "Latitude")]
    pub latitude: Option<f64>,
    #[serde(rename = "Longitude")]
    pub longitude: Option<f64>,

    // Extraction-derived
    #[serde(rename = "Beds")]
    pub beds: String,
    #[serde(rename = "Bath")]
    pub bath: String,
    #[serde(rename = "Price")]
    pub price: String,
    #[serde(rename = "Available")]
    pub available: String,

    #[serde(rename = "Note")]
    pub note: String,
    #[serde(rename = "Timestamp", with = "timestamp_format")]
    pub timestamp: Option<NaiveDateTime>,
}

/// Upsert key: `(url_scrapped, website_address)`.
pub type RecordKey = (String, String);

impl ListingRecord {
    /// Builds a record from one extracted entry. Entries with neither an address
    /// nor a name cannot be keyed and are rejected.
    pub fn from_raw(raw: &RawListing, url: &str, now: NaiveDateTime) -> Option<Self> {
        let website_address = raw
            .address
            .as_deref()
            .or(raw.name.as_deref())
            .filter(|s| !s.is_empty())?
            .to_string();

        Some(ListingRecord {
            url_scrapped: url.to_string(),
            website_address,
            beds: raw.beds.clone().unwrap_or_default(),
            bath: raw.bath.clone().unwrap_or_default(),
            price: raw.price.clone().unwrap_or_default(),
            available: raw.availability.clone().unwrap_or_default(),
            timestamp: Some(now),
            ..Default::default()
        })
    }

    pub fn key(&self) -> RecordKey {
        (self.url_scrapped.clone(), self.website_address.clone())
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    #[cfg(test)]
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    pub fn apply_address(&mut self, address: &AddressRecord) {
        self.full_address = address.full_address.clone();
        self.street_number = address.street_number.clone();
        self.street_name = address.street_name.clone();
        self.zipcode = address.zipcode.clone();
        self.state = address.state.clone();
        self.city = address.city.clone();
        self.county = address.county.clone();
        self.latitude = address.latitude;
        self.longitude = address.longitude;
    }

    /// Overwrites this row with every non-empty field of `incoming`, stamps it
    /// and marks the note as updated. The key fields are left alone.
    pub fn merge_from(&mut self, incoming: &ListingRecord, now: NaiveDateTime) {
        macro_rules! overwrite_if_present {
            ($($field:ident),+) => {
                $(
                    if !incoming.$field.is_empty() {
                        self.$field = incoming.$field.clone();
                    }
                )+
            };
        }

        overwrite_if_present!(
            full_address,
            street_number,
            street_name,
            zipcode,
            state,
            city,
            county,
            beds,
            bath,
            price,
            available
        );

        if incoming.latitude.is_some() {
            self.latitude = incoming.latitude;
        }
        if incoming.longitude.is_some() {
            self.longitude = incoming.longitude;
        }

        if !incoming.note.is_empty() {
            self.note = if incoming.note.ends_with(notes::UPDATED_SUFFIX) {
                incoming.note.clone()
            } else {
                format!("{}{}", incoming.note, notes::UPDATED_SUFFIX)
            };
        }

        self.timestamp = Some(now);
    }
}

/// A failed pipeline run, as stored in the errors file.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRow {
    pub url_scrapped: String,
    pub note: String,
    pub timestamp: Option<NaiveDateTime>,
}

impl ErrorRow {
    pub fn new(url: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            url_scrapped: url.into(),
            note: note.into(),
            timestamp: None,
        }
    }
}

impl From<ErrorRow> for ListingRecord {
    fn from(row: ErrorRow) -> Self {
        ListingRecord {
            url_scrapped: row.url_scrapped,
            note: row.note,
            timestamp: row.timestamp,
            ..Default::default()
        }
    }
}

/// One entry as returned by the extraction agent. Models are loose about types,
/// so numbers and booleans are accepted and kept as text.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawListing {
    #[serde(default, deserialize_with = "loose_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose_text", alias = "location")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "loose_text", alias = "bedrooms")]
    pub beds: Option<String>,
    #[serde(default, deserialize_with = "loose_text", alias = "baths", alias = "bathrooms")]
    pub bath: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "loose_text", alias = "available")]
    pub availability: Option<String>,
}

fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(ts: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match ts {
            Some(ts) => serializer.serialize_str(&ts.format(FORMAT).to_string()),
            None => serializer.serialize_str(""),
        }
    }

    // Hand-edited files show up here; an unreadable stamp is dropped, not fatal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        Ok(NaiveDateTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
            .ok())
    }
}
