// src/geos/geocoder.rs

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::GeocodeError;
use crate::config::{GeocodingService, Settings};
use crate::domain::AddressRecord;

const OPENCAGE_URL: &str = "https://api.opencagedata.com/geocode/v1/json";
const GOOGLE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Resolves free-form address text. `Ok(None)` means the service answered but
/// found no match.
pub trait Geocoder: Send + Sync {
    fn geocode(&self, address: &str) -> Result<Option<AddressRecord>, GeocodeError>;
}

fn build_client() -> Result<Client, GeocodeError> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| GeocodeError::RequestFailed(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct OpenCageResponse {
    #[serde(default)]
    results: Vec<OpenCageResult>,
}

#[derive(Debug, Deserialize)]
struct OpenCageResult {
    #[serde(default)]
    formatted: String,
    #[serde(default)]
    components: HashMap<String, serde_json::Value>,
    geometry: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl OpenCageResponse {
    fn into_address(self) -> Option<AddressRecord> {
        let best = self.results.into_iter().next()?;
        let component = |key: &str| {
            best.components
                .get(key)
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let city = ["city", "town", "village"]
            .iter()
            .map(|key| component(*key))
            .find(|value| !value.is_empty())
            .unwrap_or_default();

        Some(AddressRecord {
            full_address: best.formatted.clone(),
            street_number: component("house_number"),
            street_name: component("road"),
            zipcode: component("postcode"),
            state: component("state"),
            city,
            county: component("county"),
            latitude: Some(best.geometry.lat),
            longitude: Some(best.geometry.lng),
        })
    }
}

pub struct OpenCageGeocoder {
    api_key: String,
    client: Client,
}

impl OpenCageGeocoder {
    pub fn new(api_key: String) -> Result<Self, GeocodeError> {
        Ok(Self {
            api_key,
            client: build_client()?,
        })
    }
}

impl Geocoder for OpenCageGeocoder {
    fn geocode(&self, address: &str) -> Result<Option<AddressRecord>, GeocodeError> {
        info!(address, "Attempting to geocode address with OpenCage");

        let resp = self
            .client
            .get(OPENCAGE_URL)
            .query(&[("q", address), ("key", self.api_key.as_str()), ("limit", "1")])
            .send()?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GeocodeError::ApiError(format!("OpenCage {status}: {body}")));
        }

        let body: OpenCageResponse = resp
            .json()
            .map_err(|e| GeocodeError::BadResponse(e.to_string()))?;
        let found = body.into_address();
        match &found {
            Some(record) => debug!(full_address = %record.full_address, "Geocoded with OpenCage"),
            None => warn!(address, "OpenCage could not find coordinates"),
        }
        Ok(found)
    }
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GoogleResult>,
}

#[derive(Debug, Deserialize)]
struct GoogleResult {
    #[serde(default)]
    formatted_address: String,
    #[serde(default)]
    address_components: Vec<GoogleComponent>,
    geometry: GoogleGeometry,
}

#[derive(Debug, Deserialize)]
struct GoogleComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleGeometry {
    location: GoogleLocation,
}

#[derive(Debug, Deserialize)]
struct GoogleLocation {
    lat: f64,
    lng: f64,
}

impl GoogleResponse {
    fn into_address(self) -> Result<Option<AddressRecord>, GeocodeError> {
        match self.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Ok(None),
            other => {
                return Err(GeocodeError::ApiError(format!(
                    "Google status {other}: {}",
                    self.error_message.unwrap_or_default()
                )))
            }
        }

        let Some(best) = self.results.into_iter().next() else {
            return Ok(None);
        };
        let component = |kind: &str| {
            best.address_components
                .iter()
                .find(|c| c.types.iter().any(|t| t == kind))
                .map(|c| c.long_name.clone())
                .unwrap_or_default()
        };

        Ok(Some(AddressRecord {
            full_address: best.formatted_address.clone(),
            street_number: component("street_number"),
            street_name: component("route"),
            zipcode: component("postal_code"),
            state: component("administrative_area_level_1"),
            city: component("locality"),
            county: component("administrative_area_level_2"),
            latitude: Some(best.geometry.location.lat),
            longitude: Some(best.geometry.location.lng),
        }))
    }
}

pub struct GoogleGeocoder {
    api_key: String,
    client: Client,
}

impl GoogleGeocoder {
    pub fn new(api_key: String) -> Result<Self, GeocodeError> {
        Ok(Self {
            api_key,
            client: build_client()?,
        })
    }
}

impl Geocoder for GoogleGeocoder {
    fn geocode(&self, address: &str) -> Result<Option<AddressRecord>, GeocodeError> {
        info!(address, "Attempting to geocode address with Google");

        let resp = self
            .client
            .get(GOOGLE_URL)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GeocodeError::ApiError(format!("Google {status}: {body}")));
        }

        let body: GoogleResponse = resp
            .json()
            .map_err(|e| GeocodeError::BadResponse(e.to_string()))?;
        let found = body.into_address()?;
        if found.is_none() {
            warn!(address, "Google could not find coordinates");
        }
        Ok(found)
    }
}

pub fn geocoder_from_settings(settings: &Settings) -> Result<Arc<dyn Geocoder>, GeocodeError> {
    let missing = |key: &str| GeocodeError::Config(format!("{key} environment variable not set"));

    match settings.geocoding_service {
        GeocodingService::OpenCage => {
            let key = settings
                .opencage_api_key
                .clone()
                .ok_or_else(|| missing("OPENCAGE_API_KEY"))?;
            Ok(Arc::new(OpenCageGeocoder::new(key)?))
        }
        GeocodingService::Google => {
            let key = settings
                .google_api_key
                .clone()
                .ok_or_else(|| missing("GOOGLE_API_KEY"))?;
            Ok(Arc::new(GoogleGeocoder::new(key)?))
        }
    }
}
