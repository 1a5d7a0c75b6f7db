use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Geocoding API error: {0}")]
    ApiError(String),

    #[error("Unexpected geocoding response: {0}")]
    BadResponse(String),

    #[error("Geocoder configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for GeocodeError {
    fn from(err: reqwest::Error) -> Self {
        GeocodeError::RequestFailed(err.to_string())
    }
}
