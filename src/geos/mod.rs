mod backfill;
mod geocode_error;
mod geocoder;

pub use backfill::backfill;
pub use geocode_error::GeocodeError;
pub use geocoder::{geocoder_from_settings, Geocoder};
