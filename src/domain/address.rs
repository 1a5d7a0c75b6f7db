/// Normalized geocoding result for one address.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressRecord {
    pub full_address: String,
    pub street_number: String,
    pub street_name: String,
    pub zipcode: String,
    pub state: String,
    pub city: String,
    pub county: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl AddressRecord {
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}
