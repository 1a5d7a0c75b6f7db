pub mod address;
pub mod category;
pub mod listing;
pub mod notes;

pub use address::AddressRecord;
pub use category::{classify, ErrorCategory};
pub use listing::{ErrorRow, ListingRecord, RawListing};
