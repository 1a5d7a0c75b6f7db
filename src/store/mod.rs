mod csv_store;
mod store_error;
mod websites;

pub use csv_store::{latest_error_file, load_error_rows, CsvStore, Sink};
pub use store_error::StoreError;
pub use websites::load_websites;
