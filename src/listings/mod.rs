// Listing sources and listing-level parsing

pub mod file_source;
pub mod postcode;
pub mod rightmove;

pub use file_source::{read_table, write_table, FileSource, TableFormat};
pub use postcode::extract_postcode;
pub use rightmove::RightmoveSource;
