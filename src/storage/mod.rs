//! Storage Module
//!
//! Loading and saving the relations a site hosts. Files are CSV: a header
//! row of attribute names followed by one row per tuple. Every value is
//! kept as text.

pub mod csv;
pub mod error;

pub use csv::{load_table, load_table_with_options, parse_table, save_table, CsvOptions};
pub use error::{StorageError, StorageResult};
