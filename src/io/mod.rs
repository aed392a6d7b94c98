//! I/O module
//!
//! Handles CSV parsing and output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (row conversion, result serialization)
//! - `sync_reader` - Synchronous request iterator and UTXO snapshot loader
//! - `async_reader` - Asynchronous request reader with batch interface

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{
    convert_request_row, convert_utxo_row, write_results_csv, RequestRow, UtxoRow,
};
pub use sync_reader::{load_utxos, SyncReader};
