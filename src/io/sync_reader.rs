//! Synchronous CSV readers
//!
//! Provides a streaming iterator over request script rows and a loader for
//! UTXO snapshots. Delegates CSV format concerns to the csv_format module.
//!
//! # Iterator Interface
//!
//! `SyncReader` implements `Iterator`, yielding `Result<RequestRecord, ReserveError>`
//! for each CSV row:
//!
//! ```no_run
//! use utxo_reserver::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("requests.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(record) => println!("Replaying request: {:?}", record),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual row errors are yielded as `ReserveError::Parse` with the line number

use crate::io::csv_format::{convert_request_row, convert_utxo_row, RequestRow, UtxoRow};
use crate::types::{RequestRecord, ReserveError, Utxo};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;
use tracing::warn;

fn open(path: &Path) -> Result<csv::Reader<File>, ReserveError> {
    let file = File::open(path).map_err(|e| ReserveError::Io {
        message: format!("Failed to open file '{}': {}", path.display(), e),
    })?;

    Ok(ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .buffer_capacity(8 * 1024)
        .from_reader(file))
}

/// Streaming reader over a request script
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl SyncReader {
    pub fn new(path: &Path) -> Result<Self, ReserveError> {
        Ok(Self {
            reader: open(path)?,
            line_num: 1,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<RequestRecord, ReserveError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.reader.deserialize::<RequestRow>().next()?;
        self.line_num += 1;
        let line = Some(self.line_num);

        Some(match row {
            Ok(row) => convert_request_row(row).map_err(|message| ReserveError::Parse { line, message }),
            Err(e) => Err(ReserveError::Parse {
                line,
                message: e.to_string(),
            }),
        })
    }
}

/// Load a UTXO snapshot
///
/// Malformed rows are logged and skipped; only failing to open the file is fatal.
pub fn load_utxos(path: &Path) -> Result<Vec<Utxo>, ReserveError> {
    let mut reader = open(path)?;
    let mut utxos = Vec::new();

    for (i, row) in reader.deserialize::<UtxoRow>().enumerate() {
        let line = i + 2;
        match row.map_err(|e| e.to_string()).and_then(convert_utxo_row) {
            Ok(utxo) => utxos.push(utxo),
            Err(e) => warn!(line, error = %e, "Skipping malformed UTXO row"),
        }
    }

    Ok(utxos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Request;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "id,op,account,asset,amount,tx_hash,index,token,ttl_secs,target,at\n";
    const ASSET: &str = "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";
    const HASH: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_sync_reader_new_fails_on_missing_file() {
        let err = SyncReader::new(Path::new("nonexistent.csv")).unwrap_err();
        assert!(matches!(err, ReserveError::Io { .. }));
        assert!(err.to_string().contains("Failed to open file"));
    }

    #[test]
    fn test_sync_reader_iterates_rows_in_order() {
        let content = format!(
            "{HEADER}1,reserve,alice,{ASSET},25,,,,60,,0\n\
             2, cancel ,alice,,,,,,,1,5\n\
             3,expire,,,,,,,,,10\n"
        );
        let file = create_temp_csv(&content);

        let records: Vec<_> = SyncReader::new(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 3);
        assert!(matches!(records[0].request, Request::Reserve { ttl_secs: Some(60), .. }));
        assert_eq!(records[1].request, Request::Cancel { target: 1 });
        assert_eq!(records[1].at, 5);
        assert_eq!(records[2].request, Request::Expire);
    }

    #[test]
    fn test_sync_reader_reports_line_of_bad_row() {
        let content = format!(
            "{HEADER}1,reserve,alice,{ASSET},25,,,,,,0\n\
             2,spend,alice,,,,,,,,0\n\
             x,expire,,,,,,,,,0\n\
             4,expire,,,,,,,,,0\n"
        );
        let file = create_temp_csv(&content);

        let results: Vec<_> = SyncReader::new(file.path()).unwrap().collect();

        assert_eq!(results.len(), 4);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(ReserveError::Parse { line: Some(3), .. })));
        assert!(matches!(results[2], Err(ReserveError::Parse { line: Some(4), .. })));
        assert!(results[3].is_ok());
    }

    #[test]
    fn test_load_utxos_skips_malformed_rows() {
        let content = format!(
            "tx_hash,index,asset,amount,account,control_program,control_program_index\n\
             {HASH},0,{ASSET},10,alice,,\n\
             {HASH},1,{ASSET},-5,alice,,\n\
             {HASH},2,{ASSET},20,bob,00ff,3\n"
        );
        let file = create_temp_csv(&content);

        let utxos = load_utxos(file.path()).unwrap();

        assert_eq!(utxos.len(), 2);
        assert_eq!(utxos[0].amount, 10);
        assert_eq!(utxos[1].control_program, vec![0x00, 0xff]);
        assert_eq!(utxos[1].control_program_index, 3);
    }

    #[test]
    fn test_load_utxos_missing_file() {
        assert!(load_utxos(Path::new("nonexistent.csv")).is_err());
    }
}
