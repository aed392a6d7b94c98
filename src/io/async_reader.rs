//! Asynchronous CSV reader with batch interface
//!
//! Reads request script rows in batches for the async replay strategy.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of RequestRecords
//!                  ↓
//!           csv_format module
//!           (RequestRow, convert_request_row)
//! ```

use crate::io::csv_format::{convert_request_row, RequestRow};
use crate::types::RequestRecord;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Batch reader over a request script
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read up to `batch_size` valid rows
    ///
    /// Malformed rows are logged and skipped and do not count toward the
    /// batch. An empty batch means end of input.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<RequestRecord> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut rows = self.csv_reader.deserialize::<RequestRow>();

        while batch.len() < batch_size {
            match rows.next().await {
                Some(Ok(row)) => match convert_request_row(row) {
                    Ok(record) => batch.push(record),
                    Err(e) => warn!(error = %e, "Skipping invalid request row"),
                },
                Some(Err(e)) => warn!(error = %e, "Skipping malformed request row"),
                None => break,
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Request;
    use futures::io::Cursor;

    const HEADER: &str = "id,op,account,asset,amount,tx_hash,index,token,ttl_secs,target,at\n";
    const ASSET: &str = "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";

    fn reader(body: &str) -> AsyncReader<Cursor<Vec<u8>>> {
        AsyncReader::new(Cursor::new(format!("{HEADER}{body}").into_bytes()))
    }

    #[tokio::test]
    async fn test_async_reader_read_batch() {
        let mut reader = reader(&format!(
            "1,reserve,alice,{ASSET},10,,,,,,0\n\
             2,reserve,bob,{ASSET},20,,,,,,0\n\
             3,cancel,alice,,,,,,,1,1\n"
        ));

        let batch = reader.read_batch(2).await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].id, 1);
        assert_eq!(batch[1].id, 2);

        let batch = reader.read_batch(2).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].request, Request::Cancel { target: 1 });

        assert!(reader.read_batch(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_empty_csv() {
        let mut reader = reader("");
        assert!(reader.read_batch(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_skips_invalid_rows() {
        let mut reader = reader(&format!(
            "1,spend,alice,,,,,,,,0\n\
             x,expire,,,,,,,,,0\n\
             3,reserve,alice,{ASSET},10,,,,,,0\n"
        ));

        let batch = reader.read_batch(10).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, 3);
    }
}
