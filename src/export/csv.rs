// SPDX-License-Identifier: Apache-2.0

use std::time::Instant;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::engine::cursor::RowCursor;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::shaper::format_csv_value;
use crate::export::types::ExportSummary;

/// Streams CSV records into an async sink.
///
/// Each record is escaped by the `csv` crate into its own buffer and written
/// to the sink before the next row is read, so memory stays flat regardless
/// of how many rows the query returns.
pub struct CsvWriter<W> {
    writer: W,
    bytes_written: u64,
}

impl<W> CsvWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            bytes_written: 0,
        }
    }

    pub async fn write_header(&mut self, columns: &[String]) -> EngineResult<()> {
        self.write_record(columns).await
    }

    pub async fn write_record(&mut self, fields: &[String]) -> EngineResult<()> {
        let bytes = encode_record(fields)?;
        self.writer
            .write_all(&bytes)
            .await
            .map_err(|e| EngineError::write_failed(e.to_string()))?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    pub async fn finish(&mut self) -> EngineResult<()> {
        self.writer
            .flush()
            .await
            .map_err(|e| EngineError::write_failed(e.to_string()))
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

fn encode_record(fields: &[String]) -> EngineResult<Vec<u8>> {
    let mut staging = csv::WriterBuilder::new().from_writer(Vec::new());
    staging
        .write_record(fields)
        .map_err(|e| EngineError::write_failed(e.to_string()))?;
    staging
        .into_inner()
        .map_err(|e| EngineError::write_failed(e.error().to_string()))
}

/// Write every row of `cursor` as CSV, header first. No row limit applies.
pub async fn export_cursor<C, W>(cursor: &mut C, sink: W) -> EngineResult<ExportSummary>
where
    C: RowCursor + ?Sized,
    W: AsyncWrite + Unpin + Send,
{
    let started = Instant::now();
    let mut writer = CsvWriter::new(sink);
    writer.write_header(cursor.columns()).await?;

    let mut rows_exported = 0u64;
    while let Some(row) = cursor.next_row().await? {
        let record: Vec<String> = row.iter().map(format_csv_value).collect();
        writer.write_record(&record).await?;
        rows_exported += 1;
    }
    writer.finish().await?;

    Ok(ExportSummary {
        rows_exported,
        bytes_written: writer.bytes_written(),
        elapsed_ms: started.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cursor::MemoryCursor;
    use crate::engine::types::NativeValue;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_export_writes_header_and_escapes() {
        let ts = Utc.with_ymd_and_hms(2025, 12, 20, 10, 0, 0).unwrap();
        let mut cursor = MemoryCursor::new(
            vec!["id".into(), "note".into(), "at".into()],
            vec![
                vec![
                    NativeValue::Int(1),
                    NativeValue::Text("hello, \"world\"".into()),
                    NativeValue::Timestamp(ts),
                ],
                vec![NativeValue::Int(2), NativeValue::Null, NativeValue::Null],
            ],
        );

        let mut out = Vec::new();
        let summary = export_cursor(&mut cursor, &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "id,note,at\n1,\"hello, \"\"world\"\"\",2025-12-20T10:00:00Z\n2,,\n"
        );
        assert_eq!(summary.rows_exported, 2);
        assert_eq!(summary.bytes_written, text.len() as u64);
    }

    #[test]
    fn test_encode_record_quotes_only_when_needed() {
        let bytes = encode_record(&["a".into(), "b\nc".into(), String::new()]).unwrap();
        assert_eq!(bytes, b"a,\"b\nc\",\n");
    }

    #[tokio::test]
    async fn test_export_ignores_row_limit() {
        let rows = (0..1500).map(|i| vec![NativeValue::Int(i)]).collect();
        let mut cursor = MemoryCursor::new(vec!["n".into()], rows);

        let mut out = Vec::new();
        let summary = export_cursor(&mut cursor, &mut out).await.unwrap();

        assert_eq!(summary.rows_exported, 1500);
    }

    #[tokio::test]
    async fn test_export_surfaces_scan_failure() {
        let rows = (0..3).map(|i| vec![NativeValue::Int(i)]).collect();
        let mut cursor = MemoryCursor::new(vec!["n".into()], rows).failing_after(1);

        let mut out = Vec::new();
        let err = export_cursor(&mut cursor, &mut out).await.unwrap_err();
        assert!(matches!(err, EngineError::ScanFailed { .. }));
    }
}
