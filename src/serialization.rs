//! Writers for loaded records.
//!
//! Records serialize as JSON objects of their set values, in field
//! declaration order.

use std::io::Write;

use serde::Serialize;
use thiserror::Error;

/// Error type for serialization operations
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// NDJSON (Newline Delimited JSON) writer
///
/// Writes records as NDJSON, one JSON object per line.
pub struct NdjsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> NdjsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write a single record as an NDJSON line
    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<(), SerializationError> {
        let json = serde_json::to_string(record)?;
        writeln!(self.writer, "{}", json)?;
        Ok(())
    }

    pub fn write_all<T: Serialize>(&mut self, records: &[T]) -> Result<(), SerializationError> {
        for record in records {
            self.write(record)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), SerializationError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Write one record as a JSON document, optionally pretty-printed
pub fn write_json<W: Write, T: Serialize>(
    mut writer: W,
    record: &T,
    pretty: bool,
) -> Result<(), SerializationError> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, record)?;
    } else {
        serde_json::to_writer(&mut writer, record)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write records as one JSON array
pub fn write_json_array<W: Write, T: Serialize>(
    mut writer: W,
    records: &[T],
    pretty: bool,
) -> Result<(), SerializationError> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, records)?;
    } else {
        serde_json::to_writer(&mut writer, records)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
