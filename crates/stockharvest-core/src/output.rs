//! Row output for metadata records in CSV or JSON Lines format.
//!
//! CSV output starts with the fixed [`HEADER`] row; every record is written as
//! one row with its columns in header order. `keywords` and `category` cells
//! hold compact JSON arrays.

use serde::Serialize;
use std::borrow::Cow;
use std::io::{self, Write};

use crate::types::MetadataRecord;

/// Output column names, in order.
pub const HEADER: [&str; 6] = [
    "searched_keyword",
    "photo_id",
    "keywords",
    "description",
    "category",
    "file_path",
];

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Comma-separated values with a header row
    Csv,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }

    /// Conventional file extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::JsonLines => "jsonl",
        }
    }
}

/// An append-only writer that serializes metadata records as rows.
pub struct RowWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    rows_written: usize,
}

impl<W: Write> RowWriter<W> {
    /// Create a new row writer. Nothing is written until
    /// [`write_header`](Self::write_header) or [`write`](Self::write).
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            rows_written: 0,
        }
    }

    /// Write the header row. A no-op for JSON Lines.
    pub fn write_header(&mut self) -> io::Result<()> {
        if self.format == OutputFormat::Csv {
            let line = encode_csv_row(HEADER.iter().map(|c| Cow::Borrowed(*c)));
            self.writer.write_all(line.as_bytes())?;
        }
        Ok(())
    }

    /// Write a single record as one row.
    ///
    /// The row is encoded completely before anything reaches the sink, so an
    /// encoding failure never leaves half a row behind.
    pub fn write(&mut self, record: &MetadataRecord) -> io::Result<()> {
        let line = match self.format {
            OutputFormat::Csv => {
                let mut cells = Vec::with_capacity(HEADER.len());
                for column in HEADER {
                    let cell = record_field(record, column)?.unwrap_or_default();
                    cells.push(Cow::Owned(cell));
                }
                encode_csv_row(cells.into_iter())
            }
            OutputFormat::JsonLines => {
                let mut line = serde_json::to_string(record).map_err(io::Error::other)?;
                line.push('\n');
                line
            }
        };
        self.writer.write_all(line.as_bytes())?;
        self.rows_written += 1;
        Ok(())
    }

    /// Get the number of data rows written.
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Look up a record field by column name.
///
/// Returns `Ok(None)` for a column the record has no field for.
fn record_field(record: &MetadataRecord, column: &str) -> io::Result<Option<String>> {
    let value = match column {
        "searched_keyword" => record.searched_keyword.clone(),
        "photo_id" => record.photo_id.clone(),
        "keywords" => to_json_cell(&record.keywords)?,
        "description" => record.description.clone(),
        "category" => to_json_cell(&record.category)?,
        "file_path" => record.file_path.display().to_string(),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn to_json_cell<T: Serialize + ?Sized>(value: &T) -> io::Result<String> {
    serde_json::to_string(value).map_err(io::Error::other)
}

/// Quote a CSV field if it contains a delimiter, quote, or line break.
pub fn escape_csv_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn encode_csv_row<'a>(cells: impl Iterator<Item = Cow<'a, str>>) -> String {
    let mut line = cells
        .map(|cell| escape_csv_field(&cell).into_owned())
        .collect::<Vec<_>>()
        .join(",");
    line.push_str("\r\n");
    line
}
