//! Reader for the tab-separated complaints flat file.

use std::io::Read;

use anyhow::Result;
use csv::{ByteRecord, ReaderBuilder};
use flate2::read::GzDecoder;
use tracing::{debug, info, instrument, warn};

use crate::record::RawComplaint;
use crate::schema::Schema;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// How to read a raw complaints table.
#[derive(Debug, Clone, Copy)]
pub struct ReaderOptions {
    pub delimiter: u8,
    /// First row names the columns. The published flat file has none.
    pub has_headers: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            delimiter: b'\t',
            has_headers: false,
        }
    }
}

/// A raw table: its column layout plus rows in file order.
#[derive(Debug, Clone)]
pub struct ComplaintTable {
    pub schema: Schema,
    pub rows: Vec<RawComplaint>,
    /// Rows dropped for having more fields than the schema.
    pub skipped: usize,
}

/// Returns the bytes unchanged, or gunzipped when they carry the gzip magic.
pub fn decode_source(bytes: Vec<u8>) -> Result<Vec<u8>> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(bytes);
    }

    let mut decoded = Vec::new();
    GzDecoder::new(bytes.as_slice()).read_to_end(&mut decoded)?;
    debug!(compressed = bytes.len(), decoded = decoded.len(), "Gzip source decoded");
    Ok(decoded)
}

/// Reads raw complaints from delimited text.
///
/// Quoting is disabled: complaint narratives contain bare quote characters.
/// Short rows are padded with empty fields; rows longer than the schema are
/// skipped and counted. Non-UTF-8 bytes are replaced rather than rejected.
///
/// # Errors
///
/// Returns a [`SchemaError`](crate::error::SchemaError) when a header row
/// lacks a required column, and I/O errors from the underlying reader.
#[instrument(skip(reader), fields(has_headers = options.has_headers))]
pub fn read_complaints<R: Read>(reader: R, options: &ReaderOptions) -> Result<ComplaintTable> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(options.has_headers)
        .quoting(false)
        .flexible(true)
        .from_reader(reader);

    let schema = if options.has_headers {
        let header: Vec<String> = rdr.byte_headers()?.iter().map(lossy).collect();
        Schema::from_header(&header)?
    } else {
        Schema::flat_file()
    };

    let mut rows = Vec::new();
    let mut skipped = 0;
    let mut record = ByteRecord::new();

    while rdr.read_byte_record(&mut record)? {
        if record.len() > schema.len() {
            skipped += 1;
            let line = record.position().map(|p| p.line());
            warn!(line, fields = record.len(), expected = schema.len(), "Skipping malformed row");
            continue;
        }

        let mut fields: Vec<String> = record.iter().map(lossy).collect();
        fields.resize(schema.len(), String::new());
        rows.push(RawComplaint::new(fields));
    }

    info!(rows = rows.len(), skipped, "Complaint table read");
    Ok(ComplaintTable {
        schema,
        rows,
        skipped,
    })
}

fn lossy(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn flat_row(make: &str, model: &str, year: &str, fail: &str) -> String {
        let mut fields = vec![""; 49];
        fields[0] = "1";
        fields[3] = make;
        fields[4] = model;
        fields[5] = year;
        fields[7] = fail;
        fields[19] = "VEHICLE STALLED \"SUDDENLY\"";
        fields.join("\t")
    }

    #[test]
    fn test_read_headerless_flat_file() {
        let data = format!(
            "{}\n{}\n",
            flat_row("TOYOTA", "CAMRY", "2018", "20180101"),
            flat_row("HONDA", "CIVIC", "2016", "20170505")
        );
        let table = read_complaints(data.as_bytes(), &ReaderOptions::default()).unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.skipped, 0);
        assert_eq!(table.schema, Schema::flat_file());
        assert_eq!(table.rows[1].field(table.schema.make_index()), "HONDA");
        assert_eq!(table.rows[0].field(19), "VEHICLE STALLED \"SUDDENLY\"");
    }

    #[test]
    fn test_short_rows_padded_long_rows_skipped() {
        let long = format!("{}\textra", flat_row("FORD", "FOCUS", "2012", "20130101"));
        let data = format!("1\t2\t3\tKIA\n{}\n", long);
        let table = read_complaints(data.as_bytes(), &ReaderOptions::default()).unwrap();

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.skipped, 1);
        assert_eq!(table.rows[0].fields.len(), 49);
        assert_eq!(table.rows[0].field(3), "KIA");
        assert_eq!(table.rows[0].field(7), "");
    }

    #[test]
    fn test_read_with_headers() {
        let data = "MAKETXT,MODELTXT,YEARTXT,FAILDATE,CITY\nMAZDA,CX-5,2017,20170612,DENVER\n";
        let options = ReaderOptions {
            delimiter: b',',
            has_headers: true,
        };
        let table = read_complaints(data.as_bytes(), &options).unwrap();

        assert_eq!(table.schema.len(), 5);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].field(table.schema.fail_date_index()), "20170612");
        assert_eq!(table.rows[0].field(4), "DENVER");
    }

    #[test]
    fn test_read_with_headers_missing_column() {
        let data = "MAKETXT,MODELTXT,YEARTXT\nMAZDA,CX-5,2017\n";
        let options = ReaderOptions {
            delimiter: b',',
            has_headers: true,
        };
        let err = read_complaints(data.as_bytes(), &options).unwrap_err();

        assert_eq!(
            err.downcast_ref::<SchemaError>(),
            Some(&SchemaError::MissingColumn("FAILDATE".to_string()))
        );
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut data = flat_row("CITRO", "X", "2010", "20100101").into_bytes();
        data[15] = 0xFF;
        let table = read_complaints(data.as_slice(), &ReaderOptions::default()).unwrap();
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_decode_source_plain_passthrough() {
        let bytes = b"plain text".to_vec();
        assert_eq!(decode_source(bytes.clone()).unwrap(), bytes);
    }

    #[test]
    fn test_decode_source_gzip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"compressed rows").unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(decode_source(compressed).unwrap(), b"compressed rows".to_vec());
    }
}
