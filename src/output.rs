//! Output formatting and persistence for annotated complaints and reports.
//!
//! Supports pretty-printing, JSON serialization, and CSV export.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::record::AnnotatedComplaint;
use crate::schema::Schema;
use csv::WriterBuilder;
use std::fs::File;
use std::io::Write;

/// Columns appended after the pass-through fields, in output order.
pub const DERIVED_COLUMNS: [&str; 10] = [
    "count",
    "model_year",
    "fail_date",
    "fail_epoch",
    "make_model",
    "make_model_year",
    "make_model_cum",
    "make_model_rate",
    "make_model_year_cum",
    "make_model_year_rate",
];

const FAIL_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty<T: std::fmt::Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes a value as pretty-printed JSON to `path`.
pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<()> {
    let mut file = File::create(path)?;
    serde_json::to_writer_pretty(&mut file, value)?;
    file.write_all(b"\n")?;
    debug!(path, "JSON written");
    Ok(())
}

/// Writes annotated complaints as CSV: every schema column verbatim, then
/// [`DERIVED_COLUMNS`]. Missing values are empty cells.
pub fn write_annotated<W: Write>(
    writer: W,
    schema: &Schema,
    records: &[AnnotatedComplaint],
) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(writer);

    let header: Vec<&str> = schema
        .columns()
        .iter()
        .map(String::as_str)
        .chain(DERIVED_COLUMNS)
        .collect();
    writer.write_record(&header)?;

    for a in records {
        let r = &a.record;
        let o = &a.observation;
        let derived = [
            r.count.to_string(),
            optional(r.model_year),
            r.fail_date
                .map(|d| d.format(FAIL_DATE_FORMAT).to_string())
                .unwrap_or_default(),
            a.fail_epoch.to_string(),
            r.keys.make_model.clone(),
            r.keys.make_model_year.clone(),
            o.make_model_cum.to_string(),
            o.make_model_rate.to_string(),
            o.make_model_year_cum.to_string(),
            optional(o.make_model_year_rate),
        ];
        let pass_through = r.raw.fields.iter().map(String::as_str);
        writer.write_record(pass_through.chain(derived.iter().map(String::as_str)))?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes annotated complaints as CSV to a file at `path`.
pub fn write_annotated_file(
    path: &str,
    schema: &Schema,
    records: &[AnnotatedComplaint],
) -> Result<()> {
    let file = File::create(path)?;
    write_annotated(file, schema, records)?;
    info!(path, records = records.len(), "Annotated complaints written");
    Ok(())
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::CohortKeys;
    use crate::record::{CohortObservation, NormalizedComplaint, RawComplaint};
    use crate::stats::IngestStats;
    use std::fs;

    fn annotated(year: Option<i32>) -> AnnotatedComplaint {
        let fail_date = chrono::NaiveDate::from_ymd_opt(2018, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        AnnotatedComplaint {
            record: NormalizedComplaint {
                raw: RawComplaint::new(vec![
                    "TOYOTA".into(),
                    "CAMRY".into(),
                    "2018".into(),
                    "20180601".into(),
                ]),
                make: "TOYOTA".into(),
                model: "CAMRY".into(),
                model_year: year,
                fail_date: Some(fail_date),
                fail_epoch: Some(1_527_811_200),
                keys: CohortKeys::build("TOYOTA", "CAMRY", "2018"),
                count: 1,
            },
            fail_epoch: 1_527_811_200,
            observation: CohortObservation {
                make_model_cum: 3,
                make_model_rate: 1.5,
                make_model_year_cum: 2,
                make_model_year_rate: year.map(|_| 0.25),
            },
        }
    }

    fn schema() -> Schema {
        Schema::from_header(&["MAKETXT", "MODELTXT", "YEARTXT", "FAILDATE"]).unwrap()
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&IngestStats::default());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&IngestStats::default()).unwrap();
    }

    #[test]
    fn test_write_annotated_header_and_row() {
        let mut buf = Vec::new();
        write_annotated(&mut buf, &schema(), &[annotated(Some(2018))]).unwrap();

        let content = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "MAKETXT,MODELTXT,YEARTXT,FAILDATE,count,model_year,fail_date,fail_epoch,\
             make_model,make_model_year,make_model_cum,make_model_rate,make_model_year_cum,\
             make_model_year_rate"
        );
        assert_eq!(
            lines[1],
            "TOYOTA,CAMRY,2018,20180601,1,2018,2018-06-01 00:00:00,1527811200,TOYOTA CAMRY,\
             TOYOTA CAMRY 2018,3,1.5,2,0.25"
        );
    }

    #[test]
    fn test_write_annotated_missing_values_are_empty() {
        let mut buf = Vec::new();
        write_annotated(&mut buf, &schema(), &[annotated(None)]).unwrap();

        let content = String::from_utf8(buf).unwrap();
        let row = content.lines().nth(1).unwrap();
        assert!(row.ends_with(",3,1.5,2,"));
        assert!(row.contains(",1,,2018-06-01"));
    }

    #[test]
    fn test_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("annotated.csv");
        let json_path = dir.path().join("stats.json");

        write_annotated_file(csv_path.to_str().unwrap(), &schema(), &[annotated(Some(2018))])
            .unwrap();
        write_json(json_path.to_str().unwrap(), &IngestStats::default()).unwrap();

        assert_eq!(fs::read_to_string(&csv_path).unwrap().lines().count(), 2);
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json["rows_read"], 0);
    }
}
