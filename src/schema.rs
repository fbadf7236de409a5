//! Column layout of the NHTSA ODI complaints flat file.
//!
//! The published file has no header row; its 49 tab-separated columns are
//! documented in the ODI data dictionary and listed here in file order.

use std::collections::HashMap;

use crate::error::SchemaError;

/// Column names of the complaints flat file, in file order.
pub const COLUMNS: [&str; 49] = [
    "CMPLID",
    "ODINO",
    "MFR_NAME",
    "MAKETXT",
    "MODELTXT",
    "YEARTXT",
    "CRASH",
    "FAILDATE",
    "FIRE",
    "INJURED",
    "DEATHS",
    "COMPDESC",
    "CITY",
    "STATE",
    "VIN",
    "DATEA",
    "LDATE",
    "MILES",
    "OCCURENCES",
    "CDESCR",
    "CMPL_TYPE",
    "POLICE_RPT_YN",
    "PURCH_DT",
    "ORIG_OWNER_YN",
    "ANTI_BRAKES_YN",
    "CRUISE_CONT_YN",
    "NUM_CYLS",
    "DRIVE_TRAIN",
    "FUEL_SYS",
    "FUEL_TYPE",
    "TRANS_TYPE",
    "VEH_SPEED",
    "DOT",
    "TIRE_SIZE",
    "LOC_OF_TIRE",
    "TIRE_FAIL_TYPE",
    "ORIG_EQUIP_YN",
    "MANUF_DT",
    "SEAT_TYPE",
    "RESTRAINT_TYPE",
    "DEALER_NAME",
    "DEALER_TEL",
    "DEALER_CITY",
    "DEALER_STATE",
    "DEALER_ZIP",
    "PROD_TYPE",
    "REPAIRED_YN",
    "MEDICAL_ATTN",
    "VEHICLES_TOWED_YN",
];

pub const MAKE: &str = "MAKETXT";
pub const MODEL: &str = "MODELTXT";
pub const YEAR: &str = "YEARTXT";
pub const FAIL_DATE: &str = "FAILDATE";

/// Columns the normalization stage reads. Everything else passes through.
pub const REQUIRED: [&str; 4] = [MAKE, MODEL, YEAR, FAIL_DATE];

/// Resolved column layout of one ingested table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
    make: usize,
    model: usize,
    year: usize,
    fail_date: usize,
}

impl Schema {
    /// Layout of the headerless flat file.
    pub fn flat_file() -> Self {
        // COLUMNS is fixed and contains every required name exactly once.
        Self {
            columns: COLUMNS.iter().map(|c| c.to_string()).collect(),
            make: 3,
            model: 4,
            year: 5,
            fail_date: 7,
        }
    }

    /// Resolves the required columns from a header row.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the header is empty, or when a required
    /// column is absent or appears more than once.
    pub fn from_header<S: AsRef<str>>(header: &[S]) -> Result<Self, SchemaError> {
        if header.is_empty() {
            return Err(SchemaError::EmptyHeader);
        }

        let columns: Vec<String> = header.iter().map(|h| h.as_ref().trim().to_string()).collect();

        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (i, name) in columns.iter().enumerate() {
            if REQUIRED.contains(&name.as_str()) && positions.insert(name.as_str(), i).is_some() {
                return Err(SchemaError::DuplicateColumn(name.clone()));
            }
        }

        let position = |name: &str| {
            positions
                .get(name)
                .copied()
                .ok_or_else(|| SchemaError::MissingColumn(name.to_string()))
        };

        let make = position(MAKE)?;
        let model = position(MODEL)?;
        let year = position(YEAR)?;
        let fail_date = position(FAIL_DATE)?;

        Ok(Self {
            columns,
            make,
            model,
            year,
            fail_date,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn make_index(&self) -> usize {
        self.make
    }

    pub fn model_index(&self) -> usize {
        self.model
    }

    pub fn year_index(&self) -> usize {
        self.year
    }

    pub fn fail_date_index(&self) -> usize {
        self.fail_date
    }
}
