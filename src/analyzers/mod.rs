//! Cohort filtering and ranking over annotated complaints.
//!
//! The filter narrows the annotated stream by model year, cohort size and
//! make/model allow-lists; the ranking stage summarizes annotated complaints
//! per make/model/year cohort.

pub mod filter;
pub mod ranking;
pub mod types;
